use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use rand::seq::SliceRandom;
use uuid::Uuid;

use quizmate_common::question::Question;

/// Read-only source of quiz questions. Authoring lives elsewhere; the
/// coordinator only selects and reads.
pub trait QuestionStore: Send + Sync {
    fn by_id(&self, id: Uuid) -> Option<Question>;
    fn by_category(&self, category_id: Uuid) -> Vec<Question>;
    /// Uniform-random active question of the category, skipping `exclude`.
    fn random_excluding(&self, category_id: Uuid, exclude: &[Uuid]) -> Option<Question>;
}

pub struct InMemoryQuestionStore {
    questions: RwLock<HashMap<Uuid, Question>>,
}

impl InMemoryQuestionStore {
    pub fn new(questions: Vec<Question>) -> Self {
        let mut map = HashMap::new();
        for question in questions {
            if !question.is_well_formed() {
                tracing::warn!(question_id = %question.id, "skipping malformed question");
                continue;
            }
            map.insert(question.id, question);
        }
        Self {
            questions: RwLock::new(map),
        }
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let questions: Vec<Question> = serde_json::from_str(&raw)?;
        tracing::info!(count = questions.len(), path = %path.display(), "loaded questions");
        Ok(Self::new(questions))
    }

    pub fn len(&self) -> usize {
        self.questions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl QuestionStore for InMemoryQuestionStore {
    fn by_id(&self, id: Uuid) -> Option<Question> {
        self.questions.read().unwrap().get(&id).cloned()
    }

    fn by_category(&self, category_id: Uuid) -> Vec<Question> {
        self.questions
            .read()
            .unwrap()
            .values()
            .filter(|q| q.category_id == category_id && q.is_active)
            .cloned()
            .collect()
    }

    fn random_excluding(&self, category_id: Uuid, exclude: &[Uuid]) -> Option<Question> {
        let questions = self.questions.read().unwrap();
        let candidates: Vec<&Question> = questions
            .values()
            .filter(|q| q.category_id == category_id && q.is_active && !exclude.contains(&q.id))
            .collect();
        candidates.choose(&mut rand::thread_rng()).map(|q| (*q).clone())
    }
}
