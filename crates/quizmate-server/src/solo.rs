use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use quizmate_common::error::RoomError;
use quizmate_common::judge::{self, PlayMode};
use quizmate_common::protocol::SoloStatsView;

use crate::directory::MemberDirectory;
use crate::store::QuestionStore;

/// One graded solo answer.
#[derive(Debug, Clone)]
pub struct SoloResult {
    pub member_id: Uuid,
    pub question_id: Uuid,
    pub category_id: Uuid,
    pub answer_text: String,
    pub is_correct: bool,
    pub time_taken: Option<u32>,
    pub score_earned: u32,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CategoryProgress {
    pub questions_attempted: u32,
    pub questions_correct: u32,
    pub total_score: u64,
    pub completion_percentage: f64,
    pub last_played_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SoloOutcome {
    pub is_correct: bool,
    pub score_earned: u32,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub member_score: u64,
    pub member_level: u32,
}

/// Practice play outside any room: same judge, the wider quick-answer
/// window, and the only writer of cumulative member score and level.
pub struct SoloEngine {
    store: Arc<dyn QuestionStore>,
    directory: Arc<dyn MemberDirectory>,
    results: Mutex<Vec<SoloResult>>,
    progress: Mutex<HashMap<(Uuid, Uuid), CategoryProgress>>,
}

impl SoloEngine {
    pub fn new(store: Arc<dyn QuestionStore>, directory: Arc<dyn MemberDirectory>) -> Self {
        Self {
            store,
            directory,
            results: Mutex::new(Vec::new()),
            progress: Mutex::new(HashMap::new()),
        }
    }

    pub fn submit_answer(
        &self,
        member_id: Uuid,
        question_id: Uuid,
        answer_text: &str,
        time_taken: Option<u32>,
    ) -> Result<SoloOutcome, RoomError> {
        if answer_text.trim().is_empty() {
            return Err(RoomError::EmptyAnswer);
        }
        let question = self
            .store
            .by_id(question_id)
            .ok_or(RoomError::QuestionNotFound)?;

        let is_correct = judge::grade(&question.correct_answer, answer_text);
        let score_earned = judge::score_answer(is_correct, time_taken, PlayMode::Solo);
        let member = self.directory.credit_score(member_id, u64::from(score_earned))?;

        self.results.lock().unwrap().push(SoloResult {
            member_id,
            question_id,
            category_id: question.category_id,
            answer_text: answer_text.to_string(),
            is_correct,
            time_taken,
            score_earned,
            answered_at: Utc::now(),
        });

        let mut progress = self.progress.lock().unwrap();
        let entry = progress
            .entry((member_id, question.category_id))
            .or_insert_with(|| CategoryProgress {
                questions_attempted: 0,
                questions_correct: 0,
                total_score: 0,
                completion_percentage: 0.0,
                last_played_at: Utc::now(),
            });
        entry.questions_attempted += 1;
        if is_correct {
            entry.questions_correct += 1;
        }
        entry.total_score += u64::from(score_earned);
        entry.completion_percentage =
            f64::from(entry.questions_correct) / f64::from(entry.questions_attempted) * 100.0;
        entry.last_played_at = Utc::now();

        Ok(SoloOutcome {
            is_correct,
            score_earned,
            correct_answer: question.correct_answer.clone(),
            explanation: question.explanation.clone(),
            member_score: member.score,
            member_level: member.level,
        })
    }

    pub fn stats(&self, member_id: Uuid) -> Result<SoloStatsView, RoomError> {
        let member = self
            .directory
            .by_id(member_id)
            .ok_or(RoomError::MemberNotFound)?;
        let results = self.results.lock().unwrap();
        let attempted = results.iter().filter(|r| r.member_id == member_id).count() as u32;
        let correct = results
            .iter()
            .filter(|r| r.member_id == member_id && r.is_correct)
            .count() as u32;
        let accuracy_rate = if attempted > 0 {
            let rate = f64::from(correct) / f64::from(attempted) * 100.0;
            (rate * 100.0).round() / 100.0
        } else {
            0.0
        };
        Ok(SoloStatsView {
            total_questions_attempted: attempted,
            total_correct_answers: correct,
            total_score: member.score,
            current_level: member.level,
            accuracy_rate,
        })
    }

    pub fn category_progress(&self, member_id: Uuid, category_id: Uuid) -> Option<CategoryProgress> {
        self.progress
            .lock()
            .unwrap()
            .get(&(member_id, category_id))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryMemberDirectory;
    use crate::store::InMemoryQuestionStore;
    use quizmate_common::question::{Question, QuestionKind};

    fn question(category_id: Uuid, answer: &str) -> Question {
        Question {
            id: Uuid::new_v4(),
            category_id,
            text: format!("{}?", answer),
            kind: QuestionKind::FillBlank,
            correct_answer: answer.into(),
            options: vec![],
            explanation: Some("because".into()),
            difficulty: 2,
            is_active: true,
        }
    }

    fn engine(questions: Vec<Question>) -> (SoloEngine, Arc<InMemoryMemberDirectory>) {
        let directory = Arc::new(InMemoryMemberDirectory::new());
        let store = Arc::new(InMemoryQuestionStore::new(questions));
        (SoloEngine::new(store, directory.clone()), directory)
    }

    #[test]
    fn test_quick_correct_answer_earns_bonus() {
        let category = Uuid::new_v4();
        let q = question(category, "Au");
        let q_id = q.id;
        let (engine, directory) = engine(vec![q]);
        let member = directory.register("Alice");

        let outcome = engine.submit_answer(member.id, q_id, " au ", Some(25)).unwrap();
        assert!(outcome.is_correct);
        assert_eq!(outcome.score_earned, 15);
        assert_eq!(outcome.member_score, 15);
        assert_eq!(outcome.correct_answer, "Au");
        assert_eq!(directory.by_id(member.id).unwrap().score, 15);
    }

    #[test]
    fn test_slow_correct_answer_scores_base_points() {
        let category = Uuid::new_v4();
        let q = question(category, "Au");
        let q_id = q.id;
        let (engine, directory) = engine(vec![q]);
        let member = directory.register("Alice");
        let outcome = engine.submit_answer(member.id, q_id, "Au", Some(31)).unwrap();
        assert_eq!(outcome.score_earned, 10);
    }

    #[test]
    fn test_wrong_answer_scores_nothing() {
        let category = Uuid::new_v4();
        let q = question(category, "Au");
        let q_id = q.id;
        let (engine, directory) = engine(vec![q]);
        let member = directory.register("Alice");
        let outcome = engine.submit_answer(member.id, q_id, "Ag", Some(5)).unwrap();
        assert!(!outcome.is_correct);
        assert_eq!(outcome.score_earned, 0);
        assert_eq!(directory.by_id(member.id).unwrap().score, 0);
    }

    #[test]
    fn test_unknown_question_and_member() {
        let category = Uuid::new_v4();
        let q = question(category, "Au");
        let q_id = q.id;
        let (engine, directory) = engine(vec![q]);
        let member = directory.register("Alice");
        assert_eq!(
            engine
                .submit_answer(member.id, Uuid::new_v4(), "Au", None)
                .unwrap_err(),
            RoomError::QuestionNotFound
        );
        assert_eq!(
            engine.submit_answer(Uuid::new_v4(), q_id, "Au", None).unwrap_err(),
            RoomError::MemberNotFound
        );
        assert_eq!(
            engine.submit_answer(member.id, q_id, "  ", None).unwrap_err(),
            RoomError::EmptyAnswer
        );
    }

    #[test]
    fn test_stats_and_progress_accumulate() {
        let category = Uuid::new_v4();
        let q1 = question(category, "one");
        let q2 = question(category, "two");
        let (q1_id, q2_id) = (q1.id, q2.id);
        let (engine, directory) = engine(vec![q1, q2]);
        let member = directory.register("Alice");

        engine.submit_answer(member.id, q1_id, "one", Some(5)).unwrap();
        engine.submit_answer(member.id, q2_id, "nope", Some(5)).unwrap();

        let stats = engine.stats(member.id).unwrap();
        assert_eq!(stats.total_questions_attempted, 2);
        assert_eq!(stats.total_correct_answers, 1);
        assert_eq!(stats.accuracy_rate, 50.0);
        assert_eq!(stats.total_score, 15);
        assert_eq!(stats.current_level, 1);

        let progress = engine.category_progress(member.id, category).unwrap();
        assert_eq!(progress.questions_attempted, 2);
        assert_eq!(progress.questions_correct, 1);
        assert_eq!(progress.total_score, 15);
        assert_eq!(progress.completion_percentage, 50.0);
    }

    #[test]
    fn test_level_up_through_solo_play() {
        let category = Uuid::new_v4();
        let questions: Vec<Question> =
            (0..7).map(|i| question(category, &format!("a{}", i))).collect();
        let ids: Vec<Uuid> = questions.iter().map(|q| q.id).collect();
        let (engine, directory) = engine(questions);
        let member = directory.register("Alice");

        // 7 quick correct answers at 15 points apiece crosses 100
        for (i, q_id) in ids.iter().enumerate() {
            engine
                .submit_answer(member.id, *q_id, &format!("a{}", i), Some(3))
                .unwrap();
        }
        let stats = engine.stats(member.id).unwrap();
        assert_eq!(stats.total_score, 105);
        assert_eq!(stats.current_level, 2);
    }
}
