use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    FillBlank,
}

/// A quiz question as provided by the question store. The core only reads
/// these; authoring and storage live outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub category_id: Uuid,
    pub text: String,
    pub kind: QuestionKind,
    pub correct_answer: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default = "default_difficulty")]
    pub difficulty: u8,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_difficulty() -> u8 {
    1
}

fn default_active() -> bool {
    true
}

impl Question {
    pub fn is_multiple_choice(&self) -> bool {
        self.kind == QuestionKind::MultipleChoice
    }

    /// Multiple-choice questions need a non-empty option set that actually
    /// contains the correct answer; fill-in-the-blank ones carry no options.
    pub fn is_well_formed(&self) -> bool {
        match self.kind {
            QuestionKind::MultipleChoice => {
                !self.options.is_empty() && self.options.iter().any(|o| o == &self.correct_answer)
            }
            QuestionKind::FillBlank => true,
        }
    }

    /// Projection shown to players while the question is in play.
    pub fn public_view(&self) -> PublicQuestionView {
        PublicQuestionView {
            id: self.id,
            text: self.text.clone(),
            kind: self.kind,
            options: self.options.clone(),
            difficulty: self.difficulty,
        }
    }

    /// Projection for post-round results and game summaries.
    pub fn full_view(&self) -> FullQuestionView {
        FullQuestionView {
            id: self.id,
            text: self.text.clone(),
            kind: self.kind,
            options: self.options.clone(),
            correct_answer: self.correct_answer.clone(),
            explanation: self.explanation.clone(),
            difficulty: self.difficulty,
        }
    }
}

/// Question payload during active play. Never carries the correct answer
/// or the explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestionView {
    pub id: Uuid,
    pub text: String,
    pub kind: QuestionKind,
    pub options: Vec<String>,
    pub difficulty: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullQuestionView {
    pub id: Uuid,
    pub text: String,
    pub kind: QuestionKind,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub difficulty: u8,
}
