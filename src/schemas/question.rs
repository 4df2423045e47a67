use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Question;
use crate::db::types::DifficultyLevel;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[serde(alias = "quiz", alias = "quizId")]
    pub(crate) quiz_id: String,
    #[serde(alias = "questionText")]
    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub(crate) question_text: String,
    pub(crate) options: Vec<String>,
    #[serde(alias = "correctAnswer")]
    #[validate(range(min = 0, max = 3, message = "correct_answer must be between 0 and 3"))]
    pub(crate) correct_answer: i32,
    #[serde(default = "default_points")]
    #[validate(range(min = 0, message = "points must be non-negative"))]
    pub(crate) points: i32,
    #[serde(alias = "orderIndex", alias = "order")]
    #[validate(range(min = 1, message = "order_index must be at least 1"))]
    pub(crate) order_index: i32,
    #[serde(default)]
    pub(crate) explanation: Option<String>,
    #[serde(default = "default_difficulty")]
    pub(crate) difficulty: DifficultyLevel,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionUpdate {
    #[serde(default)]
    #[serde(alias = "questionText")]
    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub(crate) question_text: Option<String>,
    #[serde(default)]
    pub(crate) options: Option<Vec<String>>,
    #[serde(default)]
    #[serde(alias = "correctAnswer")]
    #[validate(range(min = 0, max = 3, message = "correct_answer must be between 0 and 3"))]
    pub(crate) correct_answer: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 0, message = "points must be non-negative"))]
    pub(crate) points: Option<i32>,
    #[serde(default)]
    #[serde(alias = "orderIndex", alias = "order")]
    #[validate(range(min = 1, message = "order_index must be at least 1"))]
    pub(crate) order_index: Option<i32>,
    #[serde(default)]
    pub(crate) explanation: Option<String>,
    #[serde(default)]
    pub(crate) difficulty: Option<DifficultyLevel>,
}

/// Full view with the answer key. Admin endpoints only.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) question_text: String,
    pub(crate) options: Vec<String>,
    pub(crate) correct_answer: i32,
    pub(crate) points: i32,
    pub(crate) order_index: i32,
    pub(crate) explanation: Option<String>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

/// Learner-facing view: the answer key and explanation never leave the server
/// before an attempt is graded.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionPublicResponse {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) question_text: String,
    pub(crate) options: Vec<String>,
    pub(crate) points: i32,
    pub(crate) order_index: i32,
    pub(crate) difficulty: DifficultyLevel,
}

impl QuestionResponse {
    pub(crate) fn from_db(question: Question) -> Self {
        Self {
            id: question.id,
            quiz_id: question.quiz_id,
            question_text: question.question_text,
            options: question.options.0,
            correct_answer: question.correct_answer,
            points: question.points,
            order_index: question.order_index,
            explanation: question.explanation,
            difficulty: question.difficulty,
            created_at: format_primitive(question.created_at),
            updated_at: format_primitive(question.updated_at),
        }
    }
}

impl QuestionPublicResponse {
    pub(crate) fn from_db(question: Question) -> Self {
        Self {
            id: question.id,
            quiz_id: question.quiz_id,
            question_text: question.question_text,
            options: question.options.0,
            points: question.points,
            order_index: question.order_index,
            difficulty: question.difficulty,
        }
    }
}

fn default_points() -> i32 {
    1
}

fn default_difficulty() -> DifficultyLevel {
    DifficultyLevel::Medium
}
