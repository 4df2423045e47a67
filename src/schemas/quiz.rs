use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Quiz;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuizCreate {
    #[serde(alias = "course", alias = "courseId")]
    pub(crate) course_id: String,
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default = "default_passing_score")]
    #[serde(alias = "passingScore")]
    #[validate(range(min = 0, max = 100, message = "passing_score must be between 0 and 100"))]
    pub(crate) passing_score: i32,
    #[serde(default = "default_time_limit")]
    #[serde(alias = "timeLimitMinutes", alias = "timeLimit")]
    #[validate(range(min = 1, message = "time_limit_minutes must be at least 1"))]
    pub(crate) time_limit_minutes: i32,
    #[serde(default = "default_max_attempts")]
    #[serde(alias = "maxAttempts")]
    #[validate(range(min = 1, message = "max_attempts must be at least 1"))]
    pub(crate) max_attempts: i32,
    #[serde(alias = "orderIndex", alias = "order")]
    #[validate(range(min = 1, message = "order_index must be at least 1"))]
    pub(crate) order_index: i32,
    #[serde(default)]
    #[serde(alias = "isPublished")]
    pub(crate) is_published: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuizUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[serde(alias = "passingScore")]
    #[validate(range(min = 0, max = 100, message = "passing_score must be between 0 and 100"))]
    pub(crate) passing_score: Option<i32>,
    #[serde(default)]
    #[serde(alias = "timeLimitMinutes", alias = "timeLimit")]
    #[validate(range(min = 1, message = "time_limit_minutes must be at least 1"))]
    pub(crate) time_limit_minutes: Option<i32>,
    #[serde(default)]
    #[serde(alias = "maxAttempts")]
    #[validate(range(min = 1, message = "max_attempts must be at least 1"))]
    pub(crate) max_attempts: Option<i32>,
    #[serde(default)]
    #[serde(alias = "orderIndex", alias = "order")]
    #[validate(range(min = 1, message = "order_index must be at least 1"))]
    pub(crate) order_index: Option<i32>,
    #[serde(default)]
    #[serde(alias = "isPublished")]
    pub(crate) is_published: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) passing_score: i32,
    pub(crate) time_limit_minutes: i32,
    pub(crate) max_attempts: i32,
    pub(crate) order_index: i32,
    pub(crate) is_published: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl QuizResponse {
    pub(crate) fn from_db(quiz: Quiz) -> Self {
        Self {
            id: quiz.id,
            course_id: quiz.course_id,
            title: quiz.title,
            description: quiz.description,
            passing_score: quiz.passing_score,
            time_limit_minutes: quiz.time_limit_minutes,
            max_attempts: quiz.max_attempts,
            order_index: quiz.order_index,
            is_published: quiz.is_published,
            created_at: format_primitive(quiz.created_at),
            updated_at: format_primitive(quiz.updated_at),
        }
    }
}

fn default_passing_score() -> i32 {
    70
}

fn default_time_limit() -> i32 {
    30
}

fn default_max_attempts() -> i32 {
    3
}
