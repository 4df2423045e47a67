use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Progress;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ProgressUpsert {
    #[serde(default)]
    #[serde(alias = "totalLessons")]
    #[validate(range(min = 0, message = "total_lessons must be non-negative"))]
    pub(crate) total_lessons: Option<i32>,
    #[serde(default)]
    #[serde(alias = "totalQuizzes")]
    #[validate(range(min = 0, message = "total_quizzes must be non-negative"))]
    pub(crate) total_quizzes: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuizProgressUpdate {
    #[serde(alias = "passedQuizzes")]
    #[validate(range(min = 0, message = "passed_quizzes must be non-negative"))]
    pub(crate) passed_quizzes: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct CompletedLessonView {
    pub(crate) lesson_id: String,
    pub(crate) completed_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProgressResponse {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) course_id: String,
    pub(crate) completed_lessons: Vec<CompletedLessonView>,
    pub(crate) total_lessons: i32,
    pub(crate) total_quizzes: i32,
    pub(crate) passed_quizzes: i32,
    pub(crate) completion_percentage: i32,
    pub(crate) last_accessed_at: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProgressStatsResponse {
    pub(crate) total_students: i64,
    pub(crate) completed_students: i64,
    pub(crate) active_students: i64,
    pub(crate) average_completion: f64,
    pub(crate) average_lessons_completed: f64,
    pub(crate) average_quizzes_passed: f64,
}

impl ProgressResponse {
    pub(crate) fn from_db(progress: Progress) -> Self {
        Self {
            id: progress.id,
            user_id: progress.user_id,
            course_id: progress.course_id,
            completed_lessons: progress
                .completed_lessons
                .0
                .into_iter()
                .map(|entry| CompletedLessonView {
                    lesson_id: entry.lesson_id,
                    completed_at: entry.completed_at,
                })
                .collect(),
            total_lessons: progress.total_lessons,
            total_quizzes: progress.total_quizzes,
            passed_quizzes: progress.passed_quizzes,
            completion_percentage: progress.completion_percentage,
            last_accessed_at: format_primitive(progress.last_accessed_at),
            created_at: format_primitive(progress.created_at),
            updated_at: format_primitive(progress.updated_at),
        }
    }
}
