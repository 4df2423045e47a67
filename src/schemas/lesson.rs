use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Lesson;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct LessonCreate {
    #[serde(alias = "course", alias = "courseId")]
    pub(crate) course_id: String,
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(alias = "videoUrl")]
    #[validate(length(min = 1, message = "video_url must not be empty"))]
    pub(crate) video_url: String,
    #[serde(default)]
    #[serde(alias = "resourceLinks")]
    pub(crate) resource_links: Vec<String>,
    #[serde(alias = "orderIndex", alias = "order")]
    #[validate(range(min = 1, message = "order_index must be at least 1"))]
    pub(crate) order_index: i32,
    #[serde(default)]
    #[serde(alias = "durationMinutes", alias = "duration")]
    #[validate(range(min = 0, message = "duration_minutes must be non-negative"))]
    pub(crate) duration_minutes: i32,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[serde(alias = "isPublished")]
    pub(crate) is_published: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct LessonUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    #[serde(alias = "videoUrl")]
    pub(crate) video_url: Option<String>,
    #[serde(default)]
    #[serde(alias = "resourceLinks")]
    pub(crate) resource_links: Option<Vec<String>>,
    #[serde(default)]
    #[serde(alias = "orderIndex", alias = "order")]
    #[validate(range(min = 1, message = "order_index must be at least 1"))]
    pub(crate) order_index: Option<i32>,
    #[serde(default)]
    #[serde(alias = "durationMinutes", alias = "duration")]
    #[validate(range(min = 0, message = "duration_minutes must be non-negative"))]
    pub(crate) duration_minutes: Option<i32>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[serde(alias = "isPublished")]
    pub(crate) is_published: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LessonResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) video_url: String,
    pub(crate) resource_links: Vec<String>,
    pub(crate) order_index: i32,
    pub(crate) duration_minutes: i32,
    pub(crate) is_published: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl LessonResponse {
    pub(crate) fn from_db(lesson: Lesson) -> Self {
        Self {
            id: lesson.id,
            course_id: lesson.course_id,
            title: lesson.title,
            description: lesson.description,
            video_url: lesson.video_url,
            resource_links: lesson.resource_links.0,
            order_index: lesson.order_index,
            duration_minutes: lesson.duration_minutes,
            is_published: lesson.is_published,
            created_at: format_primitive(lesson.created_at),
            updated_at: format_primitive(lesson.updated_at),
        }
    }
}
