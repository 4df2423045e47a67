use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Course;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CourseCreate {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[validate(length(min = 1, message = "description must not be empty"))]
    pub(crate) description: String,
    #[serde(alias = "instructorName")]
    #[validate(length(min = 1, message = "instructor_name must not be empty"))]
    pub(crate) instructor_name: String,
    #[validate(range(min = 0.0, message = "price must be non-negative"))]
    pub(crate) price: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CourseUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[serde(alias = "instructorName")]
    pub(crate) instructor_name: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "price must be non-negative"))]
    pub(crate) price: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CourseResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) instructor_name: String,
    pub(crate) price: f64,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl CourseResponse {
    pub(crate) fn from_db(course: Course) -> Self {
        Self {
            id: course.id,
            title: course.title,
            description: course.description,
            instructor_name: course.instructor_name,
            price: course.price,
            created_by: course.created_by,
            created_at: format_primitive(course.created_at),
            updated_at: format_primitive(course.updated_at),
        }
    }
}
