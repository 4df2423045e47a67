pub(crate) mod attempts;
pub(crate) mod courses;
pub(crate) mod enrollments;
pub(crate) mod lessons;
pub(crate) mod progress;
pub(crate) mod questions;
pub(crate) mod quizzes;
pub(crate) mod users;
