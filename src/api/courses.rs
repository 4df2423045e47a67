use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::pagination::PaginatedResponse;
use crate::api::validation::validate_id;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::course::{CourseCreate, CourseResponse, CourseUpdate};

#[derive(Debug, Deserialize)]
struct ListCoursesQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
}

#[derive(Debug, Deserialize)]
struct SearchCoursesQuery {
    #[serde(default)]
    #[serde(alias = "query")]
    q: String,
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
}

#[derive(Debug, Deserialize)]
struct DeleteCourseQuery {
    #[serde(default)]
    force: bool,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route("/search", get(search_courses))
        .route(
            "/:course_id",
            get(get_course).patch(update_course).delete(delete_course),
        )
}

async fn create_course(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<CourseCreate>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let title = payload.title.trim();
    let taken = repositories::courses::exists_by_title(state.db(), title)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check course title"))?;
    if taken.is_some() {
        return Err(ApiError::Conflict("Course with this title already exists".to_string()));
    }

    let now = primitive_now_utc();
    let course = repositories::courses::create(
        state.db(),
        repositories::courses::CreateCourse {
            id: &Uuid::new_v4().to_string(),
            title,
            description: Some(payload.description.trim()),
            instructor_name: payload.instructor_name.trim(),
            price: payload.price,
            created_by: &admin.id,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create course"))?;

    Ok((StatusCode::CREATED, Json(CourseResponse::from_db(course))))
}

async fn list_courses(
    Query(params): Query<ListCoursesQuery>,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<CourseResponse>>, ApiError> {
    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 100);

    let courses = repositories::courses::list(state.db(), skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list courses"))?;
    let total_count = repositories::courses::count(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count courses"))?;

    Ok(Json(PaginatedResponse {
        items: courses.into_iter().map(CourseResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn search_courses(
    Query(params): Query<SearchCoursesQuery>,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<CourseResponse>>, ApiError> {
    let term = params.q.trim();
    if term.is_empty() {
        return Err(ApiError::BadRequest("Search query is required".to_string()));
    }

    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 100);

    let courses = repositories::courses::search(state.db(), term, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to search courses"))?;
    let total_count = repositories::courses::count_search(state.db(), term)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count search results"))?;

    Ok(Json(PaginatedResponse {
        items: courses.into_iter().map(CourseResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn get_course(
    Path(course_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CourseResponse>, ApiError> {
    validate_id(&course_id, "course")?;

    let course = repositories::courses::find_by_id(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    Ok(Json(CourseResponse::from_db(course)))
}

async fn update_course(
    Path(course_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<CourseUpdate>,
) -> Result<Json<CourseResponse>, ApiError> {
    validate_id(&course_id, "course")?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let existing = repositories::courses::find_by_id(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?;
    if existing.is_none() {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }

    let course = repositories::courses::update(
        state.db(),
        &course_id,
        repositories::courses::UpdateCourse {
            title: payload.title.map(|value| value.trim().to_string()),
            description: payload.description.map(|value| value.trim().to_string()),
            instructor_name: payload.instructor_name.map(|value| value.trim().to_string()),
            price: payload.price,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update course"))?;

    Ok(Json(CourseResponse::from_db(course)))
}

async fn delete_course(
    Path(course_id): Path<String>,
    Query(params): Query<DeleteCourseQuery>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    validate_id(&course_id, "course")?;

    let course = repositories::courses::find_by_id(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?;
    if course.is_none() {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }

    if !params.force {
        let enrolled = repositories::enrollments::count_admin(
            state.db(),
            &repositories::enrollments::EnrollmentFilter {
                status: None,
                payment_status: None,
                course_id: Some(&course_id),
                user_id: None,
            },
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count enrollments"))?;

        if enrolled > 0 {
            return Err(ApiError::Conflict(
                "Course has enrollments; pass force=true to delete".to_string(),
            ));
        }
    }

    let deleted = repositories::courses::delete(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete course"))?;
    if !deleted {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }

    tracing::info!(
        admin_id = %admin.id,
        course_id = %course_id,
        action = "course_delete",
        "Admin deleted course"
    );

    Ok(StatusCode::NO_CONTENT)
}
