use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{routing::get, routing::post, Json, Router};
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
use crate::schemas::lesson::{LessonCreate, LessonResponse, LessonUpdate};

#[derive(Debug, Deserialize)]
struct ListLessonsQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_lesson))
        .route("/course/:course_id", get(list_lessons_by_course))
        .route(
            "/:lesson_id",
            get(get_lesson).patch(update_lesson).delete(delete_lesson),
        )
}

async fn create_lesson(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<LessonCreate>,
) -> Result<(StatusCode, Json<LessonResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    validate_id(&payload.course_id, "course")?;

    let course_exists = repositories::courses::exists(state.db(), &payload.course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check course"))?;
    if !course_exists {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }

    let taken = repositories::lessons::order_taken(
        state.db(),
        &payload.course_id,
        payload.order_index,
        None,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to check lesson order"))?;
    if taken {
        return Err(ApiError::Conflict(
            "Lesson with this order already exists in the course".to_string(),
        ));
    }

    let resource_links: Vec<String> = payload
        .resource_links
        .into_iter()
        .map(|link| link.trim().to_string())
        .filter(|link| !link.is_empty())
        .collect();

    let now = primitive_now_utc();
    let lesson = repositories::lessons::create(
        state.db(),
        repositories::lessons::CreateLesson {
            id: &Uuid::new_v4().to_string(),
            course_id: &payload.course_id,
            title: payload.title.trim(),
            description: payload.description.as_deref().map(str::trim),
            video_url: payload.video_url.trim(),
            resource_links,
            order_index: payload.order_index,
            duration_minutes: payload.duration_minutes,
            is_published: payload.is_published,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create lesson"))?;

    Ok((StatusCode::CREATED, Json(LessonResponse::from_db(lesson))))
}

async fn list_lessons_by_course(
    Path(course_id): Path<String>,
    Query(params): Query<ListLessonsQuery>,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<LessonResponse>>, ApiError> {
    validate_id(&course_id, "course")?;

    let course_exists = repositories::courses::exists(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check course"))?;
    if !course_exists {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }

    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 100);

    let lessons = repositories::lessons::list_by_course(state.db(), &course_id, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list lessons"))?;
    let total_count = repositories::lessons::count_by_course(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count lessons"))?;

    Ok(Json(PaginatedResponse {
        items: lessons.into_iter().map(LessonResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn get_lesson(
    Path(lesson_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<LessonResponse>, ApiError> {
    validate_id(&lesson_id, "lesson")?;

    let lesson = repositories::lessons::find_by_id(state.db(), &lesson_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch lesson"))?
        .ok_or_else(|| ApiError::NotFound("Lesson not found".to_string()))?;

    Ok(Json(LessonResponse::from_db(lesson)))
}

async fn update_lesson(
    Path(lesson_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<LessonUpdate>,
) -> Result<Json<LessonResponse>, ApiError> {
    validate_id(&lesson_id, "lesson")?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let lesson = repositories::lessons::find_by_id(state.db(), &lesson_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch lesson"))?
        .ok_or_else(|| ApiError::NotFound("Lesson not found".to_string()))?;

    if let Some(order_index) = payload.order_index {
        let taken = repositories::lessons::order_taken(
            state.db(),
            &lesson.course_id,
            order_index,
            Some(&lesson.id),
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check lesson order"))?;
        if taken {
            return Err(ApiError::Conflict(
                "Lesson with this order already exists in the course".to_string(),
            ));
        }
    }

    let resource_links = payload.resource_links.map(|links| {
        links
            .into_iter()
            .map(|link| link.trim().to_string())
            .filter(|link| !link.is_empty())
            .collect::<Vec<_>>()
    });

    let updated = repositories::lessons::update(
        state.db(),
        &lesson_id,
        repositories::lessons::UpdateLesson {
            title: payload.title.map(|value| value.trim().to_string()),
            description: payload.description.map(|value| value.trim().to_string()),
            video_url: payload.video_url.map(|value| value.trim().to_string()),
            resource_links,
            order_index: payload.order_index,
            duration_minutes: payload.duration_minutes,
            is_published: payload.is_published,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update lesson"))?;

    Ok(Json(LessonResponse::from_db(updated)))
}

async fn delete_lesson(
    Path(lesson_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    validate_id(&lesson_id, "lesson")?;

    let deleted = repositories::lessons::delete(state.db(), &lesson_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete lesson"))?;
    if !deleted {
        return Err(ApiError::NotFound("Lesson not found".to_string()));
    }

    tracing::info!(
        admin_id = %admin.id,
        lesson_id = %lesson_id,
        action = "lesson_delete",
        "Admin deleted lesson"
    );

    Ok(StatusCode::NO_CONTENT)
}
