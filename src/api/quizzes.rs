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
use crate::schemas::quiz::{QuizCreate, QuizResponse, QuizUpdate};

#[derive(Debug, Deserialize)]
struct ListQuizzesQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_quiz))
        .route("/course/:course_id", get(list_quizzes_by_course))
        .route(
            "/:quiz_id",
            get(get_quiz).patch(update_quiz).delete(delete_quiz),
        )
}

async fn create_quiz(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<QuizCreate>,
) -> Result<(StatusCode, Json<QuizResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    validate_id(&payload.course_id, "course")?;

    let course_exists = repositories::courses::exists(state.db(), &payload.course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check course"))?;
    if !course_exists {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }

    let taken = repositories::quizzes::order_taken(
        state.db(),
        &payload.course_id,
        payload.order_index,
        None,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to check quiz order"))?;
    if taken {
        return Err(ApiError::Conflict(
            "Quiz with this order already exists in the course".to_string(),
        ));
    }

    let now = primitive_now_utc();
    let quiz = repositories::quizzes::create(
        state.db(),
        repositories::quizzes::CreateQuiz {
            id: &Uuid::new_v4().to_string(),
            course_id: &payload.course_id,
            title: payload.title.trim(),
            description: payload.description.as_deref().map(str::trim),
            passing_score: payload.passing_score,
            time_limit_minutes: payload.time_limit_minutes,
            max_attempts: payload.max_attempts,
            order_index: payload.order_index,
            is_published: payload.is_published,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create quiz"))?;

    Ok((StatusCode::CREATED, Json(QuizResponse::from_db(quiz))))
}

async fn list_quizzes_by_course(
    Path(course_id): Path<String>,
    Query(params): Query<ListQuizzesQuery>,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<QuizResponse>>, ApiError> {
    validate_id(&course_id, "course")?;

    let course_exists = repositories::courses::exists(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check course"))?;
    if !course_exists {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }

    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 100);

    let quizzes = repositories::quizzes::list_by_course(state.db(), &course_id, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list quizzes"))?;
    let total_count = repositories::quizzes::count_by_course(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count quizzes"))?;

    Ok(Json(PaginatedResponse {
        items: quizzes.into_iter().map(QuizResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn get_quiz(
    Path(quiz_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<QuizResponse>, ApiError> {
    validate_id(&quiz_id, "quiz")?;

    let quiz = repositories::quizzes::find_by_id(state.db(), &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?
        .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(QuizResponse::from_db(quiz)))
}

async fn update_quiz(
    Path(quiz_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<QuizUpdate>,
) -> Result<Json<QuizResponse>, ApiError> {
    validate_id(&quiz_id, "quiz")?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let quiz = repositories::quizzes::find_by_id(state.db(), &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?
        .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))?;

    if let Some(order_index) = payload.order_index {
        let taken = repositories::quizzes::order_taken(
            state.db(),
            &quiz.course_id,
            order_index,
            Some(&quiz.id),
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check quiz order"))?;
        if taken {
            return Err(ApiError::Conflict(
                "Quiz with this order already exists in the course".to_string(),
            ));
        }
    }

    let updated = repositories::quizzes::update(
        state.db(),
        &quiz_id,
        repositories::quizzes::UpdateQuiz {
            title: payload.title.map(|value| value.trim().to_string()),
            description: payload.description.map(|value| value.trim().to_string()),
            passing_score: payload.passing_score,
            time_limit_minutes: payload.time_limit_minutes,
            max_attempts: payload.max_attempts,
            order_index: payload.order_index,
            is_published: payload.is_published,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update quiz"))?;

    Ok(Json(QuizResponse::from_db(updated)))
}

async fn delete_quiz(
    Path(quiz_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    validate_id(&quiz_id, "quiz")?;

    let deleted = repositories::quizzes::delete(state.db(), &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete quiz"))?;
    if !deleted {
        return Err(ApiError::NotFound("Quiz not found".to_string()));
    }

    tracing::info!(
        admin_id = %admin.id,
        quiz_id = %quiz_id,
        action = "quiz_delete",
        "Admin deleted quiz"
    );

    Ok(StatusCode::NO_CONTENT)
}
