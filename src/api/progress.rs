use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, patch};
use axum::{Json, Router};
use serde::Deserialize;
use time::Duration;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::pagination::PaginatedResponse;
use crate::api::validation::validate_id;
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::models::CompletedLesson;
use crate::repositories;
use crate::schemas::progress::{
    ProgressResponse, ProgressStatsResponse, ProgressUpsert, QuizProgressUpdate,
};
use crate::services;

/// Learners count as active if they touched the course within this window.
const ACTIVE_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Deserialize)]
struct ListProgressQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
}

#[derive(Debug, Deserialize)]
struct AdminListProgressQuery {
    #[serde(default)]
    #[serde(alias = "courseId")]
    course_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "userId")]
    user_id: Option<String>,
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/my", get(my_progress))
        .route("/course/:course_id", get(get_course_progress).post(upsert_progress))
        .route("/course/:course_id/stats", get(course_progress_stats))
        .route(
            "/course/:course_id/lesson/:lesson_id/complete",
            patch(complete_lesson),
        )
        .route("/course/:course_id/quiz", patch(update_quiz_progress))
        .route("/course/:course_id/reset", patch(reset_progress))
        .route("/admin/all", get(admin_list_progress))
        .route("/admin/:progress_id", delete(admin_delete_progress))
}

async fn require_course(state: &AppState, course_id: &str) -> Result<(), ApiError> {
    let course_exists = repositories::courses::exists(state.db(), course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check course"))?;
    if course_exists {
        Ok(())
    } else {
        Err(ApiError::NotFound("Course not found".to_string()))
    }
}

async fn my_progress(
    Query(params): Query<ListProgressQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<ProgressResponse>>, ApiError> {
    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 100);

    let rows = repositories::progress::list_for_user(state.db(), &user.id, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list progress"))?;
    let total_count = repositories::progress::count_for_user(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count progress"))?;

    Ok(Json(PaginatedResponse {
        items: rows.into_iter().map(ProgressResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn get_course_progress(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ProgressResponse>, ApiError> {
    validate_id(&course_id, "course")?;
    require_course(&state, &course_id).await?;

    let progress = repositories::progress::find_by_user_course(state.db(), &user.id, &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch progress"))?
        .ok_or_else(|| ApiError::NotFound("Progress not found for this course".to_string()))?;

    Ok(Json(ProgressResponse::from_db(progress)))
}

async fn upsert_progress(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ProgressUpsert>,
) -> Result<(StatusCode, Json<ProgressResponse>), ApiError> {
    validate_id(&course_id, "course")?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    require_course(&state, &course_id).await?;

    let existing = repositories::progress::find_by_user_course(state.db(), &user.id, &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch progress"))?;

    let now = primitive_now_utc();
    let progress = match existing {
        Some(progress) => {
            let total_lessons = payload.total_lessons.unwrap_or(progress.total_lessons);
            let total_quizzes = payload.total_quizzes.unwrap_or(progress.total_quizzes);
            let percentage = services::progress::completion_percentage(
                progress.completed_lessons.0.len() as i32,
                progress.passed_quizzes,
                total_lessons,
                total_quizzes,
            );
            repositories::progress::update_totals(
                state.db(),
                &progress.id,
                payload.total_lessons,
                payload.total_quizzes,
                percentage,
                now,
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to update progress"))?
            .ok_or_else(|| {
                ApiError::NotFound("Progress not found for this course".to_string())
            })?
        }
        None => {
            repositories::progress::create(
                state.db(),
                repositories::progress::CreateProgress {
                    id: &Uuid::new_v4().to_string(),
                    user_id: &user.id,
                    course_id: &course_id,
                    total_lessons: payload.total_lessons.unwrap_or(0),
                    total_quizzes: payload.total_quizzes.unwrap_or(0),
                    last_accessed_at: now,
                    created_at: now,
                    updated_at: now,
                },
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to create progress"))?;

            // A concurrent request may have won the insert; either row works.
            repositories::progress::find_by_user_course(state.db(), &user.id, &course_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to fetch progress"))?
                .ok_or_else(|| ApiError::Internal("Failed to load progress".to_string()))?
        }
    };

    Ok((StatusCode::CREATED, Json(ProgressResponse::from_db(progress))))
}

async fn complete_lesson(
    Path((course_id, lesson_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ProgressResponse>, ApiError> {
    validate_id(&course_id, "course")?;
    validate_id(&lesson_id, "lesson")?;
    require_course(&state, &course_id).await?;

    let progress = repositories::progress::find_by_user_course(state.db(), &user.id, &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch progress"))?
        .ok_or_else(|| ApiError::NotFound("Progress not found for this course".to_string()))?;

    // Completing the same lesson twice is a no-op, not an error.
    if progress.completed_lessons.0.iter().any(|entry| entry.lesson_id == lesson_id) {
        return Ok(Json(ProgressResponse::from_db(progress)));
    }

    let now = primitive_now_utc();
    let mut lessons = progress.completed_lessons.0.clone();
    lessons.push(CompletedLesson {
        lesson_id: lesson_id.clone(),
        completed_at: format_primitive(now),
    });
    let percentage = services::progress::completion_percentage(
        lessons.len() as i32,
        progress.passed_quizzes,
        progress.total_lessons,
        progress.total_quizzes,
    );

    let updated = repositories::progress::set_completed_lessons(
        state.db(),
        &progress.id,
        sqlx::types::Json(lessons),
        percentage,
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update progress"))?
    .ok_or_else(|| ApiError::NotFound("Progress not found for this course".to_string()))?;

    Ok(Json(ProgressResponse::from_db(updated)))
}

async fn update_quiz_progress(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<QuizProgressUpdate>,
) -> Result<Json<ProgressResponse>, ApiError> {
    validate_id(&course_id, "course")?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    require_course(&state, &course_id).await?;

    let progress = repositories::progress::find_by_user_course(state.db(), &user.id, &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch progress"))?
        .ok_or_else(|| ApiError::NotFound("Progress not found for this course".to_string()))?;

    if payload.passed_quizzes > progress.total_quizzes {
        return Err(ApiError::BadRequest(
            "Passed quizzes cannot exceed total quizzes".to_string(),
        ));
    }

    let now = primitive_now_utc();
    let percentage = services::progress::completion_percentage(
        progress.completed_lessons.0.len() as i32,
        payload.passed_quizzes,
        progress.total_lessons,
        progress.total_quizzes,
    );

    let updated = repositories::progress::set_passed_quizzes(
        state.db(),
        &progress.id,
        payload.passed_quizzes,
        percentage,
        Some(now),
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update progress"))?
    .ok_or_else(|| ApiError::NotFound("Progress not found for this course".to_string()))?;

    Ok(Json(ProgressResponse::from_db(updated)))
}

async fn reset_progress(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ProgressResponse>, ApiError> {
    validate_id(&course_id, "course")?;
    require_course(&state, &course_id).await?;

    let progress = repositories::progress::find_by_user_course(state.db(), &user.id, &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch progress"))?
        .ok_or_else(|| ApiError::NotFound("Progress not found for this course".to_string()))?;

    let reset = repositories::progress::reset(state.db(), &progress.id, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to reset progress"))?
        .ok_or_else(|| ApiError::NotFound("Progress not found for this course".to_string()))?;

    Ok(Json(ProgressResponse::from_db(reset)))
}

async fn course_progress_stats(
    Path(course_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ProgressStatsResponse>, ApiError> {
    validate_id(&course_id, "course")?;
    require_course(&state, &course_id).await?;

    let cutoff = primitive_now_utc() - Duration::days(ACTIVE_WINDOW_DAYS);
    let stats = repositories::progress::stats_for_course(state.db(), &course_id, cutoff)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to compute progress stats"))?;

    Ok(Json(ProgressStatsResponse {
        total_students: stats.total_students,
        completed_students: stats.completed_students,
        active_students: stats.active_students,
        average_completion: stats.average_completion,
        average_lessons_completed: stats.average_lessons_completed,
        average_quizzes_passed: stats.average_quizzes_passed,
    }))
}

async fn admin_list_progress(
    Query(params): Query<AdminListProgressQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<ProgressResponse>>, ApiError> {
    let filter = repositories::progress::ProgressFilter {
        course_id: params.course_id.as_deref(),
        user_id: params.user_id.as_deref(),
    };
    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 100);

    let rows = repositories::progress::list_admin(state.db(), &filter, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list progress"))?;
    let total_count = repositories::progress::count_admin(state.db(), &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count progress"))?;

    Ok(Json(PaginatedResponse {
        items: rows.into_iter().map(ProgressResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn admin_delete_progress(
    Path(progress_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    validate_id(&progress_id, "progress")?;

    let deleted = repositories::progress::delete(state.db(), &progress_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete progress"))?;
    if !deleted {
        return Err(ApiError::NotFound("Progress not found".to_string()));
    }

    tracing::info!(
        admin_id = %admin.id,
        progress_id = %progress_id,
        action = "progress_delete",
        "Admin deleted progress"
    );

    Ok(StatusCode::NO_CONTENT)
}
