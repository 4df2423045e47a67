use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::pagination::PaginatedResponse;
use crate::api::validation::validate_id;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::{EnrollmentStatus, PaymentStatus};
use crate::repositories;
use crate::schemas::enrollment::{
    EnrollmentCreate, EnrollmentResponse, EnrollmentStatsResponse, EnrollmentUpdate,
};
use crate::services;

#[derive(Debug, Deserialize)]
struct ListMyEnrollmentsQuery {
    #[serde(default)]
    status: Option<EnrollmentStatus>,
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
}

#[derive(Debug, Deserialize)]
struct AdminListEnrollmentsQuery {
    #[serde(default)]
    status: Option<EnrollmentStatus>,
    #[serde(default)]
    #[serde(alias = "paymentStatus")]
    payment_status: Option<PaymentStatus>,
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
        .route("/course/:course_id", post(enroll))
        .route("/course/:course_id/stats", get(enrollment_stats))
        .route("/my", get(list_my_enrollments))
        .route("/admin/all", get(admin_list_enrollments))
        .route(
            "/admin/:enrollment_id",
            patch(admin_update_enrollment).delete(admin_delete_enrollment),
        )
        .route("/:enrollment_id", get(get_enrollment))
        .route("/:enrollment_id/access", patch(touch_enrollment))
}

async fn enroll(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<EnrollmentCreate>,
) -> Result<(StatusCode, Json<EnrollmentResponse>), ApiError> {
    validate_id(&course_id, "course")?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let course_exists = repositories::courses::exists(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check course"))?;
    if !course_exists {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }

    let enrollment_id = Uuid::new_v4().to_string();
    let now = primitive_now_utc();
    let created = repositories::enrollments::create(
        state.db(),
        repositories::enrollments::CreateEnrollment {
            id: &enrollment_id,
            user_id: &user.id,
            course_id: &course_id,
            payment_amount: payload.payment_amount,
            enrolled_at: now,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create enrollment"))?;
    if !created {
        return Err(ApiError::Conflict(
            "User is already enrolled in this course".to_string(),
        ));
    }

    metrics::counter!("enrollments_created_total").increment(1);

    // Seed the learner's progress row so quiz passes land somewhere.
    if let Err(e) = services::progress::seed_for_enrollment(&state, &user.id, &course_id).await {
        tracing::warn!(
            error = %e,
            user_id = %user.id,
            course_id = %course_id,
            "Failed to seed course progress after enrollment"
        );
    }

    let enrollment = repositories::enrollments::find_by_id(state.db(), &enrollment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch enrollment"))?
        .ok_or_else(|| ApiError::Internal("Failed to load enrollment".to_string()))?;

    Ok((StatusCode::CREATED, Json(EnrollmentResponse::from_db(enrollment))))
}

async fn list_my_enrollments(
    Query(params): Query<ListMyEnrollmentsQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<EnrollmentResponse>>, ApiError> {
    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 100);

    let enrollments =
        repositories::enrollments::list_for_user(state.db(), &user.id, params.status, skip, limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list enrollments"))?;
    let total_count = repositories::enrollments::count_for_user(state.db(), &user.id, params.status)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count enrollments"))?;

    Ok(Json(PaginatedResponse {
        items: enrollments.into_iter().map(EnrollmentResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn get_enrollment(
    Path(enrollment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    validate_id(&enrollment_id, "enrollment")?;

    let enrollment =
        repositories::enrollments::find_by_id_for_user(state.db(), &enrollment_id, &user.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch enrollment"))?
            .ok_or_else(|| ApiError::NotFound("Enrollment not found".to_string()))?;

    Ok(Json(EnrollmentResponse::from_db(enrollment)))
}

async fn touch_enrollment(
    Path(enrollment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    validate_id(&enrollment_id, "enrollment")?;

    // Ownership first so one learner cannot touch another's enrollment.
    let owned =
        repositories::enrollments::find_by_id_for_user(state.db(), &enrollment_id, &user.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch enrollment"))?;
    if owned.is_none() {
        return Err(ApiError::NotFound("Enrollment not found".to_string()));
    }

    let enrollment = repositories::enrollments::touch_last_accessed(
        state.db(),
        &enrollment_id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update enrollment"))?
    .ok_or_else(|| ApiError::NotFound("Enrollment not found".to_string()))?;

    Ok(Json(EnrollmentResponse::from_db(enrollment)))
}

async fn enrollment_stats(
    Path(course_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<EnrollmentStatsResponse>, ApiError> {
    validate_id(&course_id, "course")?;

    let course_exists = repositories::courses::exists(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check course"))?;
    if !course_exists {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }

    let stats = repositories::enrollments::stats_for_course(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to compute enrollment stats"))?;

    Ok(Json(EnrollmentStatsResponse {
        total_enrollments: stats.total_enrollments,
        active_enrollments: stats.active_enrollments,
        completed_enrollments: stats.completed_enrollments,
        dropped_enrollments: stats.dropped_enrollments,
        total_revenue: stats.total_revenue,
        completed_payments: stats.completed_payments,
    }))
}

async fn admin_list_enrollments(
    Query(params): Query<AdminListEnrollmentsQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<EnrollmentResponse>>, ApiError> {
    let filter = repositories::enrollments::EnrollmentFilter {
        status: params.status,
        payment_status: params.payment_status,
        course_id: params.course_id.as_deref(),
        user_id: params.user_id.as_deref(),
    };
    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 100);

    let enrollments = repositories::enrollments::list_admin(state.db(), &filter, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list enrollments"))?;
    let total_count = repositories::enrollments::count_admin(state.db(), &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count enrollments"))?;

    Ok(Json(PaginatedResponse {
        items: enrollments.into_iter().map(EnrollmentResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn admin_update_enrollment(
    Path(enrollment_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<EnrollmentUpdate>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    validate_id(&enrollment_id, "enrollment")?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let existing = repositories::enrollments::find_by_id(state.db(), &enrollment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch enrollment"))?
        .ok_or_else(|| ApiError::NotFound("Enrollment not found".to_string()))?;

    let now = primitive_now_utc();
    // First transition into completed stamps completed_at; later updates keep it.
    let completed_at = match payload.status {
        Some(EnrollmentStatus::Completed) if existing.completed_at.is_none() => Some(now),
        _ => None,
    };

    let updated = repositories::enrollments::update(
        state.db(),
        &enrollment_id,
        &repositories::enrollments::UpdateEnrollment {
            status: payload.status,
            payment_status: payload.payment_status,
            payment_amount: payload.payment_amount,
            completed_at,
        },
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update enrollment"))?
    .ok_or_else(|| ApiError::NotFound("Enrollment not found".to_string()))?;

    tracing::info!(
        admin_id = %admin.id,
        enrollment_id = %enrollment_id,
        action = "enrollment_update",
        "Admin updated enrollment"
    );

    Ok(Json(EnrollmentResponse::from_db(updated)))
}

async fn admin_delete_enrollment(
    Path(enrollment_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    validate_id(&enrollment_id, "enrollment")?;

    let deleted = repositories::enrollments::delete(state.db(), &enrollment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete enrollment"))?;
    if !deleted {
        return Err(ApiError::NotFound("Enrollment not found".to_string()));
    }

    tracing::info!(
        admin_id = %admin.id,
        enrollment_id = %enrollment_id,
        action = "enrollment_delete",
        "Admin deleted enrollment"
    );

    Ok(StatusCode::NO_CONTENT)
}
