use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{routing::get, routing::post, Json, Router};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::pagination::PaginatedResponse;
use crate::api::validation::{validate_id, validate_options};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::question::{
    QuestionCreate, QuestionPublicResponse, QuestionResponse, QuestionUpdate,
};

#[derive(Debug, Deserialize)]
struct ListQuestionsQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_question))
        .route("/quiz/:quiz_id", get(list_questions_by_quiz))
        .route(
            "/:question_id",
            get(get_question).patch(update_question).delete(delete_question),
        )
}

async fn create_question(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<QuestionCreate>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    validate_id(&payload.quiz_id, "quiz")?;
    validate_options(&payload.options)?;

    let quiz = repositories::quizzes::find_by_id(state.db(), &payload.quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?;
    if quiz.is_none() {
        return Err(ApiError::NotFound("Quiz not found".to_string()));
    }

    let taken = repositories::questions::order_taken(
        state.db(),
        &payload.quiz_id,
        payload.order_index,
        None,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to check question order"))?;
    if taken {
        return Err(ApiError::Conflict(
            "Question with this order already exists in the quiz".to_string(),
        ));
    }

    let options: Vec<String> =
        payload.options.iter().map(|option| option.trim().to_string()).collect();

    let now = primitive_now_utc();
    let question = repositories::questions::create(
        state.db(),
        repositories::questions::CreateQuestion {
            id: &Uuid::new_v4().to_string(),
            quiz_id: &payload.quiz_id,
            question_text: payload.question_text.trim(),
            options,
            correct_answer: payload.correct_answer,
            points: payload.points,
            order_index: payload.order_index,
            explanation: payload.explanation.as_deref().map(str::trim),
            difficulty: payload.difficulty,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create question"))?;

    Ok((StatusCode::CREATED, Json(QuestionResponse::from_db(question))))
}

/// Learner-facing listing: the grading fields never appear here.
async fn list_questions_by_quiz(
    Path(quiz_id): Path<String>,
    Query(params): Query<ListQuestionsQuery>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<QuestionPublicResponse>>, ApiError> {
    validate_id(&quiz_id, "quiz")?;

    let quiz = repositories::quizzes::find_by_id(state.db(), &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?;
    if quiz.is_none() {
        return Err(ApiError::NotFound("Quiz not found".to_string()));
    }

    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 100);

    let questions =
        repositories::questions::list_by_quiz_paginated(state.db(), &quiz_id, skip, limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list questions"))?;
    let total_count = repositories::questions::count_by_quiz(state.db(), &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count questions"))?;

    Ok(Json(PaginatedResponse {
        items: questions.into_iter().map(QuestionPublicResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn get_question(
    Path(question_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<QuestionResponse>, ApiError> {
    validate_id(&question_id, "question")?;

    let question = repositories::questions::find_by_id(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;

    Ok(Json(QuestionResponse::from_db(question)))
}

async fn update_question(
    Path(question_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<QuestionUpdate>,
) -> Result<Json<QuestionResponse>, ApiError> {
    validate_id(&question_id, "question")?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let question = repositories::questions::find_by_id(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;

    if let Some(ref options) = payload.options {
        validate_options(options)?;
    }

    if let Some(order_index) = payload.order_index {
        let taken = repositories::questions::order_taken(
            state.db(),
            &question.quiz_id,
            order_index,
            Some(&question.id),
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check question order"))?;
        if taken {
            return Err(ApiError::Conflict(
                "Question with this order already exists in the quiz".to_string(),
            ));
        }
    }

    let options = payload
        .options
        .map(|options| options.iter().map(|option| option.trim().to_string()).collect());

    let updated = repositories::questions::update(
        state.db(),
        &question_id,
        repositories::questions::UpdateQuestion {
            question_text: payload.question_text.map(|value| value.trim().to_string()),
            options,
            correct_answer: payload.correct_answer,
            points: payload.points,
            order_index: payload.order_index,
            explanation: payload.explanation.map(|value| value.trim().to_string()),
            difficulty: payload.difficulty,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update question"))?;

    Ok(Json(QuestionResponse::from_db(updated)))
}

async fn delete_question(
    Path(question_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    validate_id(&question_id, "question")?;

    let deleted = repositories::questions::delete(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete question"))?;
    if !deleted {
        return Err(ApiError::NotFound("Question not found".to_string()));
    }

    tracing::info!(
        admin_id = %admin.id,
        question_id = %question_id,
        action = "question_delete",
        "Admin deleted question"
    );

    Ok(StatusCode::NO_CONTENT)
}
