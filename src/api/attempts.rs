use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::pagination::PaginatedResponse;
use crate::api::validation::validate_id;
use crate::core::state::AppState;
use crate::core::time::{elapsed_whole_seconds, format_primitive, primitive_now_utc};
use crate::db::models::Question;
use crate::db::types::AttemptStatus;
use crate::repositories;
use crate::schemas::attempt::{
    AnswerView, AttemptAnswerDetail, AttemptDetailResponse, AttemptQuizInfo, AttemptResponse,
    AttemptStatsResponse, AttemptsSummary, DifficultQuestionStat, MyAttemptsResponse,
    StartAttemptResponse, StartQuizDetails, SubmitAttemptRequest, SubmitAttemptResponse,
};
use crate::services;
use crate::services::scoring::AnswerSelection;

#[derive(Debug, Deserialize)]
struct AdminListAttemptsQuery {
    #[serde(default)]
    #[serde(alias = "quizId")]
    quiz_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "userId")]
    user_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "courseId")]
    course_id: Option<String>,
    #[serde(default)]
    passed: Option<bool>,
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/start/:quiz_id", post(start_attempt))
        .route("/submit/:attempt_id", post(submit_attempt))
        .route("/quiz/:quiz_id/my-attempts", get(my_attempts))
        .route("/admin/all", get(admin_list_attempts))
        .route("/admin/quiz/:quiz_id/stats", get(admin_quiz_stats))
        .route("/admin/:attempt_id", delete(admin_delete_attempt))
        .route("/:attempt_id", get(attempt_details))
}

async fn start_attempt(
    Path(quiz_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<StartAttemptResponse>), ApiError> {
    validate_id(&quiz_id, "quiz")?;

    let quiz = repositories::quizzes::find_by_id(state.db(), &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?
        .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))?;

    let course_exists = repositories::courses::exists(state.db(), &quiz.course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check course"))?;
    if !course_exists {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }

    let attempt_id = Uuid::new_v4().to_string();
    let now = primitive_now_utc();
    let mut attempt_number = 0;
    let mut created = false;

    // Two passes: a concurrent start can claim the same attempt number, in
    // which case the insert hits the unique index and we recount.
    for _ in 0..2 {
        let prior = repositories::attempts::count_for_user_quiz(state.db(), &user.id, &quiz_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to count attempts"))?;
        if quiz.max_attempts > 0 && prior >= i64::from(quiz.max_attempts) {
            return Err(ApiError::BadRequest(
                "Maximum attempts reached for this quiz".to_string(),
            ));
        }
        attempt_number = (prior + 1) as i32;

        created = repositories::attempts::create(
            state.db(),
            repositories::attempts::CreateAttempt {
                id: &attempt_id,
                user_id: &user.id,
                quiz_id: &quiz_id,
                course_id: &quiz.course_id,
                attempt_number,
                started_at: now,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to create attempt"))?;
        if created {
            break;
        }
    }
    if !created {
        return Err(ApiError::Conflict(
            "Could not start attempt, please retry".to_string(),
        ));
    }

    metrics::counter!("quiz_attempts_started_total").increment(1);

    Ok((
        StatusCode::CREATED,
        Json(StartAttemptResponse {
            attempt_id,
            quiz_details: StartQuizDetails {
                title: quiz.title,
                description: quiz.description,
                time_limit_minutes: quiz.time_limit_minutes,
                attempt_number,
                max_attempts: quiz.max_attempts,
                started_at: format_primitive(now),
            },
        }),
    ))
}

async fn submit_attempt(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<Json<SubmitAttemptResponse>, ApiError> {
    validate_id(&attempt_id, "attempt")?;

    let attempt = repositories::attempts::find_by_id_for_user(state.db(), &attempt_id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
        .ok_or_else(|| ApiError::NotFound("Quiz attempt not found".to_string()))?;

    if attempt.status == AttemptStatus::Submitted {
        return Err(ApiError::BadRequest("Quiz attempt already submitted".to_string()));
    }

    let quiz = repositories::quizzes::find_by_id(state.db(), &attempt.quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?
        .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))?;

    let now = primitive_now_utc();
    let elapsed = elapsed_whole_seconds(attempt.started_at, now);
    if services::scoring::time_limit_exceeded(quiz.time_limit_minutes, elapsed) {
        return Err(ApiError::BadRequest("Time limit exceeded".to_string()));
    }

    let questions = repositories::questions::list_by_quiz(state.db(), &attempt.quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch questions"))?;
    if questions.is_empty() {
        return Err(ApiError::NotFound("No questions found for this quiz".to_string()));
    }

    let mut selections = Vec::with_capacity(payload.answers.len());
    for answer in &payload.answers {
        let (question_id, selected_option) =
            match (answer.question_id.as_deref(), answer.selected_option) {
                (Some(question_id), Some(selected_option)) => (question_id, selected_option),
                _ => return Err(ApiError::BadRequest("Invalid answer format".to_string())),
            };
        if Uuid::try_parse(question_id).is_err() {
            return Err(ApiError::BadRequest(format!("Invalid question ID: {question_id}")));
        }
        selections.push(AnswerSelection {
            question_id: question_id.to_string(),
            selected_option,
        });
    }

    let graded = services::scoring::score_submission(&questions, &selections, quiz.passing_score)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let finalized = repositories::attempts::finalize(
        state.db(),
        repositories::attempts::FinalizeAttempt {
            id: &attempt_id,
            answers: sqlx::types::Json(graded.answers.clone()),
            score: graded.score,
            max_score: graded.max_score,
            percentage: graded.percentage,
            passed: graded.passed,
            submitted_at: now,
            time_taken_seconds: elapsed,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to finalize attempt"))?;
    if !finalized {
        // Lost the race against a concurrent submit of the same attempt.
        return Err(ApiError::BadRequest("Quiz attempt already submitted".to_string()));
    }

    let passed_label = if graded.passed { "true" } else { "false" };
    metrics::counter!("quiz_attempts_submitted_total", "passed" => passed_label).increment(1);

    if graded.passed {
        if let Err(e) =
            services::progress::record_quiz_pass(&state, &user.id, &attempt.course_id).await
        {
            tracing::warn!(
                error = %e,
                user_id = %user.id,
                course_id = %attempt.course_id,
                "Failed to update course progress after quiz pass"
            );
        }
    }

    Ok(Json(SubmitAttemptResponse {
        attempt_id,
        score: graded.score,
        max_score: graded.max_score,
        percentage: graded.percentage,
        passed: graded.passed,
        time_taken_seconds: elapsed,
        answers: graded.answers.into_iter().map(AnswerView::from_record).collect(),
        submitted_at: format_primitive(now),
    }))
}

async fn my_attempts(
    Path(quiz_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<MyAttemptsResponse>, ApiError> {
    validate_id(&quiz_id, "quiz")?;

    let quiz = repositories::quizzes::find_by_id(state.db(), &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?
        .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))?;

    let attempts = repositories::attempts::list_for_user_quiz(state.db(), &user.id, &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list attempts"))?;

    let best = repositories::attempts::best_for_user_quiz(state.db(), &user.id, &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch best attempt"))?;
    let (best_score, best_percentage) =
        best.map(|attempt| (attempt.score, attempt.percentage)).unwrap_or((0, 0));

    let total_attempts = attempts.len() as i64;
    let summary = AttemptsSummary {
        total_attempts,
        max_attempts: quiz.max_attempts,
        attempts_remaining: (i64::from(quiz.max_attempts) - total_attempts).max(0),
        has_passed: attempts.iter().any(|attempt| attempt.passed),
        best_score,
        best_percentage,
    };

    Ok(Json(MyAttemptsResponse {
        attempts: attempts.into_iter().map(AttemptResponse::from_db).collect(),
        summary,
    }))
}

async fn attempt_details(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AttemptDetailResponse>, ApiError> {
    validate_id(&attempt_id, "attempt")?;

    let attempt = repositories::attempts::find_by_id_for_user(state.db(), &attempt_id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
        .ok_or_else(|| ApiError::NotFound("Quiz attempt not found".to_string()))?;

    let quiz = repositories::quizzes::find_by_id(state.db(), &attempt.quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?
        .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))?;

    let mut detail = AttemptDetailResponse {
        attempt_id: attempt.id.clone(),
        quiz: AttemptQuizInfo {
            id: quiz.id,
            title: quiz.title,
            description: quiz.description,
            passing_score: quiz.passing_score,
        },
        attempt_number: attempt.attempt_number,
        status: attempt.status,
        started_at: format_primitive(attempt.started_at),
        submitted_at: attempt.submitted_at.map(format_primitive),
        time_taken_seconds: attempt.time_taken_seconds,
        score: None,
        max_score: None,
        percentage: None,
        passed: None,
        answers: None,
    };

    if attempt.status == AttemptStatus::Submitted {
        let questions = repositories::questions::list_by_quiz(state.db(), &attempt.quiz_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch questions"))?;
        let by_id: HashMap<&str, &Question> =
            questions.iter().map(|question| (question.id.as_str(), question)).collect();

        let answers = attempt
            .answers
            .0
            .iter()
            .map(|record| {
                let question = by_id.get(record.question_id.as_str()).copied();
                AttemptAnswerDetail {
                    question_id: record.question_id.clone(),
                    question_text: question
                        .map(|q| q.question_text.clone())
                        .unwrap_or_else(|| "Question not found".to_string()),
                    selected_option: record.selected_option,
                    correct_option: question.map(|q| q.correct_answer),
                    is_correct: record.is_correct,
                    points: record.points,
                    explanation: if record.is_correct {
                        None
                    } else {
                        question.and_then(|q| q.explanation.clone())
                    },
                }
            })
            .collect();

        detail.score = Some(attempt.score);
        detail.max_score = Some(attempt.max_score);
        detail.percentage = Some(attempt.percentage);
        detail.passed = Some(attempt.passed);
        detail.answers = Some(answers);
    }

    Ok(Json(detail))
}

async fn admin_list_attempts(
    Query(params): Query<AdminListAttemptsQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<AttemptResponse>>, ApiError> {
    let filter = repositories::attempts::AttemptFilter {
        quiz_id: params.quiz_id.as_deref(),
        user_id: params.user_id.as_deref(),
        course_id: params.course_id.as_deref(),
        passed: params.passed,
    };
    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 100);

    let attempts = repositories::attempts::list_admin(state.db(), &filter, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list attempts"))?;
    let total_count = repositories::attempts::count_admin(state.db(), &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count attempts"))?;

    Ok(Json(PaginatedResponse {
        items: attempts.into_iter().map(AttemptResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn admin_quiz_stats(
    Path(quiz_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<AttemptStatsResponse>, ApiError> {
    validate_id(&quiz_id, "quiz")?;

    let quiz = repositories::quizzes::find_by_id(state.db(), &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?;
    if quiz.is_none() {
        return Err(ApiError::NotFound("Quiz not found".to_string()));
    }

    let stats = repositories::attempts::stats_for_quiz(state.db(), &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to compute attempt stats"))?;
    let question_rows = repositories::attempts::question_stats_for_quiz(state.db(), &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to compute question stats"))?;
    let questions = repositories::questions::list_by_quiz(state.db(), &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch questions"))?;
    let text_by_id: HashMap<&str, &str> = questions
        .iter()
        .map(|question| (question.id.as_str(), question.question_text.as_str()))
        .collect();

    let difficult_questions = question_rows
        .into_iter()
        .map(|row| {
            let correct_percentage = if row.total_answers > 0 {
                ((row.correct_answers as f64 / row.total_answers as f64) * 100.0).round() as i32
            } else {
                0
            };
            DifficultQuestionStat {
                question_text: text_by_id
                    .get(row.question_id.as_str())
                    .map(|text| text.to_string())
                    .unwrap_or_else(|| "Question not found".to_string()),
                total_answers: row.total_answers,
                correct_answers: row.correct_answers,
                incorrect_answers: row.total_answers - row.correct_answers,
                correct_percentage,
                question_id: row.question_id,
            }
        })
        .collect();

    let pass_rate = if stats.total_attempts > 0 {
        ((stats.passed_attempts as f64 / stats.total_attempts as f64) * 100.0).round() as i32
    } else {
        0
    };

    Ok(Json(AttemptStatsResponse {
        total_attempts: stats.total_attempts,
        unique_users: stats.unique_users,
        passed_attempts: stats.passed_attempts,
        pass_rate,
        average_score: stats.average_score,
        average_percentage: stats.average_percentage.round() as i32,
        average_time_taken_seconds: stats.average_time_seconds.round() as i64,
        highest_score: stats.highest_score,
        lowest_score: stats.lowest_score,
        difficult_questions,
    }))
}

async fn admin_delete_attempt(
    Path(attempt_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    validate_id(&attempt_id, "attempt")?;

    let deleted = repositories::attempts::delete(state.db(), &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete attempt"))?;
    if !deleted {
        return Err(ApiError::NotFound("Quiz attempt not found".to_string()));
    }

    tracing::info!(
        admin_id = %admin.id,
        attempt_id = %attempt_id,
        action = "quiz_attempt_delete",
        "Admin deleted quiz attempt"
    );

    Ok(StatusCode::NO_CONTENT)
}
