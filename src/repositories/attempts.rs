use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::{AnswerRecord, QuizAttempt};
use crate::db::types::AttemptStatus;

const COLUMNS: &str = "\
    id, user_id, quiz_id, course_id, attempt_number, status, answers, \
    score, max_score, percentage, passed, started_at, submitted_at, \
    time_taken_seconds, created_at, updated_at";

/// How many of the worst-performing questions the per-quiz stats report.
const DIFFICULT_QUESTION_LIMIT: i64 = 5;

pub(crate) struct CreateAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) quiz_id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) attempt_number: i32,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) struct FinalizeAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) answers: Json<Vec<AnswerRecord>>,
    pub(crate) score: i32,
    pub(crate) max_score: i32,
    pub(crate) percentage: i32,
    pub(crate) passed: bool,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) time_taken_seconds: i64,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AttemptStatsRow {
    pub(crate) total_attempts: i64,
    pub(crate) unique_users: i64,
    pub(crate) passed_attempts: i64,
    pub(crate) average_score: f64,
    pub(crate) average_percentage: f64,
    pub(crate) average_time_seconds: f64,
    pub(crate) highest_score: i32,
    pub(crate) lowest_score: i32,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct QuestionStatRow {
    pub(crate) question_id: String,
    pub(crate) total_answers: i64,
    pub(crate) correct_answers: i64,
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT {COLUMNS} FROM quiz_attempts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_by_id_for_user(
    pool: &PgPool,
    id: &str,
    user_id: &str,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT {COLUMNS} FROM quiz_attempts WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn count_for_user_quiz(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    quiz_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM quiz_attempts WHERE user_id = $1 AND quiz_id = $2")
        .bind(user_id)
        .bind(quiz_id)
        .fetch_one(executor)
        .await
}

/// Inserts a fresh attempt. Returns `false` when another request claimed the
/// same attempt number first, so the caller can recount and retry.
pub(crate) async fn create(pool: &PgPool, params: CreateAttempt<'_>) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO quiz_attempts (
            id, user_id, quiz_id, course_id, attempt_number, status, answers,
            score, max_score, percentage, passed, started_at,
            time_taken_seconds, created_at, updated_at
         )
         VALUES ($1, $2, $3, $4, $5, $6, '[]'::jsonb, 0, 0, 0, FALSE, $7, 0, $8, $9)
         ON CONFLICT (user_id, quiz_id, attempt_number) DO NOTHING",
    )
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.quiz_id)
    .bind(params.course_id)
    .bind(params.attempt_number)
    .bind(AttemptStatus::Started)
    .bind(params.started_at)
    .bind(params.created_at)
    .bind(params.updated_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Records the graded answers and closes the attempt. The status guard makes
/// the transition one-shot: a second submit of the same attempt affects zero
/// rows and the caller reports it as already submitted.
pub(crate) async fn finalize(
    pool: &PgPool,
    params: FinalizeAttempt<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE quiz_attempts
         SET answers = $1, score = $2, max_score = $3, percentage = $4, passed = $5,
             status = $6, submitted_at = $7, time_taken_seconds = $8, updated_at = $9
         WHERE id = $10 AND status = $11",
    )
    .bind(params.answers)
    .bind(params.score)
    .bind(params.max_score)
    .bind(params.percentage)
    .bind(params.passed)
    .bind(AttemptStatus::Submitted)
    .bind(params.submitted_at)
    .bind(params.time_taken_seconds)
    .bind(params.updated_at)
    .bind(params.id)
    .bind(AttemptStatus::Started)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_for_user_quiz(
    pool: &PgPool,
    user_id: &str,
    quiz_id: &str,
) -> Result<Vec<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT {COLUMNS} FROM quiz_attempts
         WHERE user_id = $1 AND quiz_id = $2
         ORDER BY attempt_number DESC"
    ))
    .bind(user_id)
    .bind(quiz_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn best_for_user_quiz(
    pool: &PgPool,
    user_id: &str,
    quiz_id: &str,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT {COLUMNS} FROM quiz_attempts
         WHERE user_id = $1 AND quiz_id = $2 AND status = $3
         ORDER BY score DESC, submitted_at DESC
         LIMIT 1"
    ))
    .bind(user_id)
    .bind(quiz_id)
    .bind(AttemptStatus::Submitted)
    .fetch_optional(pool)
    .await
}

pub(crate) struct AttemptFilter<'a> {
    pub(crate) quiz_id: Option<&'a str>,
    pub(crate) user_id: Option<&'a str>,
    pub(crate) course_id: Option<&'a str>,
    pub(crate) passed: Option<bool>,
}

pub(crate) async fn list_admin(
    pool: &PgPool,
    filter: &AttemptFilter<'_>,
    skip: i64,
    limit: i64,
) -> Result<Vec<QuizAttempt>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM quiz_attempts WHERE 1 = 1"));
    push_filters(&mut builder, filter);

    builder.push(" ORDER BY created_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 100));

    builder.build_query_as::<QuizAttempt>().fetch_all(pool).await
}

pub(crate) async fn count_admin(
    pool: &PgPool,
    filter: &AttemptFilter<'_>,
) -> Result<i64, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM quiz_attempts WHERE 1 = 1");
    push_filters(&mut builder, filter);

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &AttemptFilter<'a>) {
    if let Some(quiz_id) = filter.quiz_id {
        builder.push(" AND quiz_id = ");
        builder.push_bind(quiz_id);
    }
    if let Some(user_id) = filter.user_id {
        builder.push(" AND user_id = ");
        builder.push_bind(user_id);
    }
    if let Some(course_id) = filter.course_id {
        builder.push(" AND course_id = ");
        builder.push_bind(course_id);
    }
    if let Some(passed) = filter.passed {
        builder.push(" AND passed = ");
        builder.push_bind(passed);
    }
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM quiz_attempts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Aggregates over submitted attempts only; in-flight attempts carry zero
/// scores and would drag every average down.
pub(crate) async fn stats_for_quiz(
    pool: &PgPool,
    quiz_id: &str,
) -> Result<AttemptStatsRow, sqlx::Error> {
    sqlx::query_as::<_, AttemptStatsRow>(
        "SELECT
            COUNT(*) AS total_attempts,
            COUNT(DISTINCT user_id) AS unique_users,
            COUNT(*) FILTER (WHERE passed) AS passed_attempts,
            COALESCE(AVG(score), 0)::float8 AS average_score,
            COALESCE(AVG(percentage), 0)::float8 AS average_percentage,
            COALESCE(AVG(time_taken_seconds), 0)::float8 AS average_time_seconds,
            COALESCE(MAX(score), 0) AS highest_score,
            COALESCE(MIN(score), 0) AS lowest_score
         FROM quiz_attempts
         WHERE quiz_id = $1 AND status = $2",
    )
    .bind(quiz_id)
    .bind(AttemptStatus::Submitted)
    .fetch_one(pool)
    .await
}

/// Per-question answer counts for one quiz, worst correct-rate first.
pub(crate) async fn question_stats_for_quiz(
    pool: &PgPool,
    quiz_id: &str,
) -> Result<Vec<QuestionStatRow>, sqlx::Error> {
    sqlx::query_as::<_, QuestionStatRow>(
        "SELECT
            a.answer->>'question_id' AS question_id,
            COUNT(*) AS total_answers,
            COUNT(*) FILTER (WHERE (a.answer->>'is_correct')::boolean) AS correct_answers
         FROM quiz_attempts qa
         CROSS JOIN LATERAL jsonb_array_elements(qa.answers) AS a(answer)
         WHERE qa.quiz_id = $1 AND qa.status = $2
         GROUP BY a.answer->>'question_id'
         ORDER BY COUNT(*) FILTER (WHERE (a.answer->>'is_correct')::boolean)::float8
                  / COUNT(*)::float8 ASC
         LIMIT $3",
    )
    .bind(quiz_id)
    .bind(AttemptStatus::Submitted)
    .bind(DIFFICULT_QUESTION_LIMIT)
    .fetch_all(pool)
    .await
}
