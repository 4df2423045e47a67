use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::{CompletedLesson, Progress};

const COLUMNS: &str = "\
    id, user_id, course_id, completed_lessons, total_lessons, total_quizzes, \
    passed_quizzes, completion_percentage, last_accessed_at, created_at, updated_at";

pub(crate) struct CreateProgress<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) total_lessons: i32,
    pub(crate) total_quizzes: i32,
    pub(crate) last_accessed_at: PrimitiveDateTime,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProgressStatsRow {
    pub(crate) total_students: i64,
    pub(crate) completed_students: i64,
    pub(crate) active_students: i64,
    pub(crate) average_completion: f64,
    pub(crate) average_lessons_completed: f64,
    pub(crate) average_quizzes_passed: f64,
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Progress>, sqlx::Error> {
    sqlx::query_as::<_, Progress>(&format!("SELECT {COLUMNS} FROM progress WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_user_course(
    pool: &PgPool,
    user_id: &str,
    course_id: &str,
) -> Result<Option<Progress>, sqlx::Error> {
    sqlx::query_as::<_, Progress>(&format!(
        "SELECT {COLUMNS} FROM progress WHERE user_id = $1 AND course_id = $2"
    ))
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(pool)
    .await
}

/// Inserts a zeroed progress row. Returns `false` when one already exists for
/// the (user, course) pair.
pub(crate) async fn create(pool: &PgPool, params: CreateProgress<'_>) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO progress (
            id, user_id, course_id, completed_lessons, total_lessons, total_quizzes,
            passed_quizzes, completion_percentage, last_accessed_at, created_at, updated_at
         )
         VALUES ($1, $2, $3, '[]'::jsonb, $4, $5, 0, 0, $6, $7, $8)
         ON CONFLICT (user_id, course_id) DO NOTHING",
    )
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.course_id)
    .bind(params.total_lessons)
    .bind(params.total_quizzes)
    .bind(params.last_accessed_at)
    .bind(params.created_at)
    .bind(params.updated_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn update_totals(
    pool: &PgPool,
    id: &str,
    total_lessons: Option<i32>,
    total_quizzes: Option<i32>,
    completion_percentage: i32,
    accessed_at: PrimitiveDateTime,
) -> Result<Option<Progress>, sqlx::Error> {
    sqlx::query_as::<_, Progress>(&format!(
        "UPDATE progress
         SET total_lessons = COALESCE($1, total_lessons),
             total_quizzes = COALESCE($2, total_quizzes),
             completion_percentage = $3,
             last_accessed_at = $4,
             updated_at = $4
         WHERE id = $5
         RETURNING {COLUMNS}"
    ))
    .bind(total_lessons)
    .bind(total_quizzes)
    .bind(completion_percentage)
    .bind(accessed_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn set_completed_lessons(
    pool: &PgPool,
    id: &str,
    completed_lessons: Json<Vec<CompletedLesson>>,
    completion_percentage: i32,
    accessed_at: PrimitiveDateTime,
) -> Result<Option<Progress>, sqlx::Error> {
    sqlx::query_as::<_, Progress>(&format!(
        "UPDATE progress
         SET completed_lessons = $1,
             completion_percentage = $2,
             last_accessed_at = $3,
             updated_at = $3
         WHERE id = $4
         RETURNING {COLUMNS}"
    ))
    .bind(completed_lessons)
    .bind(completion_percentage)
    .bind(accessed_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// `accessed_at` is optional: the quiz-submit propagation path updates the
/// counters without claiming the learner opened the course page.
pub(crate) async fn set_passed_quizzes(
    pool: &PgPool,
    id: &str,
    passed_quizzes: i32,
    completion_percentage: i32,
    accessed_at: Option<PrimitiveDateTime>,
    updated_at: PrimitiveDateTime,
) -> Result<Option<Progress>, sqlx::Error> {
    sqlx::query_as::<_, Progress>(&format!(
        "UPDATE progress
         SET passed_quizzes = $1,
             completion_percentage = $2,
             last_accessed_at = COALESCE($3, last_accessed_at),
             updated_at = $4
         WHERE id = $5
         RETURNING {COLUMNS}"
    ))
    .bind(passed_quizzes)
    .bind(completion_percentage)
    .bind(accessed_at)
    .bind(updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Clears per-item progress but keeps the course totals in place.
pub(crate) async fn reset(
    pool: &PgPool,
    id: &str,
    accessed_at: PrimitiveDateTime,
) -> Result<Option<Progress>, sqlx::Error> {
    sqlx::query_as::<_, Progress>(&format!(
        "UPDATE progress
         SET completed_lessons = '[]'::jsonb,
             passed_quizzes = 0,
             completion_percentage = 0,
             last_accessed_at = $1,
             updated_at = $1
         WHERE id = $2
         RETURNING {COLUMNS}"
    ))
    .bind(accessed_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<Progress>, sqlx::Error> {
    sqlx::query_as::<_, Progress>(&format!(
        "SELECT {COLUMNS} FROM progress WHERE user_id = $1
         ORDER BY updated_at DESC OFFSET $2 LIMIT $3"
    ))
    .bind(user_id)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 100))
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_for_user(pool: &PgPool, user_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM progress WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

pub(crate) struct ProgressFilter<'a> {
    pub(crate) course_id: Option<&'a str>,
    pub(crate) user_id: Option<&'a str>,
}

pub(crate) async fn list_admin(
    pool: &PgPool,
    filter: &ProgressFilter<'_>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Progress>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM progress WHERE 1 = 1"));
    push_filters(&mut builder, filter);

    builder.push(" ORDER BY updated_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 100));

    builder.build_query_as::<Progress>().fetch_all(pool).await
}

pub(crate) async fn count_admin(
    pool: &PgPool,
    filter: &ProgressFilter<'_>,
) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM progress WHERE 1 = 1");
    push_filters(&mut builder, filter);

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &ProgressFilter<'a>) {
    if let Some(course_id) = filter.course_id {
        builder.push(" AND course_id = ");
        builder.push_bind(course_id);
    }
    if let Some(user_id) = filter.user_id {
        builder.push(" AND user_id = ");
        builder.push_bind(user_id);
    }
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM progress WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// `active_cutoff` is computed by the caller; "active" means a learner whose
/// last access falls on or after it.
pub(crate) async fn stats_for_course(
    pool: &PgPool,
    course_id: &str,
    active_cutoff: PrimitiveDateTime,
) -> Result<ProgressStatsRow, sqlx::Error> {
    sqlx::query_as::<_, ProgressStatsRow>(
        "SELECT
            COUNT(*) AS total_students,
            COUNT(*) FILTER (WHERE completion_percentage = 100) AS completed_students,
            COUNT(*) FILTER (WHERE last_accessed_at >= $2) AS active_students,
            COALESCE(AVG(completion_percentage), 0)::float8 AS average_completion,
            COALESCE(AVG(jsonb_array_length(completed_lessons)), 0)::float8
                AS average_lessons_completed,
            COALESCE(AVG(passed_quizzes), 0)::float8 AS average_quizzes_passed
         FROM progress
         WHERE course_id = $1",
    )
    .bind(course_id)
    .bind(active_cutoff)
    .fetch_one(pool)
    .await
}
