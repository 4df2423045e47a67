use sqlx::PgPool;

use crate::db::models::Quiz;

const COLUMNS: &str = "\
    id, course_id, title, description, passing_score, time_limit_minutes, \
    max_attempts, order_index, is_published, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!("SELECT {COLUMNS} FROM quizzes WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_by_course(
    pool: &PgPool,
    course_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "SELECT {COLUMNS} FROM quizzes WHERE course_id = $1
         ORDER BY order_index ASC OFFSET $2 LIMIT $3"
    ))
    .bind(course_id)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 100))
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_by_course(pool: &PgPool, course_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM quizzes WHERE course_id = $1")
        .bind(course_id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn order_taken(
    pool: &PgPool,
    course_id: &str,
    order_index: i32,
    exclude_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let found: Option<i32> = sqlx::query_scalar(
        "SELECT 1 FROM quizzes
         WHERE course_id = $1 AND order_index = $2 AND ($3::text IS NULL OR id <> $3)",
    )
    .bind(course_id)
    .bind(order_index)
    .bind(exclude_id)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

pub(crate) struct CreateQuiz<'a> {
    pub(crate) id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) passing_score: i32,
    pub(crate) time_limit_minutes: i32,
    pub(crate) max_attempts: i32,
    pub(crate) order_index: i32,
    pub(crate) is_published: bool,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateQuiz<'_>) -> Result<Quiz, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "INSERT INTO quizzes (
            id, course_id, title, description, passing_score, time_limit_minutes,
            max_attempts, order_index, is_published, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.course_id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.passing_score)
    .bind(params.time_limit_minutes)
    .bind(params.max_attempts)
    .bind(params.order_index)
    .bind(params.is_published)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdateQuiz {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) passing_score: Option<i32>,
    pub(crate) time_limit_minutes: Option<i32>,
    pub(crate) max_attempts: Option<i32>,
    pub(crate) order_index: Option<i32>,
    pub(crate) is_published: Option<bool>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateQuiz,
) -> Result<Quiz, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "UPDATE quizzes SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            passing_score = COALESCE($3, passing_score),
            time_limit_minutes = COALESCE($4, time_limit_minutes),
            max_attempts = COALESCE($5, max_attempts),
            order_index = COALESCE($6, order_index),
            is_published = COALESCE($7, is_published),
            updated_at = $8
         WHERE id = $9
         RETURNING {COLUMNS}",
    ))
    .bind(params.title)
    .bind(params.description)
    .bind(params.passing_score)
    .bind(params.time_limit_minutes)
    .bind(params.max_attempts)
    .bind(params.order_index)
    .bind(params.is_published)
    .bind(params.updated_at)
    .bind(id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM quizzes WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
