use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::Question;
use crate::db::types::DifficultyLevel;

const COLUMNS: &str = "\
    id, quiz_id, question_text, options, correct_answer, points, \
    order_index, explanation, difficulty, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// All questions of one quiz in presentation order. The scoring path relies
/// on this being the complete set.
pub(crate) async fn list_by_quiz(
    pool: &PgPool,
    quiz_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE quiz_id = $1 ORDER BY order_index ASC"
    ))
    .bind(quiz_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_by_quiz_paginated(
    pool: &PgPool,
    quiz_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE quiz_id = $1
         ORDER BY order_index ASC OFFSET $2 LIMIT $3"
    ))
    .bind(quiz_id)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 100))
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_by_quiz(pool: &PgPool, quiz_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE quiz_id = $1")
        .bind(quiz_id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn order_taken(
    pool: &PgPool,
    quiz_id: &str,
    order_index: i32,
    exclude_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let found: Option<i32> = sqlx::query_scalar(
        "SELECT 1 FROM questions
         WHERE quiz_id = $1 AND order_index = $2 AND ($3::text IS NULL OR id <> $3)",
    )
    .bind(quiz_id)
    .bind(order_index)
    .bind(exclude_id)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

pub(crate) struct CreateQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) quiz_id: &'a str,
    pub(crate) question_text: &'a str,
    pub(crate) options: Vec<String>,
    pub(crate) correct_answer: i32,
    pub(crate) points: i32,
    pub(crate) order_index: i32,
    pub(crate) explanation: Option<&'a str>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateQuestion<'_>,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (
            id, quiz_id, question_text, options, correct_answer, points,
            order_index, explanation, difficulty, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.quiz_id)
    .bind(params.question_text)
    .bind(Json(params.options))
    .bind(params.correct_answer)
    .bind(params.points)
    .bind(params.order_index)
    .bind(params.explanation)
    .bind(params.difficulty)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdateQuestion {
    pub(crate) question_text: Option<String>,
    pub(crate) options: Option<Vec<String>>,
    pub(crate) correct_answer: Option<i32>,
    pub(crate) points: Option<i32>,
    pub(crate) order_index: Option<i32>,
    pub(crate) explanation: Option<String>,
    pub(crate) difficulty: Option<DifficultyLevel>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateQuestion,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "UPDATE questions SET
            question_text = COALESCE($1, question_text),
            options = COALESCE($2, options),
            correct_answer = COALESCE($3, correct_answer),
            points = COALESCE($4, points),
            order_index = COALESCE($5, order_index),
            explanation = COALESCE($6, explanation),
            difficulty = COALESCE($7, difficulty),
            updated_at = $8
         WHERE id = $9
         RETURNING {COLUMNS}",
    ))
    .bind(params.question_text)
    .bind(params.options.map(Json))
    .bind(params.correct_answer)
    .bind(params.points)
    .bind(params.order_index)
    .bind(params.explanation)
    .bind(params.difficulty)
    .bind(params.updated_at)
    .bind(id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
