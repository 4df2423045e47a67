use sqlx::PgPool;

use crate::db::models::Course;

const COLUMNS: &str = "\
    id, title, description, instructor_name, price, created_by, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!("SELECT {COLUMNS} FROM courses WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn exists_by_title(
    pool: &PgPool,
    title: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT id FROM courses WHERE title = $1")
        .bind(title)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list(pool: &PgPool, skip: i64, limit: i64) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {COLUMNS} FROM courses ORDER BY created_at DESC OFFSET $1 LIMIT $2"
    ))
    .bind(skip.max(0))
    .bind(limit.clamp(1, 100))
    .fetch_all(pool)
    .await
}

pub(crate) async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM courses").fetch_one(pool).await
}

/// Case-insensitive substring match over title, description and instructor.
pub(crate) async fn search(
    pool: &PgPool,
    query: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<Course>, sqlx::Error> {
    let pattern = format!("%{}%", escape_like(query));
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {COLUMNS} FROM courses
         WHERE title ILIKE $1 OR description ILIKE $1 OR instructor_name ILIKE $1
         ORDER BY created_at DESC OFFSET $2 LIMIT $3"
    ))
    .bind(&pattern)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 100))
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_search(pool: &PgPool, query: &str) -> Result<i64, sqlx::Error> {
    let pattern = format!("%{}%", escape_like(query));
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM courses
         WHERE title ILIKE $1 OR description ILIKE $1 OR instructor_name ILIKE $1",
    )
    .bind(&pattern)
    .fetch_one(pool)
    .await
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

pub(crate) struct CreateCourse<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) instructor_name: &'a str,
    pub(crate) price: f64,
    pub(crate) created_by: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateCourse<'_>) -> Result<Course, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "INSERT INTO courses (
            id, title, description, instructor_name, price, created_by, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.instructor_name)
    .bind(params.price)
    .bind(params.created_by)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdateCourse {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) instructor_name: Option<String>,
    pub(crate) price: Option<f64>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateCourse,
) -> Result<Course, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "UPDATE courses SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            instructor_name = COALESCE($3, instructor_name),
            price = COALESCE($4, price),
            updated_at = $5
         WHERE id = $6
         RETURNING {COLUMNS}",
    ))
    .bind(params.title)
    .bind(params.description)
    .bind(params.instructor_name)
    .bind(params.price)
    .bind(params.updated_at)
    .bind(id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM courses WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn exists(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let found: Option<i32> = sqlx::query_scalar("SELECT 1 FROM courses WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}
