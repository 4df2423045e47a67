use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Enrollment;
use crate::db::types::{EnrollmentStatus, PaymentStatus};

const COLUMNS: &str = "\
    id, user_id, course_id, status, payment_status, payment_amount, \
    enrolled_at, completed_at, last_accessed_at, created_at, updated_at";

pub(crate) struct CreateEnrollment<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) payment_amount: f64,
    pub(crate) enrolled_at: PrimitiveDateTime,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Default)]
pub(crate) struct UpdateEnrollment {
    pub(crate) status: Option<EnrollmentStatus>,
    pub(crate) payment_status: Option<PaymentStatus>,
    pub(crate) payment_amount: Option<f64>,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EnrollmentStatsRow {
    pub(crate) total_enrollments: i64,
    pub(crate) active_enrollments: i64,
    pub(crate) completed_enrollments: i64,
    pub(crate) dropped_enrollments: i64,
    pub(crate) total_revenue: f64,
    pub(crate) completed_payments: i64,
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!("SELECT {COLUMNS} FROM enrollments WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_id_for_user(
    pool: &PgPool,
    id: &str,
    user_id: &str,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {COLUMNS} FROM enrollments WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Inserts a new enrollment. Returns `false` when the user already holds one
/// for this course, regardless of its status.
pub(crate) async fn create(
    pool: &PgPool,
    params: CreateEnrollment<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO enrollments (
            id, user_id, course_id, status, payment_status, payment_amount,
            enrolled_at, created_at, updated_at
         )
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT (user_id, course_id) DO NOTHING",
    )
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.course_id)
    .bind(EnrollmentStatus::Active)
    .bind(PaymentStatus::Pending)
    .bind(params.payment_amount)
    .bind(params.enrolled_at)
    .bind(params.created_at)
    .bind(params.updated_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
    status: Option<EnrollmentStatus>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Enrollment>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {COLUMNS} FROM enrollments WHERE user_id = "
    ));
    builder.push_bind(user_id);

    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    builder.push(" ORDER BY enrolled_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 100));

    builder.build_query_as::<Enrollment>().fetch_all(pool).await
}

pub(crate) async fn count_for_user(
    pool: &PgPool,
    user_id: &str,
    status: Option<EnrollmentStatus>,
) -> Result<i64, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM enrollments WHERE user_id = ");
    builder.push_bind(user_id);

    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) struct EnrollmentFilter<'a> {
    pub(crate) status: Option<EnrollmentStatus>,
    pub(crate) payment_status: Option<PaymentStatus>,
    pub(crate) course_id: Option<&'a str>,
    pub(crate) user_id: Option<&'a str>,
}

pub(crate) async fn list_admin(
    pool: &PgPool,
    filter: &EnrollmentFilter<'_>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Enrollment>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM enrollments WHERE 1 = 1"));
    push_filters(&mut builder, filter);

    builder.push(" ORDER BY enrolled_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 100));

    builder.build_query_as::<Enrollment>().fetch_all(pool).await
}

pub(crate) async fn count_admin(
    pool: &PgPool,
    filter: &EnrollmentFilter<'_>,
) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM enrollments WHERE 1 = 1");
    push_filters(&mut builder, filter);

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &EnrollmentFilter<'a>) {
    if let Some(status) = filter.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
    if let Some(payment_status) = filter.payment_status {
        builder.push(" AND payment_status = ");
        builder.push_bind(payment_status);
    }
    if let Some(course_id) = filter.course_id {
        builder.push(" AND course_id = ");
        builder.push_bind(course_id);
    }
    if let Some(user_id) = filter.user_id {
        builder.push(" AND user_id = ");
        builder.push_bind(user_id);
    }
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: &UpdateEnrollment,
    updated_at: PrimitiveDateTime,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "UPDATE enrollments
         SET status = COALESCE($1, status),
             payment_status = COALESCE($2, payment_status),
             payment_amount = COALESCE($3, payment_amount),
             completed_at = COALESCE($4, completed_at),
             updated_at = $5
         WHERE id = $6
         RETURNING {COLUMNS}"
    ))
    .bind(params.status)
    .bind(params.payment_status)
    .bind(params.payment_amount)
    .bind(params.completed_at)
    .bind(updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn touch_last_accessed(
    pool: &PgPool,
    id: &str,
    accessed_at: PrimitiveDateTime,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "UPDATE enrollments
         SET last_accessed_at = $1, updated_at = $1
         WHERE id = $2
         RETURNING {COLUMNS}"
    ))
    .bind(accessed_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM enrollments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn stats_for_course(
    pool: &PgPool,
    course_id: &str,
) -> Result<EnrollmentStatsRow, sqlx::Error> {
    sqlx::query_as::<_, EnrollmentStatsRow>(
        "SELECT
            COUNT(*) AS total_enrollments,
            COUNT(*) FILTER (WHERE status = $2) AS active_enrollments,
            COUNT(*) FILTER (WHERE status = $3) AS completed_enrollments,
            COUNT(*) FILTER (WHERE status = $4) AS dropped_enrollments,
            COALESCE(SUM(payment_amount), 0)::float8 AS total_revenue,
            COUNT(*) FILTER (WHERE payment_status = $5) AS completed_payments
         FROM enrollments
         WHERE course_id = $1",
    )
    .bind(course_id)
    .bind(EnrollmentStatus::Active)
    .bind(EnrollmentStatus::Completed)
    .bind(EnrollmentStatus::Dropped)
    .bind(PaymentStatus::Completed)
    .fetch_one(pool)
    .await
}
