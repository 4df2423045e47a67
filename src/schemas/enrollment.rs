use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Enrollment;
use crate::db::types::{EnrollmentStatus, PaymentStatus};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct EnrollmentCreate {
    #[serde(default)]
    #[serde(alias = "paymentAmount")]
    #[validate(range(min = 0.0, message = "payment_amount must be non-negative"))]
    pub(crate) payment_amount: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct EnrollmentUpdate {
    #[serde(default)]
    pub(crate) status: Option<EnrollmentStatus>,
    #[serde(default)]
    #[serde(alias = "paymentStatus")]
    pub(crate) payment_status: Option<PaymentStatus>,
    #[serde(default)]
    #[serde(alias = "paymentAmount")]
    #[validate(range(min = 0.0, message = "payment_amount must be non-negative"))]
    pub(crate) payment_amount: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrollmentResponse {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) course_id: String,
    pub(crate) status: EnrollmentStatus,
    pub(crate) payment_status: PaymentStatus,
    pub(crate) payment_amount: f64,
    pub(crate) enrolled_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) last_accessed_at: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrollmentStatsResponse {
    pub(crate) total_enrollments: i64,
    pub(crate) active_enrollments: i64,
    pub(crate) completed_enrollments: i64,
    pub(crate) dropped_enrollments: i64,
    pub(crate) total_revenue: f64,
    pub(crate) completed_payments: i64,
}

impl EnrollmentResponse {
    pub(crate) fn from_db(enrollment: Enrollment) -> Self {
        Self {
            id: enrollment.id,
            user_id: enrollment.user_id,
            course_id: enrollment.course_id,
            status: enrollment.status,
            payment_status: enrollment.payment_status,
            payment_amount: enrollment.payment_amount,
            enrolled_at: format_primitive(enrollment.enrolled_at),
            completed_at: enrollment.completed_at.map(format_primitive),
            last_accessed_at: enrollment.last_accessed_at.map(format_primitive),
            created_at: format_primitive(enrollment.created_at),
            updated_at: format_primitive(enrollment.updated_at),
        }
    }
}
