use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::{AnswerRecord, QuizAttempt};
use crate::db::types::AttemptStatus;

/// One answer as the learner sends it. Both fields are optional at the serde
/// level so a malformed element surfaces as a domain error instead of a
/// rejected body.
#[derive(Debug, Deserialize)]
pub(crate) struct AnswerSubmission {
    #[serde(default)]
    #[serde(alias = "question", alias = "questionId")]
    pub(crate) question_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "selectedOption")]
    pub(crate) selected_option: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitAttemptRequest {
    pub(crate) answers: Vec<AnswerSubmission>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StartQuizDetails {
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) time_limit_minutes: i32,
    pub(crate) attempt_number: i32,
    pub(crate) max_attempts: i32,
    pub(crate) started_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct StartAttemptResponse {
    pub(crate) attempt_id: String,
    pub(crate) quiz_details: StartQuizDetails,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerView {
    pub(crate) question_id: String,
    pub(crate) selected_option: i32,
    pub(crate) is_correct: bool,
    pub(crate) points: i32,
}

impl AnswerView {
    pub(crate) fn from_record(record: AnswerRecord) -> Self {
        Self {
            question_id: record.question_id,
            selected_option: record.selected_option,
            is_correct: record.is_correct,
            points: record.points,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitAttemptResponse {
    pub(crate) attempt_id: String,
    pub(crate) score: i32,
    pub(crate) max_score: i32,
    pub(crate) percentage: i32,
    pub(crate) passed: bool,
    pub(crate) time_taken_seconds: i64,
    pub(crate) answers: Vec<AnswerView>,
    pub(crate) submitted_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) quiz_id: String,
    pub(crate) course_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) status: AttemptStatus,
    pub(crate) answers: Vec<AnswerView>,
    pub(crate) score: i32,
    pub(crate) max_score: i32,
    pub(crate) percentage: i32,
    pub(crate) passed: bool,
    pub(crate) started_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) submitted_at: Option<String>,
    pub(crate) time_taken_seconds: i64,
    pub(crate) created_at: String,
}

impl AttemptResponse {
    pub(crate) fn from_db(attempt: QuizAttempt) -> Self {
        Self {
            id: attempt.id,
            user_id: attempt.user_id,
            quiz_id: attempt.quiz_id,
            course_id: attempt.course_id,
            attempt_number: attempt.attempt_number,
            status: attempt.status,
            answers: attempt.answers.0.into_iter().map(AnswerView::from_record).collect(),
            score: attempt.score,
            max_score: attempt.max_score,
            percentage: attempt.percentage,
            passed: attempt.passed,
            started_at: format_primitive(attempt.started_at),
            submitted_at: attempt.submitted_at.map(format_primitive),
            time_taken_seconds: attempt.time_taken_seconds,
            created_at: format_primitive(attempt.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptsSummary {
    pub(crate) total_attempts: i64,
    pub(crate) max_attempts: i32,
    pub(crate) attempts_remaining: i64,
    pub(crate) has_passed: bool,
    pub(crate) best_score: i32,
    pub(crate) best_percentage: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct MyAttemptsResponse {
    pub(crate) attempts: Vec<AttemptResponse>,
    pub(crate) summary: AttemptsSummary,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptQuizInfo {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) passing_score: i32,
}

/// Post-grading review row. `explanation` is only present for questions the
/// learner got wrong; `correct_option` drops out if the question was deleted
/// after grading.
#[derive(Debug, Serialize)]
pub(crate) struct AttemptAnswerDetail {
    pub(crate) question_id: String,
    pub(crate) question_text: String,
    pub(crate) selected_option: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) correct_option: Option<i32>,
    pub(crate) is_correct: bool,
    pub(crate) points: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) explanation: Option<String>,
}

/// Score fields stay absent while the attempt is still in flight.
#[derive(Debug, Serialize)]
pub(crate) struct AttemptDetailResponse {
    pub(crate) attempt_id: String,
    pub(crate) quiz: AttemptQuizInfo,
    pub(crate) attempt_number: i32,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) submitted_at: Option<String>,
    pub(crate) time_taken_seconds: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) max_score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) percentage: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) passed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) answers: Option<Vec<AttemptAnswerDetail>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DifficultQuestionStat {
    pub(crate) question_id: String,
    pub(crate) question_text: String,
    pub(crate) total_answers: i64,
    pub(crate) correct_answers: i64,
    pub(crate) incorrect_answers: i64,
    pub(crate) correct_percentage: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptStatsResponse {
    pub(crate) total_attempts: i64,
    pub(crate) unique_users: i64,
    pub(crate) passed_attempts: i64,
    pub(crate) pass_rate: i32,
    pub(crate) average_score: f64,
    pub(crate) average_percentage: i32,
    pub(crate) average_time_taken_seconds: i64,
    pub(crate) highest_score: i32,
    pub(crate) lowest_score: i32,
    pub(crate) difficult_questions: Vec<DifficultQuestionStat>,
}
