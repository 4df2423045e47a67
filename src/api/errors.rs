use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Every error leaves the API as `{"success": false, "message": "..."}`.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

fn error_body(message: String) -> Json<ErrorResponse> {
    Json(ErrorResponse { success: false, message })
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    TooManyRequests(&'static str),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                let mut response =
                    (StatusCode::UNAUTHORIZED, error_body(message.to_string())).into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::Forbidden(message) => {
                (StatusCode::FORBIDDEN, error_body(message.to_string())).into_response()
            }
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, error_body(message)).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, error_body(message)).into_response()
            }
            ApiError::Conflict(message) => {
                (StatusCode::CONFLICT, error_body(message)).into_response()
            }
            ApiError::TooManyRequests(message) => {
                (StatusCode::TOO_MANY_REQUESTS, error_body(message.to_string())).into_response()
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, error_body(message)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn unauthorized_sets_www_authenticate() {
        let response = ApiError::Unauthorized("Invalid authentication credentials").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).and_then(|v| v.to_str().ok()),
            Some("Bearer")
        );
    }

    #[tokio::test]
    async fn body_carries_success_false() {
        let response = ApiError::NotFound("Quiz not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["success"], serde_json::json!(false));
        assert_eq!(value["message"], serde_json::json!("Quiz not found"));
    }
}
