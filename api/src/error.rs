use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use stride_core::error::{self, ApiError, CoachError, LlmError};

/// Internal error type that converts to structured API responses
#[derive(Debug)]
pub enum AppError {
    /// Validation error (400)
    Validation {
        message: String,
        field: Option<String>,
        received: Option<serde_json::Value>,
        docs_hint: Option<String>,
    },
    /// Missing or malformed caller identity (401)
    Unauthorized {
        message: String,
        docs_hint: Option<String>,
    },
    /// Approval requested without a pending plan (409)
    NoPlanAwaitingApproval,
    /// LLM provider not configured (503)
    LlmUnavailable,
    /// LLM call failed (502)
    Upstream(String),
    /// Database error (500)
    Database(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            AppError::Validation {
                message,
                field,
                received,
                docs_hint,
            } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: error::codes::VALIDATION_FAILED.to_string(),
                    message,
                    field,
                    received,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::Unauthorized { message, docs_hint } => (
                StatusCode::UNAUTHORIZED,
                ApiError {
                    error: error::codes::UNAUTHORIZED.to_string(),
                    message,
                    field: None,
                    received: None,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::NoPlanAwaitingApproval => (
                StatusCode::CONFLICT,
                ApiError {
                    error: error::codes::NO_PLAN_AWAITING_APPROVAL.to_string(),
                    message: "No plan awaiting approval".to_string(),
                    field: None,
                    received: None,
                    request_id,
                    docs_hint: Some(
                        "Chat until the coach presents a plan (conversation_state.phase == \
                         'awaiting_approval'), then approve it."
                            .to_string(),
                    ),
                },
            ),
            AppError::LlmUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiError {
                    error: error::codes::SERVICE_UNAVAILABLE.to_string(),
                    message: "The coach is not available right now".to_string(),
                    field: None,
                    received: None,
                    request_id,
                    docs_hint: Some("The server has no LLM provider configured.".to_string()),
                },
            ),
            AppError::Upstream(msg) => {
                tracing::error!(request_id = %request_id, "Upstream error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    ApiError {
                        error: error::codes::UPSTREAM_FAILED.to_string(),
                        message: "The coach failed to respond. Please try again.".to_string(),
                        field: None,
                        received: None,
                        request_id,
                        docs_hint: None,
                    },
                )
            }
            AppError::Database(msg) => {
                tracing::error!(request_id = %request_id, "Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError {
                        error: error::codes::INTERNAL_ERROR.to_string(),
                        message: "An internal error occurred".to_string(),
                        field: None,
                        received: None,
                        request_id,
                        docs_hint: None,
                    },
                )
            }
        };

        (status, Json(api_error)).into_response()
    }
}

impl From<CoachError> for AppError {
    fn from(err: CoachError) -> Self {
        match err {
            CoachError::InvalidInput { field, message } => AppError::Validation {
                message,
                field: Some(field.to_string()),
                received: None,
                docs_hint: None,
            },
            CoachError::NoPlanAwaitingApproval => AppError::NoPlanAwaitingApproval,
            CoachError::Llm(LlmError::NotConfigured) => AppError::LlmUnavailable,
            CoachError::Llm(other) => AppError::Upstream(other.to_string()),
            CoachError::Persistence(err) => AppError::Database(format!("{err:?}")),
        }
    }
}
