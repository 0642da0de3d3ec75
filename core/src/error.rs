use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Structured error response body.
/// Every error carries enough context for a client to understand what went wrong
/// and what to send instead.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    /// Machine-readable error code (e.g. "validation_failed", "no_plan_awaiting_approval")
    pub error: String,
    /// Human-readable description of what went wrong
    pub message: String,
    /// Which field caused the error (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// The value that was received (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<serde_json::Value>,
    /// Request ID for tracing and debugging
    pub request_id: String,
    /// Hint about what the correct usage looks like
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

/// Error codes used across the API
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const NO_PLAN_AWAITING_APPROVAL: &str = "no_plan_awaiting_approval";
    pub const UPSTREAM_FAILED: &str = "upstream_failed";
    pub const SERVICE_UNAVAILABLE: &str = "service_unavailable";
    pub const INTERNAL_ERROR: &str = "internal_error";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const RATE_LIMITED: &str = "rate_limited";
}

/// Failure of the text-completion collaborator. Never retried by the core.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("completion provider is not configured")]
    NotConfigured,
    #[error("completion request failed: {0}")]
    Transport(String),
    #[error("completion provider returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("completion response was unusable: {0}")]
    InvalidResponse(String),
}

/// Failure of the plan store. The store has already rolled back when this surfaces.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PersistenceError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl PersistenceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[derive(Debug, Error)]
pub enum CoachError {
    /// Rejected input; nothing was mutated.
    #[error("{message}")]
    InvalidInput {
        field: &'static str,
        message: String,
    },
    /// Approval requested while no plan is pending; nothing was mutated.
    #[error("no plan awaiting approval")]
    NoPlanAwaitingApproval,
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
