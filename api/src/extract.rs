//! Custom extractors that convert axum rejections to structured AppError responses.
//!
//! Use `AppJson<T>` as a drop-in replacement for `axum::Json<T>` in handler signatures.
//! Unlike the standard extractor, deserialization failures produce a JSON `AppError`
//! instead of axum's default plain-text 422 response.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};

use crate::error::AppError;

/// JSON extractor that converts deserialization errors to structured `AppError` responses.
///
/// # Example
/// ```ignore
/// async fn chat(AppJson(req): AppJson<ChatRequest>) -> Result<Json<ChatResponse>, AppError> {
///     // a body without `message` never reaches this point: it becomes AppError::Validation
/// }
/// ```
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(map_json_rejection(rejection)),
        }
    }
}

/// Convert a `JsonRejection` to a structured `AppError::Validation`.
pub fn map_json_rejection(rejection: JsonRejection) -> AppError {
    let body_text = rejection.body_text();

    // "missing field `message`" → field = "message"
    let field_hint = extract_field_from_serde_message(&body_text);

    AppError::Validation {
        message: format!("Invalid request body: {body_text}"),
        field: Some(field_hint.unwrap_or("body".to_string())),
        received: None,
        docs_hint: Some(
            "Check the request body against the endpoint's schema (GET /api-doc/openapi.json)."
                .to_string(),
        ),
    }
}

/// Field name from serde's "missing field" / "unknown field" / "invalid type" messages.
fn extract_field_from_serde_message(msg: &str) -> Option<String> {
    ["missing field `", "unknown field `"]
        .iter()
        .find_map(|pattern| {
            let after = &msg[msg.find(pattern)? + pattern.len()..];
            after.find('`').map(|end| after[..end].to_string())
        })
        .or_else(|| nested_path(msg))
}

/// serde_path_to_error style prefix, e.g. "user_profile.weight: invalid type".
fn nested_path(msg: &str) -> Option<String> {
    let body = msg.split_once(": ").map(|(_, rest)| rest).unwrap_or(msg);
    let (path, _) = body.split_once(": ")?;
    let looks_like_path = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'));
    looks_like_path.then(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_missing_field_name() {
        let msg = "Failed to deserialize the JSON body into the target type: missing field `message` at line 1 column 14";
        assert_eq!(
            extract_field_from_serde_message(msg),
            Some("message".to_string())
        );
    }

    #[test]
    fn extracts_unknown_field_name() {
        let msg = "unknown field `foo`, expected one of `message`, `user_profile`";
        assert_eq!(
            extract_field_from_serde_message(msg),
            Some("foo".to_string())
        );
    }

    #[test]
    fn extracts_nested_path_for_type_errors() {
        let msg = "Failed to deserialize the JSON body into the target type: user_profile.weight: invalid type: string \"heavy\", expected f64 at line 1 column 40";
        assert_eq!(
            extract_field_from_serde_message(msg),
            Some("user_profile.weight".to_string())
        );
    }

    #[test]
    fn returns_none_for_generic_error() {
        let msg = "Expected request with `Content-Type: application/json`";
        assert_eq!(extract_field_from_serde_message(msg), None);
    }
}
