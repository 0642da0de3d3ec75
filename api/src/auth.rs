use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;

/// Header set by the authenticating gateway in front of this service.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity, taken from the gateway-injected `x-user-id` header.
///
/// The gateway strips any client-supplied copy of the header, so the value is
/// trusted as-is. A user id in a request body is never used for identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

pub fn extract_user_id(headers: &HeaderMap) -> Result<Uuid, AppError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| AppError::Unauthorized {
            message: format!("Missing {USER_ID_HEADER} header"),
            docs_hint: Some(
                "Requests must pass through the authenticating gateway, which sets x-user-id."
                    .to_string(),
            ),
        })?
        .to_str()
        .map_err(|_| AppError::Unauthorized {
            message: format!("{USER_ID_HEADER} header is not valid ASCII"),
            docs_hint: None,
        })?;

    Uuid::parse_str(raw.trim()).map_err(|_| AppError::Unauthorized {
        message: format!("{USER_ID_HEADER} header is not a valid UUID"),
        docs_hint: Some("Format: 'x-user-id: 01890a5d-ac96-774b-bcce-b302099a8057'".to_string()),
    })
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = extract_user_id(&parts.headers)?;
        Ok(AuthenticatedUser { user_id })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn accepts_valid_uuid() {
        let id = Uuid::now_v7();
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(extract_user_id(&headers).unwrap(), id);
    }

    #[test]
    fn rejects_missing_header() {
        let err = extract_user_id(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
    }

    #[test]
    fn rejects_non_uuid_values() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("42"));
        assert!(matches!(
            extract_user_id(&headers),
            Err(AppError::Unauthorized { .. })
        ));
    }
}
