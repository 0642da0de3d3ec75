use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::CorsLayer;

const DEFAULT_ORIGIN: &str = "http://localhost:5173";

/// Build a CORS layer from the `STRIDE_CORS_ORIGINS` env var.
///
/// - Origins: comma-separated list (default: `http://localhost:5173`)
/// - Methods: GET, POST, DELETE, OPTIONS
/// - Headers: Content-Type, x-user-id
/// - Max age: 3600s
pub fn build_cors_layer() -> CorsLayer {
    let raw = std::env::var("STRIDE_CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_ORIGIN.to_string());
    cors_layer_for(&parse_origins(&raw))
}

fn parse_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

fn cors_layer_for(origins: &[HeaderValue]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins.to_vec())
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static(crate::auth::USER_ID_HEADER),
        ])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_origins() {
        let origins = parse_origins(" https://app.stride.fit, ,http://localhost:5173 ");
        assert_eq!(
            origins,
            vec![
                HeaderValue::from_static("https://app.stride.fit"),
                HeaderValue::from_static("http://localhost:5173"),
            ]
        );
    }

    #[test]
    fn skips_values_that_are_not_header_safe() {
        assert!(parse_origins("https://ok.example,bad\norigin").len() == 1);
    }
}
