use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode, Uri, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

const HSTS: &str = "max-age=63072000; includeSubDomains";

/// Enforce HTTPS behind a TLS-terminating proxy (enabled by `STRIDE_REQUIRE_HTTPS=true`).
///
/// `X-Forwarded-Proto: http` gets a 301 to the HTTPS equivalent. Every response
/// carries an HSTS header.
pub async fn require_https(req: Request, next: Next) -> Response {
    if let Some(location) = https_redirect_target(&req) {
        let mut response =
            (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response();
        add_hsts_header(&mut response);
        return response;
    }

    let mut response = next.run(req).await;
    add_hsts_header(&mut response);
    response
}

fn https_redirect_target(req: &Request) -> Option<String> {
    let proto = req
        .headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())?;
    if !proto.eq_ignore_ascii_case("http") {
        return None;
    }

    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let target = format!("https://{host}{path_and_query}");
    target.parse::<Uri>().ok().map(|uri| uri.to_string())
}

fn add_hsts_header(response: &mut Response) {
    response
        .headers_mut()
        .insert(header::STRICT_TRANSPORT_SECURITY, HeaderValue::from_static(HSTS));
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::{Router, middleware};
    use tower::ServiceExt;

    async fn ok() -> StatusCode {
        StatusCode::OK
    }

    fn app() -> Router {
        Router::new()
            .route("/v1/coach/state", get(ok))
            .layer(middleware::from_fn(super::require_https))
    }

    #[tokio::test]
    async fn plain_http_is_redirected() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/v1/coach/state?x=1")
                    .header("host", "api.stride.fit")
                    .header("x-forwarded-proto", "http")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers().get("location").expect("location header"),
            "https://api.stride.fit/v1/coach/state?x=1"
        );
    }

    #[tokio::test]
    async fn https_passes_through_with_hsts() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/v1/coach/state")
                    .header("x-forwarded-proto", "https")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("strict-transport-security"));
    }
}
