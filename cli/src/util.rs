use serde_json::json;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "x-user-id";

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!("{}", serde_json::to_string_pretty(&err).unwrap());
    std::process::exit(4);
}

/// Coach endpoints are scoped to a caller; fail fast before any request goes out.
pub fn require_user(user_id: Option<Uuid>) -> Uuid {
    user_id.unwrap_or_else(|| {
        exit_error(
            "user_id is required for coach and plan commands",
            Some("Set --user-id or STRIDE_USER_ID to a UUID."),
        )
    })
}

/// Map an HTTP status to the CLI exit code.
///
/// Exit codes: 0=success (2xx), 1=client error (4xx), 2=server error (5xx),
///             3=connection error, 4=usage error
pub fn exit_code_for(status: u16) -> i32 {
    match status {
        200..=299 => 0,
        400..=499 => 1,
        _ => 2,
    }
}

/// Parse a response body, treating an empty body (204) as JSON null.
pub fn parse_body(text: &str) -> serde_json::Value {
    if text.trim().is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_str(text)
        .unwrap_or_else(|e| json!({"raw_error": format!("Failed to parse response as JSON: {e}")}))
}

/// Execute a request and return the status and parsed body (no printing).
pub async fn send(
    api_url: &str,
    method: reqwest::Method,
    path: &str,
    user_id: Option<Uuid>,
    body: Option<&serde_json::Value>,
) -> Result<(u16, serde_json::Value), String> {
    let url = reqwest::Url::parse(&format!("{api_url}{path}"))
        .map_err(|e| format!("Invalid URL: {api_url}{path}: {e}"))?;

    let mut req = client().request(method, url);
    if let Some(id) = user_id {
        req = req.header(USER_ID_HEADER, id.to_string());
    }
    if let Some(b) = body {
        req = req.json(b);
    }

    let resp = req.send().await.map_err(|e| format!("{e}"))?;
    let status = resp.status().as_u16();
    let text = resp.text().await.map_err(|e| format!("{e}"))?;
    Ok((status, parse_body(&text)))
}

/// Execute an API request, print the response, exit with structured code.
pub async fn api_request(
    api_url: &str,
    method: reqwest::Method,
    path: &str,
    user_id: Option<Uuid>,
    body: Option<serde_json::Value>,
    raw: bool,
) -> i32 {
    if let Err(e) = reqwest::Url::parse(&format!("{api_url}{path}")) {
        let err = json!({
            "error": "cli_error",
            "message": format!("Invalid URL: {api_url}{path}: {e}")
        });
        eprintln!("{}", serde_json::to_string_pretty(&err).unwrap());
        return 4;
    }

    let (status, resp_body) = match send(api_url, method, path, user_id, body.as_ref()).await {
        Ok(pair) => pair,
        Err(e) => {
            let err = json!({
                "error": "connection_error",
                "message": e,
                "docs_hint": "Is the API server running? Check STRIDE_API_URL."
            });
            eprintln!("{}", serde_json::to_string_pretty(&err).unwrap());
            return 3;
        }
    };

    let exit_code = exit_code_for(status);
    let output = if resp_body.is_null() {
        json!({"status": status})
    } else {
        resp_body
    };

    let formatted = if raw {
        serde_json::to_string(&output).unwrap()
    } else {
        serde_json::to_string_pretty(&output).unwrap()
    };

    if exit_code == 0 {
        println!("{formatted}");
    } else {
        eprintln!("{formatted}");
    }

    exit_code
}
