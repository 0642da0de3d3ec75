use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};
use serde::Serialize;
use sqlx::PgPool;
use stride_core::store::{ConversationStore, EvictionPolicy};

use crate::state::AppState;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// `ok` when the database answers, `degraded` otherwise
    pub status: String,
    pub version: String,
    pub conversations: ConversationHealth,
}

/// In-memory conversation store occupancy.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ConversationHealth {
    pub live: usize,
    /// `unbounded`, `ttl:<seconds>s` or `lru:<capacity>`
    pub eviction: String,
}

impl ConversationHealth {
    fn of(store: &ConversationStore) -> Self {
        Self {
            live: store.len(),
            eviction: eviction_label(store.policy()),
        }
    }
}

fn eviction_label(policy: EvictionPolicy) -> String {
    match policy {
        EvictionPolicy::Unbounded => "unbounded".to_string(),
        EvictionPolicy::Ttl(ttl) => format!("ttl:{}s", ttl.as_secs()),
        EvictionPolicy::Lru { capacity } => format!("lru:{capacity}"),
    }
}

async fn database_reachable(pool: &PgPool) -> bool {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .is_ok()
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Database liveness plus conversation store occupancy
///
/// Conversations live only in memory, so the count drops to zero on restart.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Database reachable", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let conversations = ConversationHealth::of(state.coach.store());
    let (code, status) = if database_reachable(&state.db).await {
        (StatusCode::OK, "ok")
    } else {
        tracing::warn!(live = conversations.live, "health check: database unreachable");
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            conversations,
        }),
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::routes::test_support::test_state;

    #[test]
    fn eviction_labels() {
        assert_eq!(eviction_label(EvictionPolicy::Unbounded), "unbounded");
        assert_eq!(
            eviction_label(EvictionPolicy::Ttl(Duration::from_secs(900))),
            "ttl:900s"
        );
        assert_eq!(eviction_label(EvictionPolicy::Lru { capacity: 64 }), "lru:64");
    }

    #[tokio::test]
    async fn reports_live_conversations() {
        let (state, _) = test_state(vec![]);
        state.coach.store().get(Uuid::now_v7());
        state.coach.store().get(Uuid::now_v7());

        let response = router()
            .with_state(state)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("body should be json");
        assert_eq!(body["conversations"]["live"], 2);
        assert_eq!(body["conversations"]["eviction"], "unbounded");
        assert!(body["status"] == "ok" || body["status"] == "degraded");
    }
}
