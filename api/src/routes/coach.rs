use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stride_core::conversation::{ChatTurn, ConversationState, UserProfile};
use stride_core::error::ApiError;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

pub fn chat_router() -> Router<AppState> {
    Router::new().route("/v1/coach/chat", post(chat))
}

pub fn approve_router() -> Router<AppState> {
    Router::new().route("/v1/coach/approve", post(approve_plan))
}

pub fn conversation_router() -> Router<AppState> {
    Router::new()
        .route("/v1/coach/state", get(get_conversation_state))
        .route("/v1/coach/conversation", delete(reset_conversation))
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ChatRequest {
    /// The user's message for this turn
    pub message: String,
    #[serde(default)]
    pub user_profile: UserProfile,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ChatResponse {
    pub reply: String,
    pub conversation_state: ConversationState,
    /// True when this reply contains a new plan awaiting approval
    pub plan_generated: bool,
    pub awaiting_approval: bool,
    /// Set when the message approved the pending plan and it was saved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_plan_id: Option<Uuid>,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct ApproveRequest {
    /// Fills the plan's current weight when it was generated without one
    #[serde(default)]
    pub user_profile: UserProfile,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ApproveResponse {
    pub message: String,
    pub plan_id: Uuid,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ConversationStateResponse {
    pub conversation_state: ConversationState,
    /// Most recent turns, oldest first
    pub history: Vec<ChatTurn>,
}

/// Send one message to the coach
///
/// Runs a full conversational turn: slot extraction, state transition, one LLM
/// completion, and plan detection on the reply. When the conversation is awaiting
/// approval, a message like "yes" saves the pending plan.
#[utoipa::path(
    post,
    path = "/v1/coach/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Coach reply", body = ChatResponse),
        (status = 400, description = "Invalid message", body = ApiError),
        (status = 401, description = "Missing caller identity", body = ApiError),
        (status = 502, description = "LLM call failed", body = ApiError),
        (status = 503, description = "LLM not configured", body = ApiError)
    ),
    tag = "coach"
)]
pub async fn chat(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    AppJson(req): AppJson<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let _turn = state.turn_locks.acquire(auth.user_id).await;

    let outcome = state
        .coach
        .handle_turn(auth.user_id, &req.message, &req.user_profile)
        .await?;

    tracing::debug!(
        user_id = %auth.user_id,
        phase = %outcome.conversation_state.phase,
        plan_generated = outcome.plan_generated,
        "coach turn completed"
    );

    Ok(Json(ChatResponse {
        reply: outcome.reply,
        conversation_state: outcome.conversation_state,
        plan_generated: outcome.plan_generated,
        awaiting_approval: outcome.awaiting_approval,
        saved_plan_id: outcome.saved_plan_id,
    }))
}

/// Approve and save the pending plan
///
/// Deactivates the user's previous plan and stores the pending one in a single
/// transaction. Fails with 409 when no plan is awaiting approval.
#[utoipa::path(
    post,
    path = "/v1/coach/approve",
    request_body = ApproveRequest,
    responses(
        (status = 200, description = "Plan saved", body = ApproveResponse),
        (status = 401, description = "Missing caller identity", body = ApiError),
        (status = 409, description = "No plan awaiting approval", body = ApiError)
    ),
    tag = "coach"
)]
pub async fn approve_plan(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    AppJson(req): AppJson<ApproveRequest>,
) -> Result<Json<ApproveResponse>, AppError> {
    let _turn = state.turn_locks.acquire(auth.user_id).await;

    let plan_id = state
        .coach
        .approve_plan(auth.user_id, &req.user_profile)
        .await?;

    Ok(Json(ApproveResponse {
        message: "Plan approved and saved".to_string(),
        plan_id,
    }))
}

/// Current conversation state and recent history
#[utoipa::path(
    get,
    path = "/v1/coach/state",
    responses(
        (status = 200, description = "Conversation snapshot", body = ConversationStateResponse),
        (status = 401, description = "Missing caller identity", body = ApiError)
    ),
    tag = "coach"
)]
pub async fn get_conversation_state(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Json<ConversationStateResponse> {
    Json(ConversationStateResponse {
        conversation_state: state.coach.conversation_state(auth.user_id),
        history: state.coach.history(auth.user_id),
    })
}

/// Forget the conversation and start over
#[utoipa::path(
    delete,
    path = "/v1/coach/conversation",
    responses(
        (status = 204, description = "Conversation reset"),
        (status = 401, description = "Missing caller identity", body = ApiError)
    ),
    tag = "coach"
)]
pub async fn reset_conversation(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> StatusCode {
    let _turn = state.turn_locks.acquire(auth.user_id).await;
    state.coach.reset(auth.user_id);
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::routes::test_support::{PLAN_REPLY, test_state};

    fn app(state: AppState) -> Router {
        chat_router()
            .merge(approve_router())
            .merge(conversation_router())
            .with_state(state)
    }

    fn post_json(uri: &str, user: Option<Uuid>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(user) = user {
            builder = builder.header("x-user-id", user.to_string());
        }
        builder
            .body(Body::from(body.to_string()))
            .expect("request should build")
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        serde_json::from_slice(&bytes).expect("body should be json")
    }

    #[tokio::test]
    async fn chat_requires_identity_header() {
        let (state, _) = test_state(vec![]);
        let response = app(state)
            .oneshot(post_json(
                "/v1/coach/chat",
                None,
                serde_json::json!({"message": "hi"}),
            ))
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "unauthorized");
    }

    #[tokio::test]
    async fn chat_rejects_malformed_body() {
        let (state, _) = test_state(vec![]);
        let response = app(state)
            .oneshot(post_json(
                "/v1/coach/chat",
                Some(Uuid::now_v7()),
                serde_json::json!({"text": "hi"}),
            ))
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["field"], "message");
    }

    #[tokio::test]
    async fn chat_then_approve_saves_plan() {
        let (state, sink) = test_state(vec![
            "Hi there! What are your goals?".to_string(),
            "Nice, let me put that together.".to_string(),
            PLAN_REPLY.to_string(),
        ]);
        let app = app(state);
        let user = Uuid::now_v7();

        for message in [
            "hello",
            "I want to lose weight, I like cardio, 3 days a week",
            "sounds good",
        ] {
            let response = app
                .clone()
                .oneshot(post_json(
                    "/v1/coach/chat",
                    Some(user),
                    serde_json::json!({"message": message}),
                ))
                .await
                .expect("request should succeed");
            assert_eq!(response.status(), StatusCode::OK);
        }

        let state_response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/v1/coach/state")
                    .header("x-user-id", user.to_string())
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");
        let snapshot = body_json(state_response).await;
        assert_eq!(snapshot["conversation_state"]["phase"], "awaiting_approval");
        assert_eq!(snapshot["history"].as_array().map(Vec::len), Some(6));

        let response = app
            .clone()
            .oneshot(post_json(
                "/v1/coach/approve",
                Some(user),
                serde_json::json!({"user_profile": {"weight": 81.5}}),
            ))
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Plan approved and saved");
        assert!(body["plan_id"].is_string());

        let commits = sink.commits();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].1.current_weight, Some(81.5));

        let response = app
            .oneshot(post_json("/v1/coach/approve", Some(user), serde_json::json!({})))
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn approve_without_plan_is_conflict() {
        let (state, _) = test_state(vec![]);
        let response = app(state)
            .oneshot(post_json(
                "/v1/coach/approve",
                Some(Uuid::now_v7()),
                serde_json::json!({}),
            ))
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            body_json(response).await["error"],
            "no_plan_awaiting_approval"
        );
    }

    #[tokio::test]
    async fn reset_returns_no_content() {
        let (state, _) = test_state(vec![]);
        let response = app(state)
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/v1/coach/conversation")
                    .header("x-user-id", Uuid::now_v7().to_string())
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
