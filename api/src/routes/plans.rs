use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use stride_core::coach::ActivePlan;
use stride_core::error::ApiError;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/plans/active", get(get_active_plan))
}

/// Get the user's active plan
///
/// Returns the most recently approved plan with its exercises, or `null` when
/// the user has never approved one.
#[utoipa::path(
    get,
    path = "/v1/plans/active",
    responses(
        (status = 200, description = "Active plan or null", body = Option<ActivePlan>),
        (status = 401, description = "Missing caller identity", body = ApiError)
    ),
    tag = "plans"
)]
pub async fn get_active_plan(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<Option<ActivePlan>>, AppError> {
    let plan = state.coach.active_plan(auth.user_id).await?;
    Ok(Json(plan))
}
