use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use stride_core::coach::Coach;
use stride_core::store::{ConversationStore, EvictionPolicy};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod auth;
mod config;
mod error;
mod extract;
mod llm;
mod middleware;
mod plan_store;
mod routes;
mod state;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stride Coach API",
        version = "0.1.0",
        description = "Conversational workout-plan coach: chat to gather goals, review the generated plan, approve it."
    ),
    paths(
        routes::health::health_check,
        routes::coach::chat,
        routes::coach::approve_plan,
        routes::coach::get_conversation_state,
        routes::coach::reset_conversation,
        routes::plans::get_active_plan,
    ),
    components(schemas(
        routes::health::HealthResponse,
        routes::health::ConversationHealth,
        routes::coach::ChatRequest,
        routes::coach::ChatResponse,
        routes::coach::ApproveRequest,
        routes::coach::ApproveResponse,
        routes::coach::ConversationStateResponse,
        stride_core::error::ApiError,
        stride_core::coach::ActivePlan,
        stride_core::conversation::ConversationState,
        stride_core::conversation::Phase,
        stride_core::conversation::Goal,
        stride_core::conversation::GatheredInfo,
        stride_core::conversation::UserProfile,
        stride_core::conversation::ChatTurn,
        stride_core::conversation::Role,
        stride_core::plan::PendingPlan,
        stride_core::plan::CandidatePlan,
        stride_core::plan::Exercise,
        stride_core::plan::Category,
        stride_core::plan::Weekday,
        stride_core::plan::PlanRecord,
        stride_core::plan::ExerciseRecord,
    )),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "user_id_header",
            utoipa::openapi::security::SecurityScheme::ApiKey(
                utoipa::openapi::security::ApiKey::Header(
                    utoipa::openapi::security::ApiKeyValue::new(auth::USER_ID_HEADER),
                ),
            ),
        );
    }
}

fn build_router(app_state: state::AppState, require_https: bool) -> Router {
    let cors_layer = middleware::cors::build_cors_layer();

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::coach::chat_router().layer(middleware::rate_limit::chat_layer()))
        .merge(routes::coach::approve_router().layer(middleware::rate_limit::approve_layer()))
        .merge(routes::coach::conversation_router().layer(middleware::rate_limit::read_layer()))
        .merge(routes::plans::router().layer(middleware::rate_limit::read_layer()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .option_layer(require_https.then(|| {
                    axum::middleware::from_fn(middleware::https::require_https)
                }))
                .layer(cors_layer),
        )
        .with_state(app_state)
}

/// Periodically drop idle conversations when a TTL is configured.
fn spawn_conversation_sweeper(coach: Arc<Coach>, ttl: Duration) {
    let period = (ttl / 2).max(Duration::from_secs(30));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let dropped = coach.store().sweep();
            if dropped > 0 {
                tracing::info!(dropped, "swept idle conversations");
            }
        }
    });
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stride_api=debug,stride_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = config::Config::from_env().expect("invalid configuration");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let provider = llm::provider_from_config(&config.llm).expect("Failed to build LLM client");
    let sink = Arc::new(plan_store::PgPlanStore::new(pool.clone()));
    let coach = Arc::new(Coach::new(
        ConversationStore::new(config.eviction),
        provider,
        sink,
    ));

    if let EvictionPolicy::Ttl(ttl) = config.eviction {
        spawn_conversation_sweeper(coach.clone(), ttl);
    }
    tracing::info!(
        eviction = ?config.eviction,
        model = %config.llm.model,
        llm_configured = config.llm.api_key.is_some(),
        "coach ready"
    );

    let app_state = state::AppState {
        db: pool,
        coach,
        turn_locks: state::TurnLocks::default(),
    };
    let app = build_router(app_state, config.require_https);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Stride API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server error");
}
