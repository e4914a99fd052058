use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use clap::Parser;
use rankor::services::events::{AuditEvent, EventSink};
use rankor::services::store::ContentStore;
use rankor::services::AccessGate;
use rankor::utils::validation::{self, RawFeedbackBody, RawRecommendationParams};
use rankor::{init_tracing, AppState, Config, EngineError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    message: String,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
        }
    }
}

async fn health_check() -> Json<ApiResponse<HashMap<String, String>>> {
    let mut status = HashMap::new();
    status.insert("status".to_string(), "healthy".to_string());
    status.insert("service".to_string(), "rankor-recommendations".to_string());
    status.insert("version".to_string(), env!("CARGO_PKG_VERSION").to_string());

    Json(ApiResponse::success(status))
}

async fn get_recommendations(
    State(state): State<AppState>,
    Query(params): Query<RawRecommendationParams>,
) -> Result<Json<ApiResponse<rankor::RecommendationBatch>>, EngineError> {
    let client_key = params
        .user_id
        .clone()
        .unwrap_or_else(|| "anonymous".to_string());
    state.gate.check(&client_key).await?;

    let query = validation::parse_recommendation_query(params, &state.config.engine)
        .map_err(|errors| EngineError::Validation { errors })?;

    let batch = state.engine.recommend(query).await?;
    Ok(Json(ApiResponse::success(batch)))
}

async fn post_feedback(
    State(state): State<AppState>,
    Json(body): Json<RawFeedbackBody>,
) -> Result<Json<ApiResponse<serde_json::Value>>, EngineError> {
    let client_key = body
        .user_id
        .clone()
        .unwrap_or_else(|| "anonymous".to_string());
    state.gate.check(&client_key).await?;

    let feedback =
        validation::parse_feedback(body).map_err(|errors| EngineError::Validation { errors })?;

    state.feedback.record(feedback.clone()).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "recommendation_id": feedback.recommendation_id,
        "action": feedback.action,
        "recorded_at": feedback.created_at,
    }))))
}

async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<rankor::RecommendationStats>>, EngineError> {
    let stats = state.engine.stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}

async fn add_item(
    State(state): State<AppState>,
    Json(item): Json<rankor::ContentItem>,
) -> Result<Json<ApiResponse<String>>, EngineError> {
    state.content_store.insert_item(item).await;
    Ok(Json(ApiResponse::success("Item added successfully".to_string())))
}

async fn record_event(
    State(state): State<AppState>,
    Json(event): Json<rankor::InteractionEvent>,
) -> Result<Json<ApiResponse<String>>, EngineError> {
    state
        .content_store
        .record_event(event.clone())
        .await
        .map_err(|e| EngineError::Persistence(e.to_string()))?;

    // profile drift is best-effort; the append already succeeded
    if let Err(e) = state.behavior.apply_event(&event).await {
        warn!("Interest nudge skipped for event: {}", e);
    }

    state
        .events
        .emit(AuditEvent::new(
            "interaction_recorded",
            Some(event.user_id),
            serde_json::json!({
                "item_id": event.item_id,
                "event_type": event.event_type,
            }),
        ))
        .await;

    Ok(Json(ApiResponse::success("Event recorded successfully".to_string())))
}

async fn refresh_interests(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<rankor::UserInterest>>>, EngineError> {
    let interests = state
        .behavior
        .refresh_interests(user_id)
        .await
        .map_err(|e| EngineError::Internal(e.to_string()))?;
    Ok(Json(ApiResponse::success(interests)))
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/recommendations", get(get_recommendations))
        .route("/recommendations/feedback", post(post_feedback))
        .route("/recommendations/stats", get(get_stats))
        .route("/items", post(add_item))
        .route("/events", post(record_event))
        .route("/users/:user_id/interests", post(refresh_interests))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing().await;

    let config = if std::path::Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, using default configuration");
        Config::default()
    };

    info!("Starting Rankor recommendation server with config: {:?}", config.server);

    let state = AppState::new(config.clone()).await?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.socket_addr()).await?;
    info!("Server listening on {}", config.server.socket_addr());

    axum::serve(listener, app).await?;

    Ok(())
}
