pub mod algorithms;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::EngineError;
pub use models::*;

use anyhow::Result;
use services::behavior::BehaviorAnalyzer;
use services::cache::ResultCache;
use services::engine::RecommendationEngine;
use services::events::{EventSink, TracingEventSink};
use services::feedback::FeedbackRecorder;
use services::store::{InMemoryContentStore, InMemoryRecommendationStore};
use services::{AccessGate, AllowAll};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub content_store: Arc<InMemoryContentStore>,
    pub recommendation_store: Arc<InMemoryRecommendationStore>,
    pub behavior: Arc<BehaviorAnalyzer>,
    pub cache: Arc<ResultCache>,
    pub engine: Arc<RecommendationEngine>,
    pub feedback: Arc<FeedbackRecorder>,
    pub gate: Arc<dyn AccessGate>,
    pub events: Arc<dyn EventSink>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);

        let content_store = Arc::new(InMemoryContentStore::new());
        let recommendation_store = Arc::new(InMemoryRecommendationStore::new());
        let events: Arc<dyn EventSink> = Arc::new(TracingEventSink);

        let behavior = Arc::new(BehaviorAnalyzer::new(
            content_store.clone(),
            config.behavior.clone(),
        ));

        let cache = match redis::Client::open(config.redis.url.as_str()) {
            Ok(client) => Arc::new(ResultCache::with_redis(client, config.redis.ttl_seconds)),
            Err(e) => {
                warn!("Redis client unavailable, caching in memory only: {}", e);
                Arc::new(ResultCache::in_memory(config.redis.ttl_seconds))
            }
        };

        let engine = Arc::new(RecommendationEngine::new(
            content_store.clone(),
            recommendation_store.clone(),
            behavior.clone(),
            cache.clone(),
            events.clone(),
            config.clone(),
        ));

        let feedback = Arc::new(FeedbackRecorder::new(
            content_store.clone(),
            recommendation_store.clone(),
            behavior.clone(),
            events.clone(),
        ));

        Ok(Self {
            config,
            content_store,
            recommendation_store,
            behavior,
            cache,
            engine,
            feedback,
            gate: Arc::new(AllowAll),
            events,
        })
    }
}

pub async fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
