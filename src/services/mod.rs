use crate::error::EngineError;
use async_trait::async_trait;

pub mod behavior;
pub mod cache;
pub mod engine;
pub mod events;
pub mod feedback;
pub mod store;

/// Authorization and rate limiting live outside this crate; the pipeline only
/// consumes a yes/no decision keyed by caller identity.
#[async_trait]
pub trait AccessGate: Send + Sync {
    async fn check(&self, client_key: &str) -> Result<(), EngineError>;
}

pub struct AllowAll;

#[async_trait]
impl AccessGate for AllowAll {
    async fn check(&self, _client_key: &str) -> Result<(), EngineError> {
        Ok(())
    }
}
