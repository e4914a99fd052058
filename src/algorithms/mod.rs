pub mod blending;
pub mod collaborative;
pub mod content_similarity;
pub mod trending;

use crate::models::*;
use anyhow::Result;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

pub use collaborative::CollaborativeGenerator;
pub use content_similarity::ContentSimilarityGenerator;
pub use trending::TrendingGenerator;

/// Shared contract for candidate generation strategies. Generators are
/// side-effect-free reads: they return at most `limit` candidates sorted by
/// their own internal score, which is not yet the blended ranking score.
#[async_trait::async_trait]
pub trait CandidateGenerator: Send + Sync {
    fn kind(&self) -> GeneratorKind;

    async fn generate(
        &self,
        user_id: Option<Uuid>,
        interests: &[UserInterest],
        behavior: Option<&UserBehaviorSummary>,
        limit: usize,
    ) -> Result<Vec<Candidate>>;
}

/// Runs the configured generators concurrently. One slow or failing strategy
/// contributes an empty list and is logged as a partial failure; it never
/// aborts the request.
pub struct GeneratorSet {
    generators: Vec<Arc<dyn CandidateGenerator>>,
    timeout: Duration,
}

impl GeneratorSet {
    pub fn new(generators: Vec<Arc<dyn CandidateGenerator>>, timeout_ms: u64) -> Self {
        Self {
            generators,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    pub async fn run(
        &self,
        kinds: &[GeneratorKind],
        user_id: Option<Uuid>,
        interests: &[UserInterest],
        behavior: Option<&UserBehaviorSummary>,
        limits: &HashMap<GeneratorKind, usize>,
    ) -> Vec<Candidate> {
        let tasks = self
            .generators
            .iter()
            .filter(|g| kinds.contains(&g.kind()))
            .map(|generator| {
                let limit = limits.get(&generator.kind()).copied().unwrap_or(0);
                async move {
                    if limit == 0 {
                        return Vec::new();
                    }
                    match tokio::time::timeout(
                        self.timeout,
                        generator.generate(user_id, interests, behavior, limit),
                    )
                    .await
                    {
                        Ok(Ok(candidates)) => candidates,
                        Ok(Err(e)) => {
                            warn!(
                                generator = generator.kind().as_str(),
                                "Candidate generator failed, using empty contribution: {}", e
                            );
                            Vec::new()
                        }
                        Err(_) => {
                            warn!(
                                generator = generator.kind().as_str(),
                                "Candidate generator timed out after {:?}", self.timeout
                            );
                            Vec::new()
                        }
                    }
                }
            });

        join_all(tasks).await.into_iter().flatten().collect()
    }
}
