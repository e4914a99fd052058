use crate::algorithms::CandidateGenerator;
use crate::models::*;
use crate::services::store::ContentStore;
use anyhow::Result;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Ranks items by recent view/interaction velocity inside the user's interest
/// categories, falling back to global trending when no interests exist.
pub struct TrendingGenerator {
    store: Arc<dyn ContentStore>,
    window_days: i64,
}

impl TrendingGenerator {
    pub fn new(store: Arc<dyn ContentStore>, window_days: i64) -> Self {
        Self { store, window_days }
    }
}

#[async_trait::async_trait]
impl CandidateGenerator for TrendingGenerator {
    fn kind(&self) -> GeneratorKind {
        GeneratorKind::TrendingAnalysis
    }

    async fn generate(
        &self,
        _user_id: Option<Uuid>,
        interests: &[UserInterest],
        _behavior: Option<&UserBehaviorSummary>,
        limit: usize,
    ) -> Result<Vec<Candidate>> {
        let sections: Vec<String> = interests
            .iter()
            .filter(|i| i.kind == InterestKind::Category)
            .map(|i| i.value.clone())
            .collect();

        let since = Utc::now() - Duration::days(self.window_days);
        let mut entries = self
            .store
            .trending_window(
                if sections.is_empty() {
                    None
                } else {
                    Some(&sections)
                },
                since,
                limit.saturating_mul(2),
            )
            .await?;

        // interest-scoped trending may be empty; global trending still applies
        if entries.is_empty() && !sections.is_empty() {
            entries = self
                .store
                .trending_window(None, since, limit.saturating_mul(2))
                .await?;
        }
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let max_velocity = entries
            .iter()
            .map(|e| velocity(e.window_views, e.window_interactions))
            .fold(0.0_f64, f64::max);
        if max_velocity <= 0.0 {
            return Ok(Vec::new());
        }

        let mut candidates: Vec<Candidate> = entries
            .into_iter()
            .map(|entry| {
                let score = velocity(entry.window_views, entry.window_interactions) / max_velocity;
                let factors = vec![
                    format!("{} recent views", entry.window_views),
                    format!("{} recent interactions", entry.window_interactions),
                    format!("trending in {}", entry.item.section),
                ];
                let category = entry.item.section.clone();
                Candidate::new(
                    entry.item,
                    score,
                    GeneratorKind::TrendingAnalysis,
                    ReasonData::Trending {
                        views: entry.window_views,
                        interactions: entry.window_interactions,
                        category,
                    },
                )
                .with_factors(factors)
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.item.id.cmp(&b.item.id))
        });
        candidates.truncate(limit);
        Ok(candidates)
    }
}

fn velocity(views: u64, interactions: u64) -> f64 {
    views as f64 + 2.0 * interactions as f64
}
