use crate::algorithms::CandidateGenerator;
use crate::models::*;
use crate::services::store::ContentStore;
use crate::utils::jaccard;
use anyhow::Result;
use chrono::{Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

// Co-users considered before similarity scoring; keeps the neighborhood
// computation bounded on hot items.
const MAX_CO_USERS: usize = 50;

/// Surfaces items that behaviorally similar users engaged with positively and
/// the requesting user has not seen. Similarity is Jaccard over the two users'
/// positively-interacted item sets.
pub struct CollaborativeGenerator {
    store: Arc<dyn ContentStore>,
    window_days: i64,
    min_similarity: f64,
    neighborhood_size: usize,
}

impl CollaborativeGenerator {
    pub fn new(
        store: Arc<dyn ContentStore>,
        window_days: i64,
        min_similarity: f64,
        neighborhood_size: usize,
    ) -> Self {
        Self {
            store,
            window_days,
            min_similarity,
            neighborhood_size,
        }
    }

    fn positive_items(events: &[InteractionEvent]) -> HashSet<Uuid> {
        events
            .iter()
            .filter(|e| e.event_type.is_positive())
            .map(|e| e.item_id)
            .collect()
    }
}

#[async_trait::async_trait]
impl CandidateGenerator for CollaborativeGenerator {
    fn kind(&self) -> GeneratorKind {
        GeneratorKind::CollaborativeFiltering
    }

    async fn generate(
        &self,
        user_id: Option<Uuid>,
        _interests: &[UserInterest],
        _behavior: Option<&UserBehaviorSummary>,
        limit: usize,
    ) -> Result<Vec<Candidate>> {
        let Some(user_id) = user_id else {
            return Ok(Vec::new());
        };

        let since = Utc::now() - Duration::days(self.window_days);
        let own_events = self.store.events_for_user(user_id, Some(since)).await?;
        let seed: HashSet<Uuid> = Self::positive_items(&own_events);
        if seed.is_empty() {
            return Ok(Vec::new());
        }

        let seed_ids: Vec<Uuid> = seed.iter().copied().collect();
        let co_events = self.store.events_for_items(&seed_ids, Some(since)).await?;

        let mut overlap_counts: HashMap<Uuid, u64> = HashMap::new();
        for event in co_events
            .iter()
            .filter(|e| e.user_id != user_id && e.event_type.is_positive())
        {
            *overlap_counts.entry(event.user_id).or_insert(0) += 1;
        }
        if overlap_counts.is_empty() {
            return Ok(Vec::new());
        }

        let mut co_users: Vec<(Uuid, u64)> = overlap_counts.into_iter().collect();
        co_users.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        co_users.truncate(MAX_CO_USERS);

        let mut neighborhood: Vec<(Uuid, f64, Vec<InteractionEvent>)> = Vec::new();
        for (other_id, _) in co_users {
            let other_events = self.store.events_for_user(other_id, Some(since)).await?;
            let other_items = Self::positive_items(&other_events);
            let similarity = jaccard(&seed, &other_items);
            if similarity >= self.min_similarity {
                neighborhood.push((other_id, similarity, other_events));
            }
        }
        if neighborhood.is_empty() {
            return Ok(Vec::new());
        }

        neighborhood.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        neighborhood.truncate(self.neighborhood_size);

        let mut item_scores: HashMap<Uuid, f64> = HashMap::new();
        let mut item_supporters: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
        let mut item_interactions: HashMap<Uuid, u64> = HashMap::new();
        for (other_id, similarity, events) in &neighborhood {
            for event in events.iter().filter(|e| e.event_type.is_positive()) {
                if seed.contains(&event.item_id) {
                    continue;
                }
                *item_scores.entry(event.item_id).or_insert(0.0) +=
                    similarity * event.event_type.weight();
                item_supporters
                    .entry(event.item_id)
                    .or_default()
                    .insert(*other_id);
                *item_interactions.entry(event.item_id).or_insert(0) += 1;
            }
        }

        let max_score = item_scores.values().cloned().fold(0.0_f64, f64::max);
        if max_score <= 0.0 {
            return Ok(Vec::new());
        }

        let mut candidates: Vec<Candidate> = Vec::new();
        for (item_id, raw_score) in &item_scores {
            let Some(item) = self.store.get_item(*item_id).await? else {
                continue;
            };
            let similar_user_count = item_supporters
                .get(item_id)
                .map(|s| s.len())
                .unwrap_or(0);
            let common_interactions = item_interactions.get(item_id).copied().unwrap_or(0);

            let factors = vec![
                format!("{} similar readers engaged with this", similar_user_count),
                format!("{} shared interactions", common_interactions),
            ];

            candidates.push(
                Candidate::new(
                    item,
                    raw_score / max_score,
                    GeneratorKind::CollaborativeFiltering,
                    ReasonData::Collaborative {
                        similar_user_count,
                        common_interactions,
                    },
                )
                .with_factors(factors),
            );
        }

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
