use crate::models::*;
use crate::utils::metrics::OutcomeCounters;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct TrendingEntry {
    pub item: ContentItem,
    pub window_views: u64,
    pub window_interactions: u64,
}

/// Read-only view of the content catalog and the prior-interaction log.
/// The engine never owns this data; production deployments back it with the
/// relational store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn get_item(&self, item_id: Uuid) -> Result<Option<ContentItem>>;
    async fn published_items(&self, limit: usize) -> Result<Vec<ContentItem>>;
    async fn popular_items(&self, limit: usize) -> Result<Vec<ContentItem>>;
    async fn trending_window(
        &self,
        sections: Option<&[String]>,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<TrendingEntry>>;
    async fn events_for_user(
        &self,
        user_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<InteractionEvent>>;
    async fn events_for_items(
        &self,
        item_ids: &[Uuid],
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<InteractionEvent>>;
    async fn viewed_item_ids(&self, user_id: Uuid) -> Result<HashSet<Uuid>>;
    async fn record_event(&self, event: InteractionEvent) -> Result<()>;
}

/// Persisted recommendation batches, the append-only feedback log and the
/// per-generator outcome tallies derived from it.
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    async fn save_batch(&self, recommendations: &[Recommendation]) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Recommendation>>;
    async fn append_feedback(&self, feedback: Feedback) -> Result<()>;
    async fn record_outcome(&self, kind: GeneratorKind, action: FeedbackAction) -> Result<()>;
    async fn generator_trust(&self, kind: GeneratorKind) -> Result<f64>;
    async fn stats(&self) -> Result<RecommendationStats>;
}

pub struct InMemoryContentStore {
    items: Arc<RwLock<HashMap<Uuid, ContentItem>>>,
    events: Arc<RwLock<Vec<InteractionEvent>>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(HashMap::new())),
            events: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn insert_item(&self, item: ContentItem) {
        let mut items = self.items.write().await;
        items.insert(item.id, item);
    }

    pub async fn batch_insert_items(&self, batch: Vec<ContentItem>) {
        let count = batch.len();
        {
            let mut items = self.items.write().await;
            for item in batch {
                items.insert(item.id, item);
            }
        }
        info!("Batch inserted {} content items", count);
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn get_item(&self, item_id: Uuid) -> Result<Option<ContentItem>> {
        let items = self.items.read().await;
        Ok(items.get(&item_id).cloned())
    }

    async fn published_items(&self, limit: usize) -> Result<Vec<ContentItem>> {
        let items = self.items.read().await;
        let mut published: Vec<ContentItem> = items
            .values()
            .filter(|item| item.published_at <= Utc::now())
            .cloned()
            .collect();
        published.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        published.truncate(limit);
        Ok(published)
    }

    async fn popular_items(&self, limit: usize) -> Result<Vec<ContentItem>> {
        let items = self.items.read().await;
        let mut popular: Vec<ContentItem> = items
            .values()
            .filter(|item| item.published_at <= Utc::now())
            .cloned()
            .collect();
        popular.sort_by(|a, b| {
            (b.view_count, b.like_count, b.published_at).cmp(&(
                a.view_count,
                a.like_count,
                a.published_at,
            ))
        });
        popular.truncate(limit);
        Ok(popular)
    }

    async fn trending_window(
        &self,
        sections: Option<&[String]>,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<TrendingEntry>> {
        let mut views: HashMap<Uuid, u64> = HashMap::new();
        let mut interactions: HashMap<Uuid, u64> = HashMap::new();
        {
            let events = self.events.read().await;
            for event in events.iter().filter(|e| e.created_at >= since) {
                if event.event_type == EventType::PageView {
                    *views.entry(event.item_id).or_insert(0) += 1;
                } else {
                    *interactions.entry(event.item_id).or_insert(0) += 1;
                }
            }
        }

        let items = self.items.read().await;
        let mut entries: Vec<TrendingEntry> = items
            .values()
            .filter(|item| item.published_at <= Utc::now())
            .filter(|item| match sections {
                Some(allowed) => allowed.iter().any(|s| s == &item.section),
                None => true,
            })
            .map(|item| TrendingEntry {
                window_views: views.get(&item.id).copied().unwrap_or(0),
                window_interactions: interactions.get(&item.id).copied().unwrap_or(0),
                item: item.clone(),
            })
            .filter(|entry| entry.window_views + entry.window_interactions > 0)
            .collect();

        entries.sort_by(|a, b| {
            let va = a.window_views + 2 * a.window_interactions;
            let vb = b.window_views + 2 * b.window_interactions;
            vb.cmp(&va).then(b.item.published_at.cmp(&a.item.published_at))
        });
        entries.truncate(limit);
        Ok(entries)
    }

    async fn events_for_user(
        &self,
        user_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<InteractionEvent>> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| e.user_id == user_id)
            .filter(|e| since.map(|s| e.created_at >= s).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn events_for_items(
        &self,
        item_ids: &[Uuid],
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<InteractionEvent>> {
        let wanted: HashSet<&Uuid> = item_ids.iter().collect();
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| wanted.contains(&e.item_id))
            .filter(|e| since.map(|s| e.created_at >= s).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn viewed_item_ids(&self, user_id: Uuid) -> Result<HashSet<Uuid>> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| e.user_id == user_id)
            .filter(|e| matches!(e.event_type, EventType::PageView | EventType::Read))
            .map(|e| e.item_id)
            .collect())
    }

    async fn record_event(&self, event: InteractionEvent) -> Result<()> {
        {
            let mut items = self.items.write().await;
            if let Some(item) = items.get_mut(&event.item_id) {
                match event.event_type {
                    EventType::PageView => item.view_count += 1,
                    EventType::Like => item.like_count += 1,
                    _ => {}
                }
            }
        }

        let mut events = self.events.write().await;
        events.push(event);
        Ok(())
    }
}

pub struct InMemoryRecommendationStore {
    recommendations: DashMap<Uuid, Recommendation>,
    feedback: Arc<RwLock<Vec<Feedback>>>,
    outcomes: DashMap<GeneratorKind, OutcomeCounters>,
}

impl InMemoryRecommendationStore {
    pub fn new() -> Self {
        Self {
            recommendations: DashMap::new(),
            feedback: Arc::new(RwLock::new(Vec::new())),
            outcomes: DashMap::new(),
        }
    }
}

impl Default for InMemoryRecommendationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecommendationStore for InMemoryRecommendationStore {
    async fn save_batch(&self, recommendations: &[Recommendation]) -> Result<()> {
        for rec in recommendations {
            self.recommendations.insert(rec.id, rec.clone());
            self.outcomes
                .entry(rec.reason_type)
                .or_default()
                .record_shown();
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Recommendation>> {
        Ok(self.recommendations.get(&id).map(|r| r.clone()))
    }

    async fn append_feedback(&self, feedback: Feedback) -> Result<()> {
        let mut log = self.feedback.write().await;
        log.push(feedback);
        Ok(())
    }

    async fn record_outcome(&self, kind: GeneratorKind, action: FeedbackAction) -> Result<()> {
        self.outcomes.entry(kind).or_default().record_action(action);
        Ok(())
    }

    async fn generator_trust(&self, kind: GeneratorKind) -> Result<f64> {
        Ok(self
            .outcomes
            .get(&kind)
            .map(|c| c.trust())
            .unwrap_or(0.5))
    }

    async fn stats(&self) -> Result<RecommendationStats> {
        let total_recommendations = self.recommendations.len() as u64;
        let total_feedback = self.feedback.read().await.len() as u64;

        let mut score_sum = 0.0;
        let mut reason_breakdown: HashMap<String, u64> = HashMap::new();
        for entry in self.recommendations.iter() {
            score_sum += entry.score;
            *reason_breakdown
                .entry(entry.reason_type.as_str().to_string())
                .or_insert(0) += 1;
        }
        let average_score = if total_recommendations > 0 {
            score_sum / total_recommendations as f64
        } else {
            0.0
        };

        let mut generator_performance: Vec<GeneratorPerformance> = self
            .outcomes
            .iter()
            .map(|entry| entry.value().performance(*entry.key()))
            .collect();
        generator_performance.sort_by_key(|p| p.generator.rank());

        Ok(RecommendationStats {
            total_recommendations,
            total_feedback,
            average_score,
            reason_breakdown,
            generator_performance,
            generated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn item(section: &str) -> ContentItem {
        ContentItem::new(Uuid::new_v4(), "title", section)
    }

    #[tokio::test]
    async fn test_insert_and_get_item() {
        let store = InMemoryContentStore::new();
        let article = item("sports");
        let id = article.id;
        store.insert_item(article).await;

        let found = store.get_item(id).await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().section, "sports");
        assert!(store.get_item(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_popular_ordering() {
        let store = InMemoryContentStore::new();
        let low = item("sports").with_counts(10, 1);
        let high = item("sports").with_counts(500, 40);
        let high_id = high.id;
        store.batch_insert_items(vec![low, high]).await;

        let popular = store.popular_items(10).await.unwrap();
        assert_eq!(popular[0].id, high_id);
    }

    #[tokio::test]
    async fn test_trending_window_scopes_by_section_and_time() {
        let store = InMemoryContentStore::new();
        let sports = item("sports");
        let economy = item("economy");
        let sports_id = sports.id;
        let economy_id = economy.id;
        store.batch_insert_items(vec![sports, economy]).await;

        let user = Uuid::new_v4();
        for _ in 0..3 {
            store
                .record_event(InteractionEvent::new(user, sports_id, EventType::PageView))
                .await
                .unwrap();
        }
        store
            .record_event(
                InteractionEvent::new(user, economy_id, EventType::PageView)
                    .at(Utc::now() - Duration::days(30)),
            )
            .await
            .unwrap();

        let since = Utc::now() - Duration::days(7);
        let entries = store.trending_window(None, since, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].item.id, sports_id);
        assert_eq!(entries[0].window_views, 3);

        let scoped = store
            .trending_window(Some(&["economy".to_string()]), since, 10)
            .await
            .unwrap();
        assert!(scoped.is_empty());
    }

    #[tokio::test]
    async fn test_viewed_item_ids() {
        let store = InMemoryContentStore::new();
        let user = Uuid::new_v4();
        let seen = Uuid::new_v4();
        let liked_only = Uuid::new_v4();

        store
            .record_event(InteractionEvent::new(user, seen, EventType::Read))
            .await
            .unwrap();
        store
            .record_event(InteractionEvent::new(user, liked_only, EventType::Like))
            .await
            .unwrap();

        let viewed = store.viewed_item_ids(user).await.unwrap();
        assert!(viewed.contains(&seen));
        assert!(!viewed.contains(&liked_only));
    }

    #[tokio::test]
    async fn test_recommendation_store_roundtrip() {
        let store = InMemoryRecommendationStore::new();
        let rec = Recommendation {
            id: Uuid::new_v4(),
            user_id: Some(Uuid::new_v4()),
            item_id: Uuid::new_v4(),
            item_type: ItemType::Article,
            score: 0.7,
            confidence: 0.6,
            reason_type: GeneratorKind::ContentSimilarity,
            reason_data: vec![],
            created_at: Utc::now(),
        };
        store.save_batch(std::slice::from_ref(&rec)).await.unwrap();

        let found = store.get(rec.id).await.unwrap().unwrap();
        assert_eq!(found.item_id, rec.item_id);

        store
            .record_outcome(GeneratorKind::ContentSimilarity, FeedbackAction::Like)
            .await
            .unwrap();
        let trust = store
            .generator_trust(GeneratorKind::ContentSimilarity)
            .await
            .unwrap();
        assert!(trust > 0.5);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_recommendations, 1);
        assert_eq!(stats.reason_breakdown["content_similarity"], 1);
    }
}
