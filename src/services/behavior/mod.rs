use crate::config::BehaviorConfig;
use crate::models::*;
use crate::services::store::ContentStore;
use crate::utils::{clamp_unit, day_part};
use anyhow::Result;
use chrono::{Duration, Timelike, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct InterestAnalysis {
    pub category_weights: HashMap<String, f64>,
    pub keyword_weights: HashMap<String, f64>,
    pub data_points: usize,
    pub overall_engagement: f64,
}

/// Builds behavior summaries and derived interest weights from the
/// interaction log. Interest sets are derived state: each refresh replaces
/// the previous set atomically instead of appending to it.
pub struct BehaviorAnalyzer {
    store: Arc<dyn ContentStore>,
    interests: DashMap<Uuid, Vec<UserInterest>>,
    config: BehaviorConfig,
}

impl BehaviorAnalyzer {
    pub fn new(store: Arc<dyn ContentStore>, config: BehaviorConfig) -> Self {
        Self {
            store,
            interests: DashMap::new(),
            config,
        }
    }

    /// Returns `None` when the user has too little history to profile.
    /// Callers treat that as a valid state and fall back to the default
    /// recommendation path, not as an error.
    pub async fn build_summary(
        &self,
        user_id: Uuid,
        window_days: i64,
    ) -> Result<Option<UserBehaviorSummary>> {
        let since = Utc::now() - Duration::days(window_days);
        let events = self.store.events_for_user(user_id, Some(since)).await?;

        if (events.len() as u64) < self.config.min_interactions {
            return Ok(None);
        }

        let mut counts_by_event: HashMap<String, u64> = HashMap::new();
        let mut hour_histogram: HashMap<u32, u64> = HashMap::new();
        let mut durations: Vec<f64> = Vec::new();
        let mut category_weights: HashMap<String, f64> = HashMap::new();
        let mut reading_times: Vec<u32> = Vec::new();

        for event in &events {
            *counts_by_event
                .entry(event.event_type.as_str().to_string())
                .or_insert(0) += 1;
            *hour_histogram.entry(event.created_at.hour()).or_insert(0) += 1;
            if let Some(secs) = event.session_duration_secs {
                durations.push(secs as f64);
            }

            if let Some(item) = self.store.get_item(event.item_id).await? {
                *category_weights.entry(item.section.clone()).or_insert(0.0) +=
                    event.event_type.weight();
                if event.event_type.is_positive() {
                    reading_times.push(item.reading_time);
                }
            }
        }

        let avg_session_duration = if durations.is_empty() {
            0.0
        } else {
            durations.iter().sum::<f64>() / durations.len() as f64
        };

        let mut ranked_categories: Vec<(String, f64)> = category_weights.into_iter().collect();
        ranked_categories.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        let preferred_categories: Vec<String> = ranked_categories
            .into_iter()
            .take(5)
            .map(|(section, _)| section)
            .collect();

        let activity_pattern = hour_histogram
            .into_iter()
            .max_by_key(|(hour, count)| (*count, u64::from(24 - *hour)))
            .map(|(hour, _)| day_part(hour));

        let preferred_reading_time = if reading_times.is_empty() {
            None
        } else {
            let min = *reading_times.iter().min().unwrap();
            let max = *reading_times.iter().max().unwrap();
            Some((min, max))
        };

        Ok(Some(UserBehaviorSummary {
            user_id,
            total_interactions: events.len() as u64,
            counts_by_event,
            avg_session_duration,
            preferred_categories,
            activity_pattern,
            preferred_reading_time,
            window_days: window_days as u32,
        }))
    }

    pub async fn analyze_interests(&self, user_id: Uuid) -> Result<InterestAnalysis> {
        let since = Utc::now() - Duration::days(self.config.analysis_window_days);
        let events = self.store.events_for_user(user_id, Some(since)).await?;

        let mut category_weights: HashMap<String, f64> = HashMap::new();
        let mut keyword_weights: HashMap<String, f64> = HashMap::new();
        let mut weight_sum = 0.0;

        for event in &events {
            let weight = event.event_type.weight();
            weight_sum += weight;
            if let Some(item) = self.store.get_item(event.item_id).await? {
                *category_weights.entry(item.section.clone()).or_insert(0.0) += weight;
                for tag in &item.tags {
                    *keyword_weights.entry(tag.clone()).or_insert(0.0) += weight;
                }
            }
        }

        normalize_weights(&mut category_weights);
        normalize_weights(&mut keyword_weights);

        let overall_engagement = if events.is_empty() {
            0.0
        } else {
            (weight_sum / events.len() as f64).min(1.0)
        };

        Ok(InterestAnalysis {
            category_weights,
            keyword_weights,
            data_points: events.len(),
            overall_engagement,
        })
    }

    /// Atomically replaces the stored interest set with the analysis result,
    /// keeping only weights above the persistence threshold.
    pub fn replace_interests(&self, user_id: Uuid, analysis: &InterestAnalysis) -> Vec<UserInterest> {
        let threshold = self.config.interest_threshold;
        let mut interests: Vec<UserInterest> = Vec::new();

        for (category, weight) in &analysis.category_weights {
            if *weight > threshold {
                interests.push(UserInterest::new(
                    user_id,
                    InterestKind::Category,
                    category.clone(),
                    *weight,
                ));
            }
        }
        for (keyword, weight) in &analysis.keyword_weights {
            if *weight > threshold {
                interests.push(UserInterest::new(
                    user_id,
                    InterestKind::Keyword,
                    keyword.clone(),
                    *weight,
                ));
            }
        }

        interests.sort_by(|a, b| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.value.cmp(&b.value))
        });
        self.interests.insert(user_id, interests.clone());
        info!("Replaced interest profile for {}: {} entries", user_id, interests.len());
        interests
    }

    pub async fn refresh_interests(&self, user_id: Uuid) -> Result<Vec<UserInterest>> {
        let analysis = self.analyze_interests(user_id).await?;
        Ok(self.replace_interests(user_id, &analysis))
    }

    pub fn interests(&self, user_id: Uuid) -> Vec<UserInterest> {
        self.interests
            .get(&user_id)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    pub fn set_interests(&self, user_id: Uuid, interests: Vec<UserInterest>) {
        self.interests.insert(user_id, interests);
    }

    /// Monotone, bounded weight adjustment from recommendation feedback:
    /// positive actions pull the item's section/tags up, negative actions pull
    /// them down, always staying within [0, 1].
    pub fn apply_feedback(&self, user_id: Uuid, item: &ContentItem, action: FeedbackAction) {
        let delta = action.weight_delta();
        let mut entry = self.interests.entry(user_id).or_default();

        adjust_interest(&mut entry, user_id, InterestKind::Category, &item.section, delta);
        for tag in &item.tags {
            adjust_interest(&mut entry, user_id, InterestKind::Keyword, tag, delta);
        }
    }

    /// Lightweight nudge applied when an interaction event is ingested, so
    /// profiles drift toward recent activity between full refreshes.
    pub async fn apply_event(&self, event: &InteractionEvent) -> Result<()> {
        if let Some(item) = self.store.get_item(event.item_id).await? {
            let delta = event.event_type.weight() * 0.05;
            let mut entry = self.interests.entry(event.user_id).or_default();
            adjust_interest(&mut entry, event.user_id, InterestKind::Category, &item.section, delta);
            for tag in &item.tags {
                adjust_interest(&mut entry, event.user_id, InterestKind::Keyword, tag, delta);
            }
        }
        Ok(())
    }
}

fn normalize_weights(weights: &mut HashMap<String, f64>) {
    let max = weights.values().cloned().fold(0.0_f64, f64::max);
    if max > 0.0 {
        for weight in weights.values_mut() {
            *weight /= max;
        }
    }
}

fn adjust_interest(
    interests: &mut Vec<UserInterest>,
    user_id: Uuid,
    kind: InterestKind,
    value: &str,
    delta: f64,
) {
    if let Some(interest) = interests
        .iter_mut()
        .find(|i| i.kind == kind && i.value == value)
    {
        interest.weight = clamp_unit(interest.weight + delta);
    } else if delta > 0.0 {
        interests.push(UserInterest::new(user_id, kind, value, clamp_unit(delta)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::InMemoryContentStore;

    fn analyzer(store: Arc<InMemoryContentStore>) -> BehaviorAnalyzer {
        BehaviorAnalyzer::new(store, crate::config::Config::default().behavior)
    }

    async fn seed_events(
        store: &InMemoryContentStore,
        user: Uuid,
        item: Uuid,
        count: usize,
        event_type: EventType,
    ) {
        for _ in 0..count {
            store
                .record_event(InteractionEvent::new(user, item, event_type))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_summary_sentinel_under_min_interactions() {
        let store = Arc::new(InMemoryContentStore::new());
        let analyzer = analyzer(store.clone());
        let user = Uuid::new_v4();
        let item = ContentItem::new(Uuid::new_v4(), "title", "sports");
        let item_id = item.id;
        store.insert_item(item).await;

        seed_events(&store, user, item_id, 2, EventType::Read).await;
        let summary = analyzer.build_summary(user, 30).await.unwrap();
        assert!(summary.is_none());

        seed_events(&store, user, item_id, 1, EventType::Like).await;
        let summary = analyzer.build_summary(user, 30).await.unwrap().unwrap();
        assert_eq!(summary.total_interactions, 3);
        assert_eq!(summary.preferred_categories, vec!["sports".to_string()]);
        assert_eq!(summary.counts_by_event["read"], 2);
        assert_eq!(summary.counts_by_event["like"], 1);
    }

    #[tokio::test]
    async fn test_interest_analysis_and_replace() {
        let store = Arc::new(InMemoryContentStore::new());
        let analyzer = analyzer(store.clone());
        let user = Uuid::new_v4();

        let sports = ContentItem::new(Uuid::new_v4(), "match report", "sports")
            .with_tags(vec!["football".to_string()]);
        let economy = ContentItem::new(Uuid::new_v4(), "market brief", "economy");
        let sports_id = sports.id;
        let economy_id = economy.id;
        store.batch_insert_items(vec![sports, economy]).await;

        seed_events(&store, user, sports_id, 4, EventType::Like).await;
        seed_events(&store, user, economy_id, 1, EventType::PageView).await;

        let analysis = analyzer.analyze_interests(user).await.unwrap();
        assert_eq!(analysis.data_points, 5);
        assert!((analysis.category_weights["sports"] - 1.0).abs() < 1e-9);
        assert!(analysis.category_weights["economy"] < analysis.category_weights["sports"]);

        let interests = analyzer.replace_interests(user, &analysis);
        assert!(interests
            .iter()
            .any(|i| i.kind == InterestKind::Category && i.value == "sports"));
        assert!(interests
            .iter()
            .any(|i| i.kind == InterestKind::Keyword && i.value == "football"));
        // weights at or below the threshold are not persisted
        assert!(interests.iter().all(|i| i.weight > 0.1));

        // refresh replaces rather than appends
        let again = analyzer.replace_interests(user, &analysis);
        assert_eq!(again.len(), analyzer.interests(user).len());
    }

    #[tokio::test]
    async fn test_feedback_adjustment_bounded_and_monotone() {
        let store = Arc::new(InMemoryContentStore::new());
        let analyzer = analyzer(store.clone());
        let user = Uuid::new_v4();
        let item = ContentItem::new(Uuid::new_v4(), "title", "sports")
            .with_tags(vec!["football".to_string()]);

        analyzer.set_interests(
            user,
            vec![UserInterest::new(user, InterestKind::Category, "sports", 0.8)],
        );

        analyzer.apply_feedback(user, &item, FeedbackAction::Dislike);
        let after_dislike = analyzer.interests(user);
        let sports = after_dislike
            .iter()
            .find(|i| i.value == "sports")
            .unwrap()
            .weight;
        assert!(sports < 0.8);

        for _ in 0..50 {
            analyzer.apply_feedback(user, &item, FeedbackAction::Like);
        }
        let capped = analyzer.interests(user);
        assert!(capped.iter().all(|i| i.weight <= 1.0));

        for _ in 0..100 {
            analyzer.apply_feedback(user, &item, FeedbackAction::Report);
        }
        let floored = analyzer.interests(user);
        assert!(floored.iter().all(|i| i.weight >= 0.0));
    }
}
