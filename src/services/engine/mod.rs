use crate::algorithms::blending::{self, BlendFactors, PersonalizationProfile};
use crate::algorithms::{
    CandidateGenerator, CollaborativeGenerator, ContentSimilarityGenerator, GeneratorSet,
    TrendingGenerator,
};
use crate::config::Config;
use crate::error::EngineError;
use crate::models::*;
use crate::services::behavior::BehaviorAnalyzer;
use crate::services::cache::ResultCache;
use crate::services::events::{AuditEvent, EventSink};
use crate::services::store::{ContentStore, RecommendationStore};
use crate::utils::metrics::pool_analytics;
use anyhow::Result;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Clone, Copy)]
enum ConfidenceMode {
    DataDriven(f64),
    Fixed(f64),
}

const FALLBACK_CONFIDENCE: f64 = 0.3;

/// The request pipeline: profile → concurrent candidate generation → dedup →
/// blend → filter → sort/page → confidence. Stage order is part of the
/// contract: filters run after blending so diversity and freshness see the
/// full candidate pool.
pub struct RecommendationEngine {
    content: Arc<dyn ContentStore>,
    recommendations: Arc<dyn RecommendationStore>,
    behavior: Arc<BehaviorAnalyzer>,
    cache: Arc<ResultCache>,
    generators: GeneratorSet,
    events: Arc<dyn EventSink>,
    config: Arc<Config>,
}

impl RecommendationEngine {
    pub fn new(
        content: Arc<dyn ContentStore>,
        recommendations: Arc<dyn RecommendationStore>,
        behavior: Arc<BehaviorAnalyzer>,
        cache: Arc<ResultCache>,
        events: Arc<dyn EventSink>,
        config: Arc<Config>,
    ) -> Self {
        let strategies: Vec<Arc<dyn CandidateGenerator>> = vec![
            Arc::new(ContentSimilarityGenerator::new(content.clone())),
            Arc::new(CollaborativeGenerator::new(
                content.clone(),
                config.engine.collaborative_window_days,
                config.engine.min_similarity,
                config.engine.neighborhood_size,
            )),
            Arc::new(TrendingGenerator::new(
                content.clone(),
                config.engine.trending_window_days,
            )),
        ];
        let generators = GeneratorSet::new(strategies, config.engine.generator_timeout_ms);

        Self {
            content,
            recommendations,
            behavior,
            cache,
            generators,
            events,
            config,
        }
    }

    pub async fn recommend(
        &self,
        query: RecommendationQuery,
    ) -> Result<RecommendationBatch, EngineError> {
        let started = Instant::now();
        let key = ResultCache::cache_key(query.user_id, &query);

        if !query.bypass_cache {
            if let Some(mut batch) = self.cache.get(&key).await {
                batch.metadata.cache_hit = true;
                batch.metadata.processing_time_ms = started.elapsed().as_millis() as u64;
                return Ok(batch);
            }
        }

        let budget = Duration::from_millis(self.config.engine.request_timeout_ms);
        let mut batch = match tokio::time::timeout(budget, self.generate(&query)).await {
            Ok(Ok(batch)) => batch,
            Ok(Err(e)) => {
                error!("Recommendation pipeline failed, serving fallback: {}", e);
                self.fallback_batch(&query).await?
            }
            Err(_) => {
                warn!("Recommendation request exceeded {:?}, serving fallback", budget);
                self.fallback_batch(&query).await?
            }
        };

        batch.metadata.processing_time_ms = started.elapsed().as_millis() as u64;

        self.persist_batch(&batch).await;
        self.events
            .emit(AuditEvent::new(
                "recommendations_served",
                query.user_id,
                serde_json::json!({
                    "count": batch.recommendations.len(),
                    "algorithm": batch.metadata.algorithm.as_str(),
                    "processing_time_ms": batch.metadata.processing_time_ms,
                    "cache_hit": false,
                }),
            ))
            .await;

        if !query.bypass_cache {
            self.cache.set(&key, &batch).await;
        }

        info!(
            user_id = ?query.user_id,
            count = batch.recommendations.len(),
            elapsed_ms = batch.metadata.processing_time_ms,
            "Served recommendation batch"
        );
        Ok(batch)
    }

    pub async fn stats(&self) -> Result<RecommendationStats, EngineError> {
        self.recommendations
            .stats()
            .await
            .map_err(|e| EngineError::Internal(e.to_string()))
    }

    async fn generate(&self, query: &RecommendationQuery) -> Result<RecommendationBatch> {
        let Some(user_id) = query.user_id else {
            return self.anonymous_batch(query).await;
        };

        let summary = self
            .behavior
            .build_summary(user_id, self.config.behavior.window_days)
            .await?;
        let Some(summary) = summary else {
            // insufficient behavior data is a valid state, not a fault
            return self.fallback_batch_inner(query).await;
        };

        let mut interests = self.behavior.interests(user_id);
        self.augment_interests(&mut interests, query, user_id).await?;

        let kinds = effective_kinds(query.algorithm, query.rec_type);
        let limits = self.generator_limits(&kinds, query.limit).await;
        let pool = self
            .generators
            .run(&kinds, Some(user_id), &interests, Some(&summary), &limits)
            .await;

        if pool.is_empty() {
            return self.fallback_batch_inner(query).await;
        }

        let deduped = blending::dedup_candidates(pool);
        let profile = PersonalizationProfile::from_parts(&interests, Some(&summary));
        let factors = BlendFactors {
            diversity: query.diversity_factor,
            freshness: query.freshness_factor,
            personality: query.personality_factor,
        };
        let scored = blending::blend_pool(deduped, &factors, Some(&profile), Utc::now());

        let viewed = self.viewed_set(query, Some(user_id)).await?;
        let mut filtered = blending::apply_filters(scored, &query.filters, &viewed);
        blending::sort_ranked(&mut filtered);

        if filtered.is_empty() {
            return self.fallback_batch_inner(query).await;
        }

        let data_score = blending::data_volume_score(summary.total_interactions);
        Ok(self.assemble_batch(
            query,
            filtered,
            ConfidenceMode::DataDriven(data_score),
            Some(summary),
        ))
    }

    /// Anonymous visitors get trending/popular content only; no profile is
    /// built and confidence is pinned low.
    async fn anonymous_batch(&self, query: &RecommendationQuery) -> Result<RecommendationBatch> {
        let interests: Vec<UserInterest> = query
            .context
            .user_interests
            .iter()
            .map(|value| UserInterest::new(Uuid::nil(), InterestKind::Category, value.clone(), 0.8))
            .collect();

        let kinds = vec![GeneratorKind::TrendingAnalysis];
        let limits = self.generator_limits(&kinds, query.limit).await;
        let pool = self
            .generators
            .run(&kinds, None, &interests, None, &limits)
            .await;

        if pool.is_empty() {
            return self.fallback_batch_inner(query).await;
        }

        let deduped = blending::dedup_candidates(pool);
        let factors = BlendFactors {
            diversity: query.diversity_factor,
            freshness: query.freshness_factor,
            personality: query.personality_factor,
        };
        let scored = blending::blend_pool(deduped, &factors, None, Utc::now());

        let viewed = self.viewed_set(query, None).await?;
        let mut filtered = blending::apply_filters(scored, &query.filters, &viewed);
        blending::sort_ranked(&mut filtered);

        if filtered.is_empty() {
            return self.fallback_batch_inner(query).await;
        }

        Ok(self.assemble_batch(
            query,
            filtered,
            ConfidenceMode::Fixed(FALLBACK_CONFIDENCE),
            None,
        ))
    }

    async fn fallback_batch(&self, query: &RecommendationQuery) -> Result<RecommendationBatch, EngineError> {
        self.fallback_batch_inner(query)
            .await
            .map_err(|e| EngineError::Internal(e.to_string()))
    }

    /// Globally popular items at fixed low confidence. Used for cold users,
    /// empty generator pools and as the degradation path on internal errors.
    async fn fallback_batch_inner(&self, query: &RecommendationQuery) -> Result<RecommendationBatch> {
        let wanted = (query.offset + query.limit).saturating_mul(2).max(20);
        let items = self.content.popular_items(wanted).await?;

        let candidates: Vec<Candidate> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let views = item.view_count;
                Candidate::new(
                    item,
                    (0.5 - index as f64 * 0.05).max(0.05),
                    GeneratorKind::Popular,
                    ReasonData::Popular { views },
                )
                .with_factors(vec!["widely read across the site".to_string()])
            })
            .collect();

        let factors = BlendFactors {
            diversity: query.diversity_factor,
            freshness: query.freshness_factor,
            personality: query.personality_factor,
        };
        let scored = blending::blend_pool(candidates, &factors, None, Utc::now());

        let viewed = self.viewed_set(query, query.user_id).await.unwrap_or_default();
        let mut filtered = blending::apply_filters(scored, &query.filters, &viewed);
        blending::sort_ranked(&mut filtered);

        Ok(self.assemble_batch(
            query,
            filtered,
            ConfidenceMode::Fixed(FALLBACK_CONFIDENCE),
            None,
        ))
    }

    /// Context-supplied interests supplement the stored profile for this
    /// request only; related-content requests inject the current item's
    /// section and tags at full weight.
    async fn augment_interests(
        &self,
        interests: &mut Vec<UserInterest>,
        query: &RecommendationQuery,
        user_id: Uuid,
    ) -> Result<()> {
        for value in &query.context.user_interests {
            if !interests.iter().any(|i| &i.value == value) {
                interests.push(UserInterest::new(
                    user_id,
                    InterestKind::Category,
                    value.clone(),
                    0.8,
                ));
            }
        }

        if query.rec_type == RecommendationType::RelatedContent {
            if let Some(current_id) = query.context.current_item_id {
                if let Some(item) = self.content.get_item(current_id).await? {
                    if !interests
                        .iter()
                        .any(|i| i.kind == InterestKind::Category && i.value == item.section)
                    {
                        interests.push(UserInterest::new(
                            user_id,
                            InterestKind::Category,
                            item.section.clone(),
                            1.0,
                        ));
                    }
                    for tag in &item.tags {
                        if !interests
                            .iter()
                            .any(|i| i.kind == InterestKind::Keyword && &i.value == tag)
                        {
                            interests.push(UserInterest::new(
                                user_id,
                                InterestKind::Keyword,
                                tag.clone(),
                                1.0,
                            ));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    async fn viewed_set(
        &self,
        query: &RecommendationQuery,
        user_id: Option<Uuid>,
    ) -> Result<HashSet<Uuid>> {
        let mut viewed: HashSet<Uuid> = HashSet::new();

        if query.filters.exclude_read {
            if let Some(user_id) = user_id {
                viewed.extend(self.content.viewed_item_ids(user_id).await?);
            }
            viewed.extend(query.context.reading_history.iter().copied());
        }

        // the item being read never recommends itself
        if query.rec_type == RecommendationType::RelatedContent {
            if let Some(current_id) = query.context.current_item_id {
                viewed.insert(current_id);
            }
        }

        Ok(viewed)
    }

    /// Each generator's candidate-pool share scales with its trust score;
    /// trust never touches the blend formula itself.
    async fn generator_limits(
        &self,
        kinds: &[GeneratorKind],
        limit: usize,
    ) -> HashMap<GeneratorKind, usize> {
        let base = limit.saturating_mul(self.config.engine.pool_factor);
        let mut limits = HashMap::new();

        for kind in kinds {
            let trust = self
                .recommendations
                .generator_trust(*kind)
                .await
                .unwrap_or(0.5);
            let share = ((base as f64) * (0.5 + trust)).round() as usize;
            limits.insert(*kind, share.max(limit));
        }

        limits
    }

    fn assemble_batch(
        &self,
        query: &RecommendationQuery,
        pool: Vec<ScoredCandidate>,
        confidence: ConfidenceMode,
        user_profile: Option<UserBehaviorSummary>,
    ) -> RecommendationBatch {
        let total = pool.len();
        let offset = query.offset.min(total);
        let end = (offset + query.limit).min(total);
        let now = Utc::now();

        let mut recommendations: Vec<RankedRecommendation> = Vec::with_capacity(end - offset);
        let mut reasoning: Vec<RecommendationReasoning> = Vec::new();

        for scored in &pool[offset..end] {
            let item_confidence = match confidence {
                ConfidenceMode::Fixed(fixed) => fixed,
                ConfidenceMode::DataDriven(data_score) => {
                    blending::confidence_score(data_score, scored.final_score)
                }
            };
            let recommendation_id = Uuid::new_v4();

            if query.explainability {
                reasoning.push(RecommendationReasoning {
                    recommendation_id,
                    kind: scored.candidate.source,
                    explanation: explanation_for(&scored.candidate),
                    confidence: item_confidence,
                    factors: scored.candidate.factors.clone(),
                });
            }

            recommendations.push(RankedRecommendation {
                id: recommendation_id,
                item: scored.candidate.item.clone(),
                score: scored.final_score,
                confidence: item_confidence,
                reasoning: scored.candidate.factors.clone(),
                algorithm: scored.candidate.source,
                freshness: scored.freshness,
                diversity: scored.diversity,
                personalization: scored.personalization,
                metadata: scored.candidate.reasons.clone(),
            });
        }

        let analytics = match confidence {
            ConfidenceMode::DataDriven(data_score) => pool_analytics(&pool, data_score),
            ConfidenceMode::Fixed(fixed) => {
                let mut analytics = pool_analytics(&pool, 0.0);
                analytics.average_confidence = fixed;
                analytics
            }
        };

        let explanations = if query.explainability {
            Some(build_explanations(query, user_profile.as_ref(), &recommendations))
        } else {
            None
        };

        RecommendationBatch {
            recommendations,
            pagination: Pagination {
                offset: query.offset,
                limit: query.limit,
                total,
                has_next: end < total,
                has_previous: offset > 0,
            },
            metadata: BatchMetadata {
                user_id: query.user_id,
                rec_type: query.rec_type,
                algorithm: query.algorithm,
                generated_at: now,
                processing_time_ms: 0,
                cache_hit: false,
            },
            user_profile,
            reasoning,
            explanations,
            analytics,
        }
    }

    async fn persist_batch(&self, batch: &RecommendationBatch) {
        if batch.recommendations.is_empty() {
            return;
        }

        let records: Vec<Recommendation> = batch
            .recommendations
            .iter()
            .map(|rec| Recommendation {
                id: rec.id,
                user_id: batch.metadata.user_id,
                item_id: rec.item.id,
                item_type: rec.item.item_type,
                score: rec.score,
                confidence: rec.confidence,
                reason_type: rec.algorithm,
                reason_data: rec.metadata.clone(),
                created_at: batch.metadata.generated_at,
            })
            .collect();

        if let Err(e) = self.recommendations.save_batch(&records).await {
            warn!("Failed to persist recommendation batch: {}", e);
        }
    }
}

fn effective_kinds(algorithm: Algorithm, rec_type: RecommendationType) -> Vec<GeneratorKind> {
    let algorithm = match rec_type {
        RecommendationType::Trending => Algorithm::TrendingAnalysis,
        RecommendationType::Personalized => Algorithm::ContentSimilarity,
        RecommendationType::Collaborative => Algorithm::CollaborativeFiltering,
        _ => algorithm,
    };

    match algorithm {
        Algorithm::ContentSimilarity => vec![GeneratorKind::ContentSimilarity],
        Algorithm::CollaborativeFiltering => vec![GeneratorKind::CollaborativeFiltering],
        Algorithm::TrendingAnalysis => vec![GeneratorKind::TrendingAnalysis],
        Algorithm::HybridEnsemble => vec![
            GeneratorKind::ContentSimilarity,
            GeneratorKind::CollaborativeFiltering,
            GeneratorKind::TrendingAnalysis,
        ],
    }
}

fn explanation_for(candidate: &Candidate) -> String {
    match &candidate.reasons[0] {
        ReasonData::ContentSimilarity {
            matched_categories, ..
        } if !matched_categories.is_empty() => {
            format!("Matches your reading interests in {}", matched_categories.join(", "))
        }
        ReasonData::ContentSimilarity { .. } => {
            "Matches topics you follow".to_string()
        }
        ReasonData::Collaborative {
            similar_user_count, ..
        } => format!("{} readers with similar history engaged with this", similar_user_count),
        ReasonData::Trending { category, .. } => format!("Trending now in {}", category),
        ReasonData::Popular { .. } => "Widely read across the site".to_string(),
    }
}

fn build_explanations(
    query: &RecommendationQuery,
    profile: Option<&UserBehaviorSummary>,
    recommendations: &[RankedRecommendation],
) -> Explanations {
    let mut why = Vec::new();
    let mut how = Vec::new();
    let mut alternatives = Vec::new();

    if let Some(profile) = profile {
        if !profile.preferred_categories.is_empty() {
            why.push(format!(
                "Based on your recent activity in {}",
                profile.preferred_categories.join(", ")
            ));
        }
    }
    if query.context.current_item_id.is_some() {
        why.push("Because of the article you are reading".to_string());
    }
    if why.is_empty() {
        why.push("Based on what is popular with readers right now".to_string());
    }

    how.push(format!(
        "Candidates were generated with the {} strategy",
        query.algorithm.as_str()
    ));
    let sources: HashSet<&str> = recommendations
        .iter()
        .map(|r| r.algorithm.as_str())
        .collect();
    if sources.len() > 1 {
        how.push(format!(
            "Signals from {} independent sources were merged and re-ranked",
            sources.len()
        ));
    }
    how.push("Scores were adjusted for diversity, freshness and personal fit".to_string());

    alternatives.push("Try type=trending for broader coverage".to_string());
    alternatives.push("Raise diversity_factor to widen the mix of sections".to_string());

    Explanations {
        why,
        how,
        alternatives,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_kinds() {
        assert_eq!(
            effective_kinds(Algorithm::HybridEnsemble, RecommendationType::Articles).len(),
            3
        );
        assert_eq!(
            effective_kinds(Algorithm::HybridEnsemble, RecommendationType::Trending),
            vec![GeneratorKind::TrendingAnalysis]
        );
        assert_eq!(
            effective_kinds(Algorithm::ContentSimilarity, RecommendationType::Articles),
            vec![GeneratorKind::ContentSimilarity]
        );
        assert_eq!(
            effective_kinds(Algorithm::HybridEnsemble, RecommendationType::Collaborative),
            vec![GeneratorKind::CollaborativeFiltering]
        );
    }

    #[test]
    fn test_explanation_for_sources() {
        let item = ContentItem::new(Uuid::new_v4(), "t", "sports");
        let candidate = Candidate::new(
            item,
            0.5,
            GeneratorKind::TrendingAnalysis,
            ReasonData::Trending {
                views: 5,
                interactions: 1,
                category: "sports".to_string(),
            },
        );
        assert!(explanation_for(&candidate).contains("sports"));
    }
}
