use crate::algorithms::CandidateGenerator;
use crate::models::*;
use crate::services::store::ContentStore;
use crate::utils::clamp_unit;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

const CATEGORY_SHARE: f64 = 0.6;
const KEYWORD_SHARE: f64 = 0.4;

/// Scores items by weighted overlap between the user's category/keyword
/// interests and the item's section/tags. Users without any stored interest
/// get an empty contribution.
pub struct ContentSimilarityGenerator {
    store: Arc<dyn ContentStore>,
}

impl ContentSimilarityGenerator {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl CandidateGenerator for ContentSimilarityGenerator {
    fn kind(&self) -> GeneratorKind {
        GeneratorKind::ContentSimilarity
    }

    async fn generate(
        &self,
        _user_id: Option<Uuid>,
        interests: &[UserInterest],
        _behavior: Option<&UserBehaviorSummary>,
        limit: usize,
    ) -> Result<Vec<Candidate>> {
        let mut category_weights: HashMap<&str, f64> = HashMap::new();
        let mut keyword_weights: HashMap<&str, f64> = HashMap::new();
        for interest in interests {
            match interest.kind {
                InterestKind::Category => {
                    category_weights.insert(interest.value.as_str(), interest.weight);
                }
                InterestKind::Keyword => {
                    keyword_weights.insert(interest.value.as_str(), interest.weight);
                }
            }
        }

        if category_weights.is_empty() && keyword_weights.is_empty() {
            return Ok(Vec::new());
        }

        // Over-fetch so scoring has something to rank even after misses.
        let pool = self
            .store
            .published_items(limit.saturating_mul(3).max(30))
            .await?;

        let mut candidates: Vec<Candidate> = Vec::new();
        for item in pool {
            let mut matched_categories: Vec<String> = Vec::new();
            let mut matched_keywords: Vec<String> = Vec::new();

            let category_score = match category_weights.get(item.section.as_str()) {
                Some(weight) => {
                    matched_categories.push(item.section.clone());
                    *weight
                }
                None => 0.0,
            };

            let keyword_sum: f64 = item
                .tags
                .iter()
                .filter_map(|tag| {
                    keyword_weights.get(tag.as_str()).map(|weight| {
                        matched_keywords.push(tag.clone());
                        *weight
                    })
                })
                .sum();
            let keyword_score = keyword_sum / item.tags.len().max(1) as f64;

            let score = clamp_unit(CATEGORY_SHARE * category_score + KEYWORD_SHARE * keyword_score);
            if score <= 0.0 {
                continue;
            }

            let mut factors: Vec<String> = matched_categories
                .iter()
                .map(|c| format!("matches your interest in {}", c))
                .collect();
            factors.extend(matched_keywords.iter().map(|k| format!("tagged {}", k)));

            candidates.push(
                Candidate::new(
                    item,
                    score,
                    GeneratorKind::ContentSimilarity,
                    ReasonData::ContentSimilarity {
                        matched_categories,
                        matched_keywords,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::InMemoryContentStore;

    fn interest(kind: InterestKind, value: &str, weight: f64) -> UserInterest {
        UserInterest::new(Uuid::new_v4(), kind, value, weight)
    }

    #[tokio::test]
    async fn test_empty_without_interests() {
        let store = Arc::new(InMemoryContentStore::new());
        store
            .insert_item(ContentItem::new(Uuid::new_v4(), "a", "sports"))
            .await;

        let generator = ContentSimilarityGenerator::new(store);
        let candidates = generator.generate(None, &[], None, 10).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_scores_weighted_overlap() {
        let store = Arc::new(InMemoryContentStore::new());
        let sports = ContentItem::new(Uuid::new_v4(), "match", "sports")
            .with_tags(vec!["football".to_string(), "league".to_string()]);
        let economy = ContentItem::new(Uuid::new_v4(), "markets", "economy");
        let culture = ContentItem::new(Uuid::new_v4(), "festival", "culture");
        let sports_id = sports.id;
        let economy_id = economy.id;
        store.batch_insert_items(vec![sports, economy, culture]).await;

        let interests = vec![
            interest(InterestKind::Category, "sports", 0.8),
            interest(InterestKind::Category, "economy", 0.4),
            interest(InterestKind::Keyword, "football", 0.9),
        ];

        let generator = ContentSimilarityGenerator::new(store);
        let candidates = generator.generate(None, &interests, None, 10).await.unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].item.id, sports_id);
        assert_eq!(candidates[1].item.id, economy_id);
        assert!(candidates.iter().all(|c| c.score > 0.0 && c.score <= 1.0));

        match &candidates[0].reasons[0] {
            ReasonData::ContentSimilarity {
                matched_categories,
                matched_keywords,
            } => {
                assert_eq!(matched_categories, &vec!["sports".to_string()]);
                assert_eq!(matched_keywords, &vec!["football".to_string()]);
            }
            other => panic!("unexpected reason: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_respects_limit_and_ordering() {
        let store = Arc::new(InMemoryContentStore::new());
        for i in 0..20 {
            store
                .insert_item(
                    ContentItem::new(Uuid::new_v4(), format!("article {}", i), "sports"),
                )
                .await;
        }

        let interests = vec![interest(InterestKind::Category, "sports", 0.7)];
        let generator = ContentSimilarityGenerator::new(store);
        let candidates = generator.generate(None, &interests, None, 5).await.unwrap();

        assert_eq!(candidates.len(), 5);
        for pair in candidates.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }
}
