use crate::models::*;
use crate::utils::clamp_unit;
use chrono::{DateTime, Utc};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

const FRESHNESS_DECAY_DAYS: f64 = 30.0;
const DATA_VOLUME_NORM: f64 = 50.0;

const INTEREST_MATCH_WEIGHT: f64 = 0.5;
const READING_TIME_MATCH_WEIGHT: f64 = 0.3;
const FAVORITE_SECTION_MATCH_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone, Copy)]
pub struct BlendFactors {
    pub diversity: f64,
    pub freshness: f64,
    pub personality: f64,
}

impl BlendFactors {
    /// When diversity + freshness exceed 1 the base-score weight would go
    /// negative; the pair is rescaled proportionally so their sum caps at 1.
    /// The source behavior is undefined here, so this is a documented choice.
    pub fn normalized(&self) -> (f64, f64) {
        let sum = self.diversity + self.freshness;
        if sum > 1.0 {
            (self.diversity / sum, self.freshness / sum)
        } else {
            (self.diversity, self.freshness)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PersonalizationProfile {
    pub interest_values: HashSet<String>,
    pub favorite_sections: HashSet<String>,
    pub preferred_reading_time: Option<(u32, u32)>,
}

impl PersonalizationProfile {
    pub fn from_parts(
        interests: &[UserInterest],
        behavior: Option<&UserBehaviorSummary>,
    ) -> Self {
        let interest_values = interests.iter().map(|i| i.value.clone()).collect();
        let favorite_sections = behavior
            .map(|b| b.preferred_categories.iter().cloned().collect())
            .unwrap_or_default();
        let preferred_reading_time = behavior.and_then(|b| b.preferred_reading_time);

        Self {
            interest_values,
            favorite_sections,
            preferred_reading_time,
        }
    }
}

/// Merges generator outputs into one candidate per (item type, item id).
/// The highest raw score wins outright and reasons/factors are unioned, so a
/// strong single signal is never diluted by averaging. The output is
/// independent of input order.
pub fn dedup_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut merged: HashMap<(ItemType, Uuid), Candidate> = HashMap::new();

    for candidate in candidates {
        match merged.entry((candidate.item.item_type, candidate.item.id)) {
            Entry::Vacant(slot) => {
                slot.insert(candidate);
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                let wins = candidate.score > existing.score
                    || (candidate.score == existing.score
                        && candidate.source.rank() < existing.source.rank());
                if wins {
                    existing.score = candidate.score;
                    existing.source = candidate.source;
                    existing.item = candidate.item;
                }
                for reason in candidate.reasons {
                    if !existing.reasons.contains(&reason) {
                        existing.reasons.push(reason);
                    }
                }
                for factor in candidate.factors {
                    if !existing.factors.contains(&factor) {
                        existing.factors.push(factor);
                    }
                }
            }
        }
    }

    let mut result: Vec<Candidate> = merged.into_values().collect();
    for candidate in &mut result {
        candidate.factors.sort();
        candidate
            .reasons
            .sort_by_key(|r| serde_json::to_string(r).unwrap_or_default());
    }
    result.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.item.id.cmp(&b.item.id))
    });
    result
}

pub fn freshness_score(published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days = (now - published_at).num_seconds() as f64 / 86_400.0;
    (1.0 - days / FRESHNESS_DECAY_DAYS).clamp(0.0, 1.0)
}

fn diversity_score(
    item: &ContentItem,
    section_counts: &HashMap<String, usize>,
    tag_counts: &HashMap<String, usize>,
    total: usize,
) -> f64 {
    if total == 0 {
        return 0.0;
    }

    let section_share =
        section_counts.get(&item.section).copied().unwrap_or(0) as f64 / total as f64;
    let section_component = 1.0 - section_share;

    let tag_component = if item.tags.is_empty() {
        0.0
    } else {
        let rarity_sum: f64 = item
            .tags
            .iter()
            .map(|tag| {
                1.0 - tag_counts.get(tag).copied().unwrap_or(0) as f64 / total as f64
            })
            .sum();
        rarity_sum / item.tags.len() as f64
    };

    clamp_unit((section_component + tag_component) / 2.0)
}

pub fn personalization_score(item: &ContentItem, profile: &PersonalizationProfile) -> f64 {
    let mut score = 0.0;

    let interest_match = profile.interest_values.contains(&item.section)
        || item
            .tags
            .iter()
            .any(|tag| profile.interest_values.contains(tag));
    if interest_match {
        score += INTEREST_MATCH_WEIGHT;
    }

    if let Some((min, max)) = profile.preferred_reading_time {
        if item.reading_time >= min && item.reading_time <= max {
            score += READING_TIME_MATCH_WEIGHT;
        }
    }

    if profile.favorite_sections.contains(&item.section) {
        score += FAVORITE_SECTION_MATCH_WEIGHT;
    }

    score.min(1.0)
}

/// Applies the diversity/freshness/personalization adjustments over the full
/// candidate pool. Deterministic for fixed inputs; section and tag
/// frequencies are computed over the pool as given, before any filtering.
pub fn blend_pool(
    pool: Vec<Candidate>,
    factors: &BlendFactors,
    profile: Option<&PersonalizationProfile>,
    now: DateTime<Utc>,
) -> Vec<ScoredCandidate> {
    let total = pool.len();
    let mut section_counts: HashMap<String, usize> = HashMap::new();
    let mut tag_counts: HashMap<String, usize> = HashMap::new();
    for candidate in &pool {
        *section_counts
            .entry(candidate.item.section.clone())
            .or_insert(0) += 1;
        for tag in &candidate.item.tags {
            *tag_counts.entry(tag.clone()).or_insert(0) += 1;
        }
    }

    let (diversity_factor, freshness_factor) = factors.normalized();

    pool.into_iter()
        .map(|candidate| {
            let diversity =
                diversity_score(&candidate.item, &section_counts, &tag_counts, total);
            let freshness = freshness_score(candidate.item.published_at, now);

            let adjusted = candidate.score * (1.0 - diversity_factor - freshness_factor)
                + diversity * diversity_factor
                + freshness * freshness_factor;

            let (final_score, personalization) = match profile {
                Some(profile) => {
                    let personalization = personalization_score(&candidate.item, profile);
                    (
                        adjusted * (1.0 - factors.personality)
                            + personalization * factors.personality,
                        personalization,
                    )
                }
                None => (adjusted, 0.0),
            };

            ScoredCandidate {
                candidate,
                final_score,
                diversity,
                freshness,
                personalization,
            }
        })
        .collect()
}

/// Hard constraints. Runs after blending so diversity/freshness computations
/// saw the unfiltered pool; reordering these stages changes results.
pub fn apply_filters(
    pool: Vec<ScoredCandidate>,
    filters: &CandidateFilters,
    viewed: &HashSet<Uuid>,
) -> Vec<ScoredCandidate> {
    pool.into_iter()
        .filter(|scored| {
            let item = &scored.candidate.item;

            if !filters.sections.is_empty() && !filters.sections.contains(&item.section) {
                return false;
            }
            if !filters.tags.is_empty() && !item.tags.iter().any(|t| filters.tags.contains(t)) {
                return false;
            }
            if !filters.authors.is_empty() && !filters.authors.contains(&item.author_id) {
                return false;
            }
            if let Some(after) = filters.published_after {
                if item.published_at <= after {
                    return false;
                }
            }
            if let Some(before) = filters.published_before {
                if item.published_at >= before {
                    return false;
                }
            }
            if let Some(min) = filters.min_reading_time {
                if item.reading_time < min {
                    return false;
                }
            }
            if let Some(max) = filters.max_reading_time {
                if item.reading_time > max {
                    return false;
                }
            }
            if let Some(language) = &filters.language {
                if language != "both" && &item.language != language {
                    return false;
                }
            }
            if filters.only_featured && !item.featured {
                return false;
            }
            if viewed.contains(&item.id) {
                return false;
            }

            true
        })
        .collect()
}

pub fn sort_ranked(pool: &mut [ScoredCandidate]) {
    pool.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.candidate.item.id.cmp(&b.candidate.item.id))
    });
}

pub fn data_volume_score(total_interactions: u64) -> f64 {
    (total_interactions as f64 / DATA_VOLUME_NORM).min(1.0)
}

pub fn confidence_score(data_score: f64, item_score: f64) -> f64 {
    clamp_unit(0.6 * data_score + 0.4 * item_score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn item(section: &str, tags: &[&str]) -> ContentItem {
        ContentItem::new(Uuid::new_v4(), "title", section)
            .with_tags(tags.iter().map(|t| t.to_string()).collect())
    }

    fn candidate(item: ContentItem, score: f64, source: GeneratorKind) -> Candidate {
        let reason = match source {
            GeneratorKind::TrendingAnalysis => ReasonData::Trending {
                views: 10,
                interactions: 2,
                category: item.section.clone(),
            },
            GeneratorKind::CollaborativeFiltering => ReasonData::Collaborative {
                similar_user_count: 3,
                common_interactions: 5,
            },
            _ => ReasonData::ContentSimilarity {
                matched_categories: vec![item.section.clone()],
                matched_keywords: vec![],
            },
        };
        Candidate::new(item, score, source, reason)
    }

    #[test]
    fn test_freshness_bounds() {
        let now = Utc::now();
        assert!((freshness_score(now, now) - 1.0).abs() < 1e-6);
        assert_eq!(freshness_score(now - Duration::days(30), now), 0.0);
        assert_eq!(freshness_score(now - Duration::days(120), now), 0.0);

        let half = freshness_score(now - Duration::days(15), now);
        assert!((half - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_dedup_keeps_max_and_merges_reasons() {
        let shared = item("sports", &["football"]);
        let strong = candidate(shared.clone(), 0.9, GeneratorKind::ContentSimilarity);
        let weak = candidate(shared, 0.4, GeneratorKind::TrendingAnalysis);

        let merged = dedup_candidates(vec![weak, strong]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].score, 0.9);
        assert_eq!(merged[0].source, GeneratorKind::ContentSimilarity);
        assert_eq!(merged[0].reasons.len(), 2);
    }

    #[test]
    fn test_dedup_is_order_independent() {
        let a = item("sports", &["football"]);
        let b = item("economy", &["markets"]);
        let c = item("culture", &[]);

        let build = || {
            vec![
                candidate(a.clone(), 0.8, GeneratorKind::ContentSimilarity),
                candidate(a.clone(), 0.5, GeneratorKind::TrendingAnalysis),
                candidate(b.clone(), 0.6, GeneratorKind::CollaborativeFiltering),
                candidate(b.clone(), 0.6, GeneratorKind::TrendingAnalysis),
                candidate(c.clone(), 0.3, GeneratorKind::TrendingAnalysis),
            ]
        };

        let forward = dedup_candidates(build());
        let mut shuffled = build();
        shuffled.reverse();
        shuffled.rotate_left(2);
        let backward = dedup_candidates(shuffled);

        assert_eq!(forward.len(), backward.len());
        for (x, y) in forward.iter().zip(backward.iter()) {
            assert_eq!(x.item.id, y.item.id);
            assert_eq!(x.score, y.score);
            assert_eq!(x.source, y.source);
            assert_eq!(x.reasons, y.reasons);
            assert_eq!(x.factors, y.factors);
        }
    }

    #[test]
    fn test_blend_formula_exact() {
        let now = Utc::now();
        let fresh_item = item("sports", &[]).published(now);
        let base = candidate(fresh_item, 0.6, GeneratorKind::ContentSimilarity);

        let factors = BlendFactors {
            diversity: 0.3,
            freshness: 0.2,
            personality: 0.5,
        };
        let scored = blend_pool(vec![base], &factors, None, now);
        assert_eq!(scored.len(), 1);

        // single candidate: section share 1.0, no tags -> diversity (0 + 0)/2
        let diversity = 0.0;
        let freshness = 1.0;
        let expected = 0.6 * (1.0 - 0.3 - 0.2) + diversity * 0.3 + freshness * 0.2;
        assert!((scored[0].final_score - expected).abs() < 1e-9);
        assert_eq!(scored[0].personalization, 0.0);
    }

    #[test]
    fn test_blend_is_deterministic() {
        let now = Utc::now();
        let pool = vec![
            candidate(item("sports", &["football"]), 0.7, GeneratorKind::ContentSimilarity),
            candidate(item("economy", &[]), 0.5, GeneratorKind::TrendingAnalysis),
        ];
        let factors = BlendFactors {
            diversity: 0.3,
            freshness: 0.2,
            personality: 0.5,
        };

        let first = blend_pool(pool.clone(), &factors, None, now);
        let second = blend_pool(pool, &factors, None, now);
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.final_score, b.final_score);
            assert_eq!(a.diversity, b.diversity);
            assert_eq!(a.freshness, b.freshness);
        }
    }

    #[test]
    fn test_overweight_factors_rescaled() {
        let factors = BlendFactors {
            diversity: 0.8,
            freshness: 0.6,
            personality: 0.0,
        };
        let (df, ff) = factors.normalized();
        assert!((df + ff - 1.0).abs() < 1e-9);
        assert!((df / ff - 0.8 / 0.6).abs() < 1e-9);

        let now = Utc::now();
        let scored = blend_pool(
            vec![candidate(item("sports", &[]).published(now), 0.9, GeneratorKind::ContentSimilarity)],
            &factors,
            None,
            now,
        );
        assert!(scored[0].final_score >= 0.0 && scored[0].final_score <= 1.0);
    }

    #[test]
    fn test_diversity_rewards_underrepresented_sections() {
        let now = Utc::now();
        let pool = vec![
            candidate(item("sports", &[]), 0.5, GeneratorKind::ContentSimilarity),
            candidate(item("sports", &[]), 0.5, GeneratorKind::ContentSimilarity),
            candidate(item("sports", &[]), 0.5, GeneratorKind::ContentSimilarity),
            candidate(item("culture", &[]), 0.5, GeneratorKind::ContentSimilarity),
        ];
        let factors = BlendFactors {
            diversity: 1.0,
            freshness: 0.0,
            personality: 0.0,
        };

        let scored = blend_pool(pool, &factors, None, now);
        let sports = scored
            .iter()
            .find(|s| s.candidate.item.section == "sports")
            .unwrap();
        let culture = scored
            .iter()
            .find(|s| s.candidate.item.section == "culture")
            .unwrap();
        assert!(culture.diversity > sports.diversity);
        assert!(scored.iter().all(|s| (0.0..=1.0).contains(&s.diversity)));
    }

    #[test]
    fn test_personalization_components() {
        let profile = PersonalizationProfile {
            interest_values: ["sports".to_string(), "football".to_string()]
                .into_iter()
                .collect(),
            favorite_sections: ["sports".to_string()].into_iter().collect(),
            preferred_reading_time: Some((3, 10)),
        };

        let full = item("sports", &["football"]).with_reading_time(5);
        assert!((personalization_score(&full, &profile) - 1.0).abs() < 1e-9);

        let tag_only = item("culture", &["football"]).with_reading_time(30);
        assert!((personalization_score(&tag_only, &profile) - 0.5).abs() < 1e-9);

        let nothing = item("culture", &["opera"]).with_reading_time(30);
        assert_eq!(personalization_score(&nothing, &profile), 0.0);
    }

    #[test]
    fn test_filters() {
        let now = Utc::now();
        let featured = item("sports", &["football"]).featured(true).with_reading_time(5);
        let plain = item("sports", &["football"]).with_reading_time(20);
        let old = item("economy", &[]).published(now - Duration::days(90));
        let viewed_item = item("sports", &[]);
        let viewed_id = viewed_item.id;

        let pool: Vec<ScoredCandidate> = [featured.clone(), plain, old, viewed_item]
            .into_iter()
            .map(|i| ScoredCandidate {
                candidate: candidate(i, 0.5, GeneratorKind::ContentSimilarity),
                final_score: 0.5,
                diversity: 0.0,
                freshness: 0.0,
                personalization: 0.0,
            })
            .collect();

        let only_featured = CandidateFilters {
            only_featured: true,
            ..Default::default()
        };
        let kept = apply_filters(pool.clone(), &only_featured, &HashSet::new());
        assert_eq!(kept.len(), 1);
        assert!(kept[0].candidate.item.featured);

        let short_reads = CandidateFilters {
            max_reading_time: Some(10),
            ..Default::default()
        };
        let kept = apply_filters(pool.clone(), &short_reads, &HashSet::new());
        assert!(kept.iter().all(|s| s.candidate.item.reading_time <= 10));

        let recent = CandidateFilters {
            published_after: Some(now - Duration::days(14)),
            ..Default::default()
        };
        let kept = apply_filters(pool.clone(), &recent, &HashSet::new());
        assert!(kept
            .iter()
            .all(|s| s.candidate.item.published_at > now - Duration::days(14)));

        let viewed: HashSet<Uuid> = [viewed_id].into_iter().collect();
        let kept = apply_filters(pool, &CandidateFilters::default(), &viewed);
        assert!(kept.iter().all(|s| s.candidate.item.id != viewed_id));
    }

    #[test]
    fn test_confidence_bounds() {
        assert_eq!(data_volume_score(0), 0.0);
        assert_eq!(data_volume_score(25), 0.5);
        assert_eq!(data_volume_score(500), 1.0);

        assert_eq!(confidence_score(0.0, 0.0), 0.0);
        assert_eq!(confidence_score(1.0, 1.0), 1.0);
        let mid = confidence_score(0.2, 0.6);
        assert!((mid - (0.6 * 0.2 + 0.4 * 0.6)).abs() < 1e-9);
    }
}
