use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rankor::algorithms::blending::{self, BlendFactors, PersonalizationProfile};
use rankor::*;
use uuid::Uuid;

fn build_pool(size: usize) -> Vec<Candidate> {
    let sections = ["sports", "economy", "culture", "technology", "politics"];
    let tags = ["football", "markets", "opera", "ai", "elections", "league"];
    let now = Utc::now();

    (0..size)
        .map(|i| {
            let section = sections[i % sections.len()];
            let item = ContentItem::new(Uuid::new_v4(), format!("article {}", i), section)
                .with_tags(vec![tags[i % tags.len()].to_string()])
                .published(now - Duration::days((i % 45) as i64))
                .with_counts((i * 10) as u64, i as u64);

            let source = match i % 3 {
                0 => GeneratorKind::ContentSimilarity,
                1 => GeneratorKind::CollaborativeFiltering,
                _ => GeneratorKind::TrendingAnalysis,
            };
            let reason = ReasonData::Trending {
                views: (i * 10) as u64,
                interactions: i as u64,
                category: section.to_string(),
            };
            Candidate::new(item, (i % 100) as f64 / 100.0, source, reason)
        })
        .collect()
}

fn benchmark_dedup(c: &mut Criterion) {
    let pool = build_pool(500);
    // every candidate appears twice, from two different sources
    let mut duplicated = pool.clone();
    duplicated.extend(pool.iter().cloned().map(|mut candidate| {
        candidate.source = GeneratorKind::TrendingAnalysis;
        candidate.score *= 0.8;
        candidate
    }));

    c.bench_function("dedup_candidates_1000", |b| {
        b.iter(|| black_box(blending::dedup_candidates(duplicated.clone())));
    });
}

fn benchmark_blend(c: &mut Criterion) {
    let pool = build_pool(500);
    let factors = BlendFactors {
        diversity: 0.3,
        freshness: 0.2,
        personality: 0.5,
    };
    let profile = PersonalizationProfile {
        interest_values: ["sports".to_string(), "football".to_string()]
            .into_iter()
            .collect(),
        favorite_sections: ["sports".to_string()].into_iter().collect(),
        preferred_reading_time: Some((3, 10)),
    };
    let now = Utc::now();

    c.bench_function("blend_pool_500", |b| {
        b.iter(|| {
            black_box(blending::blend_pool(
                pool.clone(),
                &factors,
                Some(&profile),
                now,
            ))
        });
    });
}

fn benchmark_full_ranking_pass(c: &mut Criterion) {
    let pool = build_pool(500);
    let factors = BlendFactors {
        diversity: 0.3,
        freshness: 0.2,
        personality: 0.5,
    };
    let filters = CandidateFilters {
        max_reading_time: Some(10),
        ..Default::default()
    };
    let now = Utc::now();

    c.bench_function("dedup_blend_filter_sort_500", |b| {
        b.iter(|| {
            let deduped = blending::dedup_candidates(pool.clone());
            let scored = blending::blend_pool(deduped, &factors, None, now);
            let mut filtered =
                blending::apply_filters(scored, &filters, &std::collections::HashSet::new());
            blending::sort_ranked(&mut filtered);
            black_box(filtered)
        });
    });
}

criterion_group!(
    benches,
    benchmark_dedup,
    benchmark_blend,
    benchmark_full_ranking_pass
);
criterion_main!(benches);
