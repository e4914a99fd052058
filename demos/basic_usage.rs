use rankor::services::store::ContentStore;
use rankor::{AppState, Config};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rankor::init_tracing().await;

    let state = AppState::new(Config::default()).await?;

    // seed a small catalog
    let sports = rankor::ContentItem::new(Uuid::new_v4(), "Derby night", "sports")
        .with_tags(vec!["football".to_string()])
        .with_counts(250, 40);
    let economy = rankor::ContentItem::new(Uuid::new_v4(), "Markets open higher", "economy")
        .with_tags(vec!["markets".to_string()])
        .with_counts(180, 22);
    let sports_id = sports.id;
    state
        .content_store
        .batch_insert_items(vec![sports, economy])
        .await;

    // a reader with enough history to profile
    let reader = Uuid::new_v4();
    for _ in 0..4 {
        state
            .content_store
            .record_event(rankor::InteractionEvent::new(
                reader,
                sports_id,
                rankor::EventType::Read,
            ))
            .await?;
    }
    state.behavior.refresh_interests(reader).await?;

    let query = rankor::RecommendationQuery {
        user_id: Some(reader),
        rec_type: rankor::RecommendationType::Articles,
        context: rankor::RequestContext::default(),
        filters: rankor::CandidateFilters::default(),
        algorithm: rankor::Algorithm::HybridEnsemble,
        diversity_factor: 0.3,
        freshness_factor: 0.2,
        personality_factor: 0.5,
        explainability: true,
        limit: 5,
        offset: 0,
        bypass_cache: false,
    };

    let batch = state.engine.recommend(query).await?;

    println!("confidence: {:.2}", batch.analytics.average_confidence);
    for rec in &batch.recommendations {
        println!(
            "{:.3}  [{}]  {}  ({})",
            rec.score,
            rec.algorithm.as_str(),
            rec.item.title,
            rec.item.section
        );
    }
    if let Some(explanations) = &batch.explanations {
        for line in &explanations.why {
            println!("why: {}", line);
        }
    }

    Ok(())
}
