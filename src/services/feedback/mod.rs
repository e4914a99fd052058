use crate::error::EngineError;
use crate::models::*;
use crate::services::behavior::BehaviorAnalyzer;
use crate::services::events::{AuditEvent, EventSink};
use crate::services::store::{ContentStore, RecommendationStore};
use crate::utils::retry_with_backoff;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Records user reactions to recommendations. The append-only write is the
/// only step that can fail the request; trust and interest-weight updates are
/// follow-up adjustments that merely log on failure.
pub struct FeedbackRecorder {
    content: Arc<dyn ContentStore>,
    recommendations: Arc<dyn RecommendationStore>,
    behavior: Arc<BehaviorAnalyzer>,
    events: Arc<dyn EventSink>,
}

impl FeedbackRecorder {
    pub fn new(
        content: Arc<dyn ContentStore>,
        recommendations: Arc<dyn RecommendationStore>,
        behavior: Arc<BehaviorAnalyzer>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            content,
            recommendations,
            behavior,
            events,
        }
    }

    pub async fn record(&self, feedback: Feedback) -> Result<(), EngineError> {
        retry_with_backoff(
            || self.recommendations.append_feedback(feedback.clone()),
            2,
            Duration::from_millis(50),
        )
        .await
        .map_err(|e| EngineError::Persistence(e.to_string()))?;

        info!(
            user_id = %feedback.user_id,
            item_id = %feedback.item_id,
            action = ?feedback.action,
            "Recorded recommendation feedback"
        );

        // Adaptation is best-effort once the append has succeeded.
        if let Err(e) = self.adapt(&feedback).await {
            warn!("Feedback adaptation skipped: {}", e);
        }

        self.events
            .emit(AuditEvent::new(
                "recommendation_feedback",
                Some(feedback.user_id),
                serde_json::json!({
                    "recommendation_id": feedback.recommendation_id,
                    "item_id": feedback.item_id,
                    "action": feedback.action,
                    "rating": feedback.rating,
                }),
            ))
            .await;

        Ok(())
    }

    async fn adapt(&self, feedback: &Feedback) -> anyhow::Result<()> {
        if let Some(recommendation) = self.recommendations.get(feedback.recommendation_id).await? {
            self.recommendations
                .record_outcome(recommendation.reason_type, feedback.action)
                .await?;
        }

        if let Some(item) = self.content.get_item(feedback.item_id).await? {
            self.behavior
                .apply_feedback(feedback.user_id, &item, feedback.action);
        }

        Ok(())
    }
}
