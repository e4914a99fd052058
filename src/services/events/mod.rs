use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_type: String,
    pub user_id: Option<Uuid>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(event_type: impl Into<String>, user_id: Option<Uuid>, metadata: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            user_id,
            metadata,
            created_at: Utc::now(),
        }
    }
}

/// Write-only analytics/audit sink. Emission is fire-and-forget: the pipeline
/// never waits on delivery guarantees and never fails a request over it.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: AuditEvent);
}

pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: AuditEvent) {
        info!(
            target: "audit",
            event_type = %event.event_type,
            user_id = ?event.user_id,
            metadata = %event.metadata,
            "audit event"
        );
    }
}
