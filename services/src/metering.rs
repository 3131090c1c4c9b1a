//! Usage metering interface.
//!
//! The core produces accurate token counts per operation; pricing and
//! aggregation happen outside, behind [`MeteringSink`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

/// Billable operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeterEvent {
    Indexed,
    Question,
    PrReview,
    SnippetFetch,
}

/// One metering record emitted after an operation completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterRecord {
    pub event: MeterEvent,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub embedding_tokens: u64,
    /// Free-form context (repo, question hash, PR id, ...). Never secrets.
    pub metadata: Value,
}

impl MeterRecord {
    /// Record with zeroed counters, for file-level events like snippet fetches.
    pub fn event_only(event: MeterEvent, metadata: Value) -> Self {
        Self {
            event,
            input_tokens: 0,
            output_tokens: 0,
            embedding_tokens: 0,
            metadata,
        }
    }
}

/// Sink for metering records. Implementations must not block the caller
/// beyond a cheap enqueue.
#[async_trait]
pub trait MeteringSink: Send + Sync {
    async fn record(&self, record: MeterRecord);
}

/// Discards every record. Default when no billing backend is wired.
#[derive(Debug, Default)]
pub struct NullMeter;

#[async_trait]
impl MeteringSink for NullMeter {
    async fn record(&self, record: MeterRecord) {
        debug!(event = ?record.event, "metering record dropped (null sink)");
    }
}

/// Buffers records in memory; used by tests and local runs.
#[derive(Debug, Default)]
pub struct RecordingMeter {
    records: Mutex<Vec<MeterRecord>>,
}

impl RecordingMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub async fn drain(&self) -> Vec<MeterRecord> {
        std::mem::take(&mut *self.records.lock().await)
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }
}

#[async_trait]
impl MeteringSink for RecordingMeter {
    async fn record(&self, record: MeterRecord) {
        self.records.lock().await.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_meter_buffers_in_order() {
        let meter = RecordingMeter::new();
        meter
            .record(MeterRecord::event_only(
                MeterEvent::SnippetFetch,
                serde_json::json!({"path": "app/Models/User.php"}),
            ))
            .await;
        meter
            .record(MeterRecord {
                event: MeterEvent::Question,
                input_tokens: 120,
                output_tokens: 48,
                embedding_tokens: 16,
                metadata: Value::Null,
            })
            .await;

        let records = meter.drain().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].event, MeterEvent::SnippetFetch);
        assert_eq!(records[1].input_tokens, 120);
        assert_eq!(meter.len().await, 0);
    }
}
