//! Audit trail for tag writes.
//!
//! Every planned or applied write is recorded so a run's changes can be
//! reviewed after the fact. The log is in-memory and bounded; nothing
//! persists between runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Outcome of one audited tag write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TagWriteOutcome {
    /// Dry-run: the write was planned but not issued.
    Planned,
    /// The write was issued and succeeded.
    Applied,
    /// The write was issued and failed.
    Failed(String),
}

/// One audited tag write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagAuditEntry {
    /// Unique entry id.
    pub id: Uuid,
    /// When the write was planned or issued.
    pub timestamp: DateTime<Utc>,
    /// Region the resource lives in.
    pub region: String,
    /// Target resource id.
    pub resource_id: String,
    /// Resource kind, as displayed.
    pub resource_kind: String,
    /// Tag key written.
    pub key: String,
    /// Tag value written (blank under the empty-value policy).
    pub value: String,
    /// What happened.
    pub outcome: TagWriteOutcome,
}

/// Bounded in-memory audit log of tag writes.
#[derive(Clone)]
pub struct TagAuditLog {
    entries: Arc<RwLock<VecDeque<TagAuditEntry>>>,
    max_entries: usize,
}

impl TagAuditLog {
    /// Creates a log bounded to `max_entries`; the oldest entries are
    /// dropped first.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
            max_entries,
        }
    }

    /// Records one write.
    pub async fn record(
        &self,
        region: &str,
        resource_id: &str,
        resource_kind: &str,
        key: &str,
        value: &str,
        outcome: TagWriteOutcome,
    ) {
        let entry = TagAuditEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            region: region.to_string(),
            resource_id: resource_id.to_string(),
            resource_kind: resource_kind.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            outcome,
        };

        info!(
            region = %entry.region,
            resource_id = %entry.resource_id,
            key = %entry.key,
            outcome = ?entry.outcome,
            "tag write audited"
        );

        let mut entries = self.entries.write().await;
        if entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Returns all entries, oldest first.
    pub async fn entries(&self) -> Vec<TagAuditEntry> {
        self.entries.read().await.iter().cloned().collect()
    }

    /// Number of recorded entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for TagAuditLog {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_and_read_back() {
        let log = TagAuditLog::default();
        log.record(
            "us-east-1",
            "vol-1",
            "Volume",
            "web-01",
            "",
            TagWriteOutcome::Applied,
        )
        .await;

        let entries = log.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].resource_id, "vol-1");
        assert_eq!(entries[0].key, "web-01");
        assert_eq!(entries[0].outcome, TagWriteOutcome::Applied);
    }

    #[tokio::test]
    async fn test_bounded_drops_oldest() {
        let log = TagAuditLog::new(2);
        for id in ["a", "b", "c"] {
            log.record("r", id, "Volume", "k", "", TagWriteOutcome::Planned)
                .await;
        }

        let entries = log.entries().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].resource_id, "b");
        assert_eq!(entries[1].resource_id, "c");
    }
}
