//! Append-only audit log of applied and declined changes.
//!
//! One JSON object per line; entries are never rewritten. Malformed
//! lines (partial writes, manual edits) are skipped on read with a
//! warning so one bad line cannot poison the whole log.

use std::sync::Arc;

use artfill_model::{HistoryEntry, HistoryStats, ItemId};

use crate::error::Result;
use crate::storage::StateStore;

pub const HISTORY_FILE: &str = "history.jsonl";

#[derive(Debug)]
pub struct ChangeHistory {
    store: Arc<dyn StateStore>,
}

impl ChangeHistory {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    pub async fn append(&self, entry: &HistoryEntry) -> Result<()> {
        let line = serde_json::to_vec(entry)?;
        self.store.append_line(HISTORY_FILE, &line).await
    }

    /// All entries in recording order.
    pub async fn entries(&self) -> Result<Vec<HistoryEntry>> {
        let Some(bytes) = self.store.load(HISTORY_FILE).await? else {
            return Ok(Vec::new());
        };
        let text = String::from_utf8_lossy(&bytes);
        let mut entries = Vec::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(err) => {
                    tracing::warn!(%err, "skipping malformed history line");
                }
            }
        }
        Ok(entries)
    }

    /// The `limit` most recent entries, newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut entries = self.entries().await?;
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }

    pub async fn entries_for_item(
        &self,
        item_id: &ItemId,
    ) -> Result<Vec<HistoryEntry>> {
        let entries = self.entries().await?;
        Ok(entries
            .into_iter()
            .filter(|entry| &entry.key.item_id == item_id)
            .collect())
    }

    pub async fn statistics(&self) -> Result<HistoryStats> {
        let mut stats = HistoryStats::default();
        let mut seen = Vec::new();
        for entry in self.entries().await? {
            stats.absorb(&entry, &mut seen);
        }
        Ok(stats)
    }
}
