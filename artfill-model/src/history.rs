use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::{ItemId, ResolutionKey};
use crate::media::ArtworkSlot;

/// What happened to the proposal this entry archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Applied,
    Declined,
}

/// Immutable audit record of a terminal proposal. Written once, never
/// mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub key: ResolutionKey,
    pub item_title: String,
    pub action: HistoryAction,
    pub provider: String,
    pub new_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_url: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Aggregate statistics over the history log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total_applied: u64,
    pub posters_applied: u64,
    pub backgrounds_applied: u64,
    pub declined: u64,
    pub unique_items: u64,
    pub by_provider: HashMap<String, u64>,
}

impl HistoryStats {
    /// Fold one entry into the aggregate.
    pub fn absorb(&mut self, entry: &HistoryEntry, seen: &mut Vec<ItemId>) {
        match entry.action {
            HistoryAction::Applied => {
                self.total_applied += 1;
                match entry.key.slot {
                    ArtworkSlot::Poster => self.posters_applied += 1,
                    ArtworkSlot::Background => self.backgrounds_applied += 1,
                }
                *self
                    .by_provider
                    .entry(entry.provider.clone())
                    .or_insert(0) += 1;
                if !seen.contains(&entry.key.item_id) {
                    seen.push(entry.key.item_id.clone());
                    self.unique_items += 1;
                }
            }
            HistoryAction::Declined => self.declined += 1,
        }
    }
}
