use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::candidate::ArtworkCandidate;
use crate::ids::{ProposalId, ResolutionKey};

/// Reference to the artwork an item had before a change, kept so an
/// external restore tool can undo an applied proposal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtworkRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub auto_generated: bool,
}

/// Lifecycle of a change proposal.
///
/// `Pending` proposals wait for the approval workflow (or are auto-applied
/// when final approval is off). `Approved`/`Declined` are decided but not
/// yet acted on; `Applied` and `Discarded` are terminal and archived into
/// history.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Approved,
    Declined,
    Applied,
    Discarded,
}

impl ProposalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProposalStatus::Applied | ProposalStatus::Discarded)
    }
}

/// A proposed artwork change for one (item, slot) key.
///
/// Dedup invariant: at most one non-terminal proposal exists per key; a
/// newer resolution merges into the existing one instead of adding a
/// second.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeProposal {
    pub id: ProposalId,
    pub key: ResolutionKey,
    pub item_title: String,
    #[serde(default)]
    pub previous: ArtworkRef,
    pub candidate: ArtworkCandidate,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
}

impl ChangeProposal {
    pub fn new(
        key: ResolutionKey,
        item_title: impl Into<String>,
        previous: ArtworkRef,
        candidate: ArtworkCandidate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ProposalId::new(),
            key,
            item_title: item_title.into(),
            previous,
            candidate,
            status: ProposalStatus::Pending,
            created_at: now,
            decided_at: None,
        }
    }

    /// Replace the candidate of a still-pending proposal with a newer
    /// resolution for the same key, keeping id and creation time.
    pub fn merge_candidate(
        &mut self,
        candidate: ArtworkCandidate,
        previous: ArtworkRef,
    ) {
        debug_assert_eq!(self.status, ProposalStatus::Pending);
        self.candidate = candidate;
        self.previous = previous;
    }
}
