use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::candidate::ArtworkCandidate;
use crate::ids::ResolutionKey;

/// Outcome of resolving one (item, slot) key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// A candidate was selected and (eventually) applied.
    Resolved,
    /// A winner was chosen during a dry run; nothing was applied. Later
    /// dry runs reuse it, a real run resolves the key for real.
    Previewed,
    /// Every available provider was queried and none produced a candidate.
    NoCandidate,
    /// The key was skipped without querying (artwork already present, or
    /// filtered out by run options).
    Skipped,
}

/// Durable memo of the last resolution for a key.
///
/// At most one decision exists per key; re-resolution overwrites in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionDecision {
    pub key: ResolutionKey,
    pub status: ResolutionStatus,
    /// The winning candidate, present only for `Resolved`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<ArtworkCandidate>,
    /// Provider that produced the winner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub decided_at: DateTime<Utc>,
}

impl ResolutionDecision {
    pub fn skipped(key: ResolutionKey, now: DateTime<Utc>) -> Self {
        Self {
            key,
            status: ResolutionStatus::Skipped,
            winner: None,
            provider: None,
            decided_at: now,
        }
    }

    pub fn no_candidate(key: ResolutionKey, now: DateTime<Utc>) -> Self {
        Self {
            key,
            status: ResolutionStatus::NoCandidate,
            winner: None,
            provider: None,
            decided_at: now,
        }
    }

    pub fn resolved(
        key: ResolutionKey,
        winner: ArtworkCandidate,
        now: DateTime<Utc>,
    ) -> Self {
        let provider = Some(winner.provider.clone());
        Self {
            key,
            status: ResolutionStatus::Resolved,
            winner: Some(winner),
            provider,
            decided_at: now,
        }
    }

    pub fn previewed(
        key: ResolutionKey,
        winner: ArtworkCandidate,
        now: DateTime<Utc>,
    ) -> Self {
        let provider = Some(winner.provider.clone());
        Self {
            key,
            status: ResolutionStatus::Previewed,
            winner: Some(winner),
            provider,
            decided_at: now,
        }
    }
}
