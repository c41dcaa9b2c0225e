//! Core data model definitions shared across artfill crates.
#![allow(missing_docs)]

pub mod candidate;
pub mod decision;
pub mod history;
pub mod ids;
pub mod media;
pub mod proposal;
pub mod provider;
pub mod stats;

// Intentionally curated re-exports for downstream consumers.
pub use candidate::ArtworkCandidate;
pub use decision::{ResolutionDecision, ResolutionStatus};
pub use history::{HistoryAction, HistoryEntry, HistoryStats};
pub use ids::{ItemId, ProposalId, ResolutionKey};
pub use media::{ArtworkSlot, ExternalIds, Library, MediaItem, MediaKind};
pub use proposal::{ArtworkRef, ChangeProposal, ProposalStatus};
pub use provider::{FailureKind, ProviderRecord, ProviderUsage};
pub use stats::{RunPhase, RunStatsSnapshot};
