//! # artfill-core
//!
//! The artwork resolution engine: given media items from a media-server
//! collaborator, it decides per (item, slot) whether artwork needs
//! fetching, queries external image providers under cooldown and quota
//! constraints, scores candidates, and produces durable, idempotent
//! change records.
//!
//! ## Architecture
//!
//! - [`providers`]: uniform provider clients (TMDb, Fanart.tv, OMDb, TVDb)
//!   behind one [`providers::Provider`] trait plus a name-keyed registry
//! - [`provider_state`]: durable per-provider cooldown and daily-quota
//!   bookkeeping
//! - [`scoring`]: pure candidate ranking
//! - [`cache`]: persistent memo of prior decisions with batched flushing
//! - [`proposals`]: pending change proposals and the approval workflow
//! - [`history`]: append-only audit log of applied/declined changes
//! - [`resolver`]: the per-key state machine tying the above together
//! - [`run`]: library iteration, parallelism, and run statistics
//! - [`engine`]: the [`engine::ArtworkEngine`] facade exposed to callers

pub mod cache;
pub mod clock;
pub mod engine;
pub mod error;
pub mod history;
pub mod media_server;
pub mod proposals;
pub mod provider_state;
pub mod providers;
pub mod resolver;
pub mod run;
pub mod scoring;
pub mod storage;

/// Test doubles (in-memory media server, scripted providers, manual
/// clock) shared by the unit and integration test suites. Only built
/// for tests or with the `test-utils` feature.
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use engine::{ApplySummary, ArtworkEngine, RunStatusReport};
pub use error::{EngineError, Result};
