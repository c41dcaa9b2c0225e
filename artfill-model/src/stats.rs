use serde::{Deserialize, Serialize};

/// Coarse position of the run coordinator, surfaced via `run_status`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Running,
    Stopping,
    Finished,
    Failed,
}

/// Point-in-time view of run-level counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatsSnapshot {
    pub items_scanned: u64,
    pub keys_skipped: u64,
    pub provider_queries: u64,
    pub proposals_created: u64,
    pub applied: u64,
    pub dry_run_decisions: u64,
    pub no_candidate: u64,
    pub errors: u64,
}
