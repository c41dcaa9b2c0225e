use std::sync::atomic::{AtomicU64, Ordering};

use artfill_model::RunStatsSnapshot;

/// Live run counters, updated lock-free from concurrent item workers.
#[derive(Debug, Default)]
pub struct RunStats {
    items_scanned: AtomicU64,
    keys_skipped: AtomicU64,
    provider_queries: AtomicU64,
    proposals_created: AtomicU64,
    applied: AtomicU64,
    dry_run_decisions: AtomicU64,
    no_candidate: AtomicU64,
    errors: AtomicU64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item_scanned(&self) {
        self.items_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn key_skipped(&self) {
        self.keys_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn provider_query(&self) {
        self.provider_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn proposal_created(&self) {
        self.proposals_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn artwork_applied(&self) {
        self.applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dry_run_decision(&self) {
        self.dry_run_decisions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn no_candidate(&self) {
        self.no_candidate.fetch_add(1, Ordering::Relaxed);
    }

    pub fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Zero every counter at the start of a run.
    pub fn reset(&self) {
        self.items_scanned.store(0, Ordering::Relaxed);
        self.keys_skipped.store(0, Ordering::Relaxed);
        self.provider_queries.store(0, Ordering::Relaxed);
        self.proposals_created.store(0, Ordering::Relaxed);
        self.applied.store(0, Ordering::Relaxed);
        self.dry_run_decisions.store(0, Ordering::Relaxed);
        self.no_candidate.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RunStatsSnapshot {
        RunStatsSnapshot {
            items_scanned: self.items_scanned.load(Ordering::Relaxed),
            keys_skipped: self.keys_skipped.load(Ordering::Relaxed),
            provider_queries: self
                .provider_queries
                .load(Ordering::Relaxed),
            proposals_created: self
                .proposals_created
                .load(Ordering::Relaxed),
            applied: self.applied.load(Ordering::Relaxed),
            dry_run_decisions: self
                .dry_run_decisions
                .load(Ordering::Relaxed),
            no_candidate: self.no_candidate.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}
