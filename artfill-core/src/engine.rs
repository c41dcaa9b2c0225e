//! The engine facade: run triggering, status, and the approval
//! workflow, over shared durable stores.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use uuid::Uuid;

use artfill_config::{EngineConfig, RunOptions};
use artfill_model::{
    ChangeProposal, HistoryAction, HistoryEntry, ProposalId,
    ProposalStatus, ProviderUsage, ResolutionDecision, RunPhase,
    RunStatsSnapshot,
};

use crate::cache::ResolutionCache;
use crate::clock::{Clock, SystemClock};
use crate::error::{EngineError, Result};
use crate::history::ChangeHistory;
use crate::media_server::MediaServer;
use crate::proposals::ProposalStore;
use crate::provider_state::ProviderStateStore;
use crate::providers::ProviderRegistry;
use crate::resolver::Resolver;
use crate::run::{RunCoordinator, RunStats};
use crate::storage::{DirStore, StateStore};

/// Point-in-time view of the engine, safe to poll during a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunStatusReport {
    pub phase: RunPhase,
    pub stats: RunStatsSnapshot,
    pub providers: Vec<ProviderUsage>,
}

/// Result of one `apply_approved` sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    pub applied: u64,
    pub declined: u64,
    pub failed: u64,
}

/// Owns the durable stores and coordinates runs. One engine instance
/// serves any number of sequential runs; a second concurrent run is
/// rejected rather than queued.
#[derive(Debug)]
pub struct ArtworkEngine {
    config: EngineConfig,
    registry: ProviderRegistry,
    media_server: Arc<dyn MediaServer>,
    clock: Arc<dyn Clock>,
    cache: Arc<ResolutionCache>,
    provider_state: Arc<ProviderStateStore>,
    proposals: Arc<ProposalStore>,
    history: Arc<ChangeHistory>,
    stats: Arc<RunStats>,
    stop: Arc<AtomicBool>,
    phase: Mutex<RunPhase>,
    running: AtomicBool,
}

impl ArtworkEngine {
    /// Wire the engine against explicit collaborators. Tests use this
    /// with in-memory doubles.
    pub async fn new(
        config: EngineConfig,
        media_server: Arc<dyn MediaServer>,
        registry: ProviderRegistry,
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let cache =
            Arc::new(ResolutionCache::load(store.clone()).await?);
        let provider_state = Arc::new(
            ProviderStateStore::load(store.clone(), clock.clone())
                .await?,
        );
        let proposals =
            Arc::new(ProposalStore::load(store.clone()).await?);
        let history = Arc::new(ChangeHistory::new(store));
        Ok(Self {
            config,
            registry,
            media_server,
            clock,
            cache,
            provider_state,
            proposals,
            history,
            stats: Arc::new(RunStats::new()),
            stop: Arc::new(AtomicBool::new(false)),
            phase: Mutex::new(RunPhase::Idle),
            running: AtomicBool::new(false),
        })
    }

    /// Production wiring: file-backed storage under the configured
    /// directory, the system clock, and providers built from configured
    /// keys.
    pub async fn with_defaults(
        config: EngineConfig,
        media_server: Arc<dyn MediaServer>,
    ) -> Result<Self> {
        let store =
            Arc::new(DirStore::new(config.storage_dir.clone()));
        let registry = ProviderRegistry::from_keys(
            &config.provider_keys,
            config.http_timeout(),
        );
        Self::new(
            config,
            media_server,
            registry,
            store,
            Arc::new(SystemClock),
        )
        .await
    }

    /// Execute one run to completion. Returns the final counters.
    pub async fn run(
        &self,
        options: RunOptions,
    ) -> Result<RunStatsSnapshot> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(EngineError::RunInProgress);
        }
        self.stop.store(false, Ordering::SeqCst);
        self.stats.reset();
        self.set_phase(RunPhase::Running);

        let options = options.normalized();
        let resolver = Arc::new(Resolver::new(
            self.cache.clone(),
            self.provider_state.clone(),
            self.proposals.clone(),
            self.history.clone(),
            self.media_server.clone(),
            self.clock.clone(),
            self.stats.clone(),
        ));
        let coordinator = RunCoordinator::new(
            resolver,
            self.media_server.clone(),
            self.cache.clone(),
            self.provider_state.clone(),
            self.proposals.clone(),
            self.stats.clone(),
            self.stop.clone(),
            self.config.parallelism,
        );
        let result = coordinator.execute(&self.registry, &options).await;
        match &result {
            Ok(stats) => {
                self.set_phase(RunPhase::Finished);
                tracing::info!(?stats, "run finished");
            }
            Err(err) => {
                self.set_phase(RunPhase::Failed);
                tracing::error!(%err, "run failed");
            }
        }
        self.running.store(false, Ordering::SeqCst);
        result
    }

    /// Ask a running scan to wind down at the next item boundary.
    pub fn request_stop(&self) {
        if self.running.load(Ordering::SeqCst) {
            self.set_phase(RunPhase::Stopping);
        }
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn run_status(&self) -> RunStatusReport {
        RunStatusReport {
            phase: self.phase(),
            stats: self.stats.snapshot(),
            providers: self.provider_state.usage_snapshot(),
        }
    }

    pub fn list_pending_proposals(&self) -> Vec<ChangeProposal> {
        self.proposals.pending()
    }

    /// Approve or decline one proposal. The decision is durable
    /// immediately; the artwork change itself waits for
    /// [`ArtworkEngine::apply_approved`].
    pub async fn decide(
        &self,
        id: ProposalId,
        approve: bool,
    ) -> Result<ChangeProposal> {
        let proposal =
            self.proposals.decide(id, approve, self.clock.now())?;
        if let Err(err) = self.proposals.persist().await {
            tracing::warn!(%err, "failed to persist proposal decision");
        }
        Ok(proposal)
    }

    /// Act on every decided proposal: upload approved candidates,
    /// archive declined ones. Failed uploads stay approved so a later
    /// sweep can retry them.
    pub async fn apply_approved(&self) -> Result<ApplySummary> {
        let mut summary = ApplySummary::default();
        for proposal in self.proposals.decided() {
            match proposal.status {
                ProposalStatus::Approved => {
                    self.apply_one(&proposal, &mut summary).await;
                }
                ProposalStatus::Declined => {
                    self.archive(&proposal, HistoryAction::Declined)
                        .await;
                    self.proposals.remove(&proposal.key);
                    summary.declined += 1;
                }
                _ => {}
            }
        }
        if let Err(err) = self.cache.flush().await {
            tracing::warn!(%err, "decision cache flush failed");
        }
        if let Err(err) = self.proposals.persist().await {
            tracing::warn!(%err, "proposal save failed");
        }
        Ok(summary)
    }

    async fn apply_one(
        &self,
        proposal: &ChangeProposal,
        summary: &mut ApplySummary,
    ) {
        let upload = self
            .media_server
            .upload_artwork(
                &proposal.key.item_id,
                proposal.key.slot,
                &proposal.candidate.url,
            )
            .await;
        match upload {
            Ok(()) => {
                self.archive(proposal, HistoryAction::Applied).await;
                self.cache
                    .put(ResolutionDecision::resolved(
                        proposal.key.clone(),
                        proposal.candidate.clone(),
                        self.clock.now(),
                    ))
                    .await;
                self.proposals.remove(&proposal.key);
                summary.applied += 1;
                tracing::info!(
                    key = %proposal.key,
                    item = %proposal.item_title,
                    "approved artwork applied"
                );
            }
            Err(err) => {
                summary.failed += 1;
                tracing::warn!(
                    key = %proposal.key,
                    %err,
                    "approved upload failed; will retry on the next sweep"
                );
            }
        }
    }

    async fn archive(
        &self,
        proposal: &ChangeProposal,
        action: HistoryAction,
    ) {
        let entry = HistoryEntry {
            id: Uuid::new_v4(),
            key: proposal.key.clone(),
            item_title: proposal.item_title.clone(),
            action,
            provider: proposal.candidate.provider.clone(),
            new_url: proposal.candidate.url.clone(),
            previous_url: proposal.previous.url.clone(),
            recorded_at: self.clock.now(),
        };
        if let Err(err) = self.history.append(&entry).await {
            tracing::warn!(%err, "failed to record history entry");
        }
    }

    /// Audit log accessor for reporting surfaces.
    pub fn history(&self) -> &ChangeHistory {
        &self.history
    }

    /// Enable or disable one provider without touching its credentials.
    pub fn set_provider_enabled(&self, provider: &str, enabled: bool) {
        self.provider_state.set_enabled(provider, enabled);
    }

    fn set_phase(&self, phase: RunPhase) {
        *self
            .phase
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = phase;
    }

    fn phase(&self) -> RunPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// Engine tests live in `tests/engine_scenarios.rs`; unit tests here
// would duplicate them against the same doubles.
