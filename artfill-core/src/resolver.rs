//! Per-key resolution: short-circuit checks, provider fan-out with
//! bounded retries, candidate selection, and the terminal action
//! (apply, propose, or record the miss).
//!
//! Resolution of one (item, slot) key holds that key's lock for its
//! whole lifetime, so concurrent workers can never race on the same
//! slot while different keys proceed in parallel.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use rand::Rng;
use tokio::sync::Mutex;
use uuid::Uuid;

use artfill_config::RunOptions;
use artfill_model::{
    ArtworkCandidate, ArtworkRef, ArtworkSlot, FailureKind,
    HistoryAction, HistoryEntry, MediaItem, ResolutionDecision,
    ResolutionKey, ResolutionStatus,
};

use crate::cache::ResolutionCache;
use crate::clock::Clock;
use crate::error::Result;
use crate::history::ChangeHistory;
use crate::media_server::MediaServer;
use crate::proposals::ProposalStore;
use crate::provider_state::ProviderStateStore;
use crate::providers::{Provider, ProviderError};
use crate::run::RunStats;
use crate::scoring;

const TRANSIENT_RETRIES: u32 = 2;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

/// What resolving one key amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Short-circuited without querying any provider.
    Skipped,
    /// A winner was chosen and logged; nothing was mutated.
    DryRun,
    /// A pending proposal now awaits approval.
    ProposalQueued,
    /// The winner was uploaded to the media server.
    Applied,
    /// Every available provider was asked; none had usable artwork.
    NoCandidate,
    /// The upload was rejected; the winner is preserved as a pending
    /// proposal so it can be retried or applied manually.
    UploadFailed,
}

pub struct Resolver {
    cache: Arc<ResolutionCache>,
    provider_state: Arc<ProviderStateStore>,
    proposals: Arc<ProposalStore>,
    history: Arc<ChangeHistory>,
    media_server: Arc<dyn MediaServer>,
    clock: Arc<dyn Clock>,
    stats: Arc<RunStats>,
    key_locks: DashMap<ResolutionKey, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("cached_decisions", &self.cache.len())
            .finish()
    }
}

impl Resolver {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cache: Arc<ResolutionCache>,
        provider_state: Arc<ProviderStateStore>,
        proposals: Arc<ProposalStore>,
        history: Arc<ChangeHistory>,
        media_server: Arc<dyn MediaServer>,
        clock: Arc<dyn Clock>,
        stats: Arc<RunStats>,
    ) -> Self {
        Self {
            cache,
            provider_state,
            proposals,
            history,
            media_server,
            clock,
            stats,
            key_locks: DashMap::new(),
        }
    }

    /// Resolve one (item, slot) key end to end.
    pub async fn resolve(
        &self,
        item: &MediaItem,
        slot: ArtworkSlot,
        providers: &[Arc<dyn Provider>],
        options: &RunOptions,
    ) -> Result<Outcome> {
        let key = ResolutionKey::new(item.id.clone(), slot);
        let lock = self
            .key_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        if self.short_circuit(item, slot, &key, options) {
            tracing::debug!(%key, "nothing to do");
            return Ok(Outcome::Skipped);
        }

        let Some(candidates) =
            self.query_providers(item, slot, providers, options).await
        else {
            self.cache
                .put(ResolutionDecision::no_candidate(
                    key,
                    self.clock.now(),
                ))
                .await;
            tracing::info!(item = %item.title, %slot, "no artwork found");
            return Ok(Outcome::NoCandidate);
        };

        let min_width = match slot {
            ArtworkSlot::Poster => options.min_poster_width,
            ArtworkSlot::Background => options.min_background_width,
        };
        let Some(winner) = scoring::select_best(
            &candidates,
            slot,
            min_width,
            &options.provider_priority,
            &options.language,
        )
        .cloned() else {
            return Ok(Outcome::NoCandidate);
        };

        let now = self.clock.now();
        if options.dry_run {
            tracing::info!(
                item = %item.title,
                %slot,
                provider = %winner.provider,
                url = %winner.url,
                "[dry run] would set artwork"
            );
            // Remember the preview so repeated dry runs answer from the
            // cache instead of re-querying every provider.
            self.cache
                .put(ResolutionDecision::previewed(key, winner, now))
                .await;
            return Ok(Outcome::DryRun);
        }

        let previous = ArtworkRef {
            url: item.current_url(slot).map(str::to_string),
            auto_generated: slot == ArtworkSlot::Poster
                && item.artwork_auto_generated,
        };

        if options.final_approval {
            // The cache decision stays untouched until the proposal is
            // actually applied; the proposal store's merge already
            // deduplicates repeat resolutions of the key.
            self.proposals.upsert(
                key,
                &item.title,
                previous,
                winner,
                now,
            );
            tracing::info!(
                item = %item.title,
                %slot,
                "queued change proposal for approval"
            );
            return Ok(Outcome::ProposalQueued);
        }

        match self
            .media_server
            .upload_artwork(&item.id, slot, &winner.url)
            .await
        {
            Ok(()) => {
                let entry = HistoryEntry {
                    id: Uuid::new_v4(),
                    key: key.clone(),
                    item_title: item.title.clone(),
                    action: HistoryAction::Applied,
                    provider: winner.provider.clone(),
                    new_url: winner.url.clone(),
                    previous_url: previous.url.clone(),
                    recorded_at: now,
                };
                if let Err(err) = self.history.append(&entry).await {
                    tracing::warn!(%err, "failed to record history entry");
                }
                tracing::info!(
                    item = %item.title,
                    %slot,
                    provider = %winner.provider,
                    "artwork applied"
                );
                self.cache
                    .put(ResolutionDecision::resolved(key, winner, now))
                    .await;
                Ok(Outcome::Applied)
            }
            Err(err) => {
                tracing::warn!(
                    item = %item.title,
                    %slot,
                    %err,
                    "upload failed; keeping the winner as a pending proposal"
                );
                self.proposals.upsert(
                    key,
                    &item.title,
                    previous,
                    winner,
                    now,
                );
                Ok(Outcome::UploadFailed)
            }
        }
    }

    /// Whether the key can be answered without querying anyone: artwork
    /// already present, or a cached decision still stands.
    fn short_circuit(
        &self,
        item: &MediaItem,
        slot: ArtworkSlot,
        key: &ResolutionKey,
        options: &RunOptions,
    ) -> bool {
        let overwrite = options.effective_overwrite();
        let mut missing = !item.has_artwork(slot);
        if slot == ArtworkSlot::Poster
            && options.treat_generated_as_missing
            && item.artwork_auto_generated
        {
            missing = true;
        }
        if !missing && !overwrite {
            return true;
        }
        if overwrite {
            return false;
        }
        match self.cache.get(key) {
            Some(decision) => match decision.status {
                ResolutionStatus::Resolved => true,
                // A preview only answers other dry runs; a real run must
                // still resolve the key for real.
                ResolutionStatus::Previewed => options.dry_run,
                // A miss is only authoritative for the day it was
                // recorded; providers gain artwork over time.
                ResolutionStatus::NoCandidate => {
                    self.clock.local_date_of(decision.decided_at)
                        == self.clock.local_date()
                }
                ResolutionStatus::Skipped => false,
            },
            None => false,
        }
    }

    /// Walk providers in priority order until one yields candidates.
    /// Returns `None` when nobody did.
    async fn query_providers(
        &self,
        item: &MediaItem,
        slot: ArtworkSlot,
        providers: &[Arc<dyn Provider>],
        options: &RunOptions,
    ) -> Option<Vec<ArtworkCandidate>> {
        for provider in providers {
            let name = provider.name();
            if !self.provider_state.is_available(name) {
                tracing::debug!(
                    provider = name,
                    "unavailable (cooldown or quota); skipping"
                );
                continue;
            }
            if let Some(candidates) = self
                .query_with_retry(
                    provider.as_ref(),
                    item,
                    slot,
                    &options.language,
                )
                .await
                && !candidates.is_empty()
            {
                return Some(candidates);
            }
        }
        None
    }

    /// One provider query with bounded retries for transient failures.
    /// Auth and rate-limit failures are terminal for the provider within
    /// this run; cooldown bookkeeping happens here.
    async fn query_with_retry(
        &self,
        provider: &dyn Provider,
        item: &MediaItem,
        slot: ArtworkSlot,
        language: &str,
    ) -> Option<Vec<ArtworkCandidate>> {
        let name = provider.name();
        let mut attempt: u32 = 0;
        loop {
            // Reserve quota before the query goes out; a reservation
            // that fails here means another worker just took the last
            // unit (or a cooldown landed mid-retry).
            if !self.provider_state.try_charge(name) {
                tracing::debug!(
                    provider = name,
                    "quota or cooldown reached; giving up on provider"
                );
                return None;
            }
            self.stats.provider_query();
            match provider.search(item, slot, language).await {
                Ok(candidates) => return Some(candidates),
                Err(ProviderError::Auth) => {
                    self.provider_state
                        .record_failure(name, FailureKind::Auth);
                    return None;
                }
                Err(ProviderError::RateLimited) => {
                    self.provider_state
                        .record_failure(name, FailureKind::RateLimited);
                    return None;
                }
                Err(ProviderError::Transient(reason)) => {
                    if attempt >= TRANSIENT_RETRIES {
                        tracing::warn!(
                            provider = name,
                            %reason,
                            "giving up after repeated transient failures"
                        );
                        self.provider_state
                            .record_failure(name, FailureKind::Transient);
                        return None;
                    }
                    attempt += 1;
                    let jitter = rand::rng().random_range(0..100u64);
                    let delay = RETRY_BASE_DELAY * 2u32.pow(attempt)
                        + Duration::from_millis(jitter);
                    tracing::debug!(
                        provider = name,
                        attempt,
                        "transient failure; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
