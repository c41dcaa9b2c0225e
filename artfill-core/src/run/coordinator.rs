//! Walks the media library and feeds every (item, slot) key to the
//! resolver, with bounded concurrency and cooperative stop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;

use artfill_config::RunOptions;
use artfill_model::{ArtworkSlot, MediaItem, MediaKind, RunStatsSnapshot};

use crate::cache::ResolutionCache;
use crate::error::{EngineError, Result};
use crate::media_server::MediaServer;
use crate::proposals::ProposalStore;
use crate::provider_state::ProviderStateStore;
use crate::providers::{Provider, ProviderRegistry};
use crate::resolver::{Outcome, Resolver};
use crate::run::RunStats;

pub struct RunCoordinator {
    resolver: Arc<Resolver>,
    media_server: Arc<dyn MediaServer>,
    cache: Arc<ResolutionCache>,
    provider_state: Arc<ProviderStateStore>,
    proposals: Arc<ProposalStore>,
    stats: Arc<RunStats>,
    stop: Arc<AtomicBool>,
    parallelism: usize,
}

impl std::fmt::Debug for RunCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunCoordinator")
            .field("parallelism", &self.parallelism)
            .finish()
    }
}

impl RunCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        resolver: Arc<Resolver>,
        media_server: Arc<dyn MediaServer>,
        cache: Arc<ResolutionCache>,
        provider_state: Arc<ProviderStateStore>,
        proposals: Arc<ProposalStore>,
        stats: Arc<RunStats>,
        stop: Arc<AtomicBool>,
        parallelism: usize,
    ) -> Self {
        Self {
            resolver,
            media_server,
            cache,
            provider_state,
            proposals,
            stats,
            stop,
            parallelism: parallelism.max(1),
        }
    }

    /// Execute one full run. State is flushed at the end even when the
    /// scan fails partway.
    pub async fn execute(
        &self,
        registry: &ProviderRegistry,
        options: &RunOptions,
    ) -> Result<RunStatsSnapshot> {
        let providers =
            registry.resolve_priority(&options.provider_priority);
        if providers.is_empty() {
            return Err(EngineError::NoUsableProvider);
        }
        let names: Vec<String> = providers
            .iter()
            .map(|provider| provider.name().to_string())
            .collect();
        self.provider_state.ensure_known(&names);
        self.provider_state.reset_if_due();
        if !names
            .iter()
            .any(|name| self.provider_state.is_available(name))
        {
            tracing::warn!(
                "every configured provider is in cooldown or out of quota"
            );
            return Err(EngineError::NoUsableProvider);
        }

        let result = self.scan(&providers, options).await;
        self.finalize().await;
        result.map(|()| self.stats.snapshot())
    }

    async fn scan(
        &self,
        providers: &[Arc<dyn Provider>],
        options: &RunOptions,
    ) -> Result<()> {
        let libraries = self.media_server.list_libraries().await?;
        for library in &libraries {
            if !options.libraries.includes(&library.name) {
                continue;
            }
            if self.stop.load(Ordering::SeqCst) {
                tracing::info!("stop requested; ending scan early");
                break;
            }
            let items = match self.media_server.list_items(library).await
            {
                Ok(items) => items,
                Err(err) => {
                    self.stats.error();
                    tracing::warn!(
                        library = %library.name,
                        %err,
                        "failed to list items; skipping library"
                    );
                    continue;
                }
            };
            tracing::info!(
                library = %library.name,
                items = items.len(),
                "scanning library"
            );
            futures::stream::iter(items)
                .for_each_concurrent(self.parallelism, |item| async move {
                    self.process_item(&item, providers, options).await;
                })
                .await;
        }
        Ok(())
    }

    /// Resolve both slots of one item. Failures are isolated: an error
    /// on one key is counted and the scan moves on.
    async fn process_item(
        &self,
        item: &MediaItem,
        providers: &[Arc<dyn Provider>],
        options: &RunOptions,
    ) {
        if self.stop.load(Ordering::SeqCst) {
            return;
        }
        if !kind_included(item.kind, options) {
            return;
        }
        self.stats.item_scanned();

        let mut slots = vec![ArtworkSlot::Poster];
        if options.include_backgrounds {
            slots.push(ArtworkSlot::Background);
        }
        for slot in slots {
            if self.stop.load(Ordering::SeqCst) {
                return;
            }
            match self
                .resolver
                .resolve(item, slot, providers, options)
                .await
            {
                Ok(outcome) => self.record_outcome(outcome),
                Err(err) => {
                    self.stats.error();
                    tracing::warn!(
                        item = %item.title,
                        %slot,
                        %err,
                        "resolution failed"
                    );
                }
            }
        }
    }

    fn record_outcome(&self, outcome: Outcome) {
        match outcome {
            Outcome::Skipped => self.stats.key_skipped(),
            Outcome::DryRun => self.stats.dry_run_decision(),
            Outcome::ProposalQueued => self.stats.proposal_created(),
            Outcome::Applied => self.stats.artwork_applied(),
            Outcome::NoCandidate => self.stats.no_candidate(),
            Outcome::UploadFailed => {
                self.stats.proposal_created();
                self.stats.error();
            }
        }
    }

    /// Flush everything durable, retrying each store once. A flush that
    /// fails twice is logged and abandoned; the in-memory state is still
    /// intact for the next attempt.
    async fn finalize(&self) {
        if let Err(err) = self.cache.flush().await {
            tracing::warn!(%err, "decision cache flush failed; retrying");
            if let Err(err) = self.cache.flush().await {
                tracing::error!(%err, "decision cache flush failed twice");
            }
        }
        if let Err(err) = self.provider_state.persist().await {
            tracing::warn!(%err, "provider state save failed; retrying");
            if let Err(err) = self.provider_state.persist().await {
                tracing::error!(%err, "provider state save failed twice");
            }
        }
        if let Err(err) = self.proposals.persist().await {
            tracing::warn!(%err, "proposal save failed; retrying");
            if let Err(err) = self.proposals.persist().await {
                tracing::error!(%err, "proposal save failed twice");
            }
        }
    }
}

fn kind_included(kind: MediaKind, options: &RunOptions) -> bool {
    match kind {
        MediaKind::Movie | MediaKind::Show => true,
        MediaKind::Season => options.include_seasons,
        MediaKind::Episode => options.include_episodes,
        MediaKind::Collection => options.include_collections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seasons_and_episodes_are_opt_in() {
        let options = RunOptions::default();
        assert!(kind_included(MediaKind::Movie, &options));
        assert!(kind_included(MediaKind::Show, &options));
        assert!(!kind_included(MediaKind::Season, &options));
        assert!(!kind_included(MediaKind::Episode, &options));
        assert!(!kind_included(MediaKind::Collection, &options));
    }
}
