//! Polymorphic artwork providers.
//!
//! Every external image source implements [`Provider`]: one uniform
//! search contract returning a finite batch of candidates, with typed
//! failure signals. Providers never retry; retry policy belongs to the
//! resolver. A provider supplied by a plugin is just another registered
//! implementation.

mod fanart;
mod http;
mod omdb;
mod tmdb;
mod tvdb;

pub use fanart::FanartProvider;
pub use omdb::OmdbProvider;
pub use tmdb::TmdbProvider;
pub use tvdb::TvdbProvider;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use artfill_config::ProviderKeys;
use artfill_model::{ArtworkCandidate, ArtworkSlot, MediaItem};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Credentials rejected. The caller puts the provider in a long
    /// cooldown so one bad key cannot cause a retry storm.
    #[error("unauthorized")]
    Auth,

    /// Provider asked us to back off; temporarily unavailable without the
    /// long cooldown.
    #[error("rate limited")]
    RateLimited,

    /// Network failure, timeout, or provider 5xx. Eligible for a bounded
    /// retry by the resolver.
    #[error("transient error: {0}")]
    Transient(String),
}

/// Uniform search contract across all provider variants.
///
/// `NotFound` is not an error: an item unknown to the provider yields an
/// empty candidate list.
#[async_trait]
pub trait Provider: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    async fn search(
        &self,
        item: &MediaItem,
        slot: ArtworkSlot,
        language: &str,
    ) -> Result<Vec<ArtworkCandidate>, ProviderError>;
}

/// Name-keyed lookup table of provider instances.
///
/// The configured priority list is resolved against this table into an
/// explicit ordered list at run start; unknown names are skipped with a
/// warning rather than failing the run.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configured credentials. Providers without a
    /// key are left unregistered.
    pub fn from_keys(keys: &ProviderKeys, timeout: Duration) -> Self {
        let mut registry = Self::new();
        if let Some(key) = &keys.tmdb {
            registry.register(Arc::new(TmdbProvider::new(key, timeout)));
        }
        if let Some(key) = &keys.fanart {
            registry.register(Arc::new(FanartProvider::new(key, timeout)));
        }
        if let Some(key) = &keys.omdb {
            registry.register(Arc::new(OmdbProvider::new(key, timeout)));
        }
        if let Some(key) = &keys.tvdb {
            registry.register(Arc::new(TvdbProvider::new(key, timeout)));
        }
        registry
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        let name = provider.name().to_string();
        if self.providers.insert(name.clone(), provider).is_some() {
            tracing::warn!(provider = %name, "replacing registered provider");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> =
            self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Resolve a configured priority list into an ordered provider list.
    pub fn resolve_priority(
        &self,
        priority: &[String],
    ) -> Vec<Arc<dyn Provider>> {
        let mut resolved = Vec::with_capacity(priority.len());
        for name in priority {
            match self.get(name) {
                Some(provider) => resolved.push(provider),
                None => tracing::warn!(
                    provider = %name,
                    "provider in priority list is not configured; skipping"
                ),
            }
        }
        resolved
    }
}
