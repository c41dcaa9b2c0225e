//! Durable memo of per-key resolution decisions.
//!
//! The cache is what makes runs idempotent: a key with a recorded
//! decision is not re-resolved unless overwrite semantics demand it.
//! Writes are batched; a flush happens once enough decisions accumulate
//! or enough time has passed, plus an unconditional flush at run end.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;

use artfill_model::{ResolutionDecision, ResolutionKey};

use crate::error::Result;
use crate::storage::StateStore;

pub const DECISIONS_FILE: &str = "decisions.json";

const FLUSH_EVERY_DECISIONS: usize = 50;
const FLUSH_INTERVAL: Duration = Duration::from_secs(60);

/// Concurrent decision map with batched persistence. Flush failures are
/// non-fatal for callers on the hot path; only the explicit end-of-run
/// [`ResolutionCache::flush`] reports them.
#[derive(Debug)]
pub struct ResolutionCache {
    decisions: DashMap<ResolutionKey, ResolutionDecision>,
    store: Arc<dyn StateStore>,
    dirty: AtomicUsize,
    last_flush: Mutex<Instant>,
}

impl ResolutionCache {
    pub async fn load(store: Arc<dyn StateStore>) -> Result<Self> {
        let decisions = DashMap::new();
        if let Some(bytes) = store.load(DECISIONS_FILE).await? {
            match serde_json::from_slice::<Vec<ResolutionDecision>>(&bytes)
            {
                Ok(loaded) => {
                    for decision in loaded {
                        decisions.insert(decision.key.clone(), decision);
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        %err,
                        "decision cache unreadable; starting empty"
                    );
                }
            }
        }
        Ok(Self {
            decisions,
            store,
            dirty: AtomicUsize::new(0),
            last_flush: Mutex::new(Instant::now()),
        })
    }

    pub fn get(&self, key: &ResolutionKey) -> Option<ResolutionDecision> {
        self.decisions.get(key).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    /// Record a decision, overwriting any earlier one for the key, and
    /// flush opportunistically when a batch threshold is reached.
    pub async fn put(&self, decision: ResolutionDecision) {
        self.decisions.insert(decision.key.clone(), decision);
        self.dirty.fetch_add(1, Ordering::Relaxed);
        self.maybe_flush().await;
    }

    async fn maybe_flush(&self) {
        let due_by_count =
            self.dirty.load(Ordering::Relaxed) >= FLUSH_EVERY_DECISIONS;
        let due_by_time = match self.last_flush.try_lock() {
            Ok(last) => last.elapsed() >= FLUSH_INTERVAL,
            // Another task is mid-flush; nothing to do.
            Err(_) => false,
        };
        if (due_by_count || due_by_time)
            && let Err(err) = self.flush().await
        {
            tracing::warn!(%err, "decision cache flush failed; continuing");
        }
    }

    /// Serialize every decision and replace the backing document
    /// atomically.
    pub async fn flush(&self) -> Result<()> {
        let mut last_flush = self.last_flush.lock().await;
        let mut snapshot: Vec<ResolutionDecision> = self
            .decisions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        snapshot.sort_by(|a, b| {
            (a.key.item_id.as_str(), a.key.slot.to_string())
                .cmp(&(b.key.item_id.as_str(), b.key.slot.to_string()))
        });
        let bytes = serde_json::to_vec_pretty(&snapshot)?;
        self.store.save(DECISIONS_FILE, &bytes).await?;
        self.dirty.store(0, Ordering::Relaxed);
        *last_flush = Instant::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use artfill_model::{ArtworkSlot, ItemId};
    use chrono::Utc;

    fn key(id: &str, slot: ArtworkSlot) -> ResolutionKey {
        ResolutionKey::new(ItemId::from(id), slot)
    }

    #[tokio::test]
    async fn put_overwrites_in_place() {
        let cache = ResolutionCache::load(Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        let k = key("m1", ArtworkSlot::Poster);
        cache
            .put(ResolutionDecision::no_candidate(k.clone(), Utc::now()))
            .await;
        cache
            .put(ResolutionDecision::skipped(k.clone(), Utc::now()))
            .await;

        assert_eq!(cache.len(), 1);
        let decision = cache.get(&k).unwrap();
        assert_eq!(
            decision.status,
            artfill_model::ResolutionStatus::Skipped
        );
    }

    #[tokio::test]
    async fn batch_threshold_triggers_a_flush() {
        let store = Arc::new(MemoryStore::new());
        let cache =
            ResolutionCache::load(store.clone()).await.unwrap();
        for n in 0..50 {
            let k = key(&format!("m{n}"), ArtworkSlot::Poster);
            cache
                .put(ResolutionDecision::no_candidate(k, Utc::now()))
                .await;
        }
        let bytes = store.load(DECISIONS_FILE).await.unwrap().unwrap();
        let persisted: Vec<ResolutionDecision> =
            serde_json::from_slice(&bytes).unwrap();
        assert_eq!(persisted.len(), 50);
    }

    #[tokio::test]
    async fn explicit_flush_survives_reload() {
        let store = Arc::new(MemoryStore::new());
        let cache =
            ResolutionCache::load(store.clone()).await.unwrap();
        let k = key("m1", ArtworkSlot::Background);
        cache
            .put(ResolutionDecision::no_candidate(k.clone(), Utc::now()))
            .await;
        cache.flush().await.unwrap();

        let reloaded = ResolutionCache::load(store).await.unwrap();
        assert!(reloaded.get(&k).is_some());
    }

    #[tokio::test]
    async fn corrupt_cache_file_starts_empty() {
        let store = Arc::new(MemoryStore::new());
        store.save(DECISIONS_FILE, b"not json").await.unwrap();
        let cache = ResolutionCache::load(store).await.unwrap();
        assert!(cache.is_empty());
    }
}
