//! Test doubles: a hand-driven clock, a scriptable provider, and an
//! in-memory media server.
//!
//! Compiled unconditionally so integration tests under `tests/` can use
//! them; nothing here is reachable from production wiring.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use dashmap::DashMap;

use artfill_model::{
    ArtworkCandidate, ArtworkSlot, ItemId, Library, MediaItem, MediaKind,
};

use crate::clock::Clock;
use crate::media_server::{MediaServer, MediaServerError};
use crate::providers::{Provider, ProviderError};

/// Deterministic clock advanced explicitly by tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        // Midday, far from a date boundary.
        Self::at(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    fn local_date(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn local_date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.date_naive()
    }
}

/// One scripted reaction of a [`ScriptedProvider`].
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Candidates(Vec<ArtworkCandidate>),
    Auth,
    RateLimited,
    Transient,
}

impl ScriptedResponse {
    fn into_result(self) -> Result<Vec<ArtworkCandidate>, ProviderError> {
        match self {
            ScriptedResponse::Candidates(candidates) => Ok(candidates),
            ScriptedResponse::Auth => Err(ProviderError::Auth),
            ScriptedResponse::RateLimited => {
                Err(ProviderError::RateLimited)
            }
            ScriptedResponse::Transient => Err(ProviderError::Transient(
                "scripted transient failure".to_string(),
            )),
        }
    }
}

/// Provider double returning queued responses, then a fixed fallback.
/// Counts every search call.
#[derive(Debug)]
pub struct ScriptedProvider {
    name: String,
    script: Mutex<VecDeque<ScriptedResponse>>,
    fallback: ScriptedResponse,
    calls: AtomicU64,
}

impl ScriptedProvider {
    pub fn new(
        name: impl Into<String>,
        fallback: ScriptedResponse,
    ) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicU64::new(0),
        }
    }

    /// Always answers with zero candidates.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, ScriptedResponse::Candidates(Vec::new()))
    }

    /// Always answers with the same candidate list.
    pub fn always(
        name: impl Into<String>,
        candidates: Vec<ArtworkCandidate>,
    ) -> Self {
        Self::new(name, ScriptedResponse::Candidates(candidates))
    }

    /// Queue a one-shot response consumed before the fallback applies.
    pub fn push(&self, response: ScriptedResponse) {
        self.script.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(
        &self,
        _item: &MediaItem,
        _slot: ArtworkSlot,
        _language: &str,
    ) -> Result<Vec<ArtworkCandidate>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        next.into_result()
    }
}

/// Record of one accepted upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub item_id: ItemId,
    pub slot: ArtworkSlot,
    pub url: String,
}

/// In-memory media server. Accepted uploads update the stored item's
/// artwork flags, so a follow-up run sees the slot as filled.
#[derive(Debug, Default)]
pub struct MemoryMediaServer {
    libraries: Mutex<Vec<Library>>,
    items: DashMap<String, Vec<MediaItem>>,
    uploads: Mutex<Vec<UploadRecord>>,
    fail_uploads: AtomicBool,
}

impl MemoryMediaServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_library(&self, library: Library, items: Vec<MediaItem>) {
        self.items.insert(library.id.clone(), items);
        self.libraries.lock().unwrap().push(library);
    }

    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaServer for MemoryMediaServer {
    async fn list_libraries(
        &self,
    ) -> Result<Vec<Library>, MediaServerError> {
        Ok(self.libraries.lock().unwrap().clone())
    }

    async fn list_items(
        &self,
        library: &Library,
    ) -> Result<Vec<MediaItem>, MediaServerError> {
        Ok(self
            .items
            .get(&library.id)
            .map(|items| items.clone())
            .unwrap_or_default())
    }

    async fn upload_artwork(
        &self,
        item_id: &ItemId,
        slot: ArtworkSlot,
        image_url: &str,
    ) -> Result<(), MediaServerError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(MediaServerError::UploadRejected(
                "scripted upload failure".to_string(),
            ));
        }
        for mut entry in self.items.iter_mut() {
            for item in entry.value_mut().iter_mut() {
                if &item.id == item_id {
                    match slot {
                        ArtworkSlot::Poster => {
                            item.has_poster = true;
                            item.poster_url =
                                Some(image_url.to_string());
                            item.artwork_auto_generated = false;
                        }
                        ArtworkSlot::Background => {
                            item.has_background = true;
                            item.background_url =
                                Some(image_url.to_string());
                        }
                    }
                }
            }
        }
        self.uploads.lock().unwrap().push(UploadRecord {
            item_id: item_id.clone(),
            slot,
            url: image_url.to_string(),
        });
        Ok(())
    }
}

/// A movie with no artwork at all, TMDb id equal to its item id.
pub fn movie(id: &str, title: &str) -> MediaItem {
    MediaItem {
        id: ItemId::from(id),
        kind: MediaKind::Movie,
        title: title.to_string(),
        year: Some(2020),
        external_ids: artfill_model::ExternalIds {
            tmdb: Some(id.to_string()),
            ..Default::default()
        },
        has_poster: false,
        has_background: false,
        poster_url: None,
        background_url: None,
        artwork_auto_generated: false,
    }
}

pub fn movie_library(id: &str, name: &str) -> Library {
    Library {
        id: id.to_string(),
        name: name.to_string(),
        kind: MediaKind::Movie,
    }
}

pub fn poster_candidate(
    provider: &str,
    url: &str,
    width: u32,
    height: u32,
) -> ArtworkCandidate {
    ArtworkCandidate {
        provider: provider.to_string(),
        url: url.to_string(),
        width,
        height,
        language: Some("en".to_string()),
        vote: None,
    }
}
