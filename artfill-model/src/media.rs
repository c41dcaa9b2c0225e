use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ids::ItemId;

/// Media item kinds as reported by the media server.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    Show,
    Season,
    Episode,
    Collection,
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Movie => write!(f, "movie"),
            MediaKind::Show => write!(f, "show"),
            MediaKind::Season => write!(f, "season"),
            MediaKind::Episode => write!(f, "episode"),
            MediaKind::Collection => write!(f, "collection"),
        }
    }
}

/// The two artwork kinds tracked per item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ArtworkSlot {
    Poster,
    Background,
}

impl ArtworkSlot {
    /// Target aspect ratio (width / height) for candidates in this slot.
    pub fn target_aspect_ratio(&self) -> f64 {
        match self {
            ArtworkSlot::Poster => 2.0 / 3.0,
            ArtworkSlot::Background => 16.0 / 9.0,
        }
    }
}

impl Display for ArtworkSlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ArtworkSlot::Poster => write!(f, "poster"),
            ArtworkSlot::Background => write!(f, "background"),
        }
    }
}

/// Provider-specific external ids carried by a media item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvdb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb: Option<String>,
}

impl ExternalIds {
    pub fn is_empty(&self) -> bool {
        self.tmdb.is_none() && self.tvdb.is_none() && self.imdb.is_none()
    }
}

/// A media library as enumerated by the media server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub id: String,
    pub name: String,
    pub kind: MediaKind,
}

/// Read-only snapshot of a media item, refreshed once per run from the
/// media-server collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: ItemId,
    pub kind: MediaKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    #[serde(default)]
    pub external_ids: ExternalIds,
    /// Whether the item currently has a poster set.
    pub has_poster: bool,
    /// Whether the item currently has a background set.
    pub has_background: bool,
    /// URL of the current poster, when the media server exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    /// URL of the current background, when the media server exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_url: Option<String>,
    /// Signal from the media server that the current poster looks
    /// auto-generated (e.g. a frame grab) rather than real artwork.
    #[serde(default)]
    pub artwork_auto_generated: bool,
}

impl MediaItem {
    /// Whether the item currently has artwork in the given slot.
    pub fn has_artwork(&self, slot: ArtworkSlot) -> bool {
        match slot {
            ArtworkSlot::Poster => self.has_poster,
            ArtworkSlot::Background => self.has_background,
        }
    }

    /// URL of the current artwork in the given slot, when known.
    pub fn current_url(&self, slot: ArtworkSlot) -> Option<&str> {
        match slot {
            ArtworkSlot::Poster => self.poster_url.as_deref(),
            ArtworkSlot::Background => self.background_url.as_deref(),
        }
    }
}
