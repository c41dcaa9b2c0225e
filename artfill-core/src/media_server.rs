//! Interface to the media-server collaborator.
//!
//! The engine only ever sees the media server through this trait: item
//! enumeration with current artwork state, and the upload contract for
//! applying a change.

use async_trait::async_trait;
use thiserror::Error;

use artfill_model::{ArtworkSlot, ItemId, Library, MediaItem};

#[derive(Debug, Error)]
pub enum MediaServerError {
    #[error("media server unreachable: {0}")]
    Unreachable(String),

    #[error("media server rejected credentials")]
    Unauthorized,

    #[error("upload rejected: {0}")]
    UploadRejected(String),
}

#[async_trait]
pub trait MediaServer: Send + Sync + std::fmt::Debug {
    async fn list_libraries(
        &self,
    ) -> Result<Vec<Library>, MediaServerError>;

    async fn list_items(
        &self,
        library: &Library,
    ) -> Result<Vec<MediaItem>, MediaServerError>;

    /// Point the given slot of the item at a new image URL. The media
    /// server fetches the bytes itself.
    async fn upload_artwork(
        &self,
        item_id: &ItemId,
        slot: ArtworkSlot,
        image_url: &str,
    ) -> Result<(), MediaServerError>;
}
