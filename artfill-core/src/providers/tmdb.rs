use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use artfill_model::{ArtworkCandidate, ArtworkSlot, MediaItem, MediaKind};

use super::http::{ProviderHttp, lenient_dimension, lenient_vote};
use super::{Provider, ProviderError};

const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";
const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/original";

/// The Movie Database. Primary source for both slots; images carry full
/// dimensions, language, and vote data.
#[derive(Debug)]
pub struct TmdbProvider {
    http: ProviderHttp,
    api_key: String,
}

impl TmdbProvider {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: ProviderHttp::new(timeout, 2.0),
            api_key: api_key.into(),
        }
    }

    fn images_path(kind: MediaKind, tmdb_id: &str) -> String {
        match kind {
            MediaKind::Movie => format!("/movie/{tmdb_id}/images"),
            MediaKind::Collection => {
                format!("/collection/{tmdb_id}/images")
            }
            MediaKind::Show | MediaKind::Season | MediaKind::Episode => {
                format!("/tv/{tmdb_id}/images")
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct TmdbImages {
    #[serde(default)]
    posters: Vec<TmdbImage>,
    #[serde(default)]
    backdrops: Vec<TmdbImage>,
}

#[derive(Debug, Deserialize)]
struct TmdbImage {
    file_path: Option<String>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    width: u32,
    #[serde(default, deserialize_with = "lenient_dimension")]
    height: u32,
    iso_639_1: Option<String>,
    #[serde(default, deserialize_with = "lenient_vote")]
    vote_average: Option<f64>,
}

#[async_trait]
impl Provider for TmdbProvider {
    fn name(&self) -> &str {
        "tmdb"
    }

    async fn search(
        &self,
        item: &MediaItem,
        slot: ArtworkSlot,
        language: &str,
    ) -> Result<Vec<ArtworkCandidate>, ProviderError> {
        let Some(tmdb_id) = item.external_ids.tmdb.as_deref() else {
            return Ok(Vec::new());
        };

        let url = format!(
            "{TMDB_API_BASE}{}",
            Self::images_path(item.kind, tmdb_id)
        );
        let query = [
            ("api_key", self.api_key.clone()),
            (
                "include_image_language",
                format!("{language},null"),
            ),
        ];

        let Some(images) = self
            .http
            .get_json::<TmdbImages>(&url, &query, None)
            .await?
        else {
            return Ok(Vec::new());
        };

        let pool = match slot {
            ArtworkSlot::Poster => images.posters,
            ArtworkSlot::Background => images.backdrops,
        };

        Ok(pool
            .into_iter()
            .filter_map(|image| {
                let file_path = image.file_path?;
                Some(ArtworkCandidate {
                    provider: self.name().to_string(),
                    url: format!("{TMDB_IMAGE_BASE}{file_path}"),
                    width: image.width,
                    height: image.height,
                    language: image.iso_639_1,
                    vote: image.vote_average,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_parsing_builds_image_urls() {
        let raw = r#"{
            "posters": [
                {"file_path": "/abc.jpg", "width": 2000, "height": 3000,
                 "iso_639_1": "en", "vote_average": 5.4},
                {"width": 100, "height": 150}
            ],
            "backdrops": []
        }"#;
        let images: TmdbImages = serde_json::from_str(raw).unwrap();
        assert_eq!(images.posters.len(), 2);
        assert_eq!(images.posters[0].width, 2000);
        // Second poster has no file_path and would be filtered out.
        assert!(images.posters[1].file_path.is_none());
    }

    #[test]
    fn shows_and_seasons_use_the_tv_endpoint() {
        assert_eq!(
            TmdbProvider::images_path(MediaKind::Show, "42"),
            "/tv/42/images"
        );
        assert_eq!(
            TmdbProvider::images_path(MediaKind::Season, "42"),
            "/tv/42/images"
        );
        assert_eq!(
            TmdbProvider::images_path(MediaKind::Movie, "7"),
            "/movie/7/images"
        );
    }
}
