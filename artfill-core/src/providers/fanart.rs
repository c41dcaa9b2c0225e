use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use artfill_model::{ArtworkCandidate, ArtworkSlot, MediaItem, MediaKind};

use super::http::{ProviderHttp, lenient_dimension, lenient_vote};
use super::{Provider, ProviderError};

const FANART_API_BASE: &str = "https://webservice.fanart.tv/v3";

/// Fanart.tv. Movies are looked up by TMDb id, shows by TVDb id.
/// Dimension fields arrive as strings and are normalized leniently.
#[derive(Debug)]
pub struct FanartProvider {
    http: ProviderHttp,
    api_key: String,
}

impl FanartProvider {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: ProviderHttp::new(timeout, 1.0),
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FanartResponse {
    #[serde(default)]
    movieposter: Vec<FanartImage>,
    #[serde(default)]
    tvposter: Vec<FanartImage>,
    #[serde(default)]
    moviebackground: Vec<FanartImage>,
    #[serde(default)]
    showbackground: Vec<FanartImage>,
    #[serde(default)]
    fanart: Vec<FanartImage>,
}

#[derive(Debug, Deserialize)]
struct FanartImage {
    url: Option<String>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    width: u32,
    #[serde(default, deserialize_with = "lenient_dimension")]
    height: u32,
    lang: Option<String>,
    #[serde(default, deserialize_with = "lenient_vote")]
    likes: Option<f64>,
}

#[async_trait]
impl Provider for FanartProvider {
    fn name(&self) -> &str {
        "fanart"
    }

    async fn search(
        &self,
        item: &MediaItem,
        slot: ArtworkSlot,
        _language: &str,
    ) -> Result<Vec<ArtworkCandidate>, ProviderError> {
        let url = match item.kind {
            MediaKind::Movie => {
                let Some(tmdb_id) = item.external_ids.tmdb.as_deref()
                else {
                    return Ok(Vec::new());
                };
                format!("{FANART_API_BASE}/movies/{tmdb_id}")
            }
            MediaKind::Show | MediaKind::Season | MediaKind::Episode => {
                let Some(tvdb_id) = item.external_ids.tvdb.as_deref()
                else {
                    return Ok(Vec::new());
                };
                format!("{FANART_API_BASE}/tv/{tvdb_id}")
            }
            MediaKind::Collection => return Ok(Vec::new()),
        };

        let query = [("api_key", self.api_key.clone())];
        let Some(response) = self
            .http
            .get_json::<FanartResponse>(&url, &query, None)
            .await?
        else {
            return Ok(Vec::new());
        };

        let pool: Vec<FanartImage> = match slot {
            ArtworkSlot::Poster => response
                .movieposter
                .into_iter()
                .chain(response.tvposter)
                .collect(),
            ArtworkSlot::Background => response
                .moviebackground
                .into_iter()
                .chain(response.showbackground)
                .chain(response.fanart)
                .collect(),
        };

        Ok(pool
            .into_iter()
            .filter_map(|image| {
                let url = image.url?;
                Some(ArtworkCandidate {
                    provider: self.name().to_string(),
                    url,
                    width: image.width,
                    height: image.height,
                    language: image.lang.filter(|l| !l.is_empty()),
                    vote: image.likes,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_widths_are_normalized() {
        let raw = r#"{
            "movieposter": [
                {"url": "https://img/1.jpg", "width": "1000",
                 "height": "1426", "lang": "en", "likes": "7"},
                {"url": "https://img/2.jpg", "width": "not-a-number"}
            ]
        }"#;
        let response: FanartResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.movieposter[0].width, 1000);
        assert_eq!(response.movieposter[0].likes, Some(7.0));
        assert_eq!(response.movieposter[1].width, 0);
    }

    #[test]
    fn unknown_sections_are_ignored() {
        let raw = r#"{"hdmovielogo": [{"url": "x"}]}"#;
        let response: FanartResponse = serde_json::from_str(raw).unwrap();
        assert!(response.movieposter.is_empty());
    }
}
