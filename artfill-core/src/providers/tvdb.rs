use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use artfill_model::{ArtworkCandidate, ArtworkSlot, MediaItem, MediaKind};

use super::http::{ProviderHttp, lenient_dimension};
use super::{Provider, ProviderError};

const TVDB_API_BASE: &str = "https://api4.thetvdb.com/v4";

// TVDb v4 artwork type ids for series-level images.
const ARTWORK_TYPE_POSTER: i64 = 2;
const ARTWORK_TYPE_BACKGROUND: i64 = 3;

/// TheTVDB v4. Series only; the API key is exchanged for a bearer token
/// on first use and the token is cached for the life of the provider.
#[derive(Debug)]
pub struct TvdbProvider {
    http: ProviderHttp,
    api_key: String,
    token: Mutex<Option<String>>,
}

impl TvdbProvider {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: ProviderHttp::new(timeout, 1.0),
            api_key: api_key.into(),
            token: Mutex::new(None),
        }
    }

    async fn bearer_token(&self) -> Result<String, ProviderError> {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }
        let body = serde_json::json!({ "apikey": self.api_key });
        let login: TvdbLoginResponse = self
            .http
            .post_json(&format!("{TVDB_API_BASE}/login"), &body)
            .await?;
        let token = login
            .data
            .and_then(|data| data.token)
            .ok_or(ProviderError::Auth)?;
        *slot = Some(token.clone());
        Ok(token)
    }
}

#[derive(Debug, Deserialize)]
struct TvdbLoginResponse {
    data: Option<TvdbLoginData>,
}

#[derive(Debug, Deserialize)]
struct TvdbLoginData {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TvdbArtworksResponse {
    data: Option<TvdbSeriesExtended>,
}

#[derive(Debug, Deserialize)]
struct TvdbSeriesExtended {
    #[serde(default)]
    artworks: Vec<TvdbArtwork>,
}

#[derive(Debug, Deserialize)]
struct TvdbArtwork {
    image: Option<String>,
    #[serde(rename = "type")]
    kind: Option<i64>,
    language: Option<String>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    width: u32,
    #[serde(default, deserialize_with = "lenient_dimension")]
    height: u32,
    score: Option<f64>,
}

#[async_trait]
impl Provider for TvdbProvider {
    fn name(&self) -> &str {
        "tvdb"
    }

    async fn search(
        &self,
        item: &MediaItem,
        slot: ArtworkSlot,
        _language: &str,
    ) -> Result<Vec<ArtworkCandidate>, ProviderError> {
        match item.kind {
            MediaKind::Show | MediaKind::Season | MediaKind::Episode => {}
            _ => return Ok(Vec::new()),
        }
        let Some(tvdb_id) = item.external_ids.tvdb.as_deref() else {
            return Ok(Vec::new());
        };

        let token = self.bearer_token().await?;
        let url = format!("{TVDB_API_BASE}/series/{tvdb_id}/artworks");
        let result = self
            .http
            .get_json::<TvdbArtworksResponse>(&url, &[], Some(&token))
            .await;

        let response = match result {
            Ok(Some(response)) => response,
            Ok(None) => return Ok(Vec::new()),
            Err(ProviderError::Auth) => {
                // Cached token may have expired; drop it so the next call
                // performs a fresh login.
                self.token.lock().await.take();
                return Err(ProviderError::Auth);
            }
            Err(err) => return Err(err),
        };

        let wanted = match slot {
            ArtworkSlot::Poster => ARTWORK_TYPE_POSTER,
            ArtworkSlot::Background => ARTWORK_TYPE_BACKGROUND,
        };

        Ok(response
            .data
            .map(|series| series.artworks)
            .unwrap_or_default()
            .into_iter()
            .filter(|artwork| artwork.kind == Some(wanted))
            .filter_map(|artwork| {
                let url = artwork.image?;
                Some(ArtworkCandidate {
                    provider: self.name().to_string(),
                    url,
                    width: artwork.width,
                    height: artwork.height,
                    language: artwork.language,
                    vote: artwork.score,
                })
            })
            .collect())
    }
}
