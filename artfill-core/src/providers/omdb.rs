use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use artfill_model::{ArtworkCandidate, ArtworkSlot, MediaItem};

use super::http::ProviderHttp;
use super::{Provider, ProviderError};

const OMDB_API_BASE: &str = "https://www.omdbapi.com/";

/// OMDb. Poster-only, looked up by IMDb id; reports no dimensions, so
/// its candidates rank after fully-sized ones.
#[derive(Debug)]
pub struct OmdbProvider {
    http: ProviderHttp,
    api_key: String,
}

impl OmdbProvider {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: ProviderHttp::new(timeout, 3.0),
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OmdbResponse {
    #[serde(rename = "Poster")]
    poster: Option<String>,
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Error")]
    error: Option<String>,
}

#[async_trait]
impl Provider for OmdbProvider {
    fn name(&self) -> &str {
        "omdb"
    }

    async fn search(
        &self,
        item: &MediaItem,
        slot: ArtworkSlot,
        _language: &str,
    ) -> Result<Vec<ArtworkCandidate>, ProviderError> {
        if slot != ArtworkSlot::Poster {
            return Ok(Vec::new());
        }
        let Some(imdb_id) = item.external_ids.imdb.as_deref() else {
            return Ok(Vec::new());
        };

        let query = [
            ("apikey", self.api_key.clone()),
            ("i", imdb_id.to_string()),
        ];
        let Some(response) = self
            .http
            .get_json::<OmdbResponse>(OMDB_API_BASE, &query, None)
            .await?
        else {
            return Ok(Vec::new());
        };

        // OMDb reports key problems in-band with a 200 status.
        if let Some(error) = &response.error
            && error.to_ascii_lowercase().contains("api key")
        {
            return Err(ProviderError::Auth);
        }
        if response.response.as_deref() == Some("False") {
            return Ok(Vec::new());
        }

        let poster = match response.poster {
            Some(url) if url != "N/A" => url,
            _ => return Ok(Vec::new()),
        };

        Ok(vec![ArtworkCandidate {
            provider: self.name().to_string(),
            url: poster,
            width: 0,
            height: 0,
            language: None,
            vote: None,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn na_poster_is_empty_result() {
        let raw = r#"{"Poster": "N/A", "Response": "True"}"#;
        let response: OmdbResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.poster.as_deref(), Some("N/A"));
    }

    #[test]
    fn error_body_parses() {
        let raw = r#"{"Response": "False", "Error": "Invalid API key!"}"#;
        let response: OmdbResponse = serde_json::from_str(raw).unwrap();
        assert!(
            response
                .error
                .unwrap()
                .to_ascii_lowercase()
                .contains("api key")
        );
    }
}
