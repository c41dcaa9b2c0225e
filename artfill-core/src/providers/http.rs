//! Shared HTTP plumbing for provider clients: per-host request pacing,
//! per-call timeout, and the uniform status-to-error mapping.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::ProviderError;

pub(crate) struct ProviderHttp {
    client: reqwest::Client,
    min_interval: Duration,
    next_allowed: Mutex<Option<Instant>>,
}

impl std::fmt::Debug for ProviderHttp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHttp")
            .field("min_interval", &self.min_interval)
            .finish()
    }
}

impl ProviderHttp {
    /// `rate_per_sec` spaces request starts so a burst of items cannot
    /// hammer one provider host.
    pub fn new(timeout: Duration, rate_per_sec: f64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        let min_interval =
            Duration::from_secs_f64(1.0 / rate_per_sec.max(0.001));
        Self {
            client,
            min_interval,
            next_allowed: Mutex::new(None),
        }
    }

    async fn pace(&self) {
        let mut slot = self.next_allowed.lock().await;
        let now = Instant::now();
        if let Some(next) = *slot
            && now < next
        {
            tokio::time::sleep_until(next).await;
            *slot = Some(next + self.min_interval);
        } else {
            *slot = Some(now + self.min_interval);
        }
    }

    /// GET a JSON document. `Ok(None)` means the resource does not exist
    /// (HTTP 404), which providers surface as an empty candidate list.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        bearer: Option<&str>,
    ) -> Result<Option<T>, ProviderError> {
        self.pace().await;

        let mut request = self.client.get(url).query(query);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| ProviderError::Transient(err.to_string()))?;

        match map_status(response.status()) {
            StatusClass::Ok => response
                .json::<T>()
                .await
                .map(Some)
                .map_err(|err| ProviderError::Transient(err.to_string())),
            StatusClass::NotFound => Ok(None),
            StatusClass::Err(err) => Err(err),
        }
    }

    /// POST a JSON body and parse the JSON response (used by TVDb login).
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T, ProviderError> {
        self.pace().await;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| ProviderError::Transient(err.to_string()))?;

        match map_status(response.status()) {
            StatusClass::Ok => response
                .json::<T>()
                .await
                .map_err(|err| ProviderError::Transient(err.to_string())),
            StatusClass::NotFound => Err(ProviderError::Transient(
                "unexpected 404 from POST endpoint".into(),
            )),
            StatusClass::Err(err) => Err(err),
        }
    }
}

enum StatusClass {
    Ok,
    NotFound,
    Err(ProviderError),
}

fn map_status(status: reqwest::StatusCode) -> StatusClass {
    use reqwest::StatusCode;
    if status.is_success() {
        return StatusClass::Ok;
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StatusClass::Err(ProviderError::Auth)
        }
        StatusCode::TOO_MANY_REQUESTS => {
            StatusClass::Err(ProviderError::RateLimited)
        }
        StatusCode::NOT_FOUND => StatusClass::NotFound,
        status => StatusClass::Err(ProviderError::Transient(format!(
            "unexpected status {status}"
        ))),
    }
}

/// Deserialize a provider dimension field that may arrive as a number, a
/// numeric string, or garbage. Malformed values become zero (the lowest
/// candidate priority), never a fatal error.
pub(crate) fn lenient_dimension<'de, D>(
    deserializer: D,
) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
            .unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// Same leniency for vote/popularity fields.
pub(crate) fn lenient_vote<'de, D>(
    deserializer: D,
) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Dims {
        #[serde(default, deserialize_with = "lenient_dimension")]
        width: u32,
    }

    #[test]
    fn numeric_string_width_is_parsed() {
        let dims: Dims =
            serde_json::from_str(r#"{"width": "1920"}"#).unwrap();
        assert_eq!(dims.width, 1920);
    }

    #[test]
    fn malformed_width_becomes_zero() {
        let dims: Dims =
            serde_json::from_str(r#"{"width": "wide"}"#).unwrap();
        assert_eq!(dims.width, 0);
        let dims: Dims =
            serde_json::from_str(r#"{"width": -5}"#).unwrap();
        assert_eq!(dims.width, 0);
        let dims: Dims = serde_json::from_str(r#"{"width": null}"#).unwrap();
        assert_eq!(dims.width, 0);
    }

    #[test]
    fn status_mapping_matches_taxonomy() {
        use reqwest::StatusCode;
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED),
            StatusClass::Err(ProviderError::Auth)
        ));
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS),
            StatusClass::Err(ProviderError::RateLimited)
        ));
        assert!(matches!(
            map_status(StatusCode::NOT_FOUND),
            StatusClass::NotFound
        ));
        assert!(matches!(
            map_status(StatusCode::BAD_GATEWAY),
            StatusClass::Err(ProviderError::Transient(_))
        ));
    }
}
