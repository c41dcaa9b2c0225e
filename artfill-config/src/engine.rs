use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

fn default_timeout_secs() -> u64 {
    12
}

fn default_parallelism() -> usize {
    4
}

/// API credentials per provider. A provider with no key is considered
/// unconfigured and is left out of the resolved priority list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderKeys {
    pub tmdb: Option<String>,
    pub fanart: Option<String>,
    pub omdb: Option<String>,
    pub tvdb: Option<String>,
}

/// Engine-level configuration: everything that outlives a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the media server collaborator.
    pub media_server_url: Option<Url>,
    /// Auth token for the media server.
    pub media_server_token: Option<String>,
    pub provider_keys: ProviderKeys,
    /// Directory holding decisions, provider state, proposals, and history.
    pub storage_dir: PathBuf,
    /// Per-call HTTP timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Maximum items resolved concurrently during a run.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            media_server_url: None,
            media_server_token: None,
            provider_keys: ProviderKeys::default(),
            storage_dir: PathBuf::from(".artfill"),
            http_timeout_secs: default_timeout_secs(),
            parallelism: default_parallelism(),
        }
    }
}

impl EngineConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }
}
