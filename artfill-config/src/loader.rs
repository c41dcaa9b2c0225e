use std::path::Path;

use thiserror::Error;

use crate::engine::EngineConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Load engine configuration from an optional TOML file, then layer
/// environment overrides on top. `.env` files are honored the same way
/// the original tool honored `python-dotenv`.
pub fn load_engine_config(
    path: Option<&Path>,
) -> Result<EngineConfig, ConfigError> {
    // Best-effort; a missing .env file is not an error.
    let _ = dotenvy::dotenv();

    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|source| {
                ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                }
            })?;
            toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?
        }
        None => EngineConfig::default(),
    };

    apply_env_overrides(&mut config)?;
    validate(&config)?;
    Ok(config)
}

fn apply_env_overrides(
    config: &mut EngineConfig,
) -> Result<(), ConfigError> {
    if let Ok(raw) = std::env::var("ARTFILL_MEDIA_SERVER_URL") {
        let url = raw.parse().map_err(|err| {
            ConfigError::Invalid(format!(
                "ARTFILL_MEDIA_SERVER_URL is not a valid URL: {err}"
            ))
        })?;
        config.media_server_url = Some(url);
    }
    if let Ok(token) = std::env::var("ARTFILL_MEDIA_SERVER_TOKEN") {
        config.media_server_token = Some(token);
    }
    if let Ok(key) = std::env::var("TMDB_API_KEY") {
        config.provider_keys.tmdb = Some(key);
    }
    if let Ok(key) = std::env::var("FANART_API_KEY") {
        config.provider_keys.fanart = Some(key);
    }
    if let Ok(key) = std::env::var("OMDB_API_KEY") {
        config.provider_keys.omdb = Some(key);
    }
    if let Ok(key) = std::env::var("TVDB_API_KEY") {
        config.provider_keys.tvdb = Some(key);
    }
    if let Ok(dir) = std::env::var("ARTFILL_STORAGE_DIR") {
        config.storage_dir = dir.into();
    }
    Ok(())
}

fn validate(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.parallelism == 0 {
        return Err(ConfigError::Invalid(
            "parallelism must be at least 1".into(),
        ));
    }
    if config.http_timeout_secs == 0 {
        tracing::warn!("http_timeout_secs of 0 clamped to 1");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
storage_dir = "/tmp/artfill-test"
http_timeout_secs = 7

[provider_keys]
tmdb = "abc123"
"#
        )
        .unwrap();

        let config = load_engine_config(Some(file.path())).unwrap();
        assert_eq!(config.http_timeout_secs, 7);
        assert_eq!(config.provider_keys.tmdb.as_deref(), Some("abc123"));
        assert_eq!(
            config.storage_dir,
            std::path::PathBuf::from("/tmp/artfill-test")
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        let err =
            load_engine_config(Some(Path::new("/nonexistent/config.toml")))
                .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn zero_parallelism_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "parallelism = 0").unwrap();
        let err = load_engine_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
