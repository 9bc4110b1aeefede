//! Application-level configuration loading: quiz tunables, catalog and audio locations.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::quiz::{EngineSettings, matcher::DEFAULT_SUGGESTION_LIMIT};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "DREAD_QUIZ_CONFIG_PATH";

const DEFAULT_TOTAL_ROUNDS: usize = 10;
const DEFAULT_SETTLE_DELAY_MS: u64 = 2000;
const DEFAULT_ROUND_AUTOPLAY_DELAY_MS: u64 = 300;
const DEFAULT_HINT_AUTOPLAY_DELAY_MS: u64 = 500;
const DEFAULT_AUDIO_BASE_URL: &str = "/audio";

/// Reasons a configuration file is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A session needs at least one round.
    #[error("total_rounds must be at least 1")]
    NoRounds,
    /// Autocomplete needs room for at least one entry.
    #[error("suggestion_limit must be at least 1")]
    NoSuggestions,
    /// Audio sources need a base URL.
    #[error("audio_base_url must not be empty")]
    EmptyAudioBaseUrl,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    total_rounds: usize,
    settle_delay: Duration,
    round_autoplay_delay: Duration,
    hint_autoplay_delay: Duration,
    catalog_path: Option<PathBuf>,
    audio_base_url: String,
    audio_dir: Option<PathBuf>,
    rng_seed: Option<u64>,
    suggestion_limit: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json_str(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        rounds = app_config.total_rounds,
                        seeded = app_config.rng_seed.is_some(),
                        "loaded quiz settings from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to load config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse and validate a configuration document.
    pub fn from_json_str(contents: &str) -> anyhow::Result<Self> {
        let raw: RawConfig = serde_json::from_str(contents)?;
        Ok(raw.try_into()?)
    }

    /// Settings handed to the quiz engine.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            total_rounds: self.total_rounds,
            settle_delay: self.settle_delay,
            round_autoplay_delay: self.round_autoplay_delay,
            hint_autoplay_delay: self.hint_autoplay_delay,
            audio_base_url: self.audio_base_url.clone(),
            suggestion_limit: self.suggestion_limit,
        }
    }

    /// Catalog file replacing the embedded one, if any.
    pub fn catalog_path(&self) -> Option<&PathBuf> {
        self.catalog_path.as_ref()
    }

    /// Directory served under `/audio`, if any.
    pub fn audio_dir(&self) -> Option<&PathBuf> {
        self.audio_dir.as_ref()
    }

    /// Fixed seed for reproducible selection.
    pub fn rng_seed(&self) -> Option<u64> {
        self.rng_seed
    }

    /// Rounds per session.
    pub fn total_rounds(&self) -> usize {
        self.total_rounds
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            total_rounds: DEFAULT_TOTAL_ROUNDS,
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            round_autoplay_delay: Duration::from_millis(DEFAULT_ROUND_AUTOPLAY_DELAY_MS),
            hint_autoplay_delay: Duration::from_millis(DEFAULT_HINT_AUTOPLAY_DELAY_MS),
            catalog_path: None,
            audio_base_url: DEFAULT_AUDIO_BASE_URL.into(),
            audio_dir: None,
            rng_seed: None,
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    total_rounds: Option<usize>,
    settle_delay_ms: Option<u64>,
    round_autoplay_delay_ms: Option<u64>,
    hint_autoplay_delay_ms: Option<u64>,
    catalog_path: Option<PathBuf>,
    audio_base_url: Option<String>,
    audio_dir: Option<PathBuf>,
    rng_seed: Option<u64>,
    suggestion_limit: Option<usize>,
}

impl TryFrom<RawConfig> for AppConfig {
    type Error = ConfigError;

    fn try_from(value: RawConfig) -> Result<Self, Self::Error> {
        let total_rounds = value.total_rounds.unwrap_or(DEFAULT_TOTAL_ROUNDS);
        if total_rounds == 0 {
            return Err(ConfigError::NoRounds);
        }
        let suggestion_limit = value.suggestion_limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT);
        if suggestion_limit == 0 {
            return Err(ConfigError::NoSuggestions);
        }
        let audio_base_url = value
            .audio_base_url
            .unwrap_or_else(|| DEFAULT_AUDIO_BASE_URL.into());
        if audio_base_url.trim().is_empty() {
            return Err(ConfigError::EmptyAudioBaseUrl);
        }

        Ok(Self {
            total_rounds,
            settle_delay: Duration::from_millis(
                value.settle_delay_ms.unwrap_or(DEFAULT_SETTLE_DELAY_MS),
            ),
            round_autoplay_delay: Duration::from_millis(
                value
                    .round_autoplay_delay_ms
                    .unwrap_or(DEFAULT_ROUND_AUTOPLAY_DELAY_MS),
            ),
            hint_autoplay_delay: Duration::from_millis(
                value
                    .hint_autoplay_delay_ms
                    .unwrap_or(DEFAULT_HINT_AUTOPLAY_DELAY_MS),
            ),
            catalog_path: value.catalog_path,
            audio_base_url,
            audio_dir: value.audio_dir,
            rng_seed: value.rng_seed,
            suggestion_limit,
        })
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AppConfig::from_json_str("{}").unwrap();
        let settings = config.engine_settings();

        assert_eq!(settings.total_rounds, 10);
        assert_eq!(settings.settle_delay, Duration::from_millis(2000));
        assert_eq!(settings.round_autoplay_delay, Duration::from_millis(300));
        assert_eq!(settings.hint_autoplay_delay, Duration::from_millis(500));
        assert_eq!(settings.suggestion_limit, 8);
        assert!(config.catalog_path().is_none());
        assert!(config.rng_seed().is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_json_str(
            r#"{
                "total_rounds": 5,
                "settle_delay_ms": 100,
                "rng_seed": 42,
                "audio_base_url": "http://localhost:9000/audio/",
                "audio_dir": "public/audio"
            }"#,
        )
        .unwrap();

        assert_eq!(config.total_rounds(), 5);
        assert_eq!(config.rng_seed(), Some(42));
        assert_eq!(
            config.engine_settings().settle_delay,
            Duration::from_millis(100)
        );
        assert_eq!(config.audio_dir(), Some(&PathBuf::from("public/audio")));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = AppConfig::from_json_str(r#"{ "total_rounds": 0 }"#).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::NoRounds)
        );

        assert!(AppConfig::from_json_str(r#"{ "audio_base_url": " " }"#).is_err());
        assert!(AppConfig::from_json_str(r#"{ "unknown_key": true }"#).is_err());
    }
}
