//! Configuration loading and startup mode selection.
//!
//! Settings live in a TOML file under the platform config directory (or an
//! explicit `--config` path); every field has a default so a missing file
//! means a default configuration, not an error. The arbiter credential is
//! resolved once at startup into an explicit [`ArbiterMode`] — the router
//! never re-checks credential presence per call.

use crate::sentiment::arbiter::{
    DEFAULT_API_BASE, DEFAULT_ARBITER_MODEL, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TIMEOUT_SECS,
};
use crate::sentiment::router::DEFAULT_ESCALATION_THRESHOLD;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable consulted when the config file carries no key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

// ── Config schema ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sentiment: SentimentConfig,
    pub arbiter: ArbiterConfig,
    pub storage: StorageConfig,
}

/// Routing policy knobs. Neither value is derived from a labeled
/// validation set; both are tunable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    /// Local confidence below which the arbiter is consulted.
    pub escalation_threshold: f64,
    /// Always double-check negative local verdicts with the arbiter.
    pub double_check_negative: bool,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            escalation_threshold: DEFAULT_ESCALATION_THRESHOLD,
            double_check_negative: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    /// Base URL of the OpenAI-compatible service.
    pub api_base: String,
    /// Arbiter model name.
    pub model: String,
    /// Cap on arbiter reply tokens.
    pub max_output_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// API key. Usually left unset in the file and provided via the
    /// `OPENAI_API_KEY` environment variable instead.
    pub api_key: Option<String>,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_ARBITER_MODEL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Review database path. Defaults to the platform data directory.
    pub db_path: Option<PathBuf>,
}

// ── Arbiter mode ─────────────────────────────────────────────────

/// Operating mode, selected once at startup from credential presence.
/// A missing credential is not an error: the system runs local-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArbiterMode {
    LocalOnly,
    Hybrid { api_key: String },
}

// ── Loading ──────────────────────────────────────────────────────

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist and parse. Without one, the default
    /// location is used when present, and defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let resolved = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_config_path().filter(|p| p.is_file()),
        };

        let mut config = match resolved {
            Some(p) => {
                let raw = std::fs::read_to_string(&p)
                    .with_context(|| format!("failed to read config file {}", p.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("failed to parse config file {}", p.display()))?
            }
            None => Self::default(),
        };

        let threshold = config.sentiment.escalation_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            let clamped = threshold.clamp(0.0, 1.0);
            tracing::warn!(
                threshold,
                clamped,
                "escalation_threshold outside [0, 1]; clamping"
            );
            config.sentiment.escalation_threshold = clamped;
        }

        Ok(config)
    }

    /// `config.toml` in the platform config directory.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "reelsense")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Resolve the operating mode from the configured credential, falling
    /// back to the environment. An empty key counts as absent.
    pub fn arbiter_mode(&self) -> ArbiterMode {
        let env_key = std::env::var(API_KEY_ENV).ok();
        self.arbiter_mode_with(env_key)
    }

    fn arbiter_mode_with(&self, env_key: Option<String>) -> ArbiterMode {
        let key = self
            .arbiter
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or(env_key.filter(|k| !k.is_empty()));

        match key {
            Some(api_key) => ArbiterMode::Hybrid { api_key },
            None => ArbiterMode::LocalOnly,
        }
    }

    /// Resolve the review database path: CLI override first, then the
    /// config file, then the platform data directory. Creates the parent
    /// directory when needed.
    pub fn db_path(&self, override_path: Option<&Path>) -> Result<PathBuf> {
        let path = override_path
            .map(Path::to_path_buf)
            .or_else(|| self.storage.db_path.clone())
            .or_else(|| {
                directories::ProjectDirs::from("", "", "reelsense")
                    .map(|dirs| dirs.data_dir().join("reviews.db3"))
            })
            .context("could not determine a database path for this platform")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        Ok(path)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.sentiment.escalation_threshold, 0.8);
        assert!(config.sentiment.double_check_negative);
        assert_eq!(config.arbiter.model, "gpt-5-mini");
        assert_eq!(config.arbiter.max_output_tokens, 256);
        assert!(config.arbiter.api_key.is_none());
        assert!(config.storage.db_path.is_none());
    }

    #[test]
    fn load_missing_explicit_path_fails() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn load_parses_partial_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            "[sentiment]\nescalation_threshold = 0.7\n\n[arbiter]\nmodel = \"gpt-5\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.sentiment.escalation_threshold, 0.7);
        assert!(config.sentiment.double_check_negative);
        assert_eq!(config.arbiter.model, "gpt-5");
        assert_eq!(config.arbiter.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn load_rejects_malformed_toml() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "sentiment = [broken").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn out_of_range_threshold_is_clamped() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[sentiment]\nescalation_threshold = 1.5\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.sentiment.escalation_threshold, 1.0);
    }

    #[test]
    fn config_key_takes_priority_over_env() {
        let mut config = Config::default();
        config.arbiter.api_key = Some("file-key".into());
        assert_eq!(
            config.arbiter_mode_with(Some("env-key".into())),
            ArbiterMode::Hybrid {
                api_key: "file-key".into()
            }
        );
    }

    #[test]
    fn env_key_is_the_fallback() {
        let config = Config::default();
        assert_eq!(
            config.arbiter_mode_with(Some("env-key".into())),
            ArbiterMode::Hybrid {
                api_key: "env-key".into()
            }
        );
    }

    #[test]
    fn empty_keys_mean_local_only() {
        let mut config = Config::default();
        config.arbiter.api_key = Some(String::new());
        assert_eq!(
            config.arbiter_mode_with(Some(String::new())),
            ArbiterMode::LocalOnly
        );
        assert_eq!(config.arbiter_mode_with(None), ArbiterMode::LocalOnly);
    }

    #[test]
    fn db_path_override_wins_and_parent_is_created() {
        let tmp = tempfile::TempDir::new().unwrap();
        let target = tmp.path().join("nested/dir/reviews.db3");
        let config = Config::default();
        let path = config.db_path(Some(&target)).unwrap();
        assert_eq!(path, target);
        assert!(target.parent().unwrap().is_dir());
    }

    #[test]
    fn db_path_falls_back_to_config_value() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.db_path = Some(tmp.path().join("from_config.db3"));
        let path = config.db_path(None).unwrap();
        assert!(path.ends_with("from_config.db3"));
    }
}
