//! `groundcheck.toml`: every key optional, CLI flags override file values.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cgv_ai::backend::{BackendClient, DEFAULT_CHAT_PATH, DEFAULT_HEALTH_PATH};
use cgv_ai::batch::{BatchOptions, SessionMode};
use cgv_ai::runner::{RunOptions, DEFAULT_TIMEOUT};
use cgv_core::domain::{NoCitationPolicy, NoInformationPolicy};
use cgv_core::error::{codes, AppError};
use serde::{Deserialize, Serialize};

use crate::presets::Preset;

pub const DEFAULT_CONFIG_FILE: &str = "groundcheck.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifierConfig {
    pub backend: BackendConfig,
    pub batch: BatchConfig,
    pub logging: LoggingConfig,
    pub stub: StubConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    pub base_url: String,
    pub chat_path: String,
    pub health_path: String,
    /// Per-query timeout; presets and the built-in default apply when unset.
    pub timeout_ms: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    pub inter_query_delay_ms: Option<u64>,
    pub session_id_prefix: Option<String>,
    pub session_mode: Option<SessionMode>,
    pub carry_history: bool,
    pub stop_on_error: bool,
    pub no_citation_policy: NoCitationPolicy,
    /// Presets may enable this when unset.
    pub no_information_policy: Option<NoInformationPolicy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StubConfig {
    pub listen_addr: String,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8000".to_string(),
        }
    }
}

impl VerifierConfig {
    pub fn parse(text: &str) -> Result<Self, AppError> {
        toml::from_str(text).map_err(|e| {
            AppError::new(codes::CONFIG_INVALID, "Failed to parse configuration")
                .with_details(e.to_string())
        })
    }

    /// Load `path` if given (it must exist), else `groundcheck.toml` in the working directory if
    /// present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let text = fs::read_to_string(&path).map_err(|e| {
            AppError::new(codes::CONFIG_LOAD_FAILED, "Failed to read configuration file")
                .with_details(format!("path={}; err={e}", path.display()))
        })?;
        let config = Self::parse(&text).map_err(|e| {
            let details = e.details.clone().unwrap_or_default();
            e.with_details(format!("path={}; {details}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn backend_client(&self) -> Result<BackendClient, AppError> {
        Ok(BackendClient::new(&self.backend.base_url)?
            .with_chat_path(&self.backend.chat_path)
            .with_health_path(&self.backend.health_path))
    }

    /// Resolve batch options: configured values first, then the preset, then built-in defaults.
    /// `now_unix` seeds the default session prefix `uat_test_<secs>`.
    pub fn batch_options(&self, preset: Option<&Preset>, now_unix: i64) -> BatchOptions {
        let timeout = self
            .backend
            .timeout_ms
            .map(Duration::from_millis)
            .or_else(|| preset.map(|p| p.timeout))
            .unwrap_or(DEFAULT_TIMEOUT);
        let inter_query_delay = self
            .batch
            .inter_query_delay_ms
            .map(Duration::from_millis)
            .or_else(|| preset.map(|p| p.inter_query_delay))
            .unwrap_or(Duration::ZERO);
        let session_id_prefix = self
            .batch
            .session_id_prefix
            .clone()
            .or_else(|| preset.and_then(|p| p.session_id_prefix.map(str::to_string)))
            .unwrap_or_else(|| format!("uat_test_{now_unix}"));
        let session_mode = self
            .batch
            .session_mode
            .or_else(|| preset.map(|p| p.session_mode))
            .unwrap_or_default();
        let no_information_policy = self
            .batch
            .no_information_policy
            .or_else(|| preset.map(|p| p.no_information_policy))
            .unwrap_or_default();

        BatchOptions {
            inter_query_delay,
            session_id_prefix,
            session_mode,
            carry_history: self.batch.carry_history,
            stop_on_error: self.batch.stop_on_error,
            run: RunOptions {
                timeout,
                no_citation_policy: self.batch.no_citation_policy,
                no_information_policy,
            },
        }
    }
}
