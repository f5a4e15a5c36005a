//! Runtime configuration. Every section falls back to the prototype's
//! defaults, so an empty file (or no file) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::kernel::time::TICK_MS;

/// Env var naming a TOML config file.
pub const CONFIG_ENV: &str = "HEXTECH_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HextechConfig {
    pub timings: Timings,
    pub provider: ProviderConfig,
    pub runtime: RuntimeConfig,
}

/// Simulated latencies, all in milliseconds unless noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub asr_to_vad_ms: u64,
    pub vad_to_nlp_ms: u64,
    pub nlp_to_llm_ms: u64,
    /// Minimum visible thinking time around the provider call.
    pub thinking_floor_ms: u64,
    pub llm_to_tts_ms: u64,
    pub tts_synthesis_ms: u64,
    /// How long a session reply is "spoken" before auto-reset.
    pub speaking_ms: u64,
    pub listening_window_secs: u32,
    pub countdown_interval_ms: u64,
    pub duplex_first_cycle_ms: u64,
    pub duplex_cycle_gap_ms: u64,
    pub duplex_broadcast_lead_ms: u64,
    pub duplex_utterance_ms: u64,
    pub duplex_follow_up_ms: u64,
    pub duplex_reply_ms: u64,
    pub barge_in_delay_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            asr_to_vad_ms: 600,
            vad_to_nlp_ms: 400,
            nlp_to_llm_ms: 800,
            thinking_floor_ms: 1200,
            llm_to_tts_ms: 600,
            tts_synthesis_ms: 1000,
            speaking_ms: 5000,
            listening_window_secs: 30,
            countdown_interval_ms: 1000,
            duplex_first_cycle_ms: 2000,
            duplex_cycle_gap_ms: 8000,
            duplex_broadcast_lead_ms: 1000,
            duplex_utterance_ms: 4000,
            duplex_follow_up_ms: 1500,
            duplex_reply_ms: 1000,
            barge_in_delay_ms: 800,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Offline canned replies.
    #[default]
    Canned,
    /// llama-server style `/completion` endpoint.
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub base_url: String,
    /// Hard ceiling on one provider call; past it the fallback reply is used.
    pub timeout_ms: u64,
    pub n_predict: usize,
    pub temperature: f32,
    pub top_p: f32,
    /// Artificial latency for the canned provider.
    pub canned_latency_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Canned,
            base_url: "http://localhost:8080".to_string(),
            timeout_ms: 5000,
            n_predict: 64,
            temperature: 0.8,
            top_p: 0.9,
            canned_latency_ms: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub tick_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { tick_ms: TICK_MS }
    }
}

impl HextechConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Explicit path wins, then `HEXTECH_CONFIG`, then defaults.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = explicit.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
