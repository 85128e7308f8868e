use anyhow::Result;
use serde::Deserialize;
use tracing::debug;

use crate::audio::CaptureProfile;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioSettings,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    /// Base URL of the query service
    pub server_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "robook-voice".to_string(),
            server_url: "http://127.0.0.1:5000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub channels: u16,
    /// Fragment flush cadence in milliseconds
    pub fragment_flush_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44_100, // Matches the service's expected capture rate
            channels: 1,         // Mono
            fragment_flush_ms: 1_000,
        }
    }
}

impl AudioSettings {
    pub fn capture_profile(&self) -> CaptureProfile {
        CaptureProfile {
            sample_rate: self.sample_rate,
            channels: self.channels,
            fragment_flush_ms: self.fragment_flush_ms,
            ..CaptureProfile::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Server-side voice styling intensity, 0.0 (plain) to 1.0 (maximum)
    pub voice_effect: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { voice_effect: 0.5 }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Load a config file if one exists, otherwise fall back to defaults so
    /// the client runs without any setup.
    pub fn load_or_default(path: &str) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                debug!("no usable config at {path} ({e}); using defaults");
                Self::default()
            }
        }
    }
}
