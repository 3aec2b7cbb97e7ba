//! Configuration for the controller host.

use std::path::Path;

use serde::{Deserialize, Serialize};
use switchboard_core::{DEFAULT_ADDRESS, Endpoint, PreviewPort, SwitchError};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub controller: ControllerConfig,
    pub media: MediaConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// `tcp:host=H,port=P`, `unix:path=P` or `H:P`.
    pub address: String,
}

/// Initial state of the simulated media server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub compose_port: i32,
    pub encode_port: i32,
    pub audio_port: i32,
    /// Composite mode at startup (0 none, 1 pip, 2 dual preview, 3 dual equal).
    pub composite_mode: i32,
    pub frame_width: i32,
    pub frame_height: i32,
    pub pip: PipConfig,
    pub preview_ports: Vec<PreviewPortConfig>,
}

/// Picture-in-picture rectangle in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipConfig {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewPortConfig {
    pub port: i32,
    /// 0 nothing, 1 video, 2 audio.
    pub serve: i32,
    /// Case type, 0..=10.
    pub case: i32,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.into(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            compose_port: 3001,
            encode_port: 3002,
            audio_port: 3003,
            composite_mode: 1,
            frame_width: 1280,
            frame_height: 720,
            pip: PipConfig::default(),
            preview_ports: vec![
                PreviewPortConfig { port: 3004, serve: 1, case: 6 },
                PreviewPortConfig { port: 3005, serve: 1, case: 6 },
                PreviewPortConfig { port: 3006, serve: 2, case: 5 },
            ],
        }
    }
}

impl Default for PipConfig {
    fn default() -> Self {
        Self {
            x: 896,
            y: 504,
            w: 384,
            h: 216,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl From<PreviewPortConfig> for PreviewPort {
    fn from(p: PreviewPortConfig) -> Self {
        PreviewPort::new(p.port, p.serve, p.case)
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ServerConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a file.
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    pub fn endpoint(&self) -> Result<Endpoint, SwitchError> {
        self.controller.address.parse()
    }
}

// ── Tests ────────────────────────────────────────────────────────
