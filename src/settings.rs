use std::path::{Path, PathBuf};
use std::time::Duration;

use eframe::egui::Color32;
use serde::{Deserialize, Serialize};

use crate::control::StreamAddress;
use crate::meter::{MeterConfig, MeterError};

/// Returns the path to the settings file: `~/.config/barmeter/settings.json`
fn settings_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("barmeter");
    path.push("settings.json");
    path
}

/// Where the meter's levels come from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Default audio input device
    Capture,
    /// Built-in oscillators
    Synthetic,
}

/// Persisted application settings.
///
/// Serialized as JSON to the platform config directory.
/// Fields use `#[serde(default)]` so that adding new settings
/// won't break existing config files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    // Stream form
    pub source_addr: String,
    pub multicast_addr: String,
    pub multicast_port: u16,
    pub relay_addr: String,

    // Levels
    pub source: SourceKind,
    pub synthetic_channels: usize,
    pub publish_interval_ms: u64,

    // Meter geometry
    pub width: f32,
    pub height: f32,
    pub margin: f32,

    // Colors (stored as u8 triples since Color32 isn't serde-friendly)
    pub palette: Vec<[u8; 3]>,
    pub background: [u8; 3],

    // Scale and labels
    pub labels: Vec<String>,
    pub max_value: Option<f32>,

    // Animation
    pub animation_ms: u64,
    pub animation_steps: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            source_addr: String::new(),
            multicast_addr: "239.255.0.1".to_string(),
            multicast_port: 5004,
            relay_addr: String::new(),

            source: SourceKind::Capture,
            synthetic_channels: 2,
            publish_interval_ms: 100,

            width: 300.0,
            height: 150.0,
            margin: 5.0,

            palette: vec![[0, 128, 0], [0, 0, 255]],
            background: [255, 255, 255],

            labels: Vec::new(),
            max_value: None,

            animation_ms: 100,
            animation_steps: 10,
        }
    }
}

impl AppSettings {
    /// Load settings from disk, falling back to defaults on any error.
    pub fn load() -> Self {
        Self::load_from(&settings_path())
    }

    fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Failed to parse settings ({}), using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                log::info!("No settings file found ({}), using defaults", e);
                Self::default()
            }
        }
    }

    /// Save settings to disk as pretty JSON.
    pub fn save(&self) {
        self.save_to(&settings_path());
    }

    fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::warn!("Failed to create config directory: {}", e);
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    log::warn!("Failed to write settings: {}", e);
                } else {
                    log::debug!("Saved settings to {}", path.display());
                }
            }
            Err(e) => {
                log::warn!("Failed to serialize settings: {}", e);
            }
        }
    }

    /// Stream address from the form fields
    pub fn stream_address(&self) -> StreamAddress {
        StreamAddress::new(&self.source_addr, &self.multicast_addr, self.multicast_port)
    }

    pub fn publish_interval(&self) -> Duration {
        Duration::from_millis(self.publish_interval_ms)
    }

    /// Validate the meter section into a `MeterConfig`
    pub fn meter_config(&self) -> Result<MeterConfig, MeterError> {
        let rgb = |[r, g, b]: [u8; 3]| Color32::from_rgb(r, g, b);
        MeterConfig::builder()
            .size(self.width, self.height)
            .margin(self.margin)
            .palette(self.palette.iter().copied().map(rgb))
            .background(rgb(self.background))
            .labels(self.labels.iter().cloned())
            .max_value(self.max_value)
            .duration(Duration::from_millis(self.animation_ms))
            .steps(self.animation_steps)
            .build()
    }
}
