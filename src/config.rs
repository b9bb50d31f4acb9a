//! Configuration management for binocam
//!
//! The original device carried its transform knobs as hand-tuned literals
//! for one fixed physical viewport; here they are configuration, loaded and
//! saved as TOML. Defaults reproduce the tuned device.

use crate::errors::BinocamError;
use crate::geometry::{CropPolicy, VerticalAlign};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinocamConfig {
    pub internal: SourceConfig,
    pub external: SourceConfig,
    pub access: AccessConfig,
    pub hotplug: HotplugConfig,
    pub telemetry: TelemetryConfig,
}

/// Per-source capture and display-transform settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Assumed buffer size before (or without) negotiation [width, height]
    pub buffer_size: [u32; 2],
    /// Target frame rate requested from the backend
    pub desired_fps: u32,
    /// Display rotation in degrees, any value, normalized at use
    pub rotation_deg: f32,
    /// Crop policy mapping the buffer into the viewport
    pub crop: CropPolicy,
    /// Zoom multiplier (> 0)
    pub zoom: f32,
    /// Horizontal flip
    pub mirror: bool,
    /// Vertical anchor inside the viewport
    pub vertical_align: VerticalAlign,
    /// Independent X-axis stretch factor (> 0)
    pub horizontal_stretch: f32,
}

/// Privileged device-access settings (external source)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Device-node glob relaxed before each external start
    pub device_glob: String,
}

/// USB hotplug behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotplugConfig {
    /// Wait after an attach before the restart attempt, letting the OS
    /// device node stabilize
    pub settle_delay_ms: u64,
}

/// Health polling behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub interval_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            buffer_size: [1280, 720],
            desired_fps: 60,
            rotation_deg: 0.0,
            crop: CropPolicy::Fit,
            zoom: 1.0,
            mirror: false,
            vertical_align: VerticalAlign::Center,
            horizontal_stretch: 1.0,
        }
    }
}

impl Default for BinocamConfig {
    fn default() -> Self {
        Self {
            internal: SourceConfig {
                buffer_size: [1280, 720],
                desired_fps: 60,
                rotation_deg: 270.0,
                crop: CropPolicy::Fit,
                zoom: 1.0,
                mirror: false,
                vertical_align: VerticalAlign::Center,
                horizontal_stretch: 1.0,
            },
            external: SourceConfig {
                buffer_size: [1280, 720],
                desired_fps: 60,
                rotation_deg: 0.0,
                crop: CropPolicy::Fill,
                zoom: 1.0,
                mirror: false,
                vertical_align: VerticalAlign::Center,
                horizontal_stretch: 1.0,
            },
            access: AccessConfig {
                device_glob: "/dev/video* /dev/v4l-subdev*".to_string(),
            },
            hotplug: HotplugConfig {
                settle_delay_ms: 200,
            },
            telemetry: TelemetryConfig { interval_ms: 500 },
        }
    }
}

impl BinocamConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, BinocamError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            BinocamError::InitializationError(format!("Failed to read config file: {}", e))
        })?;

        let config: BinocamConfig = toml::from_str(&contents).map_err(|e| {
            BinocamError::InitializationError(format!("Failed to parse config file: {}", e))
        })?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), BinocamError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                BinocamError::InitializationError(format!(
                    "Failed to create config directory: {}",
                    e
                ))
            })?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(|e| {
            BinocamError::InitializationError(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, toml_string).map_err(|e| {
            BinocamError::InitializationError(format!("Failed to write config file: {}", e))
        })?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("binocam.toml")
    }

    /// Load from default location or create with defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        for (name, source) in [("internal", &self.internal), ("external", &self.external)] {
            if source.buffer_size[0] == 0 || source.buffer_size[1] == 0 {
                return Err(format!("Invalid {} buffer size", name));
            }
            if source.desired_fps == 0 || source.desired_fps > 240 {
                return Err(format!("Invalid {} FPS (must be 1-240)", name));
            }
            if source.zoom <= 0.0 {
                return Err(format!("{} zoom must be above 0", name));
            }
            if source.horizontal_stretch <= 0.0 {
                return Err(format!("{} horizontal stretch must be above 0", name));
            }
        }

        if self.access.device_glob.trim().is_empty() {
            return Err("Device glob must not be empty".to_string());
        }
        if self.hotplug.settle_delay_ms > 60_000 {
            return Err("Settle delay must be at most 60000 ms".to_string());
        }
        if self.telemetry.interval_ms == 0 {
            return Err("Telemetry interval must be above 0 ms".to_string());
        }

        Ok(())
    }
}
