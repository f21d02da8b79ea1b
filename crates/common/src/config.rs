//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default export parameters.
    pub export: ExportDefaults,

    /// The single transition/scale policy shared by preview and export.
    pub interpolation: InterpolationConfig,

    /// Frame renderer settings.
    pub render: RenderConfig,

    /// External encoder settings.
    pub encoder: EncoderConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Target frame rate.
    pub fps: u32,

    /// Output width in pixels. Used only together with `height`; otherwise
    /// the source resolution is kept.
    pub width: Option<u32>,

    /// Output height in pixels. Used only together with `width`.
    pub height: Option<u32>,

    /// Upper bound on a single per-frame seek.
    pub seek_timeout_ms: u64,

    /// Upper bound on loading the source media.
    pub load_timeout_ms: u64,

    /// Filename offered for the finished artifact.
    pub artifact_filename: String,
}

/// Easing curve applied to transition progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EasingCurve {
    /// `p' = p`
    #[default]
    Linear,
    /// `p' = 1 - (1 - p)^5`
    QuinticOut,
}

/// Transition window and scale bounds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationConfig {
    /// Longest transition window in seconds.
    pub max_window_secs: f64,

    /// The window is `min(max_window_secs, duration / window_divisor)`.
    pub window_divisor: f64,

    /// Easing applied to transition progress.
    pub easing: EasingCurve,

    /// Lower scale clamp.
    pub min_scale: f64,

    /// Upper scale clamp.
    pub max_scale: f64,
}

/// Frame renderer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// TrueType/OpenType font used for text overlays.
    pub font_path: Option<PathBuf>,

    /// Drop-shadow offset in output pixels.
    pub shadow_offset_px: i32,

    /// Drop-shadow opacity `[0.0, 1.0]`.
    pub shadow_opacity: f64,
}

/// External encoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// ffmpeg binary name or path.
    pub ffmpeg: String,

    /// ffprobe binary name or path.
    pub ffprobe: String,

    /// x264 preset.
    pub preset: String,

    /// x264 constant rate factor.
    pub crf: u32,

    /// AAC bitrate in kbps.
    pub audio_bitrate_kbps: u32,

    /// Upper bound on one encode call.
    pub timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "kenburns=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            fps: 30,
            width: None,
            height: None,
            seek_timeout_ms: 100,
            load_timeout_ms: 10_000,
            artifact_filename: "exported.mp4".to_string(),
        }
    }
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            max_window_secs: 0.5,
            window_divisor: 4.0,
            easing: EasingCurve::Linear,
            min_scale: 1.0,
            max_scale: 5.0,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            shadow_offset_px: 2,
            shadow_opacity: 0.8,
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            preset: "ultrafast".to_string(),
            crf: 28,
            audio_bitrate_kbps: 128,
            timeout_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl InterpolationConfig {
    /// The longer 2s / 2 policy with a quintic ease-out.
    pub fn long_quintic() -> Self {
        Self {
            max_window_secs: 2.0,
            window_divisor: 2.0,
            easing: EasingCurve::QuinticOut,
            ..Self::default()
        }
    }

    /// The long quintic window in place of this policy's, keeping its scale
    /// bounds.
    pub fn with_long_transitions(self) -> Self {
        Self {
            min_scale: self.min_scale,
            max_scale: self.max_scale,
            ..Self::long_quintic()
        }
    }

    /// Reject configurations that cannot produce a usable policy.
    pub fn validate(&self) -> Result<(), crate::error::KenburnsError> {
        if !(self.max_window_secs >= 0.0) || !self.max_window_secs.is_finite() {
            return Err(crate::error::KenburnsError::config(
                "interpolation.max_window_secs must be a finite, non-negative number",
            ));
        }
        if !(self.window_divisor > 0.0) || !self.window_divisor.is_finite() {
            return Err(crate::error::KenburnsError::config(
                "interpolation.window_divisor must be positive",
            ));
        }
        if !(self.min_scale > 0.0) || !(self.max_scale >= self.min_scale) {
            return Err(crate::error::KenburnsError::config(format!(
                "invalid scale bounds [{}, {}]",
                self.min_scale, self.max_scale
            )));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
                    Ok(config) => match config.interpolation.validate() {
                        Ok(()) => return config,
                        Err(e) => {
                            tracing::warn!("Ignoring config at {:?}: {}", config_path, e);
                        }
                    },
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("kenburns").join("config.json")
}
