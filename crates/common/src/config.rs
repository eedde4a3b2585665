//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where project files are stored.
    pub projects_dir: PathBuf,

    /// Interaction tuning for the editing session.
    pub editor: EditorDefaults,

    /// Default export parameters.
    pub export: ExportDefaults,

    /// Canvas used for newly created projects.
    pub canvas: CanvasDefaults,

    /// Directory scanned for `.ttf`/`.otf` files used by text layers.
    pub fonts_dir: Option<PathBuf>,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Interaction tuning. Pixel values are screen pixels and get divided by
/// the current zoom before they are compared against canvas coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorDefaults {
    /// Distance at which a moving layer snaps to a guide.
    pub snap_threshold_px: f64,

    /// Smallest width/height a resize gesture may produce (canvas units).
    pub min_layer_size: f64,

    /// Rotation increment used while the snap modifier is held.
    pub rotation_snap_degrees: f64,

    /// Maximum number of history entries kept.
    pub history_limit: usize,

    /// Hit radius of resize/rotate handles.
    pub handle_radius_px: f64,

    /// Distance of the rotate handle above the top edge.
    pub rotate_handle_offset_px: f64,

    /// Arrow-key nudge distance (canvas units).
    pub nudge_step: f64,

    /// Arrow-key nudge distance with Shift held.
    pub nudge_step_large: f64,

    /// Offset applied to pasted and duplicated layers.
    pub paste_offset: f64,
}

/// Default export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Frame rate for animated exports.
    pub fps: u32,

    /// Default video codec.
    pub video_codec: String,

    /// Video bitrate in kbps (0 = encoder default).
    pub video_bitrate_kbps: u32,

    /// Audio bitrate in kbps.
    pub audio_bitrate_kbps: u32,

    /// JPEG quality `[1, 100]`.
    pub jpeg_quality: u8,
}

/// Canvas parameters for new projects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasDefaults {
    pub width: u32,
    pub height: u32,
    /// Background color as hex string (for example `#ffffff`).
    pub background: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "mosaic=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            projects_dir: dirs_default_projects(),
            editor: EditorDefaults::default(),
            export: ExportDefaults::default(),
            canvas: CanvasDefaults::default(),
            fonts_dir: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EditorDefaults {
    fn default() -> Self {
        Self {
            snap_threshold_px: 5.0,
            min_layer_size: 20.0,
            rotation_snap_degrees: 15.0,
            history_limit: 100,
            handle_radius_px: 8.0,
            rotate_handle_offset_px: 28.0,
            nudge_step: 1.0,
            nudge_step_large: 10.0,
            paste_offset: 20.0,
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            fps: 30,
            video_codec: "h264".to_string(),
            video_bitrate_kbps: 8000,
            audio_bitrate_kbps: 192,
            jpeg_quality: 92,
        }
    }
}

impl Default for CanvasDefaults {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1080,
            background: "#ffffff".to_string(),
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

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
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
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("mosaic").join("config.json")
}

/// Default projects directory.
fn dirs_default_projects() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("mosaic").join("projects")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "editor": { "snap_threshold_px": 8.0 } }"#).unwrap();
        assert_eq!(config.editor.snap_threshold_px, 8.0);
        assert_eq!(config.editor.min_layer_size, 20.0);
        assert_eq!(config.export.fps, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.canvas.width, 1080);
        assert_eq!(parsed.editor.rotation_snap_degrees, 15.0);
    }
}
