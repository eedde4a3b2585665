//! Export configuration, progress reporting, and job management.

pub mod encoder;
pub mod job;
pub mod pipeline;
pub mod protocol;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use mosaic_common::config::ExportDefaults;
use mosaic_common::error::MosaicError;

pub use encoder::{spawn_worker, EncoderChannel, EncoderWorker, FfmpegEncoder};
pub use job::{ExportHandle, ExportJobs, JobId};
pub use pipeline::{export, export_animated, export_static, ExportArtifact, ExportRequest};
pub use protocol::{AudioStream, EncoderRequest, EncoderResponse, EncoderStart, VideoFrame};

/// Output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    Jpg,
    /// H.264 in fragmented MP4.
    Mp4,
    /// VP9 in WebM.
    Webm,
}

impl ExportFormat {
    pub fn is_static(&self) -> bool {
        matches!(self, ExportFormat::Png | ExportFormat::Jpg)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpg => "jpg",
            ExportFormat::Mp4 => "mp4",
            ExportFormat::Webm => "webm",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpg => "image/jpeg",
            ExportFormat::Mp4 => "video/mp4",
            ExportFormat::Webm => "video/webm",
        }
    }

    /// Guess from an output path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }
}

impl FromStr for ExportFormat {
    type Err = MosaicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpg),
            "mp4" => Ok(ExportFormat::Mp4),
            "webm" => Ok(ExportFormat::Webm),
            other => Err(MosaicError::unsupported_export(format!(
                "unknown export format '{other}'"
            ))),
        }
    }
}

/// Export settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub fps: u32,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
    pub jpeg_quality: u8,
    /// Leave the background unpainted. PNG only.
    pub transparent: bool,
}

impl ExportOptions {
    pub fn new(format: ExportFormat, defaults: &ExportDefaults) -> Self {
        Self {
            format,
            fps: defaults.fps.max(1),
            video_bitrate_kbps: defaults.video_bitrate_kbps,
            audio_bitrate_kbps: defaults.audio_bitrate_kbps,
            jpeg_quality: defaults.jpeg_quality.clamp(1, 100),
            transparent: false,
        }
    }
}

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send + Sync>;

/// Export progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Frames rendered so far.
    pub frames_rendered: u64,

    /// Total frames to render.
    pub total_frames: u64,

    /// Frames the encoder has confirmed.
    pub frames_encoded: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: ExportStage,
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Preparing,
    Rendering,
    Finalizing,
    Complete,
}

impl ExportProgress {
    pub fn stage(stage: ExportStage, total_frames: u64) -> Self {
        let done = matches!(stage, ExportStage::Complete);
        Self {
            progress: if done { 1.0 } else { 0.0 },
            frames_rendered: if done { total_frames } else { 0 },
            total_frames,
            frames_encoded: if done { total_frames } else { 0 },
            eta_secs: 0.0,
            stage,
        }
    }

    pub(crate) fn rendering(frames_rendered: u64, frames_encoded: u64, total_frames: u64, elapsed_secs: f64) -> Self {
        let progress = if total_frames == 0 {
            0.0
        } else {
            (frames_rendered as f64 / total_frames as f64).clamp(0.0, 1.0)
        };
        let eta_secs = if progress > 0.0 {
            (elapsed_secs / progress) - elapsed_secs
        } else {
            0.0
        }
        .max(0.0);
        Self {
            progress,
            frames_rendered,
            total_frames,
            frames_encoded,
            eta_secs,
            stage: ExportStage::Rendering,
        }
    }
}

/// Status of one export job, as published to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExportStatus {
    Preparing,
    Rendering {
        frames: u64,
        total: u64,
    },
    Done {
        bytes: usize,
        output: Option<PathBuf>,
    },
    Error {
        message: String,
    },
}

impl ExportStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, ExportStatus::Done { .. } | ExportStatus::Error { .. })
    }
}
