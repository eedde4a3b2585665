//! `ffmpeg`/`ffprobe` subprocess helpers shared by media decoding and
//! the video encoder.

use std::path::Path;
use std::process::{Command, Stdio};

use mosaic_common::error::{MosaicError, MosaicResult};
use mosaic_scene_model::RgbaFrame;

pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Stream facts read with `ffprobe`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MediaMeta {
    pub width: u32,
    pub height: u32,
    pub duration_secs: Option<f64>,
    pub has_video: bool,
    pub has_audio: bool,
}

pub async fn read_media_meta(path: &Path) -> MosaicResult<MediaMeta> {
    let src = path.display().to_string();
    let output = tokio::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "stream=codec_type,width,height:format=duration",
            "-of",
            "default=noprint_wrappers=1",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| MosaicError::media_load(&src, format!("failed to start ffprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MosaicError::media_load(
            &src,
            format!("ffprobe failed ({}): {}", output.status, stderr.trim()),
        ));
    }

    let meta = parse_ffprobe_output(&String::from_utf8_lossy(&output.stdout));
    tracing::debug!(
        path = %src,
        width = meta.width,
        height = meta.height,
        duration = ?meta.duration_secs,
        "Read media metadata"
    );
    Ok(meta)
}

/// Parse `key=value` lines from `ffprobe -of default=noprint_wrappers=1`.
/// Dimensions come from the first video stream.
pub fn parse_ffprobe_output(raw: &str) -> MediaMeta {
    let mut meta = MediaMeta::default();
    let mut in_video = false;
    for line in raw.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        match key {
            "codec_type" => {
                in_video = value == "video" && !meta.has_video;
                meta.has_video |= value == "video";
                meta.has_audio |= value == "audio";
            }
            "width" if in_video => meta.width = value.parse().unwrap_or(0),
            "height" if in_video => meta.height = value.parse().unwrap_or(0),
            "duration" => {
                if let Ok(secs) = value.parse::<f64>() {
                    if secs.is_finite() && secs > 0.0 {
                        meta.duration_secs = Some(secs);
                    }
                }
            }
            _ => {}
        }
    }
    meta
}

/// Decode the frame shown at `secs` as straight RGBA.
pub async fn decode_frame_at(path: &Path, secs: f64, width: u32, height: u32) -> MosaicResult<RgbaFrame> {
    let src = path.display().to_string();
    let output = tokio::process::Command::new("ffmpeg")
        .args(["-v", "error", "-nostdin", "-ss"])
        .arg(format!("{:.6}", secs.max(0.0)))
        .arg("-i")
        .arg(path)
        .args([
            "-frames:v",
            "1",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
        ])
        .arg(format!("{width}x{height}"))
        .arg("pipe:1")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| MosaicError::media_load(&src, format!("failed to start ffmpeg: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MosaicError::media_load(
            &src,
            format!("frame decode failed at {secs:.3}s: {}", stderr.trim()),
        ));
    }
    RgbaFrame::new(width, height, output.stdout).ok_or_else(|| {
        MosaicError::media_load(&src, format!("no frame decoded at {secs:.3}s"))
    })
}
