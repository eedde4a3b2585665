//! The export pipeline.
//!
//! Static formats render once. Animated formats walk the timeline frame by
//! frame: seek every handle, wait for all of them, draw, and move the frame
//! into the encoder worker before touching the next one.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use image::codecs::jpeg::JpegEncoder;
use tokio::sync::mpsc;

use mosaic_common::clock::{frame_count, frame_time_secs, secs_to_us};
use mosaic_common::error::{MosaicError, MosaicResult};
use mosaic_editor_core::Editor;
use mosaic_scene_model::{composition_duration, AudioTrack, CanvasConfig, Layer, ProjectFile, RgbaFrame};

use super::encoder::{spawn_worker, EncoderWorker};
use super::protocol::{AudioStream, EncoderRequest, EncoderResponse, EncoderStart, VideoFrame};
use super::{ExportFormat, ExportOptions, ExportProgress, ExportStage, ProgressCallback};
use crate::fonts::FontBook;
use crate::media::MediaSynchronizer;
use crate::renderer::{render_frame_at, RenderContext};

/// A snapshot of the scene to export. Handles are shared with the session,
/// so later edits do not affect a running export.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub layers: Vec<Layer>,
    pub audio_tracks: Vec<AudioTrack>,
    pub canvas: CanvasConfig,
    pub options: ExportOptions,
}

impl ExportRequest {
    pub fn from_editor(editor: &Editor, options: ExportOptions) -> Self {
        Self {
            layers: editor.layers().to_vec(),
            audio_tracks: editor.audio_tracks().to_vec(),
            canvas: editor.canvas().clone(),
            options,
        }
    }

    /// Expects media references in `project` to be resolved already.
    pub fn from_project(project: &ProjectFile, options: ExportOptions) -> Self {
        Self {
            layers: project.layers.clone(),
            audio_tracks: project.audio_tracks.clone(),
            canvas: project.canvas(),
            options,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        composition_duration(&self.layers, &self.audio_tracks)
    }

    pub fn total_frames(&self) -> u64 {
        frame_count(self.duration_secs(), self.options.fps)
    }
}

/// Encoded output of a finished export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
    pub frames: u64,
}

impl ExportArtifact {
    pub fn mime(&self) -> &'static str {
        self.format.mime()
    }

    pub async fn write_to(&self, path: &Path) -> MosaicResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &self.bytes).await?;
        tracing::info!(path = %path.display(), bytes = self.bytes.len(), "Export written");
        Ok(())
    }
}

/// Run an export of any format.
pub async fn export(
    request: &ExportRequest,
    fonts: Arc<FontBook>,
    worker: Box<dyn EncoderWorker>,
    cancel: &AtomicBool,
    progress: Option<&ProgressCallback>,
) -> MosaicResult<ExportArtifact> {
    if request.options.format.is_static() {
        export_static(request, fonts).await
    } else {
        export_animated(request, fonts, worker, cancel, progress).await
    }
}

/// Render a single PNG or JPEG at the canvas's native resolution.
pub async fn export_static(request: &ExportRequest, fonts: Arc<FontBook>) -> MosaicResult<ExportArtifact> {
    let format = request.options.format;
    if !format.is_static() {
        return Err(MosaicError::unsupported_export(format!(
            "{} is not a still image format",
            format.extension()
        )));
    }
    let transparent = request.options.transparent && format == ExportFormat::Png;
    if request.options.transparent && !transparent {
        tracing::warn!(format = format.extension(), "Transparent background needs PNG; flattening");
    }
    let ctx = RenderContext { fonts, transparent };

    let mut sync = MediaSynchronizer::for_scene(&request.layers, &request.audio_tracks);
    sync.pause_all();
    let surface = render_frame_at(&request.layers, &request.canvas, &sync, 0.0, &ctx).await?;

    let bytes = match format {
        ExportFormat::Png => surface.encode_png()?,
        _ => encode_jpeg(&surface.into_frame(), request.options.jpeg_quality)?,
    };
    tracing::info!(
        format = format.extension(),
        width = request.canvas.width,
        height = request.canvas.height,
        transparent,
        bytes = bytes.len(),
        "Static export complete"
    );
    Ok(ExportArtifact {
        format,
        bytes,
        frames: 1,
    })
}

/// JPEG has no alpha; composite over white first.
pub(crate) fn encode_jpeg(frame: &RgbaFrame, quality: u8) -> MosaicResult<Vec<u8>> {
    let mut rgb = Vec::with_capacity(frame.width as usize * frame.height as usize * 3);
    for px in frame.pixels.chunks_exact(4) {
        let a = px[3] as u32;
        for &c in &px[..3] {
            rgb.push(((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8);
        }
    }
    let image = image::RgbImage::from_raw(frame.width, frame.height, rgb)
        .ok_or_else(|| MosaicError::encode("frame buffer does not match its size"))?;
    let mut out = Vec::new();
    image
        .write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)))
        .map_err(|e| MosaicError::encode(format!("JPEG encoding failed: {e}")))?;
    Ok(out)
}

/// Chunks and counters gathered from the worker.
#[derive(Debug, Default)]
struct Collected {
    chunks: Vec<Vec<u8>>,
    frames_encoded: u64,
    done: bool,
}

impl Collected {
    fn absorb(&mut self, response: EncoderResponse) -> MosaicResult<()> {
        match response {
            EncoderResponse::Chunk(chunk) => self.chunks.push(chunk),
            EncoderResponse::Progress { frames } => self.frames_encoded = frames,
            EncoderResponse::Done => self.done = true,
            EncoderResponse::Error { message } => return Err(MosaicError::encode(message)),
            EncoderResponse::Ready => {}
        }
        Ok(())
    }

    /// Take whatever has arrived without waiting.
    fn drain(&mut self, responses: &mut mpsc::UnboundedReceiver<EncoderResponse>) -> MosaicResult<()> {
        while let Ok(response) = responses.try_recv() {
            self.absorb(response)?;
        }
        Ok(())
    }

    fn into_bytes(self) -> Vec<u8> {
        self.chunks.concat()
    }
}

/// Encode the timeline to MP4 or WebM through `worker`.
pub async fn export_animated(
    request: &ExportRequest,
    fonts: Arc<FontBook>,
    worker: Box<dyn EncoderWorker>,
    cancel: &AtomicBool,
    progress: Option<&ProgressCallback>,
) -> MosaicResult<ExportArtifact> {
    let format = request.options.format;
    let duration = request.duration_secs();
    if duration <= 0.0 {
        return Err(MosaicError::ZeroDurationExport);
    }
    if format.is_static() || !worker.supports(format) {
        return Err(MosaicError::unsupported_export(format!(
            "{} encoder cannot produce {}",
            worker.name(),
            format.extension()
        )));
    }
    if !worker.is_available() {
        return Err(MosaicError::unsupported_export(format!(
            "{} encoder is not available",
            worker.name()
        )));
    }

    let fps = request.options.fps.max(1);
    let total_frames = request.total_frames();
    let report = |p: ExportProgress| {
        if let Some(cb) = progress {
            cb(p);
        }
    };
    report(ExportProgress::stage(ExportStage::Preparing, total_frames));
    tracing::info!(
        format = format.extension(),
        duration_secs = duration,
        fps,
        total_frames,
        "Starting animated export"
    );

    let mut sync = MediaSynchronizer::for_scene(&request.layers, &request.audio_tracks);
    sync.pause_all();
    let ctx = RenderContext {
        fonts,
        transparent: false,
    };

    let mut channel = spawn_worker(worker)?;
    let start = EncoderStart {
        canvas: request.canvas.size(),
        options: request.options.clone(),
        audio_streams: AudioStream::collect(&request.layers, &request.audio_tracks),
    };
    channel
        .requests
        .send(EncoderRequest::Start(start))
        .await
        .map_err(|_| MosaicError::encode("encoder exited before start"))?;
    wait_ready(&mut channel.responses).await?;

    let mut collected = Collected::default();
    let started = Instant::now();
    let mut cancelled = false;
    for index in 0..total_frames {
        if cancel.load(Ordering::SeqCst) {
            cancelled = true;
            tracing::info!(frame = index, "Export cancelled");
            break;
        }
        let secs = frame_time_secs(index, fps);
        let surface = render_frame_at(&request.layers, &request.canvas, &sync, secs, &ctx).await?;
        let frame = VideoFrame {
            index,
            timestamp_us: secs_to_us(secs),
            frame: surface.into_frame(),
        };
        if channel.requests.send(EncoderRequest::Frame(frame)).await.is_err() {
            // The worker hung up; its last message says why.
            collected.drain(&mut channel.responses)?;
            return Err(MosaicError::encode("encoder stopped accepting frames"));
        }
        collected.drain(&mut channel.responses)?;
        if collected.done {
            return Err(MosaicError::encode("encoder finished before all frames were sent"));
        }
        report(ExportProgress::rendering(
            index + 1,
            collected.frames_encoded,
            total_frames,
            started.elapsed().as_secs_f64(),
        ));
    }

    report(ExportProgress::stage(ExportStage::Finalizing, total_frames));
    // A closed channel here means the worker already exited; the response
    // stream below carries the reason.
    let _ = channel.requests.send(EncoderRequest::Finish).await;
    while !collected.done {
        match channel.responses.recv().await {
            Some(response) => collected.absorb(response)?,
            None => return Err(MosaicError::encode("encoder exited without finishing")),
        }
    }
    if let Err(err) = tokio::task::spawn_blocking(move || channel.join()).await {
        tracing::warn!(error = %err, "Failed to join encoder worker");
    }

    if cancelled {
        return Err(MosaicError::ExportCancelled);
    }
    let bytes = collected.into_bytes();
    if bytes.is_empty() {
        return Err(MosaicError::encode("encoder produced no output"));
    }
    report(ExportProgress::stage(ExportStage::Complete, total_frames));
    tracing::info!(
        format = format.extension(),
        frames = total_frames,
        bytes = bytes.len(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "Animated export complete"
    );
    Ok(ExportArtifact {
        format,
        bytes,
        frames: total_frames,
    })
}

async fn wait_ready(responses: &mut mpsc::UnboundedReceiver<EncoderResponse>) -> MosaicResult<()> {
    loop {
        match responses.recv().await {
            Some(EncoderResponse::Ready) => return Ok(()),
            Some(EncoderResponse::Error { message }) => return Err(MosaicError::encode(message)),
            Some(other) => tracing::debug!(response = ?other, "Ignoring encoder message before ready"),
            None => return Err(MosaicError::encode("encoder exited before ready")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_common::config::ExportDefaults;

    #[test]
    fn test_jpeg_flattens_over_white() {
        let frame = RgbaFrame::solid(8, 8, [0, 0, 0, 0]);
        let bytes = encode_jpeg(&frame, 90).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        let px = decoded.get_pixel(4, 4);
        assert!(px.0.iter().all(|&c| c > 245), "{px:?}");
    }

    #[test]
    fn test_total_frames_rounds_up() {
        let layer = Layer::video("v.mp4", mosaic_scene_model::Bounds::new(0.0, 0.0, 4.0, 4.0), 1.01);
        let request = ExportRequest {
            layers: vec![layer],
            audio_tracks: vec![],
            canvas: CanvasConfig::default(),
            options: ExportOptions::new(ExportFormat::Mp4, &ExportDefaults::default()),
        };
        assert_eq!(request.total_frames(), 31);
    }

    #[test]
    fn test_empty_scene_has_no_frames() {
        let request = ExportRequest {
            layers: vec![],
            audio_tracks: vec![],
            canvas: CanvasConfig::default(),
            options: ExportOptions::new(ExportFormat::Webm, &ExportDefaults::default()),
        };
        assert_eq!(request.total_frames(), 0);
    }
}
