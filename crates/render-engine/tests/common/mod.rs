//! Shared fixtures for render-engine integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use mosaic_common::config::ExportDefaults;
use mosaic_common::error::MosaicResult;
use mosaic_render_engine::export::{EncoderRequest, EncoderResponse, EncoderWorker};
use mosaic_render_engine::{ExportFormat, ExportOptions, ExportRequest};
use mosaic_scene_model::*;

/// Video stand-in that remembers every seek.
#[derive(Debug)]
pub struct RecordingClip {
    pub duration: f64,
    pub seeks: Mutex<Vec<f64>>,
    released: AtomicBool,
}

impl RecordingClip {
    pub fn new(duration: f64) -> Arc<Self> {
        Arc::new(Self {
            duration,
            seeks: Mutex::new(Vec::new()),
            released: AtomicBool::new(false),
        })
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.seeks.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaHandle for RecordingClip {
    fn kind(&self) -> MediaKind {
        MediaKind::Video
    }
    fn natural_size(&self) -> (u32, u32) {
        (16, 9)
    }
    fn is_ready(&self) -> bool {
        true
    }
    fn duration_secs(&self) -> Option<f64> {
        Some(self.duration)
    }
    fn current_time(&self) -> f64 {
        self.seeks.lock().unwrap().last().copied().unwrap_or(0.0)
    }
    async fn seek(&self, secs: f64) -> MosaicResult<f64> {
        let reached = secs.min(self.duration);
        self.seeks.lock().unwrap().push(reached);
        Ok(reached)
    }
    fn play(&self) {}
    fn pause(&self) {}
    fn is_playing(&self) -> bool {
        false
    }
    fn current_frame(&self) -> Option<Arc<RgbaFrame>> {
        Some(Arc::new(RgbaFrame::solid(16, 9, [30, 120, 220, 255])))
    }
    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
    fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// Video whose seeks take `seek_delay` and whose pixels encode the
/// position: red is `round(secs * 100)`.
#[derive(Debug)]
pub struct TimedClip {
    pub duration: f64,
    seek_delay: Duration,
    position: Mutex<f64>,
}

impl TimedClip {
    pub fn new(duration: f64, seek_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            duration,
            seek_delay,
            position: Mutex::new(0.0),
        })
    }

    pub fn red_at(secs: f64) -> u8 {
        (secs * 100.0).round() as u8
    }
}

#[async_trait]
impl MediaHandle for TimedClip {
    fn kind(&self) -> MediaKind {
        MediaKind::Video
    }
    fn natural_size(&self) -> (u32, u32) {
        (16, 9)
    }
    fn is_ready(&self) -> bool {
        true
    }
    fn duration_secs(&self) -> Option<f64> {
        Some(self.duration)
    }
    fn current_time(&self) -> f64 {
        *self.position.lock().unwrap()
    }
    async fn seek(&self, secs: f64) -> MosaicResult<f64> {
        tokio::time::sleep(self.seek_delay).await;
        let reached = secs.min(self.duration);
        *self.position.lock().unwrap() = reached;
        Ok(reached)
    }
    fn play(&self) {}
    fn pause(&self) {}
    fn is_playing(&self) -> bool {
        false
    }
    fn current_frame(&self) -> Option<Arc<RgbaFrame>> {
        let red = Self::red_at(self.current_time());
        Some(Arc::new(RgbaFrame::solid(16, 9, [red, 0, 0, 255])))
    }
    fn release(&self) {}
    fn is_released(&self) -> bool {
        false
    }
}

/// What a [`MemoryEncoder`] saw.
#[derive(Debug, Default)]
pub struct EncoderLog {
    pub started: bool,
    pub audio_streams: usize,
    pub frames: Vec<(u64, u64)>,
    /// Pixels sampled from each frame at the encoder's sample points.
    pub samples: Vec<Vec<[u8; 4]>>,
    pub finished: bool,
}

/// Encoder worker that emits one chunk per frame: the frame index byte.
#[derive(Debug, Clone)]
pub struct MemoryEncoder {
    pub log: Arc<Mutex<EncoderLog>>,
    pub available: bool,
    pub fail_at: Option<u64>,
    pub sample_points: Vec<(u32, u32)>,
}

impl MemoryEncoder {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(EncoderLog::default())),
            available: true,
            fail_at: None,
            sample_points: Vec::new(),
        }
    }

    pub fn sampling(points: &[(u32, u32)]) -> Self {
        Self {
            sample_points: points.to_vec(),
            ..Self::new()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn failing_at(index: u64) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::new()
        }
    }

    pub fn boxed(&self) -> Box<dyn EncoderWorker> {
        Box::new(self.clone())
    }
}

impl EncoderWorker for MemoryEncoder {
    fn name(&self) -> &str {
        "memory"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn run(
        self: Box<Self>,
        mut requests: mpsc::Receiver<EncoderRequest>,
        responses: mpsc::UnboundedSender<EncoderResponse>,
    ) {
        while let Some(request) = requests.blocking_recv() {
            match request {
                EncoderRequest::Start(start) => {
                    let mut log = self.log.lock().unwrap();
                    log.started = true;
                    log.audio_streams = start.audio_streams.len();
                    let _ = responses.send(EncoderResponse::Ready);
                }
                EncoderRequest::Frame(frame) => {
                    if self.fail_at == Some(frame.index) {
                        let _ = responses.send(EncoderResponse::Error {
                            message: format!("cannot encode frame {}", frame.index),
                        });
                        return;
                    }
                    let count = {
                        let mut log = self.log.lock().unwrap();
                        log.frames.push((frame.index, frame.timestamp_us));
                        let samples = self
                            .sample_points
                            .iter()
                            .map(|&(x, y)| frame.frame.pixel(x, y).unwrap_or_default())
                            .collect();
                        log.samples.push(samples);
                        log.frames.len() as u64
                    };
                    let _ = responses.send(EncoderResponse::Chunk(vec![frame.index as u8]));
                    let _ = responses.send(EncoderResponse::Progress { frames: count });
                }
                EncoderRequest::Finish => {
                    self.log.lock().unwrap().finished = true;
                    let _ = responses.send(EncoderResponse::Done);
                    return;
                }
            }
        }
    }
}

pub fn video_layer(clip: Arc<RecordingClip>, bounds: Bounds) -> Layer {
    let duration = clip.duration;
    layer_over(clip, duration, bounds)
}

/// A video layer playing `handle` inside `bounds`.
pub fn layer_over(handle: SharedMedia, duration: f64, bounds: Bounds) -> Layer {
    let mut layer = Layer::video("clip.mp4", bounds, duration);
    if let LayerKind::Video(video) = &mut layer.kind {
        video.src.handle = Some(handle);
    }
    layer
}

pub fn request(layers: Vec<Layer>, format: ExportFormat, canvas: CanvasConfig) -> ExportRequest {
    let mut options = ExportOptions::new(format, &ExportDefaults::default());
    options.fps = 10;
    ExportRequest {
        layers,
        audio_tracks: vec![],
        canvas,
        options,
    }
}
