//! Encoder workers.
//!
//! A worker runs on its own thread and speaks only through the request and
//! response channels. [`FfmpegEncoder`] pipes raw RGBA frames into an
//! `ffmpeg` child and streams the container bytes back as chunks.

use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};

use tokio::sync::mpsc;

use mosaic_common::error::{MosaicError, MosaicResult};

use super::protocol::{AudioStream, EncoderRequest, EncoderResponse, EncoderStart};
use super::ExportFormat;
use crate::ffmpeg::command_exists;

/// Frames that may be in flight towards the worker.
pub const REQUEST_QUEUE_DEPTH: usize = 8;

const CHUNK_SIZE: usize = 64 * 1024;

pub trait EncoderWorker: Send + 'static {
    fn name(&self) -> &str;

    /// Whether the runtime has what this worker needs.
    fn is_available(&self) -> bool;

    fn supports(&self, format: ExportFormat) -> bool {
        !format.is_static()
    }

    /// Serve one export. Returns when `Finish` has been handled or the
    /// request channel closes.
    fn run(
        self: Box<Self>,
        requests: mpsc::Receiver<EncoderRequest>,
        responses: mpsc::UnboundedSender<EncoderResponse>,
    );
}

/// Producer side of a running worker.
#[derive(Debug)]
pub struct EncoderChannel {
    pub requests: mpsc::Sender<EncoderRequest>,
    pub responses: mpsc::UnboundedReceiver<EncoderResponse>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl EncoderChannel {
    /// Wait for the worker thread to exit.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Encoder worker panicked");
            }
        }
    }
}

/// Start `worker` on a dedicated thread.
pub fn spawn_worker(worker: Box<dyn EncoderWorker>) -> MosaicResult<EncoderChannel> {
    let (req_tx, req_rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
    let (resp_tx, resp_rx) = mpsc::unbounded_channel();
    let name = format!("encoder-{}", worker.name());
    let thread = std::thread::Builder::new()
        .name(name)
        .spawn(move || worker.run(req_rx, resp_tx))?;
    Ok(EncoderChannel {
        requests: req_tx,
        responses: resp_rx,
        thread: Some(thread),
    })
}

/// `ffmpeg` subprocess encoder for MP4 (H.264) and WebM (VP9).
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder {
    binary: Option<String>,
}

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific `ffmpeg` executable.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: Some(binary.into()),
        }
    }

    fn binary(&self) -> &str {
        self.binary.as_deref().unwrap_or("ffmpeg")
    }

    fn spawn(&self, start: &EncoderStart) -> MosaicResult<Child> {
        let args = ffmpeg_args(start);
        tracing::debug!(args = ?args, "Running ffmpeg");
        let child = Command::new(self.binary())
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MosaicError::encode(format!("Failed to start ffmpeg: {e}")))?;
        tracing::info!(
            pid = child.id(),
            args_len = args.len(),
            audio_streams = start.audio_streams.len(),
            "ffmpeg process started"
        );
        Ok(child)
    }

    fn encode(
        &self,
        start: EncoderStart,
        requests: &mut mpsc::Receiver<EncoderRequest>,
        responses: &mpsc::UnboundedSender<EncoderResponse>,
    ) -> MosaicResult<()> {
        let mut child = self.spawn(&start)?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MosaicError::encode("Failed to capture ffmpeg stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MosaicError::encode("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MosaicError::encode("Failed to capture ffmpeg stderr"))?;

        let chunk_tx = responses.clone();
        let stdout_task = std::thread::spawn(move || forward_chunks(stdout, chunk_tx));
        let progress_tx = responses.clone();
        let stderr_task = std::thread::spawn(move || read_progress(stderr, progress_tx));

        let _ = responses.send(EncoderResponse::Ready);
        let fed = feed_frames(stdin, requests, &start);

        let status = child
            .wait()
            .map_err(|e| MosaicError::encode(format!("Failed to wait on ffmpeg: {e}")))?;
        let stdout_result = stdout_task
            .join()
            .unwrap_or_else(|_| Err(MosaicError::encode("ffmpeg stdout reader panicked")));
        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(MosaicError::encode(format!(
                "ffmpeg export failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }
        fed?;
        stdout_result?;
        Ok(())
    }
}

impl EncoderWorker for FfmpegEncoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn is_available(&self) -> bool {
        command_exists(self.binary())
    }

    fn run(
        self: Box<Self>,
        mut requests: mpsc::Receiver<EncoderRequest>,
        responses: mpsc::UnboundedSender<EncoderResponse>,
    ) {
        let start = match requests.blocking_recv() {
            Some(EncoderRequest::Start(start)) => start,
            Some(other) => {
                let _ = responses.send(EncoderResponse::Error {
                    message: format!("expected start, got {}", request_name(&other)),
                });
                return;
            }
            None => return,
        };
        let outcome = match self.encode(start, &mut requests, &responses) {
            Ok(()) => EncoderResponse::Done,
            Err(err) => {
                tracing::warn!(error = %err, "Encoder failed");
                EncoderResponse::Error {
                    message: err.to_string(),
                }
            }
        };
        let _ = responses.send(outcome);
    }
}

/// Write frames to ffmpeg until `Finish`. Closing stdin on return lets
/// ffmpeg flush the container.
fn feed_frames(
    mut stdin: ChildStdin,
    requests: &mut mpsc::Receiver<EncoderRequest>,
    start: &EncoderStart,
) -> MosaicResult<()> {
    let expected_len = start.canvas.w as usize * start.canvas.h as usize * 4;
    let mut last_index: Option<u64> = None;
    while let Some(request) = requests.blocking_recv() {
        match request {
            EncoderRequest::Frame(frame) => {
                if frame.frame.pixels.len() != expected_len {
                    return Err(MosaicError::encode(format!(
                        "frame {} is {}x{}, expected {}x{}",
                        frame.index, frame.frame.width, frame.frame.height, start.canvas.w, start.canvas.h
                    )));
                }
                if last_index.is_some_and(|last| frame.index <= last) {
                    return Err(MosaicError::encode(format!(
                        "frame {} arrived out of order",
                        frame.index
                    )));
                }
                last_index = Some(frame.index);
                stdin
                    .write_all(&frame.frame.pixels)
                    .map_err(|e| MosaicError::encode(format!("Failed writing frame to ffmpeg: {e}")))?;
            }
            EncoderRequest::Finish => break,
            EncoderRequest::Start(_) => {
                return Err(MosaicError::encode("encoder already started"));
            }
        }
    }
    stdin
        .flush()
        .map_err(|e| MosaicError::encode(format!("Failed flushing ffmpeg input: {e}")))?;
    tracing::debug!(frames = last_index.map(|i| i + 1).unwrap_or(0), "Encoder input closed");
    Ok(())
}

fn forward_chunks(
    mut stdout: impl Read,
    responses: mpsc::UnboundedSender<EncoderResponse>,
) -> MosaicResult<()> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = stdout
            .read(&mut buf)
            .map_err(|e| MosaicError::encode(format!("Failed reading ffmpeg output: {e}")))?;
        if n == 0 {
            return Ok(());
        }
        // The producer may have given up; keep draining so ffmpeg can exit.
        let _ = responses.send(EncoderResponse::Chunk(buf[..n].to_vec()));
    }
}

/// Parse `-progress pipe:2` output, reporting encoded frames. Lines that are
/// not progress keys are returned as the log tail for error messages.
fn read_progress(stderr: impl Read, responses: mpsc::UnboundedSender<EncoderResponse>) -> String {
    let mut reader = BufReader::new(stderr);
    let mut line = String::new();
    let mut state = ProgressState::default();
    let mut log = String::new();
    let mut last_progress_wall = std::time::Instant::now();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                log.push_str(&format!("<failed to read ffmpeg stderr: {err}>"));
                break;
            }
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match trimmed.split_once('=') {
            Some((key, value)) if is_progress_key(key) => {
                let before = state.frame;
                state.update(key, value);
                if key == "progress" {
                    if state.frame > before || state.complete {
                        last_progress_wall = std::time::Instant::now();
                    } else if last_progress_wall.elapsed().as_secs() >= 10 {
                        tracing::warn!(
                            frame = state.frame,
                            out_time_secs = state.out_time_secs,
                            "No ffmpeg progress advancement for 10s"
                        );
                        last_progress_wall = std::time::Instant::now();
                    }
                    let _ = responses.send(EncoderResponse::Progress {
                        frames: state.frame,
                    });
                }
            }
            _ => {
                tracing::warn!(line = trimmed, "ffmpeg");
                log.push_str(trimmed);
                log.push('\n');
            }
        }
    }
    log
}

fn is_progress_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Default)]
struct ProgressState {
    frame: u64,
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            "frame" => {
                if let Ok(frame) = value.trim().parse::<u64>() {
                    self.frame = frame;
                }
            }
            // ffmpeg reports microseconds under both names.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn request_name(request: &EncoderRequest) -> &'static str {
    match request {
        EncoderRequest::Start(_) => "start",
        EncoderRequest::Frame(_) => "frame",
        EncoderRequest::Finish => "finish",
    }
}

/// Full ffmpeg command line for one export.
pub fn ffmpeg_args(start: &EncoderStart) -> Vec<String> {
    let options = &start.options;
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-v".into(),
        "error".into(),
        "-y".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgba".into(),
        "-s".into(),
        format!("{}x{}", start.canvas.w, start.canvas.h),
        "-r".into(),
        options.fps.max(1).to_string(),
        "-i".into(),
        "pipe:0".into(),
    ];

    let audio: Vec<&AudioStream> = start
        .audio_streams
        .iter()
        .filter(|s| s.path.is_some())
        .collect();
    for stream in &audio {
        if stream.trim_start_secs > 0.0 {
            args.push("-ss".into());
            args.push(format!("{:.3}", stream.trim_start_secs));
        }
        if let Some(length) = stream.trim_length_secs {
            args.push("-t".into());
            args.push(format!("{length:.3}"));
        }
        if let Some(path) = &stream.path {
            args.push("-i".into());
            args.push(path.display().to_string());
        }
    }

    if !audio.is_empty() {
        args.push("-filter_complex".into());
        args.push(audio_filter(&audio));
        args.push("-map".into());
        args.push("0:v".into());
        args.push("-map".into());
        args.push("[aout]".into());
    }

    args.extend(codec_args(options.format, options.video_bitrate_kbps, options.audio_bitrate_kbps, !audio.is_empty()));
    args.push("-progress".into());
    args.push("pipe:2".into());
    args.push("-nostats".into());
    args.push("pipe:1".into());
    args
}

fn audio_filter(audio: &[&AudioStream]) -> String {
    let mut filter = String::new();
    for (i, stream) in audio.iter().enumerate() {
        let delay_ms = (stream.offset_secs.max(0.0) * 1000.0).round() as u64;
        filter.push_str(&format!(
            "[{}:a]volume={:.3},adelay={delay_ms}|{delay_ms}[a{i}];",
            i + 1,
            stream.volume.clamp(0.0, 1.0)
        ));
    }
    for i in 0..audio.len() {
        filter.push_str(&format!("[a{i}]"));
    }
    filter.push_str(&format!(
        "amix=inputs={}:duration=longest:normalize=0[aout]",
        audio.len()
    ));
    filter
}

fn codec_args(format: ExportFormat, video_kbps: u32, audio_kbps: u32, with_audio: bool) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    match format {
        ExportFormat::Mp4 => {
            args.extend(
                [
                    "-c:v",
                    "libx264",
                    "-preset",
                    "medium",
                    "-profile:v",
                    "high",
                    "-pix_fmt",
                    "yuv420p",
                    "-vf",
                    "scale=trunc(iw/2)*2:trunc(ih/2)*2",
                ]
                .map(String::from),
            );
            if video_kbps > 0 {
                args.push("-b:v".into());
                args.push(format!("{video_kbps}k"));
            }
            if with_audio {
                args.extend(["-c:a", "aac", "-b:a"].map(String::from));
                args.push(format!("{}k", audio_kbps.max(64)));
            }
            // A pipe cannot be seeked back to write the index.
            args.extend(
                [
                    "-movflags",
                    "frag_keyframe+empty_moov+default_base_moof",
                    "-f",
                    "mp4",
                ]
                .map(String::from),
            );
        }
        ExportFormat::Webm => {
            args.extend(["-c:v", "libvpx-vp9", "-pix_fmt", "yuv420p"].map(String::from));
            if video_kbps > 0 {
                args.push("-b:v".into());
                args.push(format!("{video_kbps}k"));
            }
            if with_audio {
                args.extend(["-c:a", "libopus", "-b:a"].map(String::from));
                args.push(format!("{}k", audio_kbps.max(64)));
            }
            args.extend(["-f", "webm"].map(String::from));
        }
        ExportFormat::Png | ExportFormat::Jpg => {}
    }
    args
}
