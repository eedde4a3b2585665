//! Messages exchanged with an encoder worker.
//!
//! The worker owns everything it receives: frame buffers are moved into
//! [`EncoderRequest::Frame`] and never touched by the producer again.

use std::path::PathBuf;

use mosaic_scene_model::{AudioTrack, CanvasSize, Layer, LayerKind, RgbaFrame};

use super::ExportOptions;

/// One audio source mixed under the video.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioStream {
    pub src: String,
    /// Local file the encoder reads. Streams without one are skipped.
    pub path: Option<PathBuf>,
    pub volume: f64,
    /// Composition time at which the stream starts.
    pub offset_secs: f64,
    /// Position in the source where playback starts.
    pub trim_start_secs: f64,
    /// How much of the source plays, when trimmed.
    pub trim_length_secs: Option<f64>,
}

impl AudioStream {
    /// Audio carried by the scene: every audio track plus each video layer
    /// whose volume is above zero.
    pub fn collect(layers: &[Layer], tracks: &[AudioTrack]) -> Vec<AudioStream> {
        let mut streams = Vec::new();
        for layer in layers {
            let LayerKind::Video(video) = &layer.kind else {
                continue;
            };
            if video.volume <= 0.0 {
                continue;
            }
            streams.push(AudioStream {
                src: video.src.src.clone(),
                path: video.src.handle.as_ref().and_then(|h| h.local_path()),
                volume: video.volume.min(1.0),
                offset_secs: 0.0,
                trim_start_secs: video.start_time,
                trim_length_secs: video.end_time.map(|_| video.play_length()),
            });
        }
        for track in tracks {
            streams.push(AudioStream {
                src: track.src.src.clone(),
                path: track.src.handle.as_ref().and_then(|h| h.local_path()),
                volume: 1.0,
                offset_secs: 0.0,
                trim_start_secs: 0.0,
                trim_length_secs: None,
            });
        }
        streams
    }
}

/// A rendered frame in straight RGBA.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub index: u64,
    pub timestamp_us: u64,
    pub frame: RgbaFrame,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncoderStart {
    pub canvas: CanvasSize,
    pub options: ExportOptions,
    pub audio_streams: Vec<AudioStream>,
}

/// Producer to worker.
#[derive(Debug)]
pub enum EncoderRequest {
    Start(EncoderStart),
    Frame(VideoFrame),
    /// No more frames; flush and close the container.
    Finish,
}

/// Worker to producer.
#[derive(Debug, Clone, PartialEq)]
pub enum EncoderResponse {
    Ready,
    Chunk(Vec<u8>),
    Progress { frames: u64 },
    Done,
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_scene_model::{Bounds, ShapeKind};

    #[test]
    fn test_collect_skips_muted_video_and_keeps_tracks() {
        let mut loud = Layer::video("a.mp4", Bounds::new(0.0, 0.0, 10.0, 10.0), 8.0);
        if let LayerKind::Video(video) = &mut loud.kind {
            video.start_time = 2.0;
            video.end_time = Some(5.0);
            video.volume = 0.5;
        }
        let mut muted = Layer::video("b.mp4", Bounds::new(0.0, 0.0, 10.0, 10.0), 8.0);
        if let LayerKind::Video(video) = &mut muted.kind {
            video.volume = 0.0;
        }
        let shape = Layer::shape(ShapeKind::Rectangle, Bounds::new(0.0, 0.0, 1.0, 1.0));
        let tracks = vec![AudioTrack::new("music", "song.mp3")];

        let streams = AudioStream::collect(&[loud, muted, shape], &tracks);
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].src, "a.mp4");
        assert_eq!(streams[0].trim_start_secs, 2.0);
        assert_eq!(streams[0].trim_length_secs, Some(3.0));
        assert_eq!(streams[0].volume, 0.5);
        assert_eq!(streams[1].src, "song.mp3");
        assert!(streams[1].path.is_none());
    }
}
