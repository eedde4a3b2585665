//! Clock and timing utilities for playback and export.
//!
//! Live playback runs against a pausable clock whose position is the
//! timeline time in seconds. Export never consults wall time: it steps
//! through frame indices and converts them with [`frame_time_secs`].

use std::time::Instant;

/// A pausable timeline clock.
///
/// While playing, the position advances with wall time from the moment
/// [`PlaybackClock::play`] was called. Pausing freezes the position.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    /// Instant playback (re)started, `None` while paused.
    anchor: Option<Instant>,

    /// Timeline position at `anchor` (or the frozen position while paused).
    base_secs: f64,
}

impl PlaybackClock {
    /// A paused clock at position zero.
    pub fn new() -> Self {
        Self {
            anchor: None,
            base_secs: 0.0,
        }
    }

    /// Start advancing from the current position. No-op if already playing.
    pub fn play(&mut self) {
        if self.anchor.is_none() {
            self.anchor = Some(Instant::now());
        }
    }

    /// Freeze at the current position.
    pub fn pause(&mut self) {
        self.base_secs = self.position_secs();
        self.anchor = None;
    }

    /// Jump to `secs`, keeping the play/pause state.
    pub fn seek(&mut self, secs: f64) {
        self.base_secs = secs.max(0.0);
        if self.anchor.is_some() {
            self.anchor = Some(Instant::now());
        }
    }

    /// Whether the clock is currently advancing.
    pub fn is_playing(&self) -> bool {
        self.anchor.is_some()
    }

    /// Current timeline position in seconds.
    pub fn position_secs(&self) -> f64 {
        match self.anchor {
            Some(anchor) => self.base_secs + anchor.elapsed().as_secs_f64(),
            None => self.base_secs,
        }
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Timestamp of frame `index` at `fps`, in seconds.
pub fn frame_time_secs(index: u64, fps: u32) -> f64 {
    index as f64 / fps.max(1) as f64
}

/// Number of frames needed to cover `duration_secs` at `fps`.
pub fn frame_count(duration_secs: f64, fps: u32) -> u64 {
    if duration_secs <= 0.0 {
        return 0;
    }
    (duration_secs * fps.max(1) as f64).ceil() as u64
}

/// Convert seconds to microseconds (encoder timestamps).
pub fn secs_to_us(secs: f64) -> u64 {
    (secs * 1_000_000.0).round() as u64
}
