//! Playback coordination across every live handle in a composition.
//!
//! Handles are shared: the editing session, history snapshots and any
//! number of export jobs can drive the same decoder. Whoever seeks and then
//! reads pixels holds a [`PlayheadLease`] on those handles in between, so
//! another synchronizer cannot move a playhead under them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, Weak};

use futures_util::future::join_all;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use mosaic_common::error::MosaicResult;
use mosaic_scene_model::{AudioTrack, Layer, LayerKind, MediaRef, SharedMedia};

use super::lock;

type Playhead = Arc<AsyncMutex<()>>;

/// The playhead lock of one handle, shared by every synchronizer over it.
fn playhead(handle: &SharedMedia) -> (usize, Playhead) {
    static PLAYHEADS: OnceLock<Mutex<HashMap<usize, Weak<AsyncMutex<()>>>>> = OnceLock::new();
    let key = handle_key(handle);
    let mut playheads = lock(PLAYHEADS.get_or_init(Default::default));
    if let Some(existing) = playheads.get(&key).and_then(Weak::upgrade) {
        return (key, existing);
    }
    playheads.retain(|_, weak| weak.strong_count() > 0);
    let fresh = Arc::new(AsyncMutex::new(()));
    playheads.insert(key, Arc::downgrade(&fresh));
    (key, fresh)
}

fn handle_key(handle: &SharedMedia) -> usize {
    Arc::as_ptr(handle) as *const () as usize
}

/// Exclusive control of a set of playheads until dropped.
#[derive(Debug)]
pub struct PlayheadLease {
    _guards: Vec<OwnedMutexGuard<()>>,
}

/// Part of a handle's own timeline that maps onto composition time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimWindow {
    pub start: f64,
    pub end: Option<f64>,
}

impl TrimWindow {
    pub const FULL: TrimWindow = TrimWindow {
        start: 0.0,
        end: None,
    };

    /// Media time shown at composition time `secs`.
    pub fn media_time(&self, secs: f64) -> f64 {
        let t = self.start + secs.max(0.0);
        match self.end {
            Some(end) => t.min(end.max(self.start)),
            None => t,
        }
    }
}

#[derive(Debug, Clone)]
struct SyncEntry {
    handle: SharedMedia,
    window: TrimWindow,
    volume: f64,
}

/// Tracks the handles referenced by the current layers and audio tracks
/// and applies play/pause/seek to all of them at once.
#[derive(Debug, Default)]
pub struct MediaSynchronizer {
    entries: Vec<SyncEntry>,
    parked: Vec<SharedMedia>,
    playing: bool,
}

impl MediaSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronizer over one composition, e.g. for an export.
    pub fn for_scene(layers: &[Layer], tracks: &[AudioTrack]) -> Self {
        let mut sync = Self::new();
        sync.reconcile(layers, tracks, std::iter::empty::<&MediaRef>());
        sync
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn handles(&self) -> impl Iterator<Item = &SharedMedia> {
        self.entries.iter().map(|e| &e.handle)
    }

    /// Wait for exclusive use of every tracked playhead. Locks are taken
    /// in address order so overlapping lessees cannot deadlock.
    pub async fn lease(&self) -> PlayheadLease {
        let mut playheads: Vec<(usize, Playhead)> = self.entries.iter().map(|e| playhead(&e.handle)).collect();
        playheads.sort_by_key(|(key, _)| *key);
        playheads.dedup_by_key(|(key, _)| *key);
        let mut guards = Vec::with_capacity(playheads.len());
        for (_, playhead) in playheads {
            guards.push(playhead.lock_owned().await);
        }
        PlayheadLease { _guards: guards }
    }

    /// Replace the tracked set with the handles of `layers` and `tracks`.
    ///
    /// Handles that dropped out are paused. Those not reachable through
    /// `retained` either (undo history, clipboard) are released; the rest
    /// stay parked and are checked again on every later call. Returns the
    /// number released.
    pub fn reconcile<'a>(
        &mut self,
        layers: &[Layer],
        tracks: &[AudioTrack],
        retained: impl IntoIterator<Item = &'a MediaRef>,
    ) -> usize {
        let mut next: Vec<SyncEntry> = Vec::new();
        let mut push = |media: &MediaRef, window: TrimWindow, volume: f64| {
            if let Some(handle) = &media.handle {
                if !next.iter().any(|e| same_handle(&e.handle, handle)) {
                    next.push(SyncEntry {
                        handle: Arc::clone(handle),
                        window,
                        volume,
                    });
                }
            }
        };
        for layer in layers {
            match &layer.kind {
                LayerKind::Video(video) => push(
                    &video.src,
                    TrimWindow {
                        start: video.start_time,
                        end: Some(video.end()),
                    },
                    video.volume,
                ),
                LayerKind::Frame(frame) => {
                    if let Some(fill) = &frame.fill {
                        push(&fill.src, TrimWindow::FULL, 1.0);
                    }
                }
                LayerKind::Image(_) | LayerKind::Text(_) | LayerKind::Shape(_) => {}
            }
        }
        for track in tracks {
            push(&track.src, TrimWindow::FULL, 1.0);
        }

        let retained: Vec<&SharedMedia> = retained
            .into_iter()
            .filter_map(|m| m.handle.as_ref())
            .collect();
        let dropped = self
            .entries
            .drain(..)
            .map(|e| e.handle)
            .chain(self.parked.drain(..))
            .filter(|h| !next.iter().any(|e| same_handle(&e.handle, h)));
        let mut parked: Vec<SharedMedia> = Vec::new();
        let mut released = 0;
        for handle in dropped {
            if parked.iter().any(|p| same_handle(p, &handle)) {
                continue;
            }
            handle.pause();
            if retained.iter().any(|h| same_handle(h, &handle)) {
                parked.push(handle);
            } else {
                handle.release();
                released += 1;
            }
        }

        for entry in &next {
            entry.handle.set_volume(entry.volume);
            if self.playing {
                entry.handle.play();
            }
        }
        tracing::debug!(tracked = next.len(), parked = parked.len(), released, "Media reconciled");
        self.entries = next;
        self.parked = parked;
        released
    }

    pub fn play_all(&mut self) {
        self.playing = true;
        for entry in &self.entries {
            entry.handle.play();
        }
    }

    pub fn pause_all(&mut self) {
        self.playing = false;
        for entry in &self.entries {
            entry.handle.pause();
        }
    }

    /// Seek every handle to composition time `secs` and wait until all of
    /// them report the position they reached.
    pub async fn seek_all_to(&self, secs: f64) -> MosaicResult<Vec<f64>> {
        let seeks = self
            .entries
            .iter()
            .map(|e| e.handle.seek(e.window.media_time(secs)));
        let reached = join_all(seeks)
            .await
            .into_iter()
            .collect::<MosaicResult<Vec<f64>>>()?;
        tracing::trace!(secs, handles = reached.len(), "Seek barrier passed");
        Ok(reached)
    }

    /// Advance the pixels of playing handles to their clocks. Handles that
    /// ran past their trim window are paused there. Returns how many
    /// handles decoded a new frame.
    pub async fn refresh_all(&self) -> MosaicResult<usize> {
        if !self.playing {
            return Ok(0);
        }
        let _lease = self.lease().await;
        for entry in &self.entries {
            if let Some(end) = entry.window.end {
                if entry.handle.is_playing() && entry.handle.current_time() >= end {
                    entry.handle.pause();
                }
            }
        }
        let refreshed = join_all(self.entries.iter().map(|e| e.handle.refresh()))
            .await
            .into_iter()
            .collect::<MosaicResult<Vec<bool>>>()?;
        Ok(refreshed.into_iter().filter(|&r| r).count())
    }

    /// Release everything, e.g. when the session closes.
    pub fn release_all(&mut self) {
        let handles = self.entries.drain(..).map(|e| e.handle).chain(self.parked.drain(..));
        for handle in handles {
            handle.pause();
            handle.release();
        }
        self.playing = false;
    }
}

fn same_handle(a: &SharedMedia, b: &SharedMedia) -> bool {
    handle_key(a) == handle_key(b)
}
