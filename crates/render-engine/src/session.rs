//! Live editing session: the editor plus the media it plays.
//!
//! Every edit, input and finished load goes through [`LiveSession`], which
//! keeps the [`MediaSynchronizer`] in step with the layer list and the undo
//! history. Handles that leave the screen are paused; those no history
//! entry can bring back are released.

use std::path::Path;
use std::sync::Arc;

use mosaic_common::error::{MosaicError, MosaicResult};
use mosaic_editor_core::{Editor, EditorInput, InputOutcome, MediaRequest};
use mosaic_scene_model::{MediaKind, MediaResolver, Point2D};

use crate::media::{MediaLoader, MediaSynchronizer};
use crate::overlay::render_editor_overlay;
use crate::renderer::{background_for, render};
use crate::surface::Surface;

/// What one display tick did.
#[derive(Debug, Default)]
pub struct Tick {
    /// Loads that failed since the last tick.
    pub load_errors: Vec<MosaicError>,
    /// Handles that decoded new pixels.
    pub refreshed: usize,
    /// Handles released because nothing can show them again.
    pub released: usize,
}

pub struct LiveSession {
    editor: Editor,
    resolver: Arc<dyn MediaResolver>,
    loader: MediaLoader<MediaRequest>,
    sync: MediaSynchronizer,
    synced: Option<(u64, usize, usize)>,
}

impl LiveSession {
    /// Must be created inside a Tokio runtime; loads run as tasks.
    pub fn new(editor: Editor, resolver: Arc<dyn MediaResolver>) -> Self {
        let mut session = Self {
            editor,
            loader: MediaLoader::new(Arc::clone(&resolver)),
            resolver,
            sync: MediaSynchronizer::new(),
            synced: None,
        };
        session.reconcile();
        session
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn sync(&self) -> &MediaSynchronizer {
        &self.sync
    }

    /// Loads submitted but not yet applied.
    pub fn pending_loads(&self) -> usize {
        self.loader.pending()
    }

    /// Run `f` against the editor, then bring media in step with the result.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut Editor) -> R) -> R {
        let result = f(&mut self.editor);
        self.reconcile();
        result
    }

    /// Dispatch one input. Media the input asked for (paste, duplicate) is
    /// loaded in the background.
    pub fn handle_input(&mut self, input: EditorInput) -> MosaicResult<InputOutcome> {
        let outcome = self.editor.handle_input(input);
        if let Ok(outcome) = &outcome {
            self.loader.submit_all(outcome.media_requests.iter().cloned());
        }
        self.reconcile();
        outcome
    }

    /// Add image, video or audio content; it appears once loaded.
    pub fn add_media(&mut self, kind: MediaKind, src: impl Into<String>, at: Option<Point2D>) {
        let request = self.editor.add_media(kind, src, at);
        self.loader.submit(request);
        self.reconcile();
    }

    /// Start loads for requests the caller got from the editor directly.
    pub fn submit(&mut self, requests: impl IntoIterator<Item = MediaRequest>) {
        self.loader.submit_all(requests);
    }

    /// Replace the composition with the project at `path`.
    pub async fn open(&mut self, path: impl AsRef<Path>) -> MosaicResult<Vec<MosaicError>> {
        let errors = self.editor.load_project(path, self.resolver.as_ref()).await?;
        self.reconcile();
        Ok(errors)
    }

    pub fn play(&mut self) {
        self.reconcile();
        self.sync.play_all();
    }

    pub fn pause(&mut self) {
        self.sync.pause_all();
    }

    pub fn is_playing(&self) -> bool {
        self.sync.is_playing()
    }

    /// Move every playhead to composition time `secs`.
    pub async fn seek(&self, secs: f64) -> MosaicResult<Vec<f64>> {
        let _lease = self.sync.lease().await;
        self.sync.seek_all_to(secs).await
    }

    /// Apply finished loads, then advance playing media by one frame.
    pub async fn tick(&mut self) -> MosaicResult<Tick> {
        let load_errors = self.loader.apply_ready(&mut self.editor);
        let released = self.reconcile();
        let refreshed = self.sync.refresh_all().await?;
        Ok(Tick {
            load_errors,
            refreshed,
            released,
        })
    }

    /// Wait for every pending load and apply it.
    pub async fn settle(&mut self) -> Vec<MosaicError> {
        let errors = self.loader.settle(&mut self.editor).await;
        self.reconcile();
        errors
    }

    /// Draw the composition and the editing overlay.
    pub fn render<S: Surface + ?Sized>(&self, surface: &mut S) {
        render(surface, self.editor.layers(), background_for(self.editor.canvas(), false));
        render_editor_overlay(surface, &self.editor);
    }

    /// Release every handle and hand back the editor.
    pub fn close(mut self) -> Editor {
        self.sync.release_all();
        tracing::debug!("Live session closed");
        self.editor
    }

    fn reconcile(&mut self) -> usize {
        let history = self.editor.history();
        let key = (self.editor.store().revision(), history.len(), history.cursor());
        if self.synced == Some(key) {
            return 0;
        }
        self.synced = Some(key);
        self.sync.reconcile(
            self.editor.layers(),
            self.editor.audio_tracks(),
            self.editor.media_refs_in_use(),
        )
    }
}
