//! Fire-and-forget media loading.
//!
//! Each request is resolved on its own task; outcomes come back through a
//! channel that the single-threaded editing loop drains between ticks.

use std::sync::Arc;

use tokio::sync::mpsc;

use mosaic_common::error::{MosaicError, MosaicResult};
use mosaic_editor_core::{Editor, MediaRequest};
use mosaic_scene_model::{MediaKind, MediaResolver, SharedMedia};

/// Result of one load, tagged with the caller's ticket.
#[derive(Debug)]
pub struct LoadOutcome<T> {
    pub ticket: T,
    pub result: MosaicResult<SharedMedia>,
}

pub struct MediaLoader<T> {
    resolver: Arc<dyn MediaResolver>,
    tx: mpsc::UnboundedSender<LoadOutcome<T>>,
    rx: mpsc::UnboundedReceiver<LoadOutcome<T>>,
    pending: usize,
}

impl<T: Send + 'static> MediaLoader<T> {
    pub fn new(resolver: Arc<dyn MediaResolver>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            resolver,
            tx,
            rx,
            pending: 0,
        }
    }

    /// Loads started but not yet collected.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Start resolving `src`. Must be called inside a Tokio runtime.
    pub fn spawn(&mut self, ticket: T, src: String, kind: MediaKind) {
        let resolver = Arc::clone(&self.resolver);
        let tx = self.tx.clone();
        self.pending += 1;
        tokio::spawn(async move {
            let result = resolver.resolve(&src, kind).await;
            if let Err(err) = &result {
                tracing::warn!(error = %err, "Media load failed");
            }
            // The loader may be gone; nothing to report to then.
            let _ = tx.send(LoadOutcome { ticket, result });
        });
    }

    /// A finished load, if any, without waiting.
    pub fn try_next(&mut self) -> Option<LoadOutcome<T>> {
        let outcome = self.rx.try_recv().ok()?;
        self.pending -= 1;
        Some(outcome)
    }

    /// Wait for the next finished load. `None` once nothing is pending.
    pub async fn next(&mut self) -> Option<LoadOutcome<T>> {
        if self.pending == 0 {
            return None;
        }
        let outcome = self.rx.recv().await?;
        self.pending -= 1;
        Some(outcome)
    }
}

impl MediaLoader<MediaRequest> {
    pub fn submit(&mut self, request: MediaRequest) {
        let src = request.src.clone();
        let kind = request.kind;
        self.spawn(request, src, kind);
    }

    pub fn submit_all(&mut self, requests: impl IntoIterator<Item = MediaRequest>) {
        for request in requests {
            self.submit(request);
        }
    }

    /// Hand every finished load to `editor`. Failures are returned for
    /// display; the session itself has already dropped the placeholder.
    pub fn apply_ready(&mut self, editor: &mut Editor) -> Vec<MosaicError> {
        let mut errors = Vec::new();
        while let Some(outcome) = self.try_next() {
            if let Err(err) = editor.complete_media_load(&outcome.ticket, outcome.result) {
                errors.push(err);
            }
        }
        errors
    }

    /// Wait for every pending load and apply it to `editor`.
    pub async fn settle(&mut self, editor: &mut Editor) -> Vec<MosaicError> {
        let mut errors = Vec::new();
        while let Some(outcome) = self.next().await {
            if let Err(err) = editor.complete_media_load(&outcome.ticket, outcome.result) {
                errors.push(err);
            }
        }
        errors
    }
}
