//! The editing session.
//!
//! [`Editor`] owns the layer store, the history and the interaction engine
//! and is the only writer of all three. UI code feeds it [`EditorInput`]s
//! and discrete commands; it answers with [`MediaRequest`]s whenever some
//! content has to be resolved asynchronously, and is told the result
//! through [`Editor::complete_media_load`].

use std::path::Path;

use mosaic_common::config::EditorDefaults;
use mosaic_common::error::{MosaicError, MosaicResult};
use mosaic_scene_model::transfer::{layer_from_clipboard, layer_to_clipboard, ClipboardError, DragPayload};
use mosaic_scene_model::{
    AudioTrack, BlobStore, Bounds, CanvasConfig, Fill, FillKind, Layer, LayerId, LayerKind, MediaKind, MediaPlacement,
    MediaRef, MediaResolver, Point2D, ProjectError, ProjectFile, ShapeKind, SharedMedia, UploadedAsset,
};

use crate::ai::{AiEditError, ImageEditOperation, ImageEditRequest, ImageEditService};
use crate::history::{History, HistoryEntry};
use crate::input::EditorInput;
use crate::interaction::{hit_test, GestureEnd, GestureKind, InteractionConfig, InteractionEngine};
use crate::shortcuts::{self, Shortcut};
use crate::snap::AlignmentGuide;
use crate::store::LayerStore;

/// Size of the placeholder box shown while media loads.
const MEDIA_PLACEHOLDER_SIZE: f64 = 400.0;

/// Maps screen pixels (relative to the viewport origin) to canvas units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

impl Viewport {
    /// Zoom and center the canvas inside a `view_w`×`view_h` area.
    pub fn fit(canvas: &CanvasConfig, view_w: f64, view_h: f64) -> Self {
        let zoom = (view_w / canvas.width as f64).min(view_h / canvas.height as f64);
        Self {
            zoom,
            pan_x: (view_w - canvas.width as f64 * zoom) / 2.0,
            pan_y: (view_h - canvas.height as f64 * zoom) / 2.0,
        }
    }

    pub fn to_canvas(&self, x: f64, y: f64) -> Point2D {
        Point2D::new((x - self.pan_x) / self.zoom, (y - self.pan_y) / self.zoom)
    }
}

/// Where resolved content should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaTarget {
    /// A loading layer; the handle attaches to its refs matching `src`.
    Layer(LayerId),
    /// Becomes this Frame's Fill.
    FrameFill(LayerId),
    /// Becomes a new audio track.
    AudioTrack { name: String },
}

/// Content the caller must resolve and report back.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRequest {
    pub target: MediaTarget,
    pub kind: MediaKind,
    pub src: String,
    /// Resize the layer to the media's aspect ratio once loaded.
    pub fit_to_media: bool,
}

/// Layer z-order changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reorder {
    Forward,
    Backward,
    ToFront,
    ToBack,
}

/// What handling one input produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputOutcome {
    pub gesture_started: Option<GestureKind>,
    pub gesture_ended: Option<GestureEnd>,
    pub shortcut: Option<Shortcut>,
    /// Payload to put on the system clipboard after a copy.
    pub clipboard: Option<String>,
    pub media_requests: Vec<MediaRequest>,
}

#[derive(Debug, Clone)]
pub struct Editor {
    store: LayerStore,
    history: History,
    interaction: InteractionEngine,
    defaults: EditorDefaults,
    viewport: Viewport,
    clipboard: Option<String>,
    uploaded_assets: Vec<UploadedAsset>,
}

impl Editor {
    /// An empty session on `canvas`.
    pub fn new(canvas: CanvasConfig, defaults: EditorDefaults) -> Self {
        let store = LayerStore::new(canvas);
        let history = History::new(HistoryEntry::capture(&store), defaults.history_limit);
        Self {
            store,
            history,
            interaction: InteractionEngine::new(InteractionConfig::from(&defaults)),
            defaults,
            viewport: Viewport::default(),
            clipboard: None,
            uploaded_assets: Vec::new(),
        }
    }

    /// A session starting from an already-resolved project.
    pub fn from_project(project: ProjectFile, defaults: EditorDefaults) -> Result<Self, ProjectError> {
        let mut editor = Self::new(project.canvas(), defaults);
        editor.open_project(project)?;
        Ok(editor)
    }

    pub fn store(&self) -> &LayerStore {
        &self.store
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn interaction(&self) -> &InteractionEngine {
        &self.interaction
    }

    pub fn layers(&self) -> &[Layer] {
        self.store.get_layers()
    }

    pub fn audio_tracks(&self) -> &[AudioTrack] {
        self.store.get_audio_tracks()
    }

    pub fn canvas(&self) -> &CanvasConfig {
        self.store.canvas()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn guides(&self) -> &[AlignmentGuide] {
        self.interaction.guides()
    }

    pub fn uploaded_assets(&self) -> &[UploadedAsset] {
        &self.uploaded_assets
    }

    pub fn register_upload(&mut self, asset: UploadedAsset) {
        self.uploaded_assets.push(asset);
    }

    /// Every content reference the session can still show, including
    /// those only reachable through undo/redo.
    pub fn media_refs_in_use(&self) -> impl Iterator<Item = &MediaRef> {
        self.store.media_refs().chain(self.history.media_refs())
    }

    fn commit(&mut self) -> bool {
        self.history.commit_store(&self.store)
    }

    // Input

    /// Dispatch one pointer or keyboard input.
    pub fn handle_input(&mut self, input: EditorInput) -> MosaicResult<InputOutcome> {
        let zoom = self.viewport.zoom;
        let mut outcome = InputOutcome::default();
        match input {
            EditorInput::PointerDown { x, y, modifiers, .. } => {
                let point = self.viewport.to_canvas(x, y);
                if !self.interaction.is_idle() {
                    self.interaction.cancel(&mut self.store);
                }
                outcome.gesture_started = self.interaction.pointer_down(&mut self.store, point, modifiers, zoom);
            }
            EditorInput::PointerMove { x, y, modifiers } => {
                let point = self.viewport.to_canvas(x, y);
                self.interaction.pointer_move(&mut self.store, point, modifiers, zoom);
            }
            EditorInput::PointerUp { x, y } => {
                let point = self.viewport.to_canvas(x, y);
                outcome.gesture_ended = self.interaction.pointer_up(&mut self.store, &mut self.history, point);
            }
            EditorInput::DoubleClick { x, y } => {
                let point = self.viewport.to_canvas(x, y);
                if let Some(index) = hit_test(self.store.get_layers(), point) {
                    let id = self.store.get_layers()[index].id.clone();
                    self.enter_fill_edit(&id);
                }
            }
            EditorInput::Key(key) => {
                if let Some(shortcut) = shortcuts::resolve(&key, &self.defaults) {
                    outcome.shortcut = Some(shortcut);
                    self.apply_shortcut(shortcut, &mut outcome)?;
                }
            }
        }
        Ok(outcome)
    }

    fn apply_shortcut(&mut self, shortcut: Shortcut, outcome: &mut InputOutcome) -> MosaicResult<()> {
        if !self.interaction.is_idle() {
            if shortcut == Shortcut::Escape {
                self.interaction.cancel(&mut self.store);
            }
            return Ok(());
        }
        match shortcut {
            Shortcut::Delete => {
                self.delete_selection();
            }
            Shortcut::Undo => {
                self.undo();
            }
            Shortcut::Redo => {
                self.redo();
            }
            Shortcut::Duplicate => outcome.media_requests = self.duplicate_selection()?,
            Shortcut::Copy => outcome.clipboard = self.copy_selection()?,
            Shortcut::Paste => outcome.media_requests = self.paste(None)?,
            Shortcut::SelectAll => self.store.select_all(),
            Shortcut::Escape => {
                if self.store.fill_edit().is_some() {
                    self.store.exit_fill_edit();
                } else {
                    self.store.clear_selection();
                }
            }
            Shortcut::Nudge { dx, dy } => {
                self.nudge(dx, dy);
            }
        }
        Ok(())
    }

    // History

    pub fn undo(&mut self) -> bool {
        self.interaction.cancel(&mut self.store);
        self.history.undo(&mut self.store)
    }

    pub fn redo(&mut self) -> bool {
        self.interaction.cancel(&mut self.store);
        self.history.redo(&mut self.store)
    }

    // Selection

    pub fn select(&mut self, id: &LayerId) {
        if self.store.layer(id).is_some() {
            self.store.select(id.clone());
        }
    }

    pub fn select_all(&mut self) {
        self.store.select_all();
    }

    pub fn clear_selection(&mut self) {
        self.store.clear_selection();
    }

    pub fn enter_fill_edit(&mut self, id: &LayerId) -> bool {
        self.store.enter_fill_edit(id)
    }

    pub fn exit_fill_edit(&mut self) {
        self.store.exit_fill_edit();
    }

    // Adding content

    fn canvas_center(&self) -> Point2D {
        let canvas = self.store.canvas();
        Point2D::new(canvas.width as f64 / 2.0, canvas.height as f64 / 2.0)
    }

    fn insert_layer(&mut self, layer: Layer) -> LayerId {
        let id = layer.id.clone();
        self.store.replace_layers(|layers| {
            let mut next = layers.to_vec();
            next.push(layer);
            next
        });
        self.store.select(id.clone());
        id
    }

    /// Add a text layer centered on the canvas. Commits.
    pub fn add_text(&mut self, text: impl Into<String>) -> LayerId {
        let width = (self.store.canvas().width as f64 * 0.6).max(self.defaults.min_layer_size);
        let layer = Layer::text(text, Bounds::centered(self.canvas_center(), width, 120.0));
        let id = self.insert_layer(layer);
        self.commit();
        tracing::debug!(layer = %id, "Text layer added");
        id
    }

    /// Add a shape layer centered on the canvas. Commits.
    pub fn add_shape(&mut self, shape: ShapeKind) -> LayerId {
        let (w, h) = match shape {
            ShapeKind::Line | ShapeKind::Arrow => (400.0, 40.0),
            ShapeKind::Rectangle | ShapeKind::Ellipse => (300.0, 300.0),
        };
        let id = self.insert_layer(Layer::shape(shape, Bounds::centered(self.canvas_center(), w, h)));
        self.commit();
        tracing::debug!(layer = %id, ?shape, "Shape layer added");
        id
    }

    /// Add an empty Frame centered on the canvas. Commits.
    pub fn add_frame(&mut self, shape: ShapeKind) -> LayerId {
        let bounds = Bounds::centered(self.canvas_center(), MEDIA_PLACEHOLDER_SIZE, MEDIA_PLACEHOLDER_SIZE);
        let id = self.insert_layer(Layer::frame(shape, bounds));
        self.commit();
        tracing::debug!(layer = %id, ?shape, "Frame layer added");
        id
    }

    /// Start adding image, video or audio content.
    ///
    /// Image and video get a loading placeholder layer right away (at `at`
    /// or the canvas center); nothing is committed until the media loads.
    pub fn add_media(&mut self, kind: MediaKind, src: impl Into<String>, at: Option<Point2D>) -> MediaRequest {
        let src = src.into();
        let center = at.unwrap_or_else(|| self.canvas_center());
        let bounds = Bounds::centered(center, MEDIA_PLACEHOLDER_SIZE, MEDIA_PLACEHOLDER_SIZE);
        let mut layer = match kind {
            MediaKind::Image => Layer::image(src.clone(), bounds),
            MediaKind::Video => Layer::video(src.clone(), bounds, 0.0),
            MediaKind::Audio => {
                return MediaRequest {
                    target: MediaTarget::AudioTrack {
                        name: display_name(&src),
                    },
                    kind,
                    src,
                    fit_to_media: false,
                };
            }
        };
        layer.name = display_name(&src);
        layer.is_loading = true;
        let id = self.insert_layer(layer);
        tracing::debug!(layer = %id, ?kind, "Media placeholder added");
        MediaRequest {
            target: MediaTarget::Layer(id),
            kind,
            src,
            fit_to_media: true,
        }
    }

    /// Deliver the outcome of a [`MediaRequest`].
    ///
    /// On success the content is attached and the change committed. On
    /// failure a loading placeholder is removed and the error returned for
    /// display; the rest of the session is unaffected.
    pub fn complete_media_load(&mut self, request: &MediaRequest, result: MosaicResult<SharedMedia>) -> MosaicResult<()> {
        let handle = match result {
            Ok(handle) => handle,
            Err(err) => {
                tracing::warn!(src = %short(&request.src), error = %err, "Media load failed");
                if let MediaTarget::Layer(id) = &request.target {
                    if self.store.layer(id).is_some_and(|l| l.is_loading) {
                        self.store
                            .replace_layers(|layers| layers.iter().filter(|l| &l.id != id).cloned().collect());
                    }
                }
                return Err(match err {
                    e @ MosaicError::MediaLoad { .. } => e,
                    other => MosaicError::media_load(request.src.clone(), other.to_string()),
                });
            }
        };

        match &request.target {
            MediaTarget::Layer(id) => {
                let Some(layer) = self.store.layer(id) else {
                    tracing::debug!(layer = %id, "Media arrived for a removed layer");
                    handle.release();
                    return Ok(());
                };
                let next = attach_media(layer, request, &handle, self.defaults.min_layer_size);
                let loaded = !next.is_loading;
                self.store.update_layer(id, |_| next);
                if loaded {
                    self.commit();
                    tracing::debug!(layer = %id, "Media layer loaded");
                }
            }
            MediaTarget::FrameFill(id) => {
                let kind = match request.kind {
                    MediaKind::Video => FillKind::Video,
                    _ => FillKind::Image,
                };
                let fill = Fill {
                    kind,
                    src: MediaRef::resolved(request.src.clone(), handle.clone()),
                    placement: MediaPlacement::default(),
                };
                if !self.set_fill(id, Some(fill)) {
                    handle.release();
                }
            }
            MediaTarget::AudioTrack { name } => {
                let mut track = AudioTrack::new(name.clone(), request.src.clone());
                track.src.handle = Some(handle);
                self.add_audio_track(track);
            }
        }
        Ok(())
    }

    /// Add a resolved audio track. Commits.
    pub fn add_audio_track(&mut self, track: AudioTrack) {
        tracing::debug!(track = %track.name, "Audio track added");
        self.store.replace_audio_tracks(|tracks| {
            let mut next = tracks.to_vec();
            next.push(track);
            next
        });
        self.commit();
    }

    /// Remove an audio track. Commits.
    pub fn remove_audio_track(&mut self, id: &str) -> bool {
        if !self.store.get_audio_tracks().iter().any(|t| t.id == id) {
            return false;
        }
        self.store
            .replace_audio_tracks(|tracks| tracks.iter().filter(|t| t.id != id).cloned().collect());
        self.commit()
    }

    // Editing

    /// Discrete property edit on one layer. Commits.
    pub fn update_layer<F>(&mut self, id: &LayerId, edit: F) -> bool
    where
        F: FnOnce(&mut Layer),
    {
        let changed = self.store.update_layer(id, |layer| {
            let mut next = layer.clone();
            edit(&mut next);
            next.width = next.width.max(f64::EPSILON);
            next.height = next.height.max(f64::EPSILON);
            next.opacity = next.opacity.clamp(0.0, 1.0);
            next
        });
        changed && self.commit()
    }

    /// Remove layers by id. Commits.
    pub fn delete_layers(&mut self, ids: &[LayerId]) -> bool {
        let before = self.store.get_layers().len();
        self.store
            .replace_layers(|layers| layers.iter().filter(|l| !ids.contains(&l.id)).cloned().collect());
        let removed = before - self.store.get_layers().len();
        if removed > 0 {
            tracing::debug!(removed, "Layers deleted");
        }
        removed > 0 && self.commit()
    }

    /// Delete key: clear the Fill while one is being edited, otherwise
    /// remove the selected layers.
    pub fn delete_selection(&mut self) -> bool {
        if let Some(frame) = self.store.fill_edit().cloned() {
            self.store.exit_fill_edit();
            return self.set_fill(&frame, None);
        }
        let ids = self.store.selection().to_vec();
        self.delete_layers(&ids)
    }

    /// Set or clear a Frame's Fill. Commits.
    pub fn set_fill(&mut self, frame_id: &LayerId, fill: Option<Fill>) -> bool {
        if !self.store.layer(frame_id).is_some_and(Layer::is_frame) {
            return false;
        }
        self.store.update_layer(frame_id, |layer| {
            let mut next = layer.clone();
            if let LayerKind::Frame(frame) = &mut next.kind {
                frame.fill = fill;
            }
            next
        });
        self.commit()
    }

    pub fn reorder(&mut self, id: &LayerId, reorder: Reorder) -> bool {
        let Some(index) = self.store.index_of(id) else {
            return false;
        };
        let last = self.store.get_layers().len() - 1;
        let target = match reorder {
            Reorder::Forward => (index + 1).min(last),
            Reorder::Backward => index.saturating_sub(1),
            Reorder::ToFront => last,
            Reorder::ToBack => 0,
        };
        if target == index {
            return false;
        }
        self.store.replace_layers(|layers| {
            let mut next = layers.to_vec();
            let layer = next.remove(index);
            next.insert(target, layer);
            next
        });
        self.commit()
    }

    /// Move the selection by a fixed step. Commits.
    pub fn nudge(&mut self, dx: f64, dy: f64) -> bool {
        if self.store.selection().is_empty() {
            return false;
        }
        let selection = self.store.selection().to_vec();
        self.store.replace_layers(|layers| {
            layers
                .iter()
                .map(|l| {
                    if selection.contains(&l.id) {
                        Layer {
                            x: l.x + dx,
                            y: l.y + dy,
                            ..l.clone()
                        }
                    } else {
                        l.clone()
                    }
                })
                .collect()
        });
        self.commit()
    }

    // Clipboard

    /// Copy the top-most selected layer. Returns the payload, `None` when
    /// nothing is selected.
    pub fn copy_selection(&mut self) -> MosaicResult<Option<String>> {
        let Some(layer) = self
            .store
            .get_layers()
            .iter()
            .rev()
            .find(|l| self.store.is_selected(&l.id))
        else {
            return Ok(None);
        };
        let payload = layer_to_clipboard(layer)?;
        self.clipboard = Some(payload.clone());
        Ok(Some(payload))
    }

    /// Paste `payload`, or the last copied layer, offset from its origin.
    pub fn paste(&mut self, payload: Option<&str>) -> MosaicResult<Vec<MediaRequest>> {
        let payload = match payload {
            Some(p) => p.to_string(),
            None => self.clipboard.clone().ok_or(ClipboardError::Empty)?,
        };
        let mut layer = layer_from_clipboard(&payload)?;
        layer.x += self.defaults.paste_offset;
        layer.y += self.defaults.paste_offset;
        Ok(self.insert_transferred(layer, None))
    }

    /// Duplicate every selected layer above its original.
    pub fn duplicate_selection(&mut self) -> MosaicResult<Vec<MediaRequest>> {
        let originals: Vec<Layer> = self
            .store
            .get_layers()
            .iter()
            .filter(|l| self.store.is_selected(&l.id))
            .cloned()
            .collect();
        let mut requests = Vec::new();
        let mut created = Vec::new();
        for original in originals {
            let mut copy = layer_from_clipboard(&layer_to_clipboard(&original)?)?;
            copy.x += self.defaults.paste_offset;
            copy.y += self.defaults.paste_offset;
            created.push(copy.id.clone());
            requests.extend(self.insert_transferred(copy, Some(&original.id)));
        }
        if let Some(first) = created.first() {
            self.store.select(first.clone());
            for id in created.iter().skip(1) {
                self.store.toggle_selected(id.clone());
            }
        }
        Ok(requests)
    }

    /// Insert a layer rebuilt from a transfer payload. Layers with content
    /// come in loading and get one request per reference; others commit
    /// immediately.
    fn insert_transferred(&mut self, mut layer: Layer, above: Option<&LayerId>) -> Vec<MediaRequest> {
        let id = layer.id.clone();
        let requests: Vec<MediaRequest> = layer
            .media_refs_mut()
            .into_iter()
            .map(|(kind, media)| MediaRequest {
                target: MediaTarget::Layer(id.clone()),
                kind,
                src: media.src.clone(),
                fit_to_media: false,
            })
            .collect();
        layer.is_loading = !requests.is_empty();

        let position = above.and_then(|a| self.store.index_of(a)).map(|i| i + 1);
        self.store.replace_layers(|layers| {
            let mut next = layers.to_vec();
            match position {
                Some(i) => next.insert(i, layer),
                None => next.push(layer),
            }
            next
        });
        self.store.select(id);
        if requests.is_empty() {
            self.commit();
        }
        requests
    }

    // Drag and drop

    /// Drop an asset at a screen position: onto a Frame it becomes the
    /// Fill, elsewhere it becomes a new layer centered on the drop point.
    pub fn drop_asset(&mut self, payload: DragPayload, x: f64, y: f64) -> MosaicResult<Vec<MediaRequest>> {
        let point = self.viewport.to_canvas(x, y);
        let DragPayload { kind, src } = payload;

        let frame = (kind != MediaKind::Audio)
            .then(|| {
                self.store
                    .get_layers()
                    .iter()
                    .rev()
                    .find(|l| l.is_frame() && l.contains_point(point))
                    .map(|l| l.id.clone())
            })
            .flatten();

        let request = match frame {
            Some(frame_id) => MediaRequest {
                target: MediaTarget::FrameFill(frame_id),
                kind,
                src: src.src.clone(),
                fit_to_media: false,
            },
            None => self.add_media(kind, src.src.clone(), Some(point)),
        };

        // Content that is already live needs no round trip.
        match src.handle {
            Some(handle) if handle.is_ready() => {
                self.complete_media_load(&request, Ok(handle))?;
                Ok(vec![])
            }
            _ => Ok(vec![request]),
        }
    }

    // Projects

    /// Replace the session with `project`. Validates first; on error the
    /// current session is left as it was.
    pub fn open_project(&mut self, project: ProjectFile) -> Result<(), ProjectError> {
        project.validate()?;
        self.interaction.cancel(&mut self.store);
        let canvas = project.canvas();
        self.store = LayerStore::with_contents(canvas, project.layers, project.audio_tracks);
        self.history = History::new(HistoryEntry::capture(&self.store), self.defaults.history_limit);
        self.uploaded_assets = project.uploaded_assets;
        tracing::info!(
            layers = self.store.get_layers().len(),
            audio_tracks = self.store.get_audio_tracks().len(),
            "Project opened"
        );
        Ok(())
    }

    /// Load a project file, resolve its media and switch to it.
    ///
    /// Returns the per-item media failures (those items are dropped). Any
    /// error while reading or validating leaves the current session
    /// untouched.
    pub async fn load_project(&mut self, path: impl AsRef<Path>, resolver: &dyn MediaResolver) -> MosaicResult<Vec<MosaicError>> {
        let mut project = ProjectFile::load(path)?;
        let failures = project.resolve_media(resolver).await;
        self.open_project(project)?;
        Ok(failures)
    }

    /// Snapshot the session as a project document.
    pub fn to_project(&self) -> ProjectFile {
        let mut project = ProjectFile::new(self.store.canvas());
        project.layers = self.store.get_layers().iter().filter(|l| !l.is_loading).cloned().collect();
        project.audio_tracks = self.store.get_audio_tracks().to_vec();
        project.uploaded_assets = self.uploaded_assets.clone();
        project
    }

    /// Write a portable project file.
    pub fn save_project(&self, path: impl AsRef<Path>, blobs: &BlobStore) -> Result<ProjectFile, ProjectError> {
        let mut project = self.to_project();
        project.make_portable(blobs)?;
        project.save(path)?;
        Ok(project)
    }

    // AI image edits

    /// Build a request for the image service from an Image layer.
    pub fn image_edit_request(&self, id: &LayerId, operation: ImageEditOperation) -> Result<ImageEditRequest, AiEditError> {
        let layer = self
            .store
            .layer(id)
            .ok_or_else(|| AiEditError::NotAnImage(id.to_string()))?;
        let LayerKind::Image(image) = &layer.kind else {
            return Err(AiEditError::NotAnImage(id.to_string()));
        };
        if layer.is_loading {
            return Err(AiEditError::MediaNotReady(id.to_string()));
        }
        Ok(ImageEditRequest {
            source: image.src.src.clone(),
            mask: None,
            references: vec![],
            operation,
        })
    }

    /// Swap in an edited image. Reversible edits keep the first original
    /// so [`Editor::revert_image_edit`] can restore it. Commits.
    pub fn apply_image_edit(&mut self, id: &LayerId, operation: &ImageEditOperation, result: MediaRef) -> Result<(), AiEditError> {
        let layer = self.store.layer(id).ok_or_else(|| AiEditError::NotAnImage(id.to_string()))?;
        let LayerKind::Image(_) = &layer.kind else {
            return Err(AiEditError::NotAnImage(id.to_string()));
        };
        let reversible = operation.is_reversible();
        self.store.update_layer(id, |layer| {
            let mut next = layer.clone();
            if let LayerKind::Image(image) = &mut next.kind {
                let previous = std::mem::replace(&mut image.src, result);
                if reversible {
                    image.original_src.get_or_insert(previous);
                } else {
                    image.original_src = None;
                }
            }
            next
        });
        self.commit();
        tracing::debug!(layer = %id, reversible, "Image edit applied");
        Ok(())
    }

    /// Restore the image kept by a reversible edit. Commits.
    pub fn revert_image_edit(&mut self, id: &LayerId) -> Result<(), AiEditError> {
        let original = match self.store.layer(id).map(|l| &l.kind) {
            Some(LayerKind::Image(image)) => image
                .original_src
                .clone()
                .ok_or_else(|| AiEditError::NothingToRevert(id.to_string()))?,
            _ => return Err(AiEditError::NotAnImage(id.to_string())),
        };
        self.store.update_layer(id, |layer| {
            let mut next = layer.clone();
            if let LayerKind::Image(image) = &mut next.kind {
                image.src = original;
                image.original_src = None;
            }
            next
        });
        self.commit();
        Ok(())
    }

    /// Run an edit through `service` and apply the resolved result.
    pub async fn edit_image(
        &mut self,
        service: &dyn ImageEditService,
        resolver: &dyn MediaResolver,
        id: &LayerId,
        operation: ImageEditOperation,
    ) -> Result<(), AiEditError> {
        let request = self.image_edit_request(id, operation.clone())?;
        tracing::info!(service = service.name(), layer = %id, "Requesting image edit");
        let response = service.edit(request).await?;
        let handle = resolver
            .resolve(&response.src, MediaKind::Image)
            .await
            .map_err(|e| AiEditError::InvalidResponse(e.to_string()))?;
        self.apply_image_edit(id, &operation, MediaRef::resolved(response.src, handle))
    }
}

/// Attach a resolved handle to `layer`'s refs matching the request.
fn attach_media(layer: &Layer, request: &MediaRequest, handle: &SharedMedia, min_size: f64) -> Layer {
    let mut next = layer.clone();
    for (kind, media) in next.media_refs_mut() {
        if kind == request.kind && media.src == request.src && media.handle.is_none() {
            media.handle = Some(handle.clone());
        }
    }
    next.is_loading = next.media_refs().iter().any(|m| m.handle.is_none());

    if let LayerKind::Video(video) = &mut next.kind {
        if let Some(duration) = handle.duration_secs() {
            video.duration = duration;
        }
    }

    if request.fit_to_media {
        let (nw, nh) = handle.natural_size();
        if nw > 0 && nh > 0 {
            let (nw, nh) = (nw as f64, nh as f64);
            let scale = (layer.width / nw).min(layer.height / nh);
            let grow = (min_size / (nw * scale)).max(min_size / (nh * scale)).max(1.0);
            let (w, h) = (nw * scale * grow, nh * scale * grow);
            next.set_bounds(Bounds::centered(layer.center(), w, h));
        }
    }
    next
}

fn display_name(src: &str) -> String {
    if src.starts_with("data:") || src.starts_with("blob:") {
        return "Untitled".to_string();
    }
    src.rsplit(|c| c == '/' || c == '\\')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(src)
        .to_string()
}

fn short(src: &str) -> String {
    src.chars().take(64).collect()
}
