//! Layer store: the one place layers and audio tracks are mutated.
//!
//! Every mutation goes through [`LayerStore::replace_layers`] or
//! [`LayerStore::replace_audio_tracks`], which take a pure transform of the
//! current collection and install its result. Changed layers are new
//! values; nothing outside hands out `&mut` into the collections.

use mosaic_scene_model::{AudioTrack, CanvasConfig, Layer, LayerId, MediaRef};

#[derive(Debug, Clone, Default)]
pub struct LayerStore {
    layers: Vec<Layer>,
    audio_tracks: Vec<AudioTrack>,
    canvas: CanvasConfig,
    selection: Vec<LayerId>,
    fill_edit: Option<LayerId>,
    revision: u64,
}

impl LayerStore {
    pub fn new(canvas: CanvasConfig) -> Self {
        Self {
            canvas,
            ..Self::default()
        }
    }

    pub fn with_contents(canvas: CanvasConfig, layers: Vec<Layer>, audio_tracks: Vec<AudioTrack>) -> Self {
        Self {
            layers,
            audio_tracks,
            canvas,
            ..Self::default()
        }
    }

    pub fn get_layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn get_audio_tracks(&self) -> &[AudioTrack] {
        &self.audio_tracks
    }

    pub fn canvas(&self) -> &CanvasConfig {
        &self.canvas
    }

    pub fn set_canvas(&mut self, canvas: CanvasConfig) {
        self.canvas = canvas;
        self.revision += 1;
    }

    /// Bumped on every mutation; lets redraw and media bookkeeping skip
    /// unchanged frames.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Install `f(current layers)` as the new layer list.
    pub fn replace_layers<F>(&mut self, f: F)
    where
        F: FnOnce(&[Layer]) -> Vec<Layer>,
    {
        self.layers = f(&self.layers);
        self.revision += 1;
        self.prune_selection();
    }

    /// Install `f(current tracks)` as the new audio track list.
    pub fn replace_audio_tracks<F>(&mut self, f: F)
    where
        F: FnOnce(&[AudioTrack]) -> Vec<AudioTrack>,
    {
        self.audio_tracks = f(&self.audio_tracks);
        self.revision += 1;
    }

    /// Replace the layer with `id` by `f(old)`. Returns false when absent.
    pub fn update_layer<F>(&mut self, id: &LayerId, f: F) -> bool
    where
        F: FnOnce(&Layer) -> Layer,
    {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let updated = f(&self.layers[index]);
        self.replace_layers(|layers| {
            let mut next = layers.to_vec();
            next[index] = updated;
            next
        });
        true
    }

    pub fn layer(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| &l.id == id)
    }

    pub fn index_of(&self, id: &LayerId) -> Option<usize> {
        self.layers.iter().position(|l| &l.id == id)
    }

    // Selection

    pub fn selection(&self) -> &[LayerId] {
        &self.selection
    }

    pub fn is_selected(&self, id: &LayerId) -> bool {
        self.selection.contains(id)
    }

    /// The selected layer when exactly one is selected.
    pub fn single_selected(&self) -> Option<&Layer> {
        match self.selection.as_slice() {
            [only] => self.layer(only),
            _ => None,
        }
    }

    pub fn select(&mut self, id: LayerId) {
        self.selection = vec![id];
        self.exit_fill_edit_unless_selected();
    }

    /// Shift-click: toggle membership.
    pub fn toggle_selected(&mut self, id: LayerId) {
        if let Some(pos) = self.selection.iter().position(|s| s == &id) {
            self.selection.remove(pos);
        } else {
            self.selection.push(id);
        }
        self.exit_fill_edit_unless_selected();
    }

    pub fn select_all(&mut self) {
        self.selection = self.layers.iter().map(|l| l.id.clone()).collect();
        self.fill_edit = None;
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.fill_edit = None;
    }

    // Fill edit mode

    pub fn fill_edit(&self) -> Option<&LayerId> {
        self.fill_edit.as_ref()
    }

    /// Enter fill edit mode on a Frame that has a Fill.
    pub fn enter_fill_edit(&mut self, id: &LayerId) -> bool {
        let editable = self.layer(id).is_some_and(|l| l.frame_fill().is_some());
        if editable {
            self.selection = vec![id.clone()];
            self.fill_edit = Some(id.clone());
        }
        editable
    }

    pub fn exit_fill_edit(&mut self) {
        self.fill_edit = None;
    }

    /// Every content reference currently on the stage.
    pub fn media_refs(&self) -> impl Iterator<Item = &MediaRef> {
        self.layers
            .iter()
            .flat_map(|l| l.media_refs())
            .chain(self.audio_tracks.iter().map(|t| &t.src))
    }

    fn prune_selection(&mut self) {
        let layers = &self.layers;
        self.selection.retain(|id| layers.iter().any(|l| &l.id == id));
        if let Some(id) = &self.fill_edit {
            let still_filled = layers.iter().any(|l| &l.id == id && l.frame_fill().is_some());
            if !still_filled {
                self.fill_edit = None;
            }
        }
    }

    fn exit_fill_edit_unless_selected(&mut self) {
        if let Some(id) = &self.fill_edit {
            if self.selection.as_slice() != std::slice::from_ref(id) {
                self.fill_edit = None;
            }
        }
    }
}
