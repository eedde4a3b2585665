//! Snapshot-based linear undo/redo.
//!
//! The history is a list of `(layers, audio tracks)` snapshots and a cursor
//! pointing at the entry that matches the store. The first entry is the
//! state the session started from, so the cursor is always a valid index.
//!
//! Layers still loading their media are never part of an entry. They
//! enter history with the commit that completes their load, and survive
//! undo/redo in place until then.

use mosaic_scene_model::{AudioTrack, Layer, MediaRef};

use crate::store::LayerStore;

/// One undoable state. Equality is structural.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryEntry {
    pub layers: Vec<Layer>,
    pub audio_tracks: Vec<AudioTrack>,
}

impl HistoryEntry {
    pub fn capture(store: &LayerStore) -> Self {
        Self {
            layers: settled(store.get_layers()),
            audio_tracks: store.get_audio_tracks().to_vec(),
        }
    }

    fn matches(&self, layers: &[Layer], audio_tracks: &[AudioTrack]) -> bool {
        self.audio_tracks.as_slice() == audio_tracks
            && self.layers.len() == layers.iter().filter(|l| !l.is_loading).count()
            && self
                .layers
                .iter()
                .zip(layers.iter().filter(|l| !l.is_loading))
                .all(|(a, b)| a == b)
    }
}

fn settled(layers: &[Layer]) -> Vec<Layer> {
    layers.iter().filter(|l| !l.is_loading).cloned().collect()
}

#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    limit: usize,
}

impl History {
    /// Start a history at `initial`, keeping at most `limit` entries.
    pub fn new(initial: HistoryEntry, limit: usize) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            limit: limit.max(1),
        }
    }

    /// Record the given state. Drops any redo tail first.
    ///
    /// Returns false (and records nothing) when the state equals the
    /// current entry.
    pub fn commit(&mut self, layers: &[Layer], audio_tracks: &[AudioTrack]) -> bool {
        if self.entries[self.cursor].matches(layers, audio_tracks) {
            tracing::trace!(cursor = self.cursor, "Commit skipped, state unchanged");
            return false;
        }

        self.entries.truncate(self.cursor + 1);
        self.entries.push(HistoryEntry {
            layers: settled(layers),
            audio_tracks: audio_tracks.to_vec(),
        });

        if self.entries.len() > self.limit {
            let overflow = self.entries.len() - self.limit;
            self.entries.drain(..overflow);
        }
        self.cursor = self.entries.len() - 1;
        tracing::debug!(cursor = self.cursor, entries = self.entries.len(), "History commit");
        true
    }

    /// Commit whatever the store currently holds.
    pub fn commit_store(&mut self, store: &LayerStore) -> bool {
        self.commit(store.get_layers(), store.get_audio_tracks())
    }

    /// Step back and restore the store. Clears the selection.
    pub fn undo(&mut self, store: &mut LayerStore) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.cursor -= 1;
        self.restore(store);
        tracing::debug!(cursor = self.cursor, "Undo");
        true
    }

    /// Step forward and restore the store. Clears the selection.
    pub fn redo(&mut self, store: &mut LayerStore) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.cursor += 1;
        self.restore(store);
        tracing::debug!(cursor = self.cursor, "Redo");
        true
    }

    /// Drop uncommitted store changes by restoring the current entry.
    pub fn revert(&mut self, store: &mut LayerStore) {
        let entry = &self.entries[self.cursor];
        if !entry.matches(store.get_layers(), store.get_audio_tracks()) {
            self.restore(store);
        }
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current(&self) -> &HistoryEntry {
        &self.entries[self.cursor]
    }

    /// Every content reference any entry can bring back.
    pub fn media_refs(&self) -> impl Iterator<Item = &MediaRef> {
        self.entries.iter().flat_map(|e| {
            e.layers
                .iter()
                .flat_map(|l| l.media_refs())
                .chain(e.audio_tracks.iter().map(|t| &t.src))
        })
    }

    fn restore(&self, store: &mut LayerStore) {
        let entry = &self.entries[self.cursor];
        store.replace_layers(|current| {
            let mut next = entry.layers.clone();
            for (index, layer) in current.iter().enumerate() {
                if layer.is_loading && !next.iter().any(|l| l.id == layer.id) {
                    next.insert(index.min(next.len()), layer.clone());
                }
            }
            next
        });
        store.replace_audio_tracks(|_| entry.audio_tracks.clone());
        store.clear_selection();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_scene_model::{Bounds, CanvasConfig, LayerId};

    fn setup() -> (LayerStore, History) {
        let store = LayerStore::new(CanvasConfig::default());
        let history = History::new(HistoryEntry::capture(&store), 100);
        (store, history)
    }

    fn push_layer(store: &mut LayerStore, id: &str, x: f64) {
        let layer = Layer::text(id, Bounds::new(x, 0.0, 10.0, 10.0)).with_id(id);
        store.replace_layers(|layers| {
            let mut next = layers.to_vec();
            next.push(layer);
            next
        });
    }

    #[test]
    fn test_identical_commit_is_noop() {
        let (mut store, mut history) = setup();
        assert!(!history.commit_store(&store));
        push_layer(&mut store, "a", 0.0);
        assert!(history.commit_store(&store));
        assert!(!history.commit_store(&store));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_structurally_equal_values_are_not_duplicated() {
        let (mut store, mut history) = setup();
        push_layer(&mut store, "a", 0.0);
        history.commit_store(&store);

        // Move away and back without committing in between.
        store.update_layer(&LayerId::from("a"), |l| Layer { x: 40.0, ..l.clone() });
        store.update_layer(&LayerId::from("a"), |l| Layer { x: 0.0, ..l.clone() });
        assert!(!history.commit_store(&store));
    }

    #[test]
    fn test_new_commit_truncates_redo_tail() {
        let (mut store, mut history) = setup();
        push_layer(&mut store, "a", 0.0);
        history.commit_store(&store);
        push_layer(&mut store, "b", 0.0);
        history.commit_store(&store);

        assert!(history.undo(&mut store));
        assert!(history.can_redo());
        push_layer(&mut store, "c", 0.0);
        history.commit_store(&store);
        assert!(!history.can_redo());
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_undo_clears_selection() {
        let (mut store, mut history) = setup();
        push_layer(&mut store, "a", 0.0);
        history.commit_store(&store);
        push_layer(&mut store, "b", 0.0);
        history.commit_store(&store);
        store.select(LayerId::from("a"));

        history.undo(&mut store);
        assert!(store.selection().is_empty());
        assert_eq!(store.get_layers().len(), 1);
    }

    #[test]
    fn test_limit_trims_oldest() {
        let store = LayerStore::new(CanvasConfig::default());
        let mut history = History::new(HistoryEntry::capture(&store), 3);
        let mut store = store;
        for i in 0..5 {
            push_layer(&mut store, &format!("l{i}"), 0.0);
            history.commit_store(&store);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), 2);
        while history.undo(&mut store) {}
        assert_eq!(store.get_layers().len(), 3);
    }

    #[test]
    fn test_revert_discards_uncommitted_changes() {
        let (mut store, mut history) = setup();
        push_layer(&mut store, "a", 0.0);
        history.commit_store(&store);
        store.update_layer(&LayerId::from("a"), |l| Layer { x: 99.0, ..l.clone() });
        history.revert(&mut store);
        assert_eq!(store.get_layers()[0].x, 0.0);
    }

    #[test]
    fn test_loading_layers_stay_out_of_entries() {
        let (mut store, mut history) = setup();
        push_layer(&mut store, "a", 0.0);
        history.commit_store(&store);
        let mut pending = Layer::image("p.png", Bounds::new(0.0, 0.0, 10.0, 10.0)).with_id("p");
        pending.is_loading = true;
        store.replace_layers(|layers| {
            let mut next = layers.to_vec();
            next.push(pending.clone());
            next
        });
        assert!(!history.commit_store(&store));

        push_layer(&mut store, "b", 0.0);
        assert!(history.commit_store(&store));
        assert!(history.current().layers.iter().all(|l| !l.is_loading));

        // The pending layer rides along through undo and redo.
        history.undo(&mut store);
        let ids: Vec<&str> = store.get_layers().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "p"]);
        history.redo(&mut store);
        let ids: Vec<&str> = store.get_layers().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "p", "b"]);
    }

    #[test]
    fn test_undo_at_start_does_nothing() {
        let (mut store, mut history) = setup();
        assert!(!history.undo(&mut store));
        assert!(!history.redo(&mut store));
        assert_eq!(history.cursor(), 0);
    }
}
