//! Property tests for history, resizing and snapping.

mod common;

use common::*;
use mosaic_editor_core::history::{History, HistoryEntry};
use mosaic_editor_core::input::Modifiers;
use mosaic_editor_core::interaction::{resize_layer, Handle, InteractionEngine};
use mosaic_editor_core::{Editor, LayerStore};
use mosaic_scene_model::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    AddText,
    AddShape,
    Nudge(i8, i8),
    MoveFirst(i16),
    DeleteLast,
    AddAudio,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::AddText),
        Just(Op::AddShape),
        (any::<i8>(), any::<i8>()).prop_map(|(x, y)| Op::Nudge(x, y)),
        any::<i16>().prop_map(Op::MoveFirst),
        Just(Op::DeleteLast),
        Just(Op::AddAudio),
    ]
}

fn apply(editor: &mut Editor, op: &Op) {
    match op {
        Op::AddText => {
            editor.add_text("t");
        }
        Op::AddShape => {
            editor.add_shape(ShapeKind::Rectangle);
        }
        Op::Nudge(dx, dy) => {
            editor.select_all();
            editor.nudge(*dx as f64, *dy as f64);
        }
        Op::MoveFirst(dx) => {
            if let Some(id) = editor.layers().first().map(|l| l.id.clone()) {
                editor.update_layer(&id, |l| l.x += *dx as f64);
            }
        }
        Op::DeleteLast => {
            if let Some(id) = editor.layers().last().map(|l| l.id.clone()) {
                editor.delete_layers(&[id]);
            }
        }
        Op::AddAudio => {
            let mut track = AudioTrack::new("a", "a.mp3");
            track.src = MediaRef::resolved("a.mp3", StaticMedia::video(1, 1, 3.0));
            editor.add_audio_track(track);
        }
    }
}

fn snapshot(editor: &Editor) -> HistoryEntry {
    HistoryEntry {
        layers: editor.layers().to_vec(),
        audio_tracks: editor.audio_tracks().to_vec(),
    }
}

fn corner() -> impl Strategy<Value = Handle> {
    prop_oneof![
        Just(Handle::TopLeft),
        Just(Handle::TopRight),
        Just(Handle::BottomLeft),
        Just(Handle::BottomRight),
    ]
}

proptest! {
    #[test]
    fn undo_then_redo_restores_every_entry(ops in prop::collection::vec(op(), 1..25)) {
        let mut editor = editor_with(vec![]);
        for op in &ops {
            apply(&mut editor, op);
        }

        let mut states = vec![snapshot(&editor)];
        while editor.undo() {
            states.push(snapshot(&editor));
        }
        states.pop();
        while let Some(expected) = states.pop() {
            prop_assert!(editor.redo());
            prop_assert_eq!(snapshot(&editor), expected);
        }
        prop_assert!(!editor.redo());
    }

    #[test]
    fn locked_corner_resize_keeps_aspect_ratio(
        w in 20.0f64..1500.0,
        h in 20.0f64..1500.0,
        rotation in 0.0f64..360.0,
        handle in corner(),
        dx in -2000.0f64..2000.0,
        dy in -2000.0f64..2000.0,
    ) {
        let mut layer = Layer::shape(ShapeKind::Rectangle, Bounds::new(100.0, 100.0, w, h));
        layer.rotation = rotation;
        let start = Point2D::new(300.0, 300.0);
        let next = resize_layer(&layer, handle, start, Point2D::new(300.0 + dx, 300.0 + dy), false, 20.0);

        let before = w / h;
        let after = next.width / next.height;
        prop_assert!((after - before).abs() <= before * 1e-9, "ratio {} became {}", before, after);
        prop_assert!(next.width >= 20.0 - 1e-9 && next.height >= 20.0 - 1e-9);
    }

    #[test]
    fn move_near_canvas_center_lands_exactly_on_it(
        half_w in 10i32..300,
        half_h in 10i32..300,
        start_x in 0i32..800,
        start_y in 0i32..800,
        miss in -16i32..=16,
    ) {
        let (w, h) = (half_w as f64 * 2.0, half_h as f64 * 2.0);
        let layer = Layer::shape(ShapeKind::Ellipse, Bounds::new(start_x as f64, start_y as f64, w, h));
        let center = layer.center();
        let mut store = LayerStore::with_contents(CanvasConfig::new(1080, 1080, "#fff"), vec![layer], vec![]);
        let mut history = History::new(HistoryEntry::capture(&store), 100);
        let mut engine = InteractionEngine::default();

        // Drop the center within 4 px of the canvas center on x.
        let target = Point2D::new(540.0 + miss as f64 / 4.0, center.y);
        engine.pointer_down(&mut store, center, Modifiers::NONE, 1.0);
        engine.pointer_move(&mut store, target, Modifiers::NONE, 1.0);
        engine.pointer_up(&mut store, &mut history, target);

        prop_assert_eq!(store.get_layers()[0].center().x, 540.0);
    }
}
