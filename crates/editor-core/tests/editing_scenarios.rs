//! End-to-end editing scenarios driven through `Editor`.

mod common;

use common::*;
use mosaic_editor_core::input::Modifiers;
use mosaic_editor_core::{
    EditorInput, GestureKind, GuideOrientation, Handle, ImageEditOperation, MediaTarget, Reorder,
};
use mosaic_scene_model::transfer::DragPayload;
use mosaic_scene_model::*;

fn drag(editor: &mut mosaic_editor_core::Editor, from: (f64, f64), to: (f64, f64)) {
    editor.handle_input(EditorInput::down(from.0, from.1)).unwrap();
    editor.handle_input(EditorInput::drag_to(to.0, to.1)).unwrap();
    editor.handle_input(EditorInput::up(to.0, to.1)).unwrap();
}

#[test]
fn move_snaps_to_neighbouring_left_edge() {
    let mut editor = editor_with(vec![
        rect("other", 5.0, 600.0, 100.0, 100.0),
        Layer::image("photo.png", Bounds::new(0.0, 0.0, 200.0, 200.0)).with_id("img"),
    ]);

    editor.handle_input(EditorInput::down(100.0, 100.0)).unwrap();
    editor.handle_input(EditorInput::drag_to(107.0, 103.0)).unwrap();

    let guides = editor.guides().to_vec();
    assert_eq!(guides.len(), 1);
    assert_eq!(guides[0].orientation, GuideOrientation::Vertical);
    assert_eq!(guides[0].position, 5.0);

    editor.handle_input(EditorInput::up(107.0, 103.0)).unwrap();
    let img = editor.store().layer(&LayerId::from("img")).unwrap();
    assert_eq!((img.x, img.y), (5.0, 3.0));
    assert!(editor.guides().is_empty());
}

#[test]
fn undo_after_three_commits_restores_second() {
    let mut editor = editor_with(vec![]);
    let text = editor.add_text("hello");
    editor.add_shape(ShapeKind::Ellipse);
    let after_second = editor.layers().to_vec();

    editor.update_layer(&text, |l| l.x += 40.0);
    assert_eq!(editor.history().len(), 4);

    assert!(editor.undo());
    assert_eq!(editor.layers(), after_second.as_slice());
    assert_eq!(editor.layers().len(), 2);
    assert!(editor.store().selection().is_empty());
}

#[test]
fn delete_shortcut_clears_fill_but_keeps_frame() {
    let mut frame = Layer::frame(ShapeKind::Ellipse, Bounds::new(100.0, 100.0, 300.0, 300.0)).with_id("f");
    if let LayerKind::Frame(content) = &mut frame.kind {
        content.fill = Some(Fill {
            kind: FillKind::Image,
            src: MediaRef::resolved("a.png", StaticMedia::image(10, 10)),
            placement: MediaPlacement::default(),
        });
    }
    let mut editor = editor_with(vec![frame, rect("r", 600.0, 600.0, 50.0, 50.0)]);

    editor
        .handle_input(EditorInput::DoubleClick { x: 250.0, y: 250.0 })
        .unwrap();
    assert_eq!(editor.store().fill_edit(), Some(&LayerId::from("f")));
    editor.handle_input(EditorInput::key("Delete", Modifiers::NONE)).unwrap();

    assert_eq!(editor.layers().len(), 2);
    assert!(editor.layers()[0].frame_fill().is_none());

    editor.select(&LayerId::from("r"));
    editor.handle_input(EditorInput::key("Backspace", Modifiers::NONE)).unwrap();
    assert_eq!(editor.layers().len(), 1);
    assert_eq!(editor.layers()[0].id.as_str(), "f");
}

#[test]
fn failed_media_load_removes_placeholder() {
    let mut editor = editor_with(vec![]);
    let request = editor.add_media(MediaKind::Image, "missing.png", None);
    assert_eq!(editor.layers().len(), 1);
    assert!(editor.layers()[0].is_loading);
    assert_eq!(editor.history().len(), 1);

    let err = editor
        .complete_media_load(&request, Err(mosaic_common::error::MosaicError::media_load("missing.png", "404")))
        .unwrap_err();
    assert!(err.to_string().contains("missing.png"));
    assert!(editor.layers().is_empty());
    assert_eq!(editor.history().len(), 1);

    // The session keeps working.
    editor.add_text("still here");
    assert_eq!(editor.history().len(), 2);
}

#[test]
fn loaded_media_fits_aspect_and_commits() {
    let mut editor = editor_with(vec![]);
    let request = editor.add_media(MediaKind::Video, "clip.mp4", Some(Point2D::new(300.0, 300.0)));
    editor
        .complete_media_load(&request, Ok(StaticMedia::video(1920, 1080, 12.0)))
        .unwrap();

    let layer = &editor.layers()[0];
    assert!(!layer.is_loading);
    assert!((layer.width / layer.height - 1920.0 / 1080.0).abs() < 1e-9);
    assert_eq!(layer.center(), Point2D::new(300.0, 300.0));
    match &layer.kind {
        LayerKind::Video(video) => assert_eq!(video.duration, 12.0),
        other => panic!("unexpected kind {other:?}"),
    }
    assert_eq!(editor.history().len(), 2);
}

#[test]
fn paste_re_resolves_media() {
    let mut editor = editor_with(vec![]);
    let request = editor.add_media(MediaKind::Image, "photo.png", None);
    editor.complete_media_load(&request, Ok(StaticMedia::image(100, 100))).unwrap();

    let outcome = editor.handle_input(EditorInput::key("KeyC", Modifiers::ctrl())).unwrap();
    assert!(outcome.clipboard.is_some());
    let outcome = editor.handle_input(EditorInput::key("KeyV", Modifiers::ctrl())).unwrap();
    assert_eq!(outcome.media_requests.len(), 1);
    let paste = &outcome.media_requests[0];
    assert_eq!(paste.src, "photo.png");
    assert!(matches!(paste.target, MediaTarget::Layer(_)));
    assert!(editor.layers()[1].is_loading);
    assert_eq!(editor.layers()[1].x, editor.layers()[0].x + 20.0);

    editor.complete_media_load(paste, Ok(StaticMedia::image(100, 100))).unwrap();
    assert!(!editor.layers()[1].is_loading);
    assert_eq!(editor.history().len(), 3);
}

#[test]
fn duplicate_text_commits_immediately() {
    let mut editor = editor_with(vec![]);
    let id = editor.add_text("dup me");
    editor.select(&id);
    let outcome = editor.handle_input(EditorInput::key("KeyD", Modifiers::ctrl())).unwrap();
    assert!(outcome.media_requests.is_empty());
    assert_eq!(editor.layers().len(), 2);
    assert_ne!(editor.layers()[0].id, editor.layers()[1].id);
    assert_eq!(editor.history().len(), 3);
}

#[test]
fn drop_on_frame_sets_fill_and_on_canvas_adds_layer() {
    let mut editor = editor_with(vec![Layer::frame(ShapeKind::Rectangle, Bounds::new(0.0, 0.0, 200.0, 200.0)).with_id("f")]);

    let requests = editor
        .drop_asset(DragPayload::new(MediaKind::Image, "in-frame.png"), 100.0, 100.0)
        .unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].target, MediaTarget::FrameFill(LayerId::from("f")));
    editor.complete_media_load(&requests[0], Ok(StaticMedia::image(50, 50))).unwrap();
    assert_eq!(editor.layers()[0].frame_fill().unwrap().src.src, "in-frame.png");

    let requests = editor
        .drop_asset(DragPayload::new(MediaKind::Image, "loose.png"), 700.0, 700.0)
        .unwrap();
    assert_eq!(editor.layers().len(), 2);
    assert_eq!(editor.layers()[1].center(), Point2D::new(700.0, 700.0));
    assert!(requests[0].fit_to_media);
}

#[test]
fn reorder_and_nudge() {
    let mut editor = editor_with(vec![rect("a", 0.0, 0.0, 50.0, 50.0), rect("b", 100.0, 0.0, 50.0, 50.0), rect("c", 200.0, 0.0, 50.0, 50.0)]);
    assert!(editor.reorder(&LayerId::from("a"), Reorder::ToFront));
    let order: Vec<&str> = editor.layers().iter().map(|l| l.id.as_str()).collect();
    assert_eq!(order, vec!["b", "c", "a"]);
    assert!(!editor.reorder(&LayerId::from("a"), Reorder::Forward));

    editor.select(&LayerId::from("b"));
    editor.handle_input(EditorInput::key("ArrowRight", Modifiers::shift())).unwrap();
    assert_eq!(editor.store().layer(&LayerId::from("b")).unwrap().x, 110.0);
}

#[test]
fn escape_cancels_active_gesture() {
    let mut editor = editor_with(vec![rect("a", 0.0, 0.0, 100.0, 100.0)]);
    let outcome = editor.handle_input(EditorInput::down(50.0, 50.0)).unwrap();
    assert_eq!(outcome.gesture_started, Some(GestureKind::Move));
    editor.handle_input(EditorInput::drag_to(300.0, 50.0)).unwrap();
    editor.handle_input(EditorInput::key("Escape", Modifiers::NONE)).unwrap();
    assert_eq!(editor.layers()[0].x, 0.0);
    assert!(editor.interaction().is_idle());
}

#[test]
fn drag_onto_frame_is_single_undo_step() {
    let frame = Layer::frame(ShapeKind::Rectangle, Bounds::new(600.0, 600.0, 300.0, 300.0)).with_id("f");
    let mut image = Layer::image("a.png", Bounds::new(0.0, 0.0, 100.0, 100.0)).with_id("img");
    if let LayerKind::Image(content) = &mut image.kind {
        content.src = MediaRef::resolved("a.png", StaticMedia::image(100, 100));
    }
    let mut editor = editor_with(vec![frame, image]);

    drag(&mut editor, (50.0, 50.0), (750.0, 750.0));
    assert_eq!(editor.layers().len(), 1);
    assert!(editor.layers()[0].frame_fill().unwrap().src.is_ready());

    editor.undo();
    assert_eq!(editor.layers().len(), 2);
    editor.redo();
    assert_eq!(editor.layers().len(), 1);
}

#[tokio::test]
async fn failed_project_load_leaves_session_untouched() {
    let mut editor = editor_with(vec![rect("keep", 0.0, 0.0, 10.0, 10.0)]);
    let dir = std::env::temp_dir().join(format!("mosaic-editor-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let bad = dir.join("bad.json");
    std::fs::write(&bad, r##"{"version": 99, "canvasSize": {"w": 1, "h": 1}, "backgroundColor": "#000"}"##).unwrap();

    assert!(editor.load_project(&bad, &FakeResolver).await.is_err());
    assert_eq!(editor.layers()[0].id.as_str(), "keep");

    let mut project = ProjectFile::new(&CanvasConfig::new(640, 480, "#000000"));
    project.layers.push(Layer::image("ok.png", Bounds::new(0.0, 0.0, 10.0, 10.0)));
    project.layers.push(Layer::image("missing.png", Bounds::new(0.0, 0.0, 10.0, 10.0)));
    let good = dir.join("good.json");
    project.save(&good).unwrap();

    let failures = editor.load_project(&good, &FakeResolver).await.unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(editor.layers().len(), 1);
    assert!(editor.layers()[0].media_refs()[0].is_ready());
    assert_eq!(editor.canvas().width, 640);
    assert_eq!(editor.history().len(), 1);
    let _ = std::fs::remove_dir_all(dir);
}

struct EchoService;

#[async_trait::async_trait]
impl mosaic_editor_core::ImageEditService for EchoService {
    async fn edit(
        &self,
        request: mosaic_editor_core::ImageEditRequest,
    ) -> Result<mosaic_editor_core::ImageEditResponse, mosaic_editor_core::AiEditError> {
        Ok(mosaic_editor_core::ImageEditResponse {
            src: format!("{}-edited.png", request.source.trim_end_matches(".png")),
        })
    }

    fn name(&self) -> &str {
        "echo"
    }
}

#[tokio::test]
async fn background_removal_is_reversible() {
    let mut image = Layer::image("cat.png", Bounds::new(0.0, 0.0, 100.0, 100.0)).with_id("img");
    if let LayerKind::Image(content) = &mut image.kind {
        content.src = MediaRef::resolved("cat.png", StaticMedia::image(100, 100));
    }
    let mut editor = editor_with(vec![image, rect("r", 0.0, 0.0, 10.0, 10.0)]);
    let id = LayerId::from("img");

    editor
        .edit_image(&EchoService, &FakeResolver, &id, ImageEditOperation::RemoveBackground)
        .await
        .unwrap();
    match &editor.layers()[0].kind {
        LayerKind::Image(content) => {
            assert_eq!(content.src.src, "cat-edited.png");
            assert_eq!(content.original_src.as_ref().unwrap().src, "cat.png");
        }
        other => panic!("unexpected kind {other:?}"),
    }

    editor.revert_image_edit(&id).unwrap();
    match &editor.layers()[0].kind {
        LayerKind::Image(content) => {
            assert_eq!(content.src.src, "cat.png");
            assert!(content.original_src.is_none());
        }
        other => panic!("unexpected kind {other:?}"),
    }

    let err = editor
        .edit_image(&EchoService, &FakeResolver, &LayerId::from("r"), ImageEditOperation::RemoveBackground)
        .await
        .unwrap_err();
    assert!(matches!(err, mosaic_editor_core::AiEditError::NotAnImage(_)));
}

fn loading_ids(editor: &mosaic_editor_core::Editor) -> Vec<&str> {
    editor
        .layers()
        .iter()
        .filter(|l| l.is_loading)
        .map(|l| l.id.as_str())
        .collect()
}

#[test]
fn undo_across_pending_load_never_strands_placeholder() {
    let mut editor = editor_with(vec![]);
    let request = editor.add_media(MediaKind::Image, "a.png", None);
    let MediaTarget::Layer(placeholder) = request.target.clone() else {
        panic!("image requests target a layer");
    };
    let text = editor.add_text("title");

    // The load is still pending: undo/redo move the text, not the placeholder.
    assert!(editor.undo());
    assert_eq!(loading_ids(&editor), vec![placeholder.as_str()]);
    assert!(editor.store().layer(&text).is_none());
    assert!(editor.redo());
    assert_eq!(editor.layers().len(), 2);
    assert_eq!(loading_ids(&editor), vec![placeholder.as_str()]);

    editor
        .complete_media_load(&request, Ok(StaticMedia::image(100, 50)))
        .unwrap();
    assert!(loading_ids(&editor).is_empty());

    // Undoing the load drops the image instead of reviving its placeholder.
    assert!(editor.undo());
    assert!(loading_ids(&editor).is_empty());
    assert_eq!(editor.layers().len(), 1);
    assert_eq!(editor.layers()[0].id, text);
    assert_eq!(editor.to_project().layers.len(), editor.layers().len());

    assert!(editor.redo());
    let image = editor.store().layer(&placeholder).unwrap();
    assert!(!image.is_loading);
    assert!(image.media_natural_size().is_some());
    assert!(loading_ids(&editor).is_empty());
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

/// Canvas position of the content center of a placed-media layer.
fn content_center(layer: &Layer) -> Point2D {
    let (_, placement) = layer.placed_media().unwrap();
    let fx = if layer.flip_h { -1.0 } else { 1.0 };
    let fy = if layer.flip_v { -1.0 } else { 1.0 };
    to_canvas(
        Point2D::new(placement.offset_x * fx, placement.offset_y * fy),
        layer.center(),
        layer.rotation,
    )
}

#[test]
fn edge_crop_on_rotated_and_flipped_images_keeps_content_in_place() {
    let cases = [
        (90.0, true, false, Handle::Right),
        (30.0, false, false, Handle::Bottom),
        (0.0, false, true, Handle::Bottom),
        (210.0, true, true, Handle::Left),
    ];
    for (rotation, flip_h, flip_v, handle) in cases {
        let mut layer = Layer::image("a.png", Bounds::new(100.0, 100.0, 200.0, 200.0)).with_id("img");
        if let LayerKind::Image(img) = &mut layer.kind {
            img.src.handle = Some(StaticMedia::image(200, 200));
        }
        layer.rotation = rotation;
        layer.flip_h = flip_h;
        layer.flip_v = flip_v;
        let mut editor = editor_with(vec![layer.clone()]);
        editor.select(&LayerId::from("img"));

        let (sx, sy) = handle.signs();
        let grip = to_canvas(handle.local_position(200.0, 200.0), layer.center(), rotation);
        let target = to_canvas(
            Point2D::new(sx * 50.0, sy * 50.0),
            layer.center(),
            rotation,
        );
        let opposite = |l: &Layer| to_canvas(Point2D::new(-sx * l.width / 2.0, -sy * l.height / 2.0), l.center(), l.rotation);
        let content_before = content_center(&layer);
        let fixed_before = opposite(&layer);

        let before = editor.history().len();
        drag(&mut editor, (grip.x, grip.y), (target.x, target.y));
        assert_eq!(editor.history().len(), before + 1, "rotation {rotation}");

        let next = editor.store().layer(&LayerId::from("img")).unwrap();
        let shrunk = if sx != 0.0 { next.width } else { next.height };
        assert!(approx(shrunk, 150.0), "rotation {rotation}: {shrunk}");

        let fixed_after = opposite(next);
        assert!(approx(fixed_before.x, fixed_after.x) && approx(fixed_before.y, fixed_after.y));

        let content_after = content_center(next);
        assert!(
            approx(content_before.x, content_after.x) && approx(content_before.y, content_after.y),
            "rotation {rotation} flips ({flip_h}, {flip_v}): {content_before:?} vs {content_after:?}"
        );
        let (_, placement) = next.placed_media().unwrap();
        assert!(approx(placement.scale, 1.0));
        assert!(approx(placement.offset_x.abs() + placement.offset_y.abs(), 25.0));
    }
}
