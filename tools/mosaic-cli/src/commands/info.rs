//! Show project information.

use std::path::PathBuf;

use serde_json::json;

use mosaic_scene_model::{composition_duration, Layer, LayerKind};

use super::{load_project, report_media_failures, resolver_for};

pub async fn run(path: PathBuf, as_json: bool) -> anyhow::Result<()> {
    let project = load_project(&path)?;

    // Durations of fills and audio tracks come from their live handles.
    let mut resolved = project.clone();
    let failures = resolved.resolve_media(&resolver_for(&path)).await;
    let duration = composition_duration(&resolved.layers, &resolved.audio_tracks);

    if as_json {
        let layers: Vec<_> = project
            .layers
            .iter()
            .map(|l| {
                json!({
                    "id": l.id.as_str(),
                    "type": l.kind_name(),
                    "name": l.name,
                    "x": l.x,
                    "y": l.y,
                    "width": l.width,
                    "height": l.height,
                    "rotation": l.rotation,
                    "opacity": l.opacity,
                })
            })
            .collect();
        let tracks: Vec<_> = project
            .audio_tracks
            .iter()
            .map(|t| json!({ "id": t.id, "name": t.name }))
            .collect();
        let summary = json!({
            "version": project.version,
            "canvas": { "width": project.canvas_size.w, "height": project.canvas_size.h },
            "backgroundColor": project.background_color,
            "layers": layers,
            "audioTracks": tracks,
            "uploadedAssets": project.uploaded_assets.len(),
            "durationSecs": duration,
            "unresolvedMedia": failures.len(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Project: {}", path.display());
    println!("  Version: {}", project.version);
    if let Some(saved) = project.saved_at {
        println!("  Saved: {saved}");
    }
    println!(
        "  Canvas: {}x{} ({})",
        project.canvas_size.w, project.canvas_size.h, project.background_color
    );
    println!();

    println!("Layers (bottom to top):");
    if project.layers.is_empty() {
        println!("  (none)");
    }
    for (i, layer) in project.layers.iter().enumerate() {
        println!("  {i:>2}. {}", describe(layer));
    }
    println!();

    println!("Audio tracks:");
    if project.audio_tracks.is_empty() {
        println!("  (none)");
    }
    for track in &project.audio_tracks {
        println!("  {} ({})", track.name, short(&track.src.src));
    }
    println!();

    println!("Uploaded assets: {}", project.uploaded_assets.len());
    if duration > 0.0 {
        println!("Duration: {duration:.2}s");
    } else {
        println!("Duration: static");
    }
    if !failures.is_empty() {
        println!();
        println!("Unresolved media:");
        report_media_failures(&failures);
    }

    Ok(())
}

fn describe(layer: &Layer) -> String {
    let geometry = format!(
        "{:.0},{:.0} {:.0}x{:.0}",
        layer.x, layer.y, layer.width, layer.height
    );
    let detail = match &layer.kind {
        LayerKind::Text(text) => format!("\"{}\"", text.text.replace('\n', " / ")),
        LayerKind::Image(image) => short(&image.src.src),
        LayerKind::Video(video) => format!(
            "{} [{:.2}s-{:.2}s]",
            short(&video.src.src),
            video.start_time,
            video.end()
        ),
        LayerKind::Shape(shape) => format!("{:?}", shape.shape).to_lowercase(),
        LayerKind::Frame(frame) => match &frame.fill {
            Some(fill) => format!("{:?} filled with {}", frame.shape, short(&fill.src.src)).to_lowercase(),
            None => format!("{:?} empty", frame.shape).to_lowercase(),
        },
    };
    let mut line = format!("{:<6} {} {geometry} {detail}", layer.kind_name(), layer.id);
    if layer.rotation != 0.0 {
        line.push_str(&format!(" rot={:.1}", layer.rotation));
    }
    if layer.opacity < 1.0 {
        line.push_str(&format!(" opacity={:.2}", layer.opacity));
    }
    line
}

/// Inline content is shortened to its scheme and mime.
fn short(src: &str) -> String {
    if src.starts_with("data:") {
        return src.split(',').next().unwrap_or("data:").to_string();
    }
    src.to_string()
}
