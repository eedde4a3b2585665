//! Validate a Mosaic project file.

use std::path::PathBuf;

use mosaic_scene_model::{decode_data_uri, is_blob_ref, is_data_uri};

use super::{load_project, resolver_for};

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating project at: {}", path.display());

    // Loading checks the version, the structure and the layer invariants.
    let project = load_project(&path)?;

    println!("  Version: {}", project.version);
    println!(
        "  Canvas: {}x{}",
        project.canvas_size.w, project.canvas_size.h
    );
    println!("  Layers: {}", project.layers.len());
    println!("  Audio tracks: {}", project.audio_tracks.len());

    let resolver = resolver_for(&path);
    let sources = project
        .layers
        .iter()
        .flat_map(|l| l.media_refs().into_iter().map(move |m| (l.id.to_string(), &m.src)))
        .chain(project.audio_tracks.iter().map(|t| (t.name.clone(), &t.src.src)))
        .chain(project.uploaded_assets.iter().map(|a| (a.id.clone(), &a.src.src)));

    let mut errors = Vec::new();
    let mut checked = 0;
    for (owner, src) in sources {
        checked += 1;
        if is_data_uri(src) {
            if let Err(e) = decode_data_uri(src) {
                errors.push(format!("{owner}: inline content is corrupt ({e})"));
            }
        } else if is_blob_ref(src) {
            errors.push(format!("{owner}: references transient content {src}"));
        } else if src.starts_with("http://") || src.starts_with("https://") {
            errors.push(format!("{owner}: remote media is not supported ({src})"));
        } else {
            let local = resolver.local_path(src);
            if !local.exists() {
                errors.push(format!("{owner}: missing file {}", local.display()));
            }
        }
    }

    if errors.is_empty() {
        println!("  Media: {checked} reference(s), all present");
        println!("\nProject is valid.");
    } else {
        println!("\nValidation issues:");
        for error in &errors {
            println!("  - {error}");
        }
        println!(
            "\n{} issue(s) found. Project may not be fully usable.",
            errors.len()
        );
    }

    Ok(())
}
