//! Render the scene at one moment to a PNG.

use std::path::PathBuf;

use mosaic_common::config::AppConfig;
use mosaic_render_engine::{render_frame_at, MediaSynchronizer, RenderContext};

use super::{load_fonts, load_resolved};

pub async fn run(
    config: &AppConfig,
    fonts: &[PathBuf],
    path: PathBuf,
    time: f64,
    output: PathBuf,
    transparent: bool,
) -> anyhow::Result<()> {
    if !time.is_finite() || time < 0.0 {
        anyhow::bail!("--time must be a non-negative number of seconds");
    }
    let project = load_resolved(&path).await?;
    let canvas = project.canvas();
    let ctx = RenderContext {
        fonts: load_fonts(config, fonts)?,
        transparent,
    };

    let mut sync = MediaSynchronizer::for_scene(&project.layers, &project.audio_tracks);
    sync.pause_all();
    let surface = render_frame_at(&project.layers, &canvas, &sync, time, &ctx).await?;
    let png = surface.encode_png()?;
    sync.release_all();

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&output, &png).await?;
    println!(
        "Rendered {}x{} at {time:.3}s to {}",
        canvas.width,
        canvas.height,
        output.display()
    );
    Ok(())
}
