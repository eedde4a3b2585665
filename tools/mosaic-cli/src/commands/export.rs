//! Export a project to an image or video.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;

use mosaic_common::config::AppConfig;
use mosaic_render_engine::export::FfmpegEncoder;
use mosaic_render_engine::{ExportFormat, ExportJobs, ExportOptions, ExportRequest, ExportStatus};

use super::{load_fonts, load_resolved};

pub async fn run(
    config: &AppConfig,
    fonts: &[PathBuf],
    path: PathBuf,
    output: PathBuf,
    format: Option<String>,
    fps: Option<u32>,
    transparent: bool,
) -> anyhow::Result<()> {
    let format = match format {
        Some(name) => name.parse::<ExportFormat>()?,
        None => ExportFormat::from_path(&output).with_context(|| {
            format!(
                "Cannot tell the format from {}. Use --format png|jpg|mp4|webm",
                output.display()
            )
        })?,
    };
    if transparent && format != ExportFormat::Png {
        anyhow::bail!("--transparent is only supported for png exports");
    }

    println!("Exporting project at: {}", path.display());
    let project = load_resolved(&path).await?;

    let mut options = ExportOptions::new(format, &config.export);
    if let Some(fps) = fps {
        options.fps = fps.max(1);
    }
    options.transparent = transparent;
    let request = ExportRequest::from_project(&project, options);

    println!("  Output: {}", output.display());
    println!("  Format: {}", format.extension());
    println!("  Canvas: {}x{}", request.canvas.width, request.canvas.height);
    if !format.is_static() {
        println!(
            "  Duration: {:.2}s ({} frames @ {}fps)",
            request.duration_secs(),
            request.total_frames(),
            request.options.fps
        );
    }

    let jobs = ExportJobs::new(load_fonts(config, fonts)?);
    let handle = jobs.start(request, Box::new(FfmpegEncoder::new()), Some(output.clone()));

    let mut status = handle.subscribe();
    let watcher = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = status.borrow().clone();
            if let ExportStatus::Rendering { frames, total } = current {
                let pct = if total == 0 {
                    0.0
                } else {
                    frames as f64 / total as f64 * 100.0
                };
                print!("\r  Progress: {pct:.1}% ({frames}/{total} frames)  ");
                let _ = std::io::stdout().flush();
            }
        }
    });

    let result = handle.wait().await;
    watcher.abort();

    match result {
        Ok(artifact) => {
            println!(
                "\nExport complete: {} ({} bytes)",
                output.display(),
                artifact.bytes.len()
            );
            Ok(())
        }
        Err(e) => {
            println!("\nExport failed: {e}");
            Err(e.into())
        }
    }
}
