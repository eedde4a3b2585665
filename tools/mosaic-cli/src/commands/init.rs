//! Initialize a new Mosaic project.

use std::path::PathBuf;

use mosaic_common::config::AppConfig;
use mosaic_scene_model::{CanvasConfig, ProjectFile, Rgba};

pub fn run(
    config: &AppConfig,
    name: String,
    output: PathBuf,
    width: Option<u32>,
    height: Option<u32>,
    background: Option<String>,
) -> anyhow::Result<()> {
    let width = width.unwrap_or(config.canvas.width);
    let height = height.unwrap_or(config.canvas.height);
    let background = background.unwrap_or_else(|| config.canvas.background.clone());
    if width == 0 || height == 0 {
        anyhow::bail!("Canvas size must be non-zero, got {width}x{height}");
    }
    if Rgba::parse(&background).is_none() {
        anyhow::bail!("Unrecognized background color: {background}");
    }

    let path = output.join(format!("{name}.mosaic.json"));
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    println!("Creating project '{}' at {}", name, path.display());

    let mut project = ProjectFile::new(&CanvasConfig::new(width, height, background.clone()));
    project
        .save(&path)
        .map_err(|e| anyhow::anyhow!("Failed to create project: {e}"))?;

    println!("Project created successfully:");
    println!("  File: {}", path.display());
    println!("  Canvas: {width}x{height}");
    println!("  Background: {background}");

    Ok(())
}
