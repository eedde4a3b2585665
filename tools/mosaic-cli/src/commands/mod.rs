//! Subcommand implementations and the helpers they share.

pub mod export;
pub mod info;
pub mod init;
pub mod render_frame;
pub mod validate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use mosaic_common::config::AppConfig;
use mosaic_common::error::MosaicError;
use mosaic_render_engine::{FontBook, FsMediaResolver};
use mosaic_scene_model::ProjectFile;

pub fn load_project(path: &Path) -> anyhow::Result<ProjectFile> {
    ProjectFile::load(path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))
}

/// Resolver for media referenced by the project at `path`; relative paths
/// are taken from the project's folder.
pub fn resolver_for(path: &Path) -> FsMediaResolver {
    FsMediaResolver::default().with_base_dir(project_dir(path))
}

fn project_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Load the project and attach live handles, reporting media that failed.
pub async fn load_resolved(path: &Path) -> anyhow::Result<ProjectFile> {
    let mut project = load_project(path)?;
    let failures = project.resolve_media(&resolver_for(path)).await;
    report_media_failures(&failures);
    Ok(project)
}

pub fn report_media_failures(failures: &[MosaicError]) {
    for failure in failures {
        eprintln!("  warning: {failure}");
    }
}

/// Fonts from the configured directory plus any given on the command line.
pub fn load_fonts(config: &AppConfig, extra: &[PathBuf]) -> anyhow::Result<Arc<FontBook>> {
    let mut fonts = FontBook::new();
    if let Some(dir) = &config.fonts_dir {
        match fonts.load_dir(dir) {
            Ok(n) => tracing::debug!(dir = %dir.display(), fonts = n, "Loaded font directory"),
            Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "Font directory unavailable"),
        }
    }
    for path in extra {
        fonts
            .load_file(path)
            .with_context(|| format!("Failed to load font {}", path.display()))?;
    }
    if fonts.is_empty() {
        tracing::warn!("No fonts loaded; text layers will not be drawn");
    }
    Ok(Arc::new(fonts))
}
