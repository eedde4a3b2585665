//! Font registry for text layers.
//!
//! Fonts are loaded from `.ttf`/`.otf` files into a [`FontBook`] keyed by
//! family. Selection prefers an exact family, then the closest weight,
//! then a matching style; anything unknown falls back to the first face
//! loaded.

use std::path::Path;

use fontdue::{Font, FontSettings};

use mosaic_common::error::{MosaicError, MosaicResult};

/// A single loaded face.
pub struct FontFace {
    family: String,
    weight: u16,
    italic: bool,
    font: Font,
}

/// Glyph coverage positioned relative to the pen origin and baseline.
#[derive(Debug, Clone)]
pub struct PositionedGlyph {
    /// Left edge relative to the start of the run.
    pub x: f32,
    /// Distance from the baseline up to the glyph's top row.
    pub top: f32,
    pub width: usize,
    pub height: usize,
    pub coverage: Vec<u8>,
}

impl FontFace {
    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn weight(&self) -> u16 {
        self.weight
    }

    pub fn is_italic(&self) -> bool {
        self.italic
    }

    /// Advance width of `text` at `px`, including kerning.
    pub fn measure(&self, text: &str, px: f32) -> f32 {
        let mut width = 0.0;
        let mut prev: Option<char> = None;
        for ch in text.chars() {
            if let Some(p) = prev {
                width += self.font.horizontal_kern(p, ch, px).unwrap_or(0.0);
            }
            width += self.font.metrics(ch, px).advance_width;
            prev = Some(ch);
        }
        width
    }

    /// `(ascent, descent)` at `px`; descent is negative.
    pub fn vertical_metrics(&self, px: f32) -> (f32, f32) {
        match self.font.horizontal_line_metrics(px) {
            Some(m) => (m.ascent, m.descent),
            None => (px * 0.8, -px * 0.2),
        }
    }

    /// Rasterize `text` into positioned coverage tiles.
    pub fn layout(&self, text: &str, px: f32) -> Vec<PositionedGlyph> {
        let mut glyphs = Vec::with_capacity(text.len());
        let mut pen = 0.0f32;
        let mut prev: Option<char> = None;
        for ch in text.chars() {
            if let Some(p) = prev {
                pen += self.font.horizontal_kern(p, ch, px).unwrap_or(0.0);
            }
            let (metrics, coverage) = self.font.rasterize(ch, px);
            if metrics.width > 0 && metrics.height > 0 {
                glyphs.push(PositionedGlyph {
                    x: pen + metrics.xmin as f32,
                    top: (metrics.height as i32 + metrics.ymin) as f32,
                    width: metrics.width,
                    height: metrics.height,
                    coverage,
                });
            }
            pen += metrics.advance_width;
            prev = Some(ch);
        }
        glyphs
    }
}

#[derive(Default)]
pub struct FontBook {
    faces: Vec<FontFace>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("families", &self.families())
            .field("faces", &self.faces.len())
            .finish()
    }
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Distinct family names, in load order.
    pub fn families(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for face in &self.faces {
            if !out.iter().any(|f| f.eq_ignore_ascii_case(&face.family)) {
                out.push(&face.family);
            }
        }
        out
    }

    /// Register a face from raw font bytes.
    pub fn add_font(&mut self, family: &str, weight: u16, italic: bool, bytes: &[u8]) -> MosaicResult<()> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| MosaicError::render(format!("invalid font data for {family}: {e}")))?;
        tracing::debug!(family, weight, italic, "Font registered");
        self.faces.push(FontFace {
            family: family.to_string(),
            weight,
            italic,
            font,
        });
        Ok(())
    }

    /// Load one font file. Family comes from the font's name table,
    /// weight and style from the file name (`Inter-BoldItalic.ttf`).
    pub fn load_file(&mut self, path: &Path) -> MosaicResult<()> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MosaicError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => MosaicError::Io(e),
        })?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let (weight, italic) = style_from_name(&stem);
        let font = Font::from_bytes(bytes.as_slice(), FontSettings::default()).map_err(|e| {
            MosaicError::render(format!("invalid font file {}: {e}", path.display()))
        })?;
        let family = font
            .name()
            .map(family_from_full_name)
            .unwrap_or_else(|| family_from_full_name(&stem));
        tracing::info!(path = %path.display(), family = %family, weight, italic, "Font loaded");
        self.faces.push(FontFace {
            family,
            weight,
            italic,
            font,
        });
        Ok(())
    }

    /// Load every `.ttf`/`.otf` in `dir`. Unreadable files are skipped
    /// with a warning.
    pub fn load_dir(&mut self, dir: &Path) -> MosaicResult<usize> {
        let mut entries: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("ttf") || e.eq_ignore_ascii_case("otf"))
            })
            .collect();
        entries.sort();

        let mut loaded = 0;
        for path in entries {
            match self.load_file(&path) {
                Ok(()) => loaded += 1,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "Skipping font")
                }
            }
        }
        Ok(loaded)
    }

    /// Best face for a text layer, or `None` when no font is loaded.
    pub fn select(&self, family: &str, weight: u16, italic: bool) -> Option<&FontFace> {
        let same_family: Vec<&FontFace> = self
            .faces
            .iter()
            .filter(|f| f.family.eq_ignore_ascii_case(family))
            .collect();
        let pool: Vec<&FontFace> = if same_family.is_empty() {
            let fallback = self.faces.first()?;
            self.faces
                .iter()
                .filter(|f| f.family.eq_ignore_ascii_case(&fallback.family))
                .collect()
        } else {
            same_family
        };
        pool.into_iter().min_by_key(|f| {
            let style_penalty = if f.italic == italic { 0 } else { 1000 };
            style_penalty + (f.weight as i32 - weight as i32).unsigned_abs()
        })
    }
}

fn style_from_name(stem: &str) -> (u16, bool) {
    let lower = stem.to_ascii_lowercase();
    let italic = lower.contains("italic") || lower.contains("oblique");
    let weight = [
        ("extralight", 200),
        ("ultralight", 200),
        ("semibold", 600),
        ("demibold", 600),
        ("extrabold", 800),
        ("ultrabold", 800),
        ("thin", 100),
        ("light", 300),
        ("medium", 500),
        ("bold", 700),
        ("black", 900),
        ("heavy", 900),
    ]
    .iter()
    .find(|(name, _)| lower.contains(name))
    .map(|(_, w)| *w)
    .unwrap_or(400);
    (weight, italic)
}

/// `"Inter Bold Italic"` / `"Inter-BoldItalic"` -> `"Inter"`.
fn family_from_full_name(name: &str) -> String {
    const STYLE_WORDS: [&str; 12] = [
        "regular", "italic", "oblique", "bold", "light", "medium", "thin", "black", "heavy",
        "semibold", "extrabold", "extralight",
    ];
    let base = name.split('-').next().unwrap_or(name);
    let words: Vec<&str> = base
        .split_whitespace()
        .take_while(|w| !STYLE_WORDS.contains(&w.to_ascii_lowercase().as_str()))
        .collect();
    if words.is_empty() {
        base.trim().to_string()
    } else {
        words.join(" ")
    }
}
