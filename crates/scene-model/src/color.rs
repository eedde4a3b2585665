//! CSS-style color strings as stored in layers and the project file.

use serde::{Deserialize, Serialize};

/// A straight-alpha RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r,g,b)`, `rgba(r,g,b,a)`
    /// or `transparent`. Returns `None` for anything else.
    pub fn parse(input: &str) -> Option<Self> {
        let s = input.trim();
        if s.eq_ignore_ascii_case("transparent") || s.eq_ignore_ascii_case("none") {
            return Some(Self::TRANSPARENT);
        }
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        let lower = s.to_ascii_lowercase();
        if let Some(body) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_functional(body);
        }
        None
    }

    /// Parse, falling back to `fallback` when the string is not a color.
    pub fn parse_or(input: &str, fallback: Rgba) -> Self {
        Self::parse(input).unwrap_or_else(|| {
            tracing::debug!(color = input, "Unparseable color, using fallback");
            fallback
        })
    }

    /// Whether painting with this color changes any pixel.
    pub fn is_visible(&self) -> bool {
        self.a > 0
    }

    /// Same color with alpha multiplied by `factor` (clamped to `[0, 1]`).
    pub fn with_alpha_factor(self, factor: f64) -> Self {
        let a = (self.a as f64 * factor.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }

    /// `#rrggbb` or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    let nibble = |c: u8| -> Option<u8> { (c as char).to_digit(16).map(|d| d as u8) };
    let bytes = hex.as_bytes();
    match bytes.len() {
        3 | 4 => {
            let mut out = [255u8; 4];
            for (i, b) in bytes.iter().enumerate() {
                let n = nibble(*b)?;
                out[i] = n * 16 + n;
            }
            Some(Rgba::new(out[0], out[1], out[2], out[3]))
        }
        6 | 8 => {
            let mut out = [255u8; 4];
            for i in 0..bytes.len() / 2 {
                out[i] = nibble(bytes[i * 2])? * 16 + nibble(bytes[i * 2 + 1])?;
            }
            Some(Rgba::new(out[0], out[1], out[2], out[3]))
        }
        _ => None,
    }
}

fn parse_functional(body: &str) -> Option<Rgba> {
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let channel = |s: &str| -> Option<u8> { s.parse::<f64>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8) };
    let alpha = match parts.get(3) {
        Some(a) => (a.parse::<f64>().ok()?.clamp(0.0, 1.0) * 255.0).round() as u8,
        None => 255,
    };
    Some(Rgba::new(
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
        alpha,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(Rgba::parse("#fff"), Some(Rgba::WHITE));
        assert_eq!(Rgba::parse("#ff000080"), Some(Rgba::new(255, 0, 0, 128)));
        assert_eq!(Rgba::parse("#1a1a1a"), Some(Rgba::new(26, 26, 26, 255)));
        assert_eq!(Rgba::parse("#12"), None);
    }

    #[test]
    fn test_parse_functional_and_keywords() {
        assert_eq!(
            Rgba::parse("rgba(10, 20, 30, 0.5)"),
            Some(Rgba::new(10, 20, 30, 128))
        );
        assert_eq!(Rgba::parse("rgb(1,2,3)"), Some(Rgba::new(1, 2, 3, 255)));
        assert_eq!(Rgba::parse("transparent"), Some(Rgba::TRANSPARENT));
        assert!(!Rgba::TRANSPARENT.is_visible());
    }

    #[test]
    fn test_hex_roundtrip() {
        let c = Rgba::new(18, 52, 86, 120);
        assert_eq!(Rgba::parse(&c.to_hex()), Some(c));
    }
}
