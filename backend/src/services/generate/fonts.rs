//! Font loading and text measurement for the renderer.
//!
//! Fonts are read from the configured directory using the
//! `{family}-{style}.ttf` naming convention. Arial is preferred if its TTFs
//! were added there; LiberationSans (metrically compatible) is the fallback.

use std::fs;
use std::path::Path;
use ttf_parser::Face;

const FAMILIES: [&str; 2] = ["Arial", "LiberationSans"];

/// Raw TTF data for the two styles the renderer draws with: bold for the
/// recipient name, regular for the corner id text.
pub(crate) struct FontSet {
    pub bold: Vec<u8>,
    pub regular: Vec<u8>,
}

pub(crate) fn load(dir: &Path) -> Result<FontSet, String> {
    for family in FAMILIES {
        let bold = dir.join(format!("{}-Bold.ttf", family));
        let regular = dir.join(format!("{}-Regular.ttf", family));
        if bold.exists() && regular.exists() {
            return Ok(FontSet {
                bold: fs::read(&bold).map_err(|e| e.to_string())?,
                regular: fs::read(&regular).map_err(|e| e.to_string())?,
            });
        }
    }
    Err(format!(
        "No usable font family in {} (expected Arial or LiberationSans Regular/Bold TTFs)",
        dir.display()
    ))
}

/// Measures the advance width of `text` at `font_size` points by summing
/// glyph advances. Kerning is ignored, which matches how the overlay preview
/// measures text; glyphs missing from the font count as half an em.
pub(crate) fn text_width(font_data: &[u8], text: &str, font_size: f64) -> Result<f64, String> {
    let face = Face::parse(font_data, 0).map_err(|e| e.to_string())?;
    let units_per_em = face.units_per_em() as f64;
    let mut units = 0.0;
    for ch in text.chars() {
        let advance = face
            .glyph_index(ch)
            .and_then(|glyph| face.glyph_hor_advance(glyph))
            .map(|a| a as f64)
            .unwrap_or(units_per_em / 2.0);
        units += advance;
    }
    Ok(units * font_size / units_per_em)
}
