//! Per-row PDF rendering.
//!
//! Each certificate is one PDF page the exact pixel size of the template
//! image, at 1 pixel = 1 point. The design config speaks the designer's
//! coordinate system (top-left origin, overlay centers) while the PDF
//! content stream uses a bottom-left origin, so every overlay position goes
//! through the transforms below before drawing.

use super::fonts::{self, FontSet};
use super::qr;
use common::model::design::DesignConfig;
use image::{DynamicImage, ImageFormat};
use printpdf::{
    Color, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, Mm, PdfDocument, Pt, Px,
    Rgb,
};
use std::error::Error;
use std::io::Cursor;

/// Point size of the corner id text. Fixed, not user-configurable.
const ID_FONT_SIZE: f64 = 8.0;
/// Distance of the id text baseline from the bottom-left page corner, in points.
const ID_MARGIN: f64 = 12.0;

const PNG_MAGIC: [u8; 4] = [0x89, 0x50, 0x4E, 0x47];

/// Detects the template image format from its leading bytes. Uploaded
/// templates may lack reliable type metadata, so the file extension and MIME
/// string are never consulted: the PNG magic sequence decides, and anything
/// else is treated as JPEG.
pub(crate) fn sniff_format(bytes: &[u8]) -> ImageFormat {
    if bytes.starts_with(&PNG_MAGIC) {
        ImageFormat::Png
    } else {
        ImageFormat::Jpeg
    }
}

/// Baseline y for the recipient name, in bottom-left-origin points.
///
/// The 0.35 factor approximates cap-height centering of the text around the
/// configured point. It is an empirical constant; tune it if exact
/// typographic centering is ever needed.
pub(crate) fn name_baseline_y(config_y: f64, font_size: f64, image_height: f64) -> f64 {
    image_height - config_y - 0.35 * font_size
}

/// Bottom-left corner of the QR square, in bottom-left-origin points, so that
/// the square of `size` ends up centered on the configured point.
pub(crate) fn qr_corner(
    config_x: f64,
    config_y: f64,
    size: f64,
    image_height: f64,
) -> (f64, f64) {
    (config_x - size / 2.0, image_height - config_y - size / 2.0)
}

/// Parses `#rrggbb` into unit-interval RGB. Malformed values fall back to black.
pub(crate) fn parse_hex_color(color: &str) -> (f64, f64, f64) {
    let hex = color.trim().trim_start_matches('#');
    // The ASCII check keeps the byte slices below on char boundaries.
    if hex.len() == 6 && hex.is_ascii() {
        if let (Ok(r), Ok(g), Ok(b)) = (
            u8::from_str_radix(&hex[0..2], 16),
            u8::from_str_radix(&hex[2..4], 16),
            u8::from_str_radix(&hex[4..6], 16),
        ) {
            return (r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);
        }
    }
    (0.0, 0.0, 0.0)
}

/// Converts an `f64` point value to printpdf's `f32`-based `Mm`. All geometry
/// is computed in `f64` and narrowed only at this seam.
fn pt(value: f64) -> Mm {
    Mm::from(Pt(value as f32))
}

fn rgb_xobject(img: &DynamicImage) -> ImageXObject {
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    ImageXObject {
        width: Px(width as usize),
        height: Px(height as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: rgb.into_raw(),
        image_filter: None,
        smask: None,
        clipping_bbox: None,
    }
}

fn gray_xobject(img: image::GrayImage) -> ImageXObject {
    let (width, height) = img.dimensions();
    ImageXObject {
        width: Px(width as usize),
        height: Px(height as usize),
        color_space: ColorSpace::Greyscale,
        bits_per_component: ColorBits::Bit8,
        interpolate: false,
        image_data: img.into_raw(),
        image_filter: None,
        smask: None,
        clipping_bbox: None,
    }
}

pub(crate) struct RenderContext<'a> {
    pub template_bytes: &'a [u8],
    pub template_format: ImageFormat,
    /// Template pixel dimensions; also the page size in points.
    pub width: f64,
    pub height: f64,
    pub design: &'a DesignConfig,
    pub fonts: &'a FontSet,
}

/// Renders one certificate: background at full size, the recipient name in
/// bold centered on its configured x, the QR code for `verify_link`, and
/// optionally the id as small corner text. Returns the document bytes.
pub(crate) fn render_certificate(
    ctx: &RenderContext<'_>,
    name: &str,
    verify_link: &str,
    id: &str,
) -> Result<Vec<u8>, Box<dyn Error>> {
    let (doc, page, layer) =
        PdfDocument::new("Certificate", pt(ctx.width), pt(ctx.height), "Layer 1");
    let layer = doc.get_page(page).get_layer(layer);
    let bold = doc.add_external_font(Cursor::new(ctx.fonts.bold.as_slice()))?;

    // Background, drawn at (0, 0) and scaled to the full page regardless of
    // the decoded pixel dimensions (the recorded template size is canonical).
    let background =
        image::load_from_memory_with_format(ctx.template_bytes, ctx.template_format)?;
    let (bg_w, bg_h) = (background.width() as f64, background.height() as f64);
    Image::from(rgb_xobject(&background)).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(pt(0.0)),
            translate_y: Some(pt(0.0)),
            scale_x: Some((ctx.width / bg_w) as f32),
            scale_y: Some((ctx.height / bg_h) as f32),
            dpi: Some(72.0),
            ..Default::default()
        },
    );

    // Recipient name, bold, horizontally centered on the configured x.
    let name_overlay = &ctx.design.name;
    let text_width = fonts::text_width(&ctx.fonts.bold, name, name_overlay.font_size)?;
    let (r, g, b) = parse_hex_color(&name_overlay.color);
    layer.set_fill_color(Color::Rgb(Rgb::new(r as f32, g as f32, b as f32, None)));
    layer.use_text(
        name,
        name_overlay.font_size as f32,
        pt(name_overlay.x - text_width / 2.0),
        pt(name_baseline_y(name_overlay.y, name_overlay.font_size, ctx.height)),
        &bold,
    );

    // QR code centered on its configured point.
    let qr_overlay = &ctx.design.qr;
    let qr_image = qr::encode(verify_link)?;
    let qr_side = qr_image.width() as f64;
    let (qr_x, qr_y) = qr_corner(qr_overlay.x, qr_overlay.y, qr_overlay.size, ctx.height);
    Image::from(gray_xobject(qr_image)).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(pt(qr_x)),
            translate_y: Some(pt(qr_y)),
            scale_x: Some((qr_overlay.size / qr_side) as f32),
            scale_y: Some((qr_overlay.size / qr_side) as f32),
            dpi: Some(72.0),
            ..Default::default()
        },
    );

    // Identifier in the bottom-left corner for print-time manual lookup.
    if ctx.design.print_id {
        let regular = doc.add_external_font(Cursor::new(ctx.fonts.regular.as_slice()))?;
        layer.set_fill_color(Color::Rgb(Rgb::new(0.4, 0.4, 0.4, None)));
        layer.use_text(id, ID_FONT_SIZE as f32, pt(ID_MARGIN), pt(ID_MARGIN), &regular);
    }

    Ok(doc.save_to_bytes()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_magic_is_detected() {
        let bytes = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(sniff_format(&bytes), ImageFormat::Png);
    }

    #[test]
    fn anything_else_is_treated_as_jpeg() {
        assert_eq!(sniff_format(&[0xFF, 0xD8, 0xFF, 0xE0]), ImageFormat::Jpeg);
        assert_eq!(sniff_format(b"GIF89a"), ImageFormat::Jpeg);
        assert_eq!(sniff_format(&[]), ImageFormat::Jpeg);
    }

    #[test]
    fn name_baseline_matches_the_documented_transform() {
        // Height 1000, configured y 500, font size 40: 1000 - 500 - 0.35*40.
        assert_eq!(name_baseline_y(500.0, 40.0, 1000.0), 486.0);
    }

    #[test]
    fn qr_square_is_centered_on_the_configured_point() {
        let (x, y) = qr_corner(80.0, 80.0, 100.0, 1000.0);
        assert_eq!(x, 30.0);
        assert_eq!(y, 870.0);
    }

    #[test]
    fn hex_colors_parse_and_malformed_values_fall_back_to_black() {
        assert_eq!(parse_hex_color("#ffffff"), (1.0, 1.0, 1.0));
        assert_eq!(parse_hex_color("#000000"), (0.0, 0.0, 0.0));
        let (r, g, b) = parse_hex_color("#ff8000");
        assert!((r - 1.0).abs() < 1e-9);
        assert!((g - 128.0 / 255.0).abs() < 1e-9);
        assert!(b.abs() < 1e-9);
        assert_eq!(parse_hex_color("not-a-color"), (0.0, 0.0, 0.0));
        assert_eq!(parse_hex_color("#12345"), (0.0, 0.0, 0.0));
    }

    #[test]
    fn non_ascii_color_values_fall_back_to_black_instead_of_panicking() {
        // "aééb" is 6 bytes but not 6 hex digits; slicing it naively would
        // split the multi-byte characters.
        assert_eq!(parse_hex_color("#aééb"), (0.0, 0.0, 0.0));
        assert_eq!(parse_hex_color("éééééé"), (0.0, 0.0, 0.0));
    }

    #[test]
    fn point_values_narrow_to_printpdf_millimetres() {
        // 72 pt is exactly one inch.
        let one_inch = pt(72.0);
        assert!((one_inch.0 - 25.4).abs() < 1e-3);
    }
}
