//! QR encoding for verification links.

use image::{GrayImage, Luma};
use qrcode::{EcLevel, QrCode};
use std::error::Error;

/// Pixels per module in the rendered matrix. The image is scaled to the
/// configured overlay size at draw time, so this only sets the base
/// resolution.
const MODULE_SCALE: u32 = 4;

/// Quiet zone width, in modules, on every side.
const MARGIN_MODULES: u32 = 1;

/// Encodes `verify_link` as a QR matrix (error correction level M, 1-module
/// margin) rendered into a grayscale image.
pub(crate) fn encode(verify_link: &str) -> Result<GrayImage, Box<dyn Error>> {
    if verify_link.is_empty() {
        return Err("QR encoding failed: verify link is empty".into());
    }
    let code = QrCode::with_error_correction_level(verify_link.as_bytes(), EcLevel::M)?;
    let width = code.width() as u32;
    let colors = code.to_colors();

    let side = (width + 2 * MARGIN_MODULES) * MODULE_SCALE;
    let mut img = GrayImage::from_pixel(side, side, Luma([255u8]));
    for my in 0..width {
        for mx in 0..width {
            if colors[(my * width + mx) as usize] == qrcode::Color::Dark {
                let px = (mx + MARGIN_MODULES) * MODULE_SCALE;
                let py = (my + MARGIN_MODULES) * MODULE_SCALE;
                for dy in 0..MODULE_SCALE {
                    for dx in 0..MODULE_SCALE {
                        img.put_pixel(px + dx, py + dy, Luma([0u8]));
                    }
                }
            }
        }
    }
    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_side_includes_the_one_module_margin() {
        let link = "http://localhost:8080/verify?id=abc";
        let code = QrCode::with_error_correction_level(link.as_bytes(), EcLevel::M).unwrap();
        let img = encode(link).unwrap();
        let expected = (code.width() as u32 + 2 * MARGIN_MODULES) * MODULE_SCALE;
        assert_eq!(img.width(), expected);
        assert_eq!(img.height(), expected);
    }

    #[test]
    fn margin_stays_white_and_finder_corner_is_dark() {
        let img = encode("http://localhost:8080/verify?id=xyz").unwrap();
        // Anywhere inside the quiet zone is white.
        assert_eq!(img.get_pixel(0, 0).0[0], 255);
        assert_eq!(img.get_pixel(MODULE_SCALE - 1, MODULE_SCALE - 1).0[0], 255);
        // The top-left finder pattern starts right after the margin.
        let inside = MARGIN_MODULES * MODULE_SCALE;
        assert_eq!(img.get_pixel(inside, inside).0[0], 0);
    }

    #[test]
    fn empty_link_is_rejected() {
        assert!(encode("").is_err());
    }
}
