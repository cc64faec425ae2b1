use serde::{Deserialize, Serialize};

/// A positioned text overlay. `x`/`y` are the pixel location of the overlay's
/// center in a top-left-origin coordinate system; the render module converts
/// to the PDF's bottom-left origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextOverlay {
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    /// Hex color string like `#1a1a1a`.
    pub color: String,
}

/// The QR overlay: a square of `size` pixels centered on (`x`, `y`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrOverlay {
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

/// Where the overlays go on the template image. Transient: carried through
/// the generate request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignConfig {
    pub name: TextOverlay,
    pub qr: QrOverlay,
    /// Also stamp the certificate id as small text in a fixed corner, for
    /// print-time manual lookup.
    #[serde(default)]
    pub print_id: bool,
}

impl DesignConfig {
    /// Default overlay placement for a template of the given pixel size:
    /// name centered, QR anchored 150px in from the bottom-right corner.
    pub fn default_for(width: f64, height: f64) -> Self {
        DesignConfig {
            name: TextOverlay {
                x: width / 2.0,
                y: height / 2.0,
                font_size: 40.0,
                color: "#000000".to_string(),
            },
            qr: QrOverlay {
                x: width - 150.0,
                y: height - 150.0,
                size: 100.0,
            },
            print_id: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_scale_with_the_image() {
        let config = DesignConfig::default_for(1200.0, 800.0);
        assert_eq!(config.name.x, 600.0);
        assert_eq!(config.name.y, 400.0);
        assert_eq!(config.qr.x, 1050.0);
        assert_eq!(config.qr.y, 650.0);
        assert!(!config.print_id);
    }
}
