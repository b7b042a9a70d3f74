//! # Printer Models
//!
//! This module defines hardware specifications for supported label printers.
//!
//! ## Supported Printers
//!
//! | Model | Max width (dots) | Resolution | Density levels |
//! |-------|------------------|------------|----------------|
//! | B1 | 384 | 203 DPI | 1-5 |
//! | B18 | 120 | 203 DPI | 1-3 |
//! | B21 | 384 | 203 DPI | 1-5 |
//! | D11 | 96 | 203 DPI | 1-3 |
//! | D110 | 96 | 203 DPI | 1-3 |
//!
//! ## Usage
//!
//! ```
//! use niimbot::printer::PrinterModel;
//!
//! let model = PrinterModel::by_name("B21").unwrap();
//! println!("Print width: {} dots ({:.1} mm)", model.max_width_dots, model.width_mm());
//! ```

use serde::Serialize;

/// # Printer Model
///
/// Defines the hardware characteristics of a label printer.
///
/// - **name**: lowercase model prefix, as found in the USB serial number
///   (e.g. `B21-C2071234` → `b21`)
/// - **max_width_dots**: printhead width in dots
/// - **dpi**: resolution in dots per inch
/// - **max_density**: highest accepted SET_LABEL_DENSITY value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrinterModel {
    pub name: &'static str,
    pub max_width_dots: u32,
    pub dpi: u16,
    pub max_density: u8,
}

impl PrinterModel {
    pub const B1: Self = Self {
        name: "b1",
        max_width_dots: 384,
        dpi: 203,
        max_density: 5,
    };

    pub const B18: Self = Self {
        name: "b18",
        max_width_dots: 120,
        dpi: 203,
        max_density: 3,
    };

    pub const B21: Self = Self {
        name: "b21",
        max_width_dots: 384,
        dpi: 203,
        max_density: 5,
    };

    pub const D11: Self = Self {
        name: "d11",
        max_width_dots: 96,
        dpi: 203,
        max_density: 3,
    };

    pub const D110: Self = Self {
        name: "d110",
        max_width_dots: 96,
        dpi: 203,
        max_density: 3,
    };

    /// All known models
    pub const ALL: [Self; 5] = [Self::B1, Self::B18, Self::B21, Self::D11, Self::D110];

    /// Case-insensitive lookup by model name.
    pub fn by_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        Self::ALL.into_iter().find(|m| m.name == name)
    }

    /// Comma-separated list of known names, for error messages.
    pub fn names() -> String {
        Self::ALL
            .iter()
            .map(|m| m.name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Calculate dots per millimeter
    #[inline]
    pub fn dots_per_mm(&self) -> f32 {
        self.dpi as f32 / 25.4
    }

    /// Calculate print width in millimeters
    #[inline]
    pub fn width_mm(&self) -> f32 {
        self.max_width_dots as f32 / self.dots_per_mm()
    }

    /// Convert millimeters to dots
    #[inline]
    pub fn mm_to_dots(&self, mm: f32) -> u32 {
        (mm * self.dots_per_mm()).round() as u32
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(PrinterModel::by_name("B21"), Some(PrinterModel::B21));
        assert_eq!(PrinterModel::by_name("d110"), Some(PrinterModel::D110));
        assert_eq!(PrinterModel::by_name("x9"), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(PrinterModel::names(), "b1, b18, b21, d11, d110");
    }

    #[test]
    fn test_density_limits() {
        let limits: Vec<_> = PrinterModel::ALL
            .iter()
            .map(|m| (m.name, m.max_density))
            .collect();
        assert_eq!(
            limits,
            vec![("b1", 5), ("b18", 3), ("b21", 5), ("d11", 3), ("d110", 3)]
        );
    }

    #[test]
    fn test_b21_width_mm() {
        // 384 dots / 8 dpmm = 48mm
        let width = PrinterModel::B21.width_mm();
        assert!((width - 48.0).abs() < 1.0);
    }

    #[test]
    fn test_mm_to_dots() {
        // 10mm ≈ 80 dots
        let dots = PrinterModel::D11.mm_to_dots(10.0);
        assert!((dots as i32 - 80).abs() < 2);
    }
}
