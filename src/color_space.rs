// src/color_space.rs - RGB to HSV and CIE L*a*b* conversions

use palette::white_point::D65;
use palette::{encoding, FromColor, Lab, Srgb};

/// HSV triple: hue in degrees [0, 360), saturation and value in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub hue: f64,
    pub saturation: f64,
    pub value: f64,
}

/// CIE L*a*b* color (D65 white point)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LabColor {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

/// Convert 8-bit RGB to HSV. Achromatic colors get hue 0.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let hsv: palette::Hsv<encoding::Srgb, f64> =
        palette::Hsv::from_color(Srgb::new(r, g, b).into_format::<f64>());
    let hue = hsv.hue.into_positive_degrees();

    Hsv {
        // rounding can land exactly on 360
        hue: if hue >= 360.0 { hue - 360.0 } else { hue },
        saturation: hsv.saturation,
        value: hsv.value,
    }
}

impl From<Lab<D65, f64>> for LabColor {
    fn from(lab: Lab<D65, f64>) -> Self {
        Self { l: lab.l, a: lab.a, b: lab.b }
    }
}

/// Convert 8-bit sRGB to CIE L*a*b*
pub fn rgb_to_lab(r: u8, g: u8, b: u8) -> LabColor {
    Lab::<D65, f64>::from_color(Srgb::new(r, g, b).into_format::<f64>()).into()
}

/// Euclidean distance in Lab space (CIE76)
#[inline]
pub fn delta_e(lab1: &LabColor, lab2: &LabColor) -> f64 {
    let dl = lab1.l - lab2.l;
    let da = lab1.a - lab2.a;
    let db = lab1.b - lab2.b;
    (dl * dl + da * da + db * db).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn hsv_primaries() {
        let red = rgb_to_hsv(255, 0, 0);
        assert_approx_eq!(red.hue, 0.0);
        assert_approx_eq!(red.saturation, 1.0);
        assert_approx_eq!(red.value, 1.0);

        assert_approx_eq!(rgb_to_hsv(0, 255, 0).hue, 120.0);
        assert_approx_eq!(rgb_to_hsv(0, 0, 255).hue, 240.0);
    }

    #[test]
    fn hsv_achromatic_has_zero_hue() {
        let gray = rgb_to_hsv(128, 128, 128);
        assert_eq!(gray.hue, 0.0);
        assert_eq!(gray.saturation, 0.0);
        assert_approx_eq!(gray.value, 128.0 / 255.0);

        let black = rgb_to_hsv(0, 0, 0);
        assert_eq!(black.saturation, 0.0);
        assert_eq!(black.value, 0.0);
    }

    #[test]
    fn hsv_magenta_wraps_below_360() {
        let hsv = rgb_to_hsv(255, 0, 1);
        assert!(hsv.hue > 359.0 && hsv.hue < 360.0);
    }

    #[test]
    fn forest_green_is_green() {
        let hsv = rgb_to_hsv(34, 139, 34);
        assert_approx_eq!(hsv.hue, 120.0);
        assert_approx_eq!(hsv.saturation, 105.0 / 139.0);
    }

    #[test]
    fn lab_reference_points() {
        let white = rgb_to_lab(255, 255, 255);
        assert_approx_eq!(white.l, 100.0, 0.01);
        assert_approx_eq!(white.a, 0.0, 0.01);
        assert_approx_eq!(white.b, 0.0, 0.01);

        let black = rgb_to_lab(0, 0, 0);
        assert_approx_eq!(black.l, 0.0, 1e-9);

        // Well-known value for pure sRGB red
        let red = rgb_to_lab(255, 0, 0);
        assert_approx_eq!(red.l, 53.24, 0.05);
        assert_approx_eq!(red.a, 80.09, 0.1);
        assert_approx_eq!(red.b, 67.20, 0.1);
    }

    /// Textbook sRGB -> XYZ (D65) -> Lab with the 0.008856 knee and 7.787 slope
    fn reference_lab(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
        let lin = |c: u8| {
            let c = c as f64 / 255.0;
            if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
        };
        let (r, g, b) = (lin(r), lin(g), lin(b));
        let x = (r * 0.4124564 + g * 0.3575761 + b * 0.1804375) / 0.95047;
        let y = r * 0.2126729 + g * 0.7151522 + b * 0.0721750;
        let z = (r * 0.0193339 + g * 0.1191920 + b * 0.9503041) / 1.08883;
        let f = |t: f64| if t > 0.008856 { t.cbrt() } else { 7.787 * t + 16.0 / 116.0 };
        let (fx, fy, fz) = (f(x), f(y), f(z));
        (116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
    }

    #[test]
    fn lab_matches_cie_formula_around_the_knee() {
        // Y = 0.008856 sits near sRGB 24; cover both branches and mixed channels
        for &(r, g, b) in &[
            (0, 0, 0),
            (10, 10, 10),
            (23, 23, 23),
            (25, 25, 25),
            (34, 139, 34),
            (5, 40, 200),
            (230, 200, 30),
            (90, 80, 75),
        ] {
            let lab = rgb_to_lab(r, g, b);
            let (l, a, bb) = reference_lab(r, g, b);
            let de = ((lab.l - l).powi(2) + (lab.a - a).powi(2) + (lab.b - bb).powi(2)).sqrt();
            assert!(de < 1e-2, "({}, {}, {}) off by ΔE {}", r, g, b, de);
        }
    }

    #[test]
    fn delta_e_is_euclidean() {
        let a = LabColor { l: 0.0, a: 3.0, b: 0.0 };
        let b = LabColor { l: 0.0, a: 0.0, b: 4.0 };
        assert_approx_eq!(delta_e(&a, &b), 5.0);
        assert_eq!(delta_e(&a, &a), 0.0);
    }
}
