// src/segmentation.rs - Local background removal driven by border color statistics

use log::{debug, warn};
use rayon::prelude::*;

use crate::border_stats::{compute_border_profile, BorderProfile};
use crate::color_space::{delta_e, rgb_to_hsv, rgb_to_lab, Hsv, LabColor};
use crate::components::{label_components, LabelMap};
use crate::config::SegmentationConfig;
use crate::image_utils::{is_near_transparent, NEAR_TRANSPARENT_ALPHA};
use crate::morphology::{apply_opening, Mask};
use crate::pixel_buffer::PixelBuffer;

// Impossible leaf colors
const NEUTRAL_SATURATION: f64 = 0.12;
const NEAR_WHITE_VALUE: f64 = 0.95;
const NEAR_BLACK_VALUE: f64 = 0.06;
const GRAY_SATURATION: f64 = 0.06;
const GRAY_VALUE_MAX: f64 = 0.94;
const BLUE_HUE_MIN: f64 = 180.0;
const BLUE_HUE_MAX: f64 = 260.0;

/// Which mask the final alpha was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskSource {
    /// Largest connected component of the cleaned mask
    LargestComponent,
    /// No trustworthy component; the whole cleaned mask was kept
    CleanedMask,
    /// Nothing stood out from the border; every plausibly-colored pixel was kept
    PlausibleColors,
}

impl MaskSource {
    /// True for the fallback paths
    pub fn is_degraded(self) -> bool {
        !matches!(self, MaskSource::LargestComponent)
    }
}

/// Result of local segmentation
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Input pixels with the alpha channel replaced by `alpha`
    pub buffer: PixelBuffer,
    /// Feathered opacity, one byte per pixel
    pub alpha: Vec<u8>,
    /// Component labels of the cleaned mask; `None` when a fallback mask was used
    pub labels: Option<LabelMap>,
    pub source: MaskSource,
    /// ΔE cutoff used for this image
    pub threshold: f64,
}

/// `clamp(mean + multiplier * std_dev, min_threshold, max_threshold)`
pub fn adaptive_threshold(profile: &BorderProfile, config: &SegmentationConfig) -> f64 {
    let raw = profile.mean_distance + config.tolerance_multiplier * profile.std_dev_distance;
    raw.clamp(config.min_threshold, config.max_threshold)
}

/// Colors a leaf cannot plausibly have: near-white, near-black, neutral gray and blue/cyan
pub fn is_impossible_leaf_color(r: u8, g: u8, b: u8) -> bool {
    is_impossible_hsv(rgb_to_hsv(r, g, b))
}

/// HSV form of [`is_impossible_leaf_color`]
pub fn is_impossible_hsv(hsv: Hsv) -> bool {
    let Hsv { hue: h, saturation: s, value: v } = hsv;

    (v > NEAR_WHITE_VALUE && s < NEUTRAL_SATURATION)
        || (v < NEAR_BLACK_VALUE && s < NEUTRAL_SATURATION)
        || (s < GRAY_SATURATION && (NEAR_BLACK_VALUE..=GRAY_VALUE_MAX).contains(&v))
        || ((BLUE_HUE_MIN..=BLUE_HUE_MAX).contains(&h) && s > NEUTRAL_SATURATION)
}

/// Pixel is opaque enough and not an impossible leaf color
#[inline]
fn is_plausible([r, g, b, a]: [u8; 4]) -> bool {
    !is_near_transparent(a) && !is_impossible_leaf_color(r, g, b)
}

/// Threshold every pixel against the border mean.
///
/// Returns the candidate-leaf mask and, separately, the mask of all pixels
/// that merely pass the color plausibility filter.
pub fn build_initial_mask(
    buffer: &PixelBuffer,
    background: &LabColor,
    threshold: f64,
) -> (Mask, Mask) {
    let (width, height) = (buffer.width(), buffer.height());
    let mut candidate = vec![0u8; buffer.pixel_count()];
    let mut plausible = vec![0u8; buffer.pixel_count()];

    candidate
        .par_chunks_mut(width as usize)
        .zip(plausible.par_chunks_mut(width as usize))
        .enumerate()
        .for_each(|(y, (cand_row, plaus_row))| {
            let row_start = y * width as usize;
            for x in 0..width as usize {
                let px = buffer.pixel(row_start + x);
                if !is_plausible(px) {
                    continue;
                }
                plaus_row[x] = 1;
                let lab = rgb_to_lab(px[0], px[1], px[2]);
                cand_row[x] = u8::from(delta_e(&lab, background) > threshold);
            }
        });

    (
        Mask::from_values(width, height, candidate),
        Mask::from_values(width, height, plausible),
    )
}

/// Soften the mask edge: each pixel's opacity is the mean of its in-bounds
/// 3x3 neighborhood, scaled to 0..=255. Values below the transparency floor drop to 0.
pub fn feather(mask: &Mask) -> Vec<u8> {
    let (width, height) = (mask.width(), mask.height());
    let mut alpha = vec![0u8; mask.len()];

    alpha
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as u32;
            let y0 = y.saturating_sub(1);
            let y1 = (y + 1).min(height - 1);
            for (x, out) in row.iter_mut().enumerate() {
                let x = x as u32;
                let x0 = x.saturating_sub(1);
                let x1 = (x + 1).min(width - 1);

                let mut on = 0u32;
                let mut total = 0u32;
                for ny in y0..=y1 {
                    for nx in x0..=x1 {
                        total += 1;
                        on += u32::from(mask.get(nx, ny));
                    }
                }

                let value = (on as f64 / total as f64 * 255.0).round() as u8;
                *out = if value < NEAR_TRANSPARENT_ALPHA { 0 } else { value };
            }
        });

    alpha
}

/// Separate the leaf from its background and write the result into the alpha channel.
///
/// Never fails for a valid buffer. When no component reaches
/// `min_component_pixels`, the cleaned mask is kept whole; when even that is
/// empty, the plausibility mask is used so a flat close-up of a leaf is not
/// discarded.
pub fn segment(mut buffer: PixelBuffer, config: &SegmentationConfig) -> Segmentation {
    let profile = compute_border_profile(&buffer, config.sample_stride);
    let threshold = adaptive_threshold(&profile, config);
    debug!(
        "Border profile: L={:.2} a={:.2} b={:.2}, mean ΔE {:.3}, σ {:.3} ({} samples) \
         -> threshold {:.3}",
        profile.mean_lab.l,
        profile.mean_lab.a,
        profile.mean_lab.b,
        profile.mean_distance,
        profile.std_dev_distance,
        profile.sample_count,
        threshold
    );

    let (initial, plausible) = build_initial_mask(&buffer, &profile.mean_lab, threshold);
    let cleaned = apply_opening(&initial, config.morph_iterations);
    debug!(
        "Initial mask {} px, after opening ({} iterations) {} px",
        initial.count(),
        config.morph_iterations,
        cleaned.count()
    );

    let labels = label_components(&cleaned);
    let largest = labels.largest();

    let (final_mask, labels, source) = match largest {
        Some((label, size)) if size >= config.min_component_pixels => {
            debug!(
                "Keeping component {} of {} ({} px)",
                label,
                labels.component_count(),
                size
            );
            let mut mask = cleaned;
            mask.retain(|idx| labels.label_at(idx) == label);
            (mask, Some(labels), MaskSource::LargestComponent)
        }
        _ if cleaned.count() > 0 => {
            warn!(
                "Largest component ({} px) below {} px, keeping full cleaned mask",
                largest.map_or(0, |(_, s)| s),
                config.min_component_pixels
            );
            (cleaned, None, MaskSource::CleanedMask)
        }
        _ => {
            warn!("Nothing differs from the border color, keeping all plausible leaf pixels");
            let mask = apply_opening(&plausible, config.morph_iterations);
            (mask, None, MaskSource::PlausibleColors)
        }
    };

    let alpha = feather(&final_mask);
    buffer.replace_alpha(&alpha);

    Segmentation {
        buffer,
        alpha,
        labels,
        source,
        threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn threshold_is_clamped() {
        let config = SegmentationConfig::default();
        let mut profile = BorderProfile {
            mean_lab: LabColor::default(),
            mean_distance: 0.0,
            std_dev_distance: 0.0,
            sample_count: 4,
        };
        assert_approx_eq!(adaptive_threshold(&profile, &config), 8.0);

        profile.mean_distance = 10.0;
        profile.std_dev_distance = 10.0;
        assert_approx_eq!(adaptive_threshold(&profile, &config), 21.0);

        profile.mean_distance = 80.0;
        assert_approx_eq!(adaptive_threshold(&profile, &config), 60.0);
    }

    #[test]
    fn impossible_colors() {
        assert!(is_impossible_leaf_color(255, 255, 255));
        assert!(is_impossible_leaf_color(5, 5, 5));
        assert!(is_impossible_leaf_color(128, 128, 130));
        assert!(is_impossible_leaf_color(40, 90, 220)); // blue
        assert!(is_impossible_leaf_color(40, 200, 210)); // cyan

        assert!(!is_impossible_leaf_color(34, 139, 34));
        assert!(!is_impossible_leaf_color(230, 200, 30));
        assert!(!is_impossible_leaf_color(90, 80, 75)); // dull brown
        assert!(!is_impossible_leaf_color(120, 40, 160)); // purple
    }

    fn hsv(hue: f64, saturation: f64, value: f64) -> Hsv {
        Hsv { hue, saturation, value }
    }

    #[test]
    fn near_white_boundary() {
        assert!(!is_impossible_hsv(hsv(0.0, 0.05, 0.95)));
        assert!(is_impossible_hsv(hsv(0.0, 0.05, 0.951)));
        assert!(is_impossible_hsv(hsv(0.0, 0.119, 0.97)));
        assert!(!is_impossible_hsv(hsv(0.0, 0.12, 0.97)));
        // between the gray ceiling (0.94) and the white floor (0.95) a neutral pixel is kept
        assert!(!is_impossible_hsv(hsv(0.0, 0.05, 0.945)));
    }

    #[test]
    fn near_black_and_gray_meet_at_value_006() {
        assert!(is_impossible_hsv(hsv(0.0, 0.1, 0.059)));
        // 0.06 is no longer near-black, and s = 0.1 is too saturated for gray
        assert!(!is_impossible_hsv(hsv(0.0, 0.1, 0.06)));
        // ...but a less saturated pixel at 0.06 is gray
        assert!(is_impossible_hsv(hsv(0.0, 0.05, 0.06)));
    }

    #[test]
    fn gray_saturation_boundary() {
        assert!(is_impossible_hsv(hsv(90.0, 0.059, 0.5)));
        assert!(!is_impossible_hsv(hsv(90.0, 0.06, 0.5)));
        assert!(is_impossible_hsv(hsv(90.0, 0.05, 0.94)));
        assert!(!is_impossible_hsv(hsv(90.0, 0.05, 0.941)));
    }

    #[test]
    fn blue_hue_range_is_inclusive() {
        assert!(is_impossible_hsv(hsv(180.0, 0.13, 0.5)));
        assert!(is_impossible_hsv(hsv(260.0, 0.13, 0.5)));
        assert!(!is_impossible_hsv(hsv(179.9, 0.13, 0.5)));
        assert!(!is_impossible_hsv(hsv(260.1, 0.13, 0.5)));
        assert!(!is_impossible_hsv(hsv(220.0, 0.12, 0.5)));
    }

    #[test]
    fn hue_180_is_background_even_though_it_would_classify_green() {
        use crate::classifier::{categorize, Category};

        let teal = hsv(180.0, 0.5, 0.8);
        assert!(is_impossible_hsv(teal));
        assert_eq!(categorize(teal), Category::Green);
    }

    #[test]
    fn feathering_softens_edges() {
        let mut mask = Mask::new(5, 5);
        for y in 1..4 {
            for x in 1..4 {
                mask.set(x, y, true);
            }
        }
        let alpha = feather(&mask);
        assert_eq!(alpha[2 * 5 + 2], 255);
        assert_eq!(alpha[5 + 2], 170); // edge of the block: 6/9
        assert_eq!(alpha[5 + 1], 113); // corner of the block: 4/9
        // image edge: only 6 in-bounds neighbors, 3 of them set
        assert_eq!(alpha[2], 128);
        // image corner: 4 in-bounds neighbors, 1 set
        assert_eq!(alpha[0], 64);
    }

    #[test]
    fn feathering_drops_faint_halo() {
        let mut mask = Mask::new(7, 7);
        mask.set(3, 3, true);
        let alpha = feather(&mask);
        assert_eq!(alpha[3 * 7 + 3], 28);
        assert_eq!(alpha[3 * 7 + 5], 0);
    }

    #[test]
    fn full_mask_feathers_to_opaque_including_edges() {
        let mask = Mask::from_values(4, 3, vec![1; 12]);
        assert!(feather(&mask).iter().all(|&a| a == 255));
    }

    #[test]
    fn keeps_only_largest_component() {
        let green = [34, 139, 34, 255];
        let mut buf = PixelBuffer::filled(40, 40, [255, 255, 255, 255]).unwrap();
        // main leaf 16x16
        for y in 6..22 {
            for x in 6..22 {
                buf.set(x, y, green);
            }
        }
        // separate 7x7 blob, survives opening but is smaller
        for y in 28..35 {
            for x in 28..35 {
                buf.set(x, y, green);
            }
        }

        let seg = segment(buf, &SegmentationConfig::default());
        assert_eq!(seg.source, MaskSource::LargestComponent);
        let labels = seg.labels.as_ref().unwrap();
        assert_eq!(labels.component_count(), 2);
        assert_eq!(labels.largest(), Some((1, 256)));

        assert_eq!(seg.buffer.get(10, 10)[3], 255);
        assert_eq!(seg.buffer.get(31, 31)[3], 0);
        assert_eq!(seg.buffer.get(10, 10)[..3], [34, 139, 34]);
    }

    #[test]
    fn small_fragments_fall_back_to_cleaned_mask() {
        let green = [34, 139, 34, 255];
        let mut buf = PixelBuffer::filled(30, 30, [255, 255, 255, 255]).unwrap();
        // two 5x5 patches survive opening but neither reaches 30 px
        for (ox, oy) in [(4u32, 4u32), (18, 18)] {
            for y in oy..oy + 5 {
                for x in ox..ox + 5 {
                    buf.set(x, y, green);
                }
            }
        }
        let config = SegmentationConfig {
            min_component_pixels: 30,
            ..SegmentationConfig::default()
        };

        let seg = segment(buf, &config);
        assert_eq!(seg.source, MaskSource::CleanedMask);
        assert!(seg.labels.is_none());
        assert_eq!(seg.buffer.get(6, 6)[3], 255);
        assert_eq!(seg.buffer.get(20, 20)[3], 255);
    }

    #[test]
    fn flat_image_uses_plausible_colors() {
        let buf = PixelBuffer::filled(30, 30, [60, 140, 50, 255]).unwrap();
        let seg = segment(buf, &SegmentationConfig::default());
        assert_eq!(seg.source, MaskSource::PlausibleColors);
        assert!(seg.source.is_degraded());
        assert!(seg.alpha.iter().all(|&a| a == 255));
    }

    #[test]
    fn transparent_input_stays_transparent() {
        let buf = PixelBuffer::filled(20, 20, [34, 139, 34, 0]).unwrap();
        let seg = segment(buf, &SegmentationConfig::default());
        assert!(seg.alpha.iter().all(|&a| a == 0));
    }
}
