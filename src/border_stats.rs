// src/border_stats.rs - Color statistics of the image frame, used as the background model

use crate::color_space::{delta_e, rgb_to_lab, LabColor};
use crate::pixel_buffer::PixelBuffer;

/// Lab statistics of pixels sampled along the image border
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderProfile {
    pub mean_lab: LabColor,
    pub mean_distance: f64,
    pub std_dev_distance: f64,
    pub sample_count: usize,
}

/// Collect the linear indices of border samples taken every `step` pixels.
///
/// The top and bottom rows and the left and right columns are walked starting
/// at 0, so every side contributes at least one sample. Corners are sampled
/// once per side they belong to.
pub fn border_sample_indices(width: u32, height: u32, step: usize) -> Vec<usize> {
    let (w, h) = (width as usize, height as usize);
    let step = step.max(1);
    let row_step = step.min(w.max(1));
    let col_step = step.min(h.max(1));
    let mut indices = Vec::with_capacity(2 * (w / row_step + h / col_step + 2));

    for x in (0..w).step_by(row_step) {
        indices.push(x);
        indices.push((h - 1) * w + x);
    }
    for y in (0..h).step_by(col_step) {
        indices.push(y * w);
        indices.push(y * w + (w - 1));
    }

    indices
}

/// Compute the mean Lab color of the border and the spread of ΔE around it
pub fn compute_border_profile(buffer: &PixelBuffer, step: usize) -> BorderProfile {
    let samples: Vec<LabColor> = border_sample_indices(buffer.width(), buffer.height(), step)
        .into_iter()
        .map(|idx| {
            let [r, g, b, _] = buffer.pixel(idx);
            rgb_to_lab(r, g, b)
        })
        .collect();

    let n = samples.len().max(1) as f64;

    let (sl, sa, sb) = samples
        .iter()
        .fold((0.0, 0.0, 0.0), |(l, a, b), s| (l + s.l, a + s.a, b + s.b));
    let mean_lab = LabColor { l: sl / n, a: sa / n, b: sb / n };

    let distances: Vec<f64> = samples.iter().map(|s| delta_e(s, &mean_lab)).collect();
    let mean_distance = distances.iter().sum::<f64>() / n;
    let variance = distances
        .iter()
        .map(|d| (d - mean_distance).powi(2))
        .sum::<f64>()
        / n;

    BorderProfile {
        mean_lab,
        mean_distance,
        std_dev_distance: variance.sqrt(),
        sample_count: samples.len(),
    }
}
