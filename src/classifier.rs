// src/classifier.rs - Pigment classification of leaf pixels and the health verdict

use std::fmt;

use log::{debug, info};
use serde::Serialize;

use crate::color_space::{rgb_to_hsv, Hsv};
use crate::image_utils::is_near_transparent;
use crate::pixel_buffer::PixelBuffer;

// Pigment rules (first match wins)
pub const BROWN_MAX_SATURATION: f64 = 0.18;
pub const BROWN_MAX_VALUE: f64 = 0.45;
pub const GREEN_HUE_RANGE: (f64, f64) = (60.0, 180.0);
pub const GREEN_MIN_SATURATION: f64 = 0.2;
pub const RED_HUE_LOW_MAX: f64 = 30.0;
pub const RED_HUE_HIGH_MIN: f64 = 330.0;
pub const RED_MIN_SATURATION: f64 = 0.18;
pub const PURPLE_HUE_RANGE: (f64, f64) = (260.0, 320.0);
pub const PURPLE_MIN_SATURATION: f64 = 0.15;
pub const YELLOW_HUE_RANGE: (f64, f64) = (30.0, 60.0);
pub const YELLOW_MIN_SATURATION: f64 = 0.18;

// Verdict thresholds, in percent of classified pixels
pub const MIN_CLASSIFIED_PIXELS: usize = 50;
pub const HEALTHY_MIN_PCT: f64 = 60.0;
pub const HEALTHY_MAX_UNHEALTHY_PCT: f64 = 20.0;
pub const MODERATE_MIN_HEALTHY_PCT: f64 = 35.0;
pub const MODERATE_UNHEALTHY_RANGE: (f64, f64) = (20.0, 40.0);

/// Pigment bucket of a single leaf pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Green,
    Red,
    Purple,
    Yellow,
    Brown,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Green,
        Category::Red,
        Category::Purple,
        Category::Yellow,
        Category::Brown,
        Category::Other,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Green => "green",
            Category::Red => "red",
            Category::Purple => "purple",
            Category::Yellow => "yellow",
            Category::Brown => "brown",
            Category::Other => "other",
        }
    }

    /// Green, red and purple are the pigments of a living leaf, variegation included
    pub fn is_healthy(self) -> bool {
        matches!(self, Category::Green | Category::Red | Category::Purple)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bucket an HSV color
pub fn categorize(hsv: Hsv) -> Category {
    let Hsv { hue: h, saturation: s, value: v } = hsv;

    if s < BROWN_MAX_SATURATION && v < BROWN_MAX_VALUE {
        Category::Brown
    } else if h >= GREEN_HUE_RANGE.0 && h <= GREEN_HUE_RANGE.1 && s >= GREEN_MIN_SATURATION {
        Category::Green
    } else if (h <= RED_HUE_LOW_MAX || h >= RED_HUE_HIGH_MIN) && s >= RED_MIN_SATURATION {
        Category::Red
    } else if h >= PURPLE_HUE_RANGE.0 && h <= PURPLE_HUE_RANGE.1 && s >= PURPLE_MIN_SATURATION {
        Category::Purple
    } else if h >= YELLOW_HUE_RANGE.0 && h < YELLOW_HUE_RANGE.1 && s >= YELLOW_MIN_SATURATION {
        Category::Yellow
    } else {
        Category::Other
    }
}

/// Bucket an 8-bit RGB pixel
#[inline]
pub fn classify_pixel(r: u8, g: u8, b: u8) -> Category {
    categorize(rgb_to_hsv(r, g, b))
}

/// Pixel count per category. `total` always equals the sum of the six counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationCounts {
    pub green: usize,
    pub red: usize,
    pub purple: usize,
    pub yellow: usize,
    pub brown: usize,
    pub other: usize,
    pub total: usize,
}

impl ClassificationCounts {
    pub fn add(&mut self, category: Category) {
        *self.slot(category) += 1;
        self.total += 1;
    }

    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::Green => self.green,
            Category::Red => self.red,
            Category::Purple => self.purple,
            Category::Yellow => self.yellow,
            Category::Brown => self.brown,
            Category::Other => self.other,
        }
    }

    fn slot(&mut self, category: Category) -> &mut usize {
        match category {
            Category::Green => &mut self.green,
            Category::Red => &mut self.red,
            Category::Purple => &mut self.purple,
            Category::Yellow => &mut self.yellow,
            Category::Brown => &mut self.brown,
            Category::Other => &mut self.other,
        }
    }

    pub fn healthy(&self) -> usize {
        self.green + self.red + self.purple
    }

    pub fn unhealthy(&self) -> usize {
        self.yellow + self.brown + self.other
    }
}

/// Share of each category in percent of `total` (all 0 when nothing was classified)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CategoryPercents {
    pub green: f64,
    pub red: f64,
    pub purple: f64,
    pub yellow: f64,
    pub brown: f64,
    pub other: f64,
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * count as f64 / total as f64
    }
}

impl CategoryPercents {
    pub fn from_counts(counts: &ClassificationCounts) -> Self {
        let t = counts.total;
        Self {
            green: percent(counts.green, t),
            red: percent(counts.red, t),
            purple: percent(counts.purple, t),
            yellow: percent(counts.yellow, t),
            brown: percent(counts.brown, t),
            other: percent(counts.other, t),
        }
    }

    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Green => self.green,
            Category::Red => self.red,
            Category::Purple => self.purple,
            Category::Yellow => self.yellow,
            Category::Brown => self.brown,
            Category::Other => self.other,
        }
    }
}

/// Coarse health label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    #[serde(rename = "No leaf detected")]
    NoLeafDetected,
    #[serde(rename = "Healthy")]
    Healthy,
    #[serde(rename = "Moderately healthy")]
    ModeratelyHealthy,
    #[serde(rename = "Unhealthy")]
    Unhealthy,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::NoLeafDetected => "No leaf detected",
            Verdict::Healthy => "Healthy",
            Verdict::ModeratelyHealthy => "Moderately healthy",
            Verdict::Unhealthy => "Unhealthy",
        }
    }

    /// Apply the verdict thresholds to healthy/unhealthy percentages
    pub fn from_shares(total: usize, healthy_pct: f64, unhealthy_pct: f64) -> Self {
        if total < MIN_CLASSIFIED_PIXELS {
            Verdict::NoLeafDetected
        } else if healthy_pct >= HEALTHY_MIN_PCT && unhealthy_pct < HEALTHY_MAX_UNHEALTHY_PCT {
            Verdict::Healthy
        } else if healthy_pct >= MODERATE_MIN_HEALTHY_PCT
            || (unhealthy_pct >= MODERATE_UNHEALTHY_RANGE.0
                && unhealthy_pct < MODERATE_UNHEALTHY_RANGE.1)
        {
            Verdict::ModeratelyHealthy
        } else {
            Verdict::Unhealthy
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts, percentages and verdict for one leaf
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub counts: ClassificationCounts,
    pub percents: CategoryPercents,
    pub healthy_pct: f64,
    pub unhealthy_pct: f64,
    pub verdict: Verdict,
}

impl AnalysisResult {
    pub fn from_counts(counts: ClassificationCounts) -> Self {
        let percents = CategoryPercents::from_counts(&counts);
        let healthy_pct = percent(counts.healthy(), counts.total);
        let unhealthy_pct = percent(counts.unhealthy(), counts.total);
        let verdict = Verdict::from_shares(counts.total, healthy_pct, unhealthy_pct);

        Self {
            counts,
            percents,
            healthy_pct,
            unhealthy_pct,
            verdict,
        }
    }
}

/// Classify every non-transparent pixel of `buffer`
pub fn classify(buffer: &PixelBuffer) -> AnalysisResult {
    let mut counts = ClassificationCounts::default();

    for [r, g, b, a] in buffer.pixels() {
        if is_near_transparent(a) {
            continue;
        }
        counts.add(classify_pixel(r, g, b));
    }

    let result = AnalysisResult::from_counts(counts);
    debug!(
        "Classified {} px: healthy {:.1}%, unhealthy {:.1}%",
        counts.total, result.healthy_pct, result.unhealthy_pct
    );
    info!("Verdict: {}", result.verdict);

    result
}
