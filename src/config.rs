// src/config.rs - TOML configuration for the leaf health analyzer

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{LeafHealthError, Result};

/// Configuration for LeafHealth
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_input_path")]
    pub input_path: String,

    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Longest side allowed before analysis; larger images are downscaled
    #[serde(default = "default_max_dimension")]
    pub max_dimension: Option<u32>,

    /// Write the alpha-masked leaf as PNG next to the report
    #[serde(default = "default_save_segmented")]
    pub save_segmented: bool,

    /// Worker threads for the row-parallel stages (None = rayon default)
    #[serde(default)]
    pub threads: Option<usize>,

    #[serde(default)]
    pub segmentation: SegmentationConfig,
}

/// Tuning knobs of the local background segmentation
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct SegmentationConfig {
    /// Scales the border ΔE standard deviation added to the threshold
    #[serde(default = "default_tolerance_multiplier")]
    pub tolerance_multiplier: f64,

    #[serde(default = "default_min_threshold")]
    pub min_threshold: f64,

    #[serde(default = "default_max_threshold")]
    pub max_threshold: f64,

    /// Stride between border samples
    #[serde(default = "default_sample_stride")]
    pub sample_stride: usize,

    /// Erosion rounds (and matching dilation rounds) of the opening
    #[serde(default = "default_morph_iterations")]
    pub morph_iterations: u32,

    /// Smallest component trusted as the leaf
    #[serde(default = "default_min_component_pixels")]
    pub min_component_pixels: usize,
}

fn default_input_path() -> String {
    "./leaf.png".to_string()
}

fn default_output_dir() -> String {
    "./output".to_string()
}

fn default_max_dimension() -> Option<u32> {
    Some(900)
}

fn default_save_segmented() -> bool {
    true
}

fn default_tolerance_multiplier() -> f64 {
    1.1
}

fn default_min_threshold() -> f64 {
    8.0
}

fn default_max_threshold() -> f64 {
    60.0
}

fn default_sample_stride() -> usize {
    6
}

fn default_morph_iterations() -> u32 {
    2
}

fn default_min_component_pixels() -> usize {
    25
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            tolerance_multiplier: default_tolerance_multiplier(),
            min_threshold: default_min_threshold(),
            max_threshold: default_max_threshold(),
            sample_stride: default_sample_stride(),
            morph_iterations: default_morph_iterations(),
            min_component_pixels: default_min_component_pixels(),
        }
    }
}

impl SegmentationConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance_multiplier.is_finite() || self.tolerance_multiplier < 0.0 {
            return Err(LeafHealthError::Config(
                "tolerance_multiplier must be a finite value >= 0.0".to_string(),
            ));
        }

        if !self.min_threshold.is_finite() || !self.max_threshold.is_finite() {
            return Err(LeafHealthError::Config(
                "min_threshold and max_threshold must be finite".to_string(),
            ));
        }

        if self.min_threshold > self.max_threshold {
            return Err(LeafHealthError::Config(format!(
                "min_threshold ({}) must be <= max_threshold ({})",
                self.min_threshold, self.max_threshold
            )));
        }

        if self.sample_stride == 0 {
            return Err(LeafHealthError::Config(
                "sample_stride must be >= 1".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            output_dir: default_output_dir(),
            max_dimension: default_max_dimension(),
            save_segmented: default_save_segmented(),
            threads: None,
            segmentation: SegmentationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            LeafHealthError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str(&content).map_err(|source| LeafHealthError::ConfigLoad {
            source,
            path: path.to_path_buf(),
        })
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            log::debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_dimension == Some(0) {
            return Err(LeafHealthError::Config(
                "max_dimension must be > 0".to_string(),
            ));
        }

        if self.threads == Some(0) {
            return Err(LeafHealthError::Config(
                "threads must be > 0".to_string(),
            ));
        }

        self.segmentation.validate()
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            LeafHealthError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}
