// src/lib.rs - Library interface for LeafHealth

pub mod border_stats;
pub mod classifier;
pub mod color_space;
pub mod components;
pub mod config;
pub mod errors;
pub mod image_io;
pub mod image_utils;
pub mod morphology;
pub mod output;
pub mod pipeline;
pub mod pixel_buffer;
pub mod segmentation;

// Re-export commonly used types and functions
pub use errors::{LeafHealthError, Result};
pub use config::{Config, SegmentationConfig};
pub use pixel_buffer::PixelBuffer;
pub use image_io::{InputImage, load_image, save_image};

pub use color_space::{delta_e, rgb_to_hsv, rgb_to_lab, Hsv, LabColor};
pub use border_stats::{compute_border_profile, BorderProfile};
pub use morphology::{apply_opening, dilate, erode, Mask};
pub use components::{label_components, LabelMap};
pub use segmentation::{segment, MaskSource, Segmentation};

pub use classifier::{
    classify,
    classify_pixel,
    AnalysisResult,
    Category,
    CategoryPercents,
    ClassificationCounts,
    Verdict,
};

pub use pipeline::{
    analyze_buffer,
    analyze_with_remover,
    process_image,
    BackgroundRemover,
    PipelineReport,
    SegmentationPath,
};
