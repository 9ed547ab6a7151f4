// src/pipeline.rs - Border statistics -> segmentation -> classification for one image

use log::{info, warn};
use serde::Serialize;

use crate::classifier::{classify, AnalysisResult};
use crate::config::{Config, SegmentationConfig};
use crate::errors::Result;
use crate::image_io::InputImage;
use crate::image_utils::resize_to_max_dimension;
use crate::pixel_buffer::PixelBuffer;
use crate::segmentation::{segment, MaskSource};

/// External background removal, e.g. a web service.
///
/// Implementations report transport problems as `LeafHealthError::Network`
/// and undecodable replies as `LeafHealthError::UpstreamFormat`.
pub trait BackgroundRemover {
    fn remove_background(&self, image_bytes: &[u8]) -> Result<PixelBuffer>;
}

/// How the background was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationPath {
    Remote,
    Local(MaskSource),
}

/// Everything produced for one image
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub result: AnalysisResult,
    /// Leaf pixels with background alpha applied
    pub segmented: PixelBuffer,
    pub path: SegmentationPath,
    /// ΔE cutoff, present for local segmentation
    pub threshold: Option<f64>,
}

impl PipelineReport {
    /// Local segmentation had to fall back; the verdict is less trustworthy
    pub fn degraded_segmentation(&self) -> bool {
        match self.path {
            SegmentationPath::Remote => false,
            SegmentationPath::Local(source) => source.is_degraded(),
        }
    }
}

/// Segment locally and classify
pub fn analyze_buffer(buffer: PixelBuffer, config: &SegmentationConfig) -> PipelineReport {
    let segmentation = segment(buffer, config);
    let result = classify(&segmentation.buffer);

    PipelineReport {
        result,
        segmented: segmentation.buffer,
        path: SegmentationPath::Local(segmentation.source),
        threshold: Some(segmentation.threshold),
    }
}

/// Try the remote remover first and fall back to local segmentation on any failure.
///
/// The remote buffer is classified as-is.
pub fn analyze_with_remover(
    image_bytes: &[u8],
    decoded: PixelBuffer,
    remover: &dyn BackgroundRemover,
    config: &SegmentationConfig,
) -> PipelineReport {
    match remover.remove_background(image_bytes) {
        Ok(buffer) => {
            info!("Using remotely segmented image ({}x{})", buffer.width(), buffer.height());
            let result = classify(&buffer);
            PipelineReport {
                result,
                segmented: buffer,
                path: SegmentationPath::Remote,
                threshold: None,
            }
        }
        Err(e) => {
            warn!("Remote background removal failed ({}), segmenting locally", e);
            analyze_buffer(decoded, config)
        }
    }
}

/// Process a loaded image: downscale, remove the background and classify
pub fn process_image(
    input_image: InputImage,
    config: &Config,
    remover: Option<&dyn BackgroundRemover>,
) -> Result<PipelineReport> {
    let InputImage { image, bytes, filename, .. } = input_image;

    let (orig_w, orig_h) = image.dimensions();
    let image = match config.max_dimension {
        Some(max_dim) => resize_to_max_dimension(image, max_dim),
        None => image,
    };
    if image.dimensions() != (orig_w, orig_h) {
        info!(
            "{}: resized {}x{} -> {}x{}",
            filename,
            orig_w,
            orig_h,
            image.width(),
            image.height()
        );
    }

    let buffer = PixelBuffer::from_rgba_image(image)?;

    let report = match remover {
        Some(remover) => analyze_with_remover(&bytes, buffer, remover, &config.segmentation),
        None => analyze_buffer(buffer, &config.segmentation),
    };

    if report.degraded_segmentation() {
        warn!(
            "{}: segmentation fell back to {:?}, verdict has lower confidence",
            filename, report.path
        );
    }

    Ok(report)
}
