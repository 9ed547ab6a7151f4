use std::path::{Path, PathBuf};
use std::fs;
use image::{ImageFormat, RgbaImage};

use crate::errors::{LeafHealthError, Result};

/// Represents an input image with its metadata
pub struct InputImage {
    pub image: RgbaImage,
    /// Undecoded file contents, handed to a remote background remover if one is configured
    pub bytes: Vec<u8>,
    pub path: PathBuf,
    pub filename: String,
}

/// Load an image file ensuring RGBA format
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<InputImage> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(LeafHealthError::InvalidPath(path.to_path_buf()));
    }

    // Get filename without extension
    let filename = path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| LeafHealthError::InvalidPath(path.to_path_buf()))?
        .to_string();

    let bytes = fs::read(path)?;
    let rgba_img = image::load_from_memory(&bytes)?.to_rgba8();

    Ok(InputImage {
        image: rgba_img,
        bytes,
        path: path.to_path_buf(),
        filename,
    })
}

/// Save an RGBA image as PNG
pub fn save_image<P: AsRef<Path>>(image: &RgbaImage, path: P) -> Result<()> {
    image.save_with_format(path, ImageFormat::Png)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn png_round_trip_keeps_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaf.png");
        let mut img = RgbaImage::from_pixel(3, 2, Rgba([34, 139, 34, 255]));
        img.put_pixel(0, 0, Rgba([255, 255, 255, 0]));
        save_image(&img, &path).unwrap();

        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded.filename, "leaf");
        assert_eq!(loaded.image, img);
        assert!(!loaded.bytes.is_empty());
    }

    #[test]
    fn missing_file_is_invalid_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_image(dir.path().join("nope.png"));
        assert!(matches!(result, Err(LeafHealthError::InvalidPath(_))));
    }
}
