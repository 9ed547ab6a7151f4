// src/pixel_buffer.rs - Owned RGBA buffer passed linearly through the pipeline

use image::RgbaImage;

use crate::errors::{LeafHealthError, Result};

/// Row-major RGBA pixels, 4 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes, checking that `data.len() == width * height * 4`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4));

        match expected {
            Some(len) if len == data.len() && width > 0 && height > 0 => {
                Ok(Self { width, height, data })
            }
            _ => Err(LeafHealthError::InvalidBuffer {
                width,
                height,
                len: data.len(),
            }),
        }
    }

    /// Buffer where every pixel has the same RGBA value
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        let count = (width as usize).saturating_mul(height as usize);
        let data = rgba.iter().copied().cycle().take(count.saturating_mul(4)).collect();
        Self::new(width, height, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// RGBA of the pixel at linear index `idx`
    #[inline]
    pub fn pixel(&self, idx: usize) -> [u8; 4] {
        let o = idx * 4;
        [self.data[o], self.data[o + 1], self.data[o + 2], self.data[o + 3]]
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixel(y as usize * self.width as usize + x as usize)
    }

    pub fn set(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let o = (y as usize * self.width as usize + x as usize) * 4;
        self.data[o..o + 4].copy_from_slice(&rgba);
    }

    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.data.chunks_exact(4).map(|p| [p[0], p[1], p[2], p[3]])
    }

    /// Replace the alpha channel with one byte per pixel from `alpha`.
    pub fn replace_alpha(&mut self, alpha: &[u8]) {
        debug_assert_eq!(alpha.len(), self.pixel_count());
        for (px, &a) in self.data.chunks_exact_mut(4).zip(alpha) {
            px[3] = a;
        }
    }

    pub fn from_rgba_image(image: RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw())
    }

    pub fn into_rgba_image(self) -> Result<RgbaImage> {
        let (width, height, len) = (self.width, self.height, self.data.len());
        RgbaImage::from_raw(width, height, self.data)
            .ok_or(LeafHealthError::InvalidBuffer { width, height, len })
    }
}
