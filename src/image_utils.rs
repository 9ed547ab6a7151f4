use image::RgbaImage;

/// Constants
pub const NEAR_TRANSPARENT_ALPHA: u8 = 16; // Alpha below which a pixel is treated as background

/// Check if an alpha value is below the near-transparency floor
#[inline]
pub fn is_near_transparent(alpha: u8) -> bool {
    alpha < NEAR_TRANSPARENT_ALPHA
}

/// Check if a point is inside the image bounds
#[inline]
pub fn in_bounds(x: i32, y: i32, width: u32, height: u32) -> bool {
    x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height
}

/// Compute the dimensions that fit `max_dim` on the longest side, keeping the aspect ratio.
/// Returns `None` when the image already fits.
pub fn fit_dimensions(width: u32, height: u32, max_dim: u32) -> Option<(u32, u32)> {
    if width.max(height) <= max_dim || width == 0 || height == 0 {
        return None;
    }

    let ratio = width as f64 / height as f64;
    let (w, h) = if ratio >= 1.0 {
        (max_dim, (max_dim as f64 / ratio).round() as u32)
    } else {
        ((max_dim as f64 * ratio).round() as u32, max_dim)
    };

    Some((w.max(1), h.max(1)))
}

/// Downscale an image so its longest side is at most `max_dim`
pub fn resize_to_max_dimension(image: RgbaImage, max_dim: u32) -> RgbaImage {
    let (width, height) = image.dimensions();
    match fit_dimensions(width, height, max_dim) {
        Some((w, h)) => image::imageops::resize(
            &image,
            w,
            h,
            image::imageops::FilterType::Triangle,
        ),
        None => image,
    }
}
