use rayon::prelude::*;

use crate::image_utils::in_bounds;

/// Binary leaf/background mask, one byte per pixel with values in {0, 1}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Mask {
    /// All-background mask
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    /// Build from raw values; any non-zero byte is stored as 1
    pub fn from_values(width: u32, height: u32, values: Vec<u8>) -> Self {
        debug_assert_eq!(values.len(), width as usize * height as usize);
        let data = values.into_iter().map(|v| u8::from(v != 0)).collect();
        Self { width, height, data }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[y as usize * self.width as usize + x as usize] != 0
    }

    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        self.data[y as usize * self.width as usize + x as usize] = u8::from(on);
    }

    /// Number of foreground pixels
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Keep only the pixels for which `keep(index)` is true
    pub fn retain<F: Fn(usize) -> bool>(&mut self, keep: F) {
        for (idx, v) in self.data.iter_mut().enumerate() {
            if *v != 0 && !keep(idx) {
                *v = 0;
            }
        }
    }

    /// Checks the 3x3 neighborhood of (x, y). Out-of-bounds neighbors are
    /// passed to `visit` as `None`.
    #[inline]
    fn neighborhood_any<F: Fn(Option<bool>) -> bool>(&self, x: u32, y: u32, visit: F) -> bool {
        for dy in -1..=1 {
            for dx in -1..=1 {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                let value = if in_bounds(nx, ny, self.width, self.height) {
                    Some(self.get(nx as u32, ny as u32))
                } else {
                    None
                };
                if visit(value) {
                    return true;
                }
            }
        }
        false
    }
}

/// One round of 8-connected erosion.
///
/// A pixel survives only if it and all eight neighbors are foreground; any
/// out-of-bounds neighbor erodes it.
pub fn erode(mask: &Mask) -> Mask {
    let width = mask.width;
    let mut data = vec![0u8; mask.len()];

    if width > 0 {
        data.par_chunks_mut(width as usize)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, out) in row.iter_mut().enumerate() {
                    let (x, y) = (x as u32, y as u32);
                    if !mask.get(x, y) {
                        continue;
                    }
                    let erode = mask.neighborhood_any(x, y, |v| v != Some(true));
                    *out = u8::from(!erode);
                }
            });
    }

    Mask { width, height: mask.height, data }
}

/// One round of 8-connected dilation.
///
/// A background pixel becomes foreground if any in-bounds neighbor is foreground.
pub fn dilate(mask: &Mask) -> Mask {
    let width = mask.width;
    let mut data = vec![0u8; mask.len()];

    if width > 0 {
        data.par_chunks_mut(width as usize)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, out) in row.iter_mut().enumerate() {
                    let (x, y) = (x as u32, y as u32);
                    let dilate = mask.get(x, y) || mask.neighborhood_any(x, y, |v| v == Some(true));
                    *out = u8::from(dilate);
                }
            });
    }

    Mask { width, height: mask.height, data }
}

/// Apply morphological opening: `iterations` erosions followed by `iterations` dilations
pub fn apply_opening(mask: &Mask, iterations: u32) -> Mask {
    let mut result = mask.clone();

    for _ in 0..iterations {
        result = erode(&result);
    }
    for _ in 0..iterations {
        result = dilate(&result);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: u32, x0: u32, y0: u32, side: u32) -> Mask {
        let mut mask = Mask::new(size, size);
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                mask.set(x, y, true);
            }
        }
        mask
    }

    #[test]
    fn erosion_shrinks_square_by_one_ring() {
        let eroded = erode(&square(10, 2, 2, 5));
        assert_eq!(eroded.count(), 9);
        assert!(eroded.get(4, 4));
        assert!(!eroded.get(2, 2));
    }

    #[test]
    fn out_of_bounds_counts_as_background() {
        let full = Mask::from_values(4, 4, vec![1; 16]);
        let eroded = erode(&full);
        // Only the 2x2 interior survives
        assert_eq!(eroded.count(), 4);
        assert!(!eroded.get(0, 0));
        assert!(eroded.get(1, 1));
    }

    #[test]
    fn dilation_grows_single_pixel_to_block() {
        let mut mask = Mask::new(5, 5);
        mask.set(0, 0, true);
        assert_eq!(dilate(&mask).count(), 4);
        mask.set(0, 0, false);
        mask.set(2, 2, true);
        assert_eq!(dilate(&mask).count(), 9);
    }

    #[test]
    fn opening_removes_speckle_and_restores_square() {
        let mut mask = square(20, 5, 5, 8);
        mask.set(17, 2, true);
        mask.set(1, 18, true);

        let opened = apply_opening(&mask, 2);
        assert_eq!(opened.count(), 64);
        assert!(!opened.get(17, 2));
        assert!(!opened.get(1, 18));
    }

    #[test]
    fn opening_never_adds_pixels() {
        // Irregular blob with a thin spur
        let mut mask = square(16, 3, 3, 7);
        for x in 10..15 {
            mask.set(x, 6, true);
        }
        mask.set(3, 12, true);
        mask.set(4, 12, true);

        for iterations in 0..4 {
            let opened = apply_opening(&mask, iterations);
            assert!(opened.count() <= mask.count());
        }
    }

    #[test]
    fn zero_iterations_is_identity() {
        let mask = square(8, 1, 1, 3);
        assert_eq!(apply_opening(&mask, 0), mask);
    }

    #[test]
    fn from_values_normalizes_to_binary() {
        let mask = Mask::from_values(3, 1, vec![0, 7, 255]);
        assert_eq!(mask.as_slice(), &[0, 1, 1]);
    }
}
