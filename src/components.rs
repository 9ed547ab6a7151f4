// src/components.rs - 4-connected component labeling with an explicit stack

use crate::morphology::Mask;

/// Per-pixel component ids: 0 = background, 1.. = component label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    width: u32,
    height: u32,
    labels: Vec<u32>,
    /// `sizes[label - 1]` is the pixel count of `label`
    sizes: Vec<usize>,
}

impl LabelMap {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    #[inline]
    pub fn label_at(&self, idx: usize) -> u32 {
        self.labels[idx]
    }

    pub fn component_count(&self) -> usize {
        self.sizes.len()
    }

    pub fn component_sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn size_of(&self, label: u32) -> Option<usize> {
        if label == 0 {
            return None;
        }
        self.sizes.get(label as usize - 1).copied()
    }

    /// Label and pixel count of the biggest component. Ties go to the lower label.
    pub fn largest(&self) -> Option<(u32, usize)> {
        self.sizes
            .iter()
            .enumerate()
            .fold(None, |best: Option<(u32, usize)>, (i, &size)| match best {
                Some((_, best_size)) if best_size >= size => best,
                _ => Some((i as u32 + 1, size)),
            })
    }
}

/// Label every foreground pixel of `mask` with its 4-connected component.
///
/// Flood fill runs on a pixel-index stack so depth does not depend on the
/// leaf shape. Components are numbered in raster order of their first pixel.
pub fn label_components(mask: &Mask) -> LabelMap {
    let (width, height) = (mask.width(), mask.height());
    let (w, h) = (width as usize, height as usize);
    let values = mask.as_slice();

    let mut labels = vec![0u32; values.len()];
    let mut sizes = Vec::new();
    let mut stack: Vec<usize> = Vec::new();

    for start in 0..values.len() {
        if values[start] == 0 || labels[start] != 0 {
            continue;
        }

        let label = sizes.len() as u32 + 1;
        let mut size = 0usize;
        labels[start] = label;
        stack.push(start);

        while let Some(idx) = stack.pop() {
            size += 1;
            let (x, y) = (idx % w, idx / w);

            let mut visit = |n: usize| {
                if values[n] != 0 && labels[n] == 0 {
                    labels[n] = label;
                    stack.push(n);
                }
            };

            if x > 0 {
                visit(idx - 1);
            }
            if x + 1 < w {
                visit(idx + 1);
            }
            if y > 0 {
                visit(idx - w);
            }
            if y + 1 < h {
                visit(idx + w);
            }
        }

        sizes.push(size);
    }

    LabelMap { width, height, labels, sizes }
}
