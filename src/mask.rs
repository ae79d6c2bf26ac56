use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// How a freshly produced mask merges with the existing selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMode {
    Replace,
    Add,
    Subtract,
    Intersect,
}

impl SelectionMode {
    pub fn label(&self) -> &'static str {
        match self {
            SelectionMode::Replace => "Replace",
            SelectionMode::Add => "Add",
            SelectionMode::Subtract => "Subtract",
            SelectionMode::Intersect => "Intersect",
        }
    }

    pub fn all() -> &'static [SelectionMode] {
        &[
            SelectionMode::Replace,
            SelectionMode::Add,
            SelectionMode::Subtract,
            SelectionMode::Intersect,
        ]
    }
}

/// Canvas-sized selection intensity raster.
///
/// Stored as RGBA with R=G=B=intensity and A=255, so it can be uploaded or
/// previewed like any other image. 0 = unselected, 255 = fully selected.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionMask {
    image: RgbaImage,
}

impl SelectionMask {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])),
        }
    }

    /// Build a mask by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> u8) -> Self {
        let mut mask = Self::empty(width, height);
        for y in 0..height {
            for x in 0..width {
                mask.set(x, y, f(x, y));
            }
        }
        mask
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.image.get_pixel(x, y).0[0]
    }

    /// Set intensity, keeping the grayscale encoding (R=G=B, A=255).
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        self.image.put_pixel(x, y, Rgba([value, value, value, 255]));
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// True when no pixel is selected at all.
    pub fn is_empty(&self) -> bool {
        self.image.pixels().all(|p| p.0[0] == 0)
    }

    /// Smallest rectangle containing every selected pixel, as
    /// `(min_x, min_y, max_x_exclusive, max_y_exclusive)`. `None` when empty.
    pub fn bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let (w, h) = (self.width(), self.height());
        let mut min_x = w;
        let mut min_y = h;
        let mut max_x = 0u32;
        let mut max_y = 0u32;
        let mut any = false;
        for y in 0..h {
            for x in 0..w {
                if self.get(x, y) > 0 {
                    any = true;
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
            }
        }
        if any {
            Some((min_x, min_y, max_x + 1, max_y + 1))
        } else {
            None
        }
    }

    pub fn memory_bytes(&self) -> usize {
        self.image.as_raw().len()
    }

    /// Per-pixel `255 − value`.
    pub fn invert(&self) -> SelectionMask {
        let mut out = SelectionMask::empty(self.width(), self.height());
        for y in 0..self.height() {
            for x in 0..self.width() {
                out.set(x, y, 255 - self.get(x, y));
            }
        }
        out
    }

    /// Morphological grow (radius > 0) or shrink (radius < 0) with a circular
    /// kernel. Shrink is erosion expressed through its dual:
    /// `255 − dilate(255 − mask, |radius|)`. Radius 0 is a no-op copy.
    pub fn grow(&self, radius: i32) -> SelectionMask {
        if radius == 0 {
            return self.clone();
        }
        if radius > 0 {
            dilate(self, radius as u32)
        } else {
            dilate(&self.invert(), (-radius) as u32).invert()
        }
    }

    /// Soften edges with three passes of separable box blur (horizontal then
    /// vertical), which approximates a Gaussian of equivalent radius. Edge
    /// pixels use clamped sampling.
    pub fn feather(&self, radius: u32) -> SelectionMask {
        if radius == 0 {
            return self.clone();
        }
        let mut current = self.clone();
        for _ in 0..3 {
            current = box_blur_horizontal(&current, radius);
            current = box_blur_vertical(&current, radius);
        }
        current
    }

    /// Boundary pixels of the selection: selected, with at least one
    /// 4-neighbor unselected or off-canvas. Used for outline display.
    pub fn edges(&self) -> Vec<(u32, u32)> {
        let (w, h) = (self.width(), self.height());
        let mut out = Vec::new();
        for y in 0..h {
            for x in 0..w {
                if self.get(x, y) == 0 {
                    continue;
                }
                let boundary = x == 0
                    || y == 0
                    || x + 1 == w
                    || y + 1 == h
                    || self.get(x - 1, y) == 0
                    || self.get(x + 1, y) == 0
                    || self.get(x, y - 1) == 0
                    || self.get(x, y + 1) == 0;
                if boundary {
                    out.push((x, y));
                }
            }
        }
        out
    }
}

/// Merge `incoming` into `existing` under the given mode. Both masks must be
/// canvas-sized (same dimensions).
///
/// Subtract computes `existing · (1 − incoming/255)` in f32 and rounds
/// half-away-from-zero (`f32::round`); the choice is observable in byte-exact
/// round trips and is fixed here.
pub fn combine(
    existing: &SelectionMask,
    incoming: &SelectionMask,
    mode: SelectionMode,
) -> SelectionMask {
    assert_eq!(
        (existing.width(), existing.height()),
        (incoming.width(), incoming.height()),
        "selection masks must share the canvas size"
    );

    if mode == SelectionMode::Replace {
        return incoming.clone();
    }

    let mut out = SelectionMask::empty(existing.width(), existing.height());
    for y in 0..existing.height() {
        for x in 0..existing.width() {
            let old = existing.get(x, y);
            let new = incoming.get(x, y);
            let value = match mode {
                SelectionMode::Replace => unreachable!(),
                SelectionMode::Add => old.max(new),
                SelectionMode::Subtract => {
                    (old as f32 * (1.0 - new as f32 / 255.0)).round() as u8
                }
                SelectionMode::Intersect => old.min(new),
            };
            out.set(x, y, value);
        }
    }
    out
}

/// Circular-kernel dilation: each output pixel takes the max over all input
/// pixels within `radius` (membership test `dx²+dy² ≤ r²`).
fn dilate(mask: &SelectionMask, radius: u32) -> SelectionMask {
    let r = radius as i32;
    let mut kernel: Vec<(i32, i32)> = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r * r {
                kernel.push((dx, dy));
            }
        }
    }

    let (w, h) = (mask.width() as i32, mask.height() as i32);
    let mut out = SelectionMask::empty(mask.width(), mask.height());
    for y in 0..h {
        for x in 0..w {
            let mut best = 0u8;
            for &(dx, dy) in &kernel {
                let sx = x + dx;
                let sy = y + dy;
                if sx < 0 || sy < 0 || sx >= w || sy >= h {
                    continue;
                }
                best = best.max(mask.get(sx as u32, sy as u32));
                if best == 255 {
                    break;
                }
            }
            out.set(x as u32, y as u32, best);
        }
    }
    out
}

fn box_blur_horizontal(mask: &SelectionMask, radius: u32) -> SelectionMask {
    let (w, h) = (mask.width(), mask.height());
    let r = radius as i32;
    let window = (2 * radius + 1) as f32;
    let mut out = SelectionMask::empty(w, h);
    for y in 0..h {
        for x in 0..w as i32 {
            let mut sum = 0u32;
            for dx in -r..=r {
                let sx = (x + dx).clamp(0, w as i32 - 1) as u32;
                sum += mask.get(sx, y) as u32;
            }
            out.set(x as u32, y, (sum as f32 / window).round() as u8);
        }
    }
    out
}

fn box_blur_vertical(mask: &SelectionMask, radius: u32) -> SelectionMask {
    let (w, h) = (mask.width(), mask.height());
    let r = radius as i32;
    let window = (2 * radius + 1) as f32;
    let mut out = SelectionMask::empty(w, h);
    for x in 0..w {
        for y in 0..h as i32 {
            let mut sum = 0u32;
            for dy in -r..=r {
                let sy = (y + dy).clamp(0, h as i32 - 1) as u32;
                sum += mask.get(x, sy) as u32;
            }
            out.set(x, y as u32, (sum as f32 / window).round() as u8);
        }
    }
    out
}
