use std::collections::VecDeque;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::mask::SelectionMask;

/// Width of the anti-aliased falloff band above the base tolerance.
///
/// Pixels whose color distance lands in `(tolerance, tolerance + BAND]` are
/// included with linearly decreasing intensity but never propagate the fill.
/// Deliberately a fixed constant, not derived from the base tolerance.
pub const ANTIALIAS_BAND: f32 = 32.0;

/// Where the seed color (and fill source pixels) are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleScope {
    /// The active layer's pixels only, rendered in canvas space.
    ActiveLayer,
    /// A flattened composite of all visible layers.
    Composite,
}

/// Color distance with alpha weighted double: `sqrt(dr² + dg² + db² + 2·da²)`.
pub fn color_distance(a: Rgba<u8>, b: Rgba<u8>) -> f32 {
    let dr = a.0[0] as f32 - b.0[0] as f32;
    let dg = a.0[1] as f32 - b.0[1] as f32;
    let db = a.0[2] as f32 - b.0[2] as f32;
    let da = a.0[3] as f32 - b.0[3] as f32;
    (dr * dr + dg * dg + db * db + 2.0 * da * da).sqrt()
}

/// Mask intensity for a pixel at color distance `d` from the seed:
/// 255 at or under the base tolerance, linear falloff across the band,
/// 0 beyond it.
fn band_intensity(d: f32, tolerance: f32) -> u8 {
    if d <= tolerance {
        255
    } else if d <= tolerance + ANTIALIAS_BAND {
        (255.0 * (1.0 - (d - tolerance) / ANTIALIAS_BAND)).round() as u8
    } else {
        0
    }
}

/// 4-connected breadth-first flood fill from `seed`, producing a selection
/// mask with an anti-aliased boundary.
///
/// Expansion only continues through pixels at or under the base tolerance;
/// band pixels are marked but act as walls.
pub fn contiguous_select(src: &RgbaImage, seed: (u32, u32), tolerance: f32) -> SelectionMask {
    let (w, h) = (src.width(), src.height());
    let mut mask = SelectionMask::empty(w, h);
    if seed.0 >= w || seed.1 >= h {
        return mask;
    }

    let seed_color = *src.get_pixel(seed.0, seed.1);
    let wu = w as usize;
    let mut visited = vec![false; wu * h as usize];
    let mut queue: VecDeque<(u32, u32)> = VecDeque::new();

    visited[seed.1 as usize * wu + seed.0 as usize] = true;
    mask.set(seed.0, seed.1, 255);
    queue.push_back(seed);

    while let Some((x, y)) = queue.pop_front() {
        let neighbors = [
            (x.wrapping_sub(1), y),
            (x + 1, y),
            (x, y.wrapping_sub(1)),
            (x, y + 1),
        ];
        for (nx, ny) in neighbors {
            if nx >= w || ny >= h {
                continue;
            }
            let vi = ny as usize * wu + nx as usize;
            if visited[vi] {
                continue;
            }
            visited[vi] = true;

            let d = color_distance(seed_color, *src.get_pixel(nx, ny));
            let intensity = band_intensity(d, tolerance);
            if intensity == 0 {
                continue;
            }
            mask.set(nx, ny, intensity);
            // Only pixels within the base tolerance keep the fill moving.
            if d <= tolerance {
                queue.push_back((nx, ny));
            }
        }
    }

    mask
}

/// Whole-canvas color scan: the same distance/falloff rule applied to every
/// pixel, with no connectivity requirement.
pub fn global_select(src: &RgbaImage, seed_color: Rgba<u8>, tolerance: f32) -> SelectionMask {
    let (w, h) = (src.width(), src.height());
    let mut mask = SelectionMask::empty(w, h);
    for y in 0..h {
        for x in 0..w {
            let d = color_distance(seed_color, *src.get_pixel(x, y));
            let intensity = band_intensity(d, tolerance);
            if intensity > 0 {
                mask.set(x, y, intensity);
            }
        }
    }
    mask
}
