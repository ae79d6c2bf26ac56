//! Layer compositor: draws a project's layers into one RGBA buffer,
//! honoring per-layer transform, opacity, and shadow. Text layers are
//! rasterized on demand from their properties.

use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use uuid::Uuid;

use crate::log_warn;
use crate::project::{Layer, ProjectState, Shadow};
use crate::text::{self, FontStore};
use crate::transform::Mat2x3;

/// Render the whole project: layers are drawn from the last index to the
/// first, so index 0 lands on top.
pub fn render(project: &ProjectState, fonts: &FontStore) -> RgbaImage {
    let mut dst = RgbaImage::from_pixel(
        project.width(),
        project.height(),
        Rgba(project.metadata.settings.background),
    );
    for layer in project.metadata.layers.iter().rev() {
        if !layer.visible {
            continue;
        }
        draw_layer(&mut dst, project, layer, fonts);
    }
    dst
}

/// Render a single layer alone into a transparent canvas-sized buffer at full
/// opacity — the sampling source for active-layer-scoped fills and for crop.
pub fn render_layer_alone(project: &ProjectState, id: Uuid, fonts: &FontStore) -> RgbaImage {
    let mut dst = RgbaImage::new(project.width(), project.height());
    if let Some(layer) = project.layer(id) {
        if let Some(src) = layer_pixels(project, layer, fonts) {
            warp_over(&mut dst, &src, &layer.transform.to_matrix().invert(), 1.0);
        }
    }
    dst
}

/// Flattened composite of all visible layers over a transparent background —
/// the sampling source for composite-scoped fills.
pub fn flatten_visible(project: &ProjectState, fonts: &FontStore) -> RgbaImage {
    let mut dst = RgbaImage::new(project.width(), project.height());
    for layer in project.metadata.layers.iter().rev() {
        if !layer.visible {
            continue;
        }
        draw_layer(&mut dst, project, layer, fonts);
    }
    dst
}

fn draw_layer(dst: &mut RgbaImage, project: &ProjectState, layer: &Layer, fonts: &FontStore) {
    let Some(src) = layer_pixels(project, layer, fonts) else {
        return;
    };
    let alpha = layer.alpha();
    if alpha <= 0.0 {
        return;
    }
    let inverse = layer.transform.to_matrix().invert();
    if let Some(shadow) = &layer.shadow {
        draw_shadow(dst, &src, &inverse, shadow, alpha);
    }
    warp_over(dst, &src, &inverse, alpha);
}

/// The layer's pixels: its owned buffer, or an on-demand rasterization of its
/// text properties. Text layers with an unregistered font are skipped (and
/// logged) rather than failing the whole render.
fn layer_pixels(project: &ProjectState, layer: &Layer, fonts: &FontStore) -> Option<RgbaImage> {
    if let Some(text) = &layer.basic_text {
        match fonts.get(&text.font_family) {
            Ok(font) => Some(text::rasterize(font, text, layer.width, layer.height)),
            Err(_) => {
                log_warn!(
                    "layer \"{}\": font family \"{}\" not registered, skipping",
                    layer.name,
                    text.font_family
                );
                None
            }
        }
    } else {
        project.buffer(layer.id).cloned()
    }
}

/// Inverse-map every destination pixel through `inverse` into the source
/// buffer, bilinear-sample it, and source-over blend with `alpha`.
/// Rows are processed in parallel.
fn warp_over(dst: &mut RgbaImage, src: &RgbaImage, inverse: &Mat2x3, alpha: f32) {
    let dst_w = dst.width() as usize;
    let row_bytes = dst_w * 4;
    dst.as_mut()
        .par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(dy, row)| {
            for dx in 0..dst_w {
                // Sample at the pixel centre.
                let local = inverse.apply(egui::Pos2::new(dx as f32 + 0.5, dy as f32 + 0.5));
                let Some(sample) = bilinear_sample(src, local.x - 0.5, local.y - 0.5) else {
                    continue;
                };
                let px = dx * 4;
                let under = [row[px], row[px + 1], row[px + 2], row[px + 3]];
                let blended = blend_over(under, sample, alpha);
                row[px..px + 4].copy_from_slice(&blended);
            }
        });
}

/// Transformed silhouette of the layer, box-blurred and tinted, drawn under
/// the layer itself at the shadow offset.
fn draw_shadow(
    dst: &mut RgbaImage,
    src: &RgbaImage,
    inverse: &Mat2x3,
    shadow: &Shadow,
    layer_alpha: f32,
) {
    let (w, h) = (dst.width(), dst.height());
    let mut silhouette = vec![0.0f32; w as usize * h as usize];
    for dy in 0..h {
        for dx in 0..w {
            let local = inverse.apply(egui::Pos2::new(dx as f32 + 0.5, dy as f32 + 0.5));
            if let Some(sample) = bilinear_sample(src, local.x - 0.5, local.y - 0.5) {
                silhouette[dy as usize * w as usize + dx as usize] = sample[3] as f32 / 255.0;
            }
        }
    }

    let radius = shadow.blur.round().max(0.0) as i32;
    if radius > 0 {
        silhouette = blur_coverage(&silhouette, w, h, radius);
    }

    let [sr, sg, sb, sa] = shadow.color;
    let shadow_alpha = sa as f32 / 255.0 * layer_alpha;
    let ox = shadow.offset_x.round() as i32;
    let oy = shadow.offset_y.round() as i32;
    for dy in 0..h as i32 {
        for dx in 0..w as i32 {
            let sx = dx - ox;
            let sy = dy - oy;
            if sx < 0 || sy < 0 || sx >= w as i32 || sy >= h as i32 {
                continue;
            }
            let cov = silhouette[sy as usize * w as usize + sx as usize];
            if cov <= 0.0 {
                continue;
            }
            let under = dst.get_pixel(dx as u32, dy as u32).0;
            let over = [sr, sg, sb, (cov * 255.0).round().min(255.0) as u8];
            let blended = blend_over(under, over, shadow_alpha);
            dst.put_pixel(dx as u32, dy as u32, Rgba(blended));
        }
    }
}

/// Three box-blur passes over a single-channel coverage buffer (the same
/// Gaussian approximation the mask feather uses).
fn blur_coverage(cov: &[f32], w: u32, h: u32, radius: i32) -> Vec<f32> {
    let window = (2 * radius + 1) as f32;
    let mut current = cov.to_vec();
    for _ in 0..3 {
        // Horizontal.
        let mut next = vec![0.0f32; current.len()];
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                let mut sum = 0.0;
                for dx in -radius..=radius {
                    let sx = (x + dx).clamp(0, w as i32 - 1);
                    sum += current[y as usize * w as usize + sx as usize];
                }
                next[y as usize * w as usize + x as usize] = sum / window;
            }
        }
        // Vertical.
        let mut out = vec![0.0f32; next.len()];
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                let mut sum = 0.0;
                for dy in -radius..=radius {
                    let sy = (y + dy).clamp(0, h as i32 - 1);
                    sum += next[sy as usize * w as usize + x as usize];
                }
                out[y as usize * w as usize + x as usize] = sum / window;
            }
        }
        current = out;
    }
    current
}

/// Bilinear sample against a transparent border. `None` when the sample
/// point is entirely outside the source.
fn bilinear_sample(src: &RgbaImage, x: f32, y: f32) -> Option<[u8; 4]> {
    let src_w = src.width() as i32;
    let src_h = src.height() as i32;
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    if x0 < -1 || y0 < -1 || x0 >= src_w || y0 >= src_h {
        return None;
    }
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let sample = |sx: i32, sy: i32| -> [f32; 4] {
        if sx < 0 || sy < 0 || sx >= src_w || sy >= src_h {
            [0.0; 4]
        } else {
            let p = src.get_pixel(sx as u32, sy as u32);
            [p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32]
        }
    };

    let tl = sample(x0, y0);
    let tr = sample(x0 + 1, y0);
    let bl = sample(x0, y0 + 1);
    let br = sample(x0 + 1, y0 + 1);

    let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = lerp(tl[c], tr[c], fx);
        let bot = lerp(bl[c], br[c], fx);
        out[c] = lerp(top, bot, fy).round().clamp(0.0, 255.0) as u8;
    }
    Some(out)
}

/// Source-over blend of `over` (scaled by `alpha`) onto `under`, straight
/// alpha.
fn blend_over(under: [u8; 4], over: [u8; 4], alpha: f32) -> [u8; 4] {
    let oa = over[3] as f32 / 255.0 * alpha;
    if oa <= 0.0 {
        return under;
    }
    let ua = under[3] as f32 / 255.0;
    let out_a = oa + ua * (1.0 - oa);
    if out_a <= 0.0 {
        return [0, 0, 0, 0];
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let o = over[c] as f32;
        let u = under[c] as f32;
        out[c] = (((o * oa) + u * ua * (1.0 - oa)) / out_a)
            .round()
            .clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    out
}
