//! Brush and eraser strokes. Pixels change live while the pointer is down;
//! on release the touched region is committed as a [`Command::PaintStroke`]
//! so undo stores patches instead of whole buffers.

use egui::Pos2;
use image::RgbaImage;
use uuid::Uuid;

use super::{PointerInput, ToolEvent};
use crate::history::{Command, PixelPatch};
use crate::mask::SelectionMask;
use crate::project::{Layer, ProjectState};

#[derive(Debug)]
enum BrushState {
    Idle,
    Stroking {
        layer: Uuid,
        /// Buffer as it was at pointer-down, for the undo patch and cancel.
        before: RgbaImage,
        /// Last stamp position, in layer-local pixels.
        last: Pos2,
        /// Touched region, exclusive max. Invalid until `dirty`.
        min_x: u32,
        min_y: u32,
        max_x: u32,
        max_y: u32,
        dirty: bool,
    },
}

/// Round soft-edged brush. `radius` is in layer pixels; strokes respect the
/// active selection mask (partial mask values scale stamp coverage).
pub struct BrushTool {
    pub radius: f32,
    pub color: [u8; 4],
    pub erase: bool,
    state: BrushState,
}

impl BrushTool {
    pub fn new(radius: f32, color: [u8; 4]) -> Self {
        Self {
            radius,
            color,
            erase: false,
            state: BrushState::Idle,
        }
    }

    pub fn eraser(radius: f32) -> Self {
        Self {
            erase: true,
            ..Self::new(radius, [0, 0, 0, 255])
        }
    }

    pub fn pointer_down(&mut self, input: PointerInput, project: &mut ProjectState) -> Vec<ToolEvent> {
        if let Some(reason) = project.paint_block_reason() {
            return vec![ToolEvent::Warning(reason.to_string())];
        }
        // paint_block_reason guarantees an active, unlocked raster layer.
        let Some(id) = project.active_layer else {
            return Vec::new();
        };
        let (Some(before), Some(layer)) = (project.buffer(id).cloned(), project.layer(id).cloned())
        else {
            return Vec::new();
        };
        let local = layer.transform.apply_inverse(input.pos);
        self.state = BrushState::Stroking {
            layer: id,
            before,
            last: local,
            min_x: 0,
            min_y: 0,
            max_x: 0,
            max_y: 0,
            dirty: false,
        };
        self.stamp_at(project, &layer, local);
        Vec::new()
    }

    pub fn pointer_move(&mut self, input: PointerInput, project: &mut ProjectState) -> Vec<ToolEvent> {
        let BrushState::Stroking { layer, last, .. } = &self.state else {
            return Vec::new();
        };
        let Some(layer) = project.layer(*layer).cloned() else {
            self.state = BrushState::Idle;
            return Vec::new();
        };

        let from = *last;
        let to = layer.transform.apply_inverse(input.pos);
        let dist = (to - from).length();
        // Stamp along the segment at half-pixel spacing so fast pointer moves
        // still leave a continuous stroke.
        let steps = (dist * 2.0).ceil().max(1.0) as u32;
        for i in 1..=steps {
            let t = i as f32 / steps as f32;
            self.stamp_at(project, &layer, from + (to - from) * t);
        }
        if let BrushState::Stroking { last, .. } = &mut self.state {
            *last = to;
        }
        Vec::new()
    }

    pub fn pointer_up(&mut self, _input: PointerInput, project: &ProjectState) -> Vec<ToolEvent> {
        let BrushState::Stroking {
            layer,
            before,
            min_x,
            min_y,
            max_x,
            max_y,
            dirty,
            ..
        } = std::mem::replace(&mut self.state, BrushState::Idle)
        else {
            return Vec::new();
        };
        if !dirty {
            return Vec::new();
        }
        let Some(current) = project.buffer(layer) else {
            return Vec::new();
        };

        let before = PixelPatch::capture(layer, &before, min_x, min_y, max_x, max_y);
        let after = PixelPatch::capture(layer, current, min_x, min_y, max_x, max_y);
        vec![ToolEvent::Commit(Command::PaintStroke {
            erase: self.erase,
            before,
            after,
        })]
    }

    /// Discard the stroke and restore the pre-stroke pixels.
    pub fn cancel(&mut self, project: &mut ProjectState) {
        if let BrushState::Stroking { layer, before, .. } =
            std::mem::replace(&mut self.state, BrushState::Idle)
        {
            if let Some(buffer) = project.buffer_mut(layer) {
                *buffer = before;
            }
        }
    }

    /// Blend one circular stamp centred at `center` (layer-local pixels) into
    /// the layer's buffer, clipped by the selection mask.
    fn stamp_at(&mut self, project: &mut ProjectState, layer: &Layer, center: Pos2) {
        let canvas_w = project.metadata.width;
        let canvas_h = project.metadata.height;
        let selection = &project.selection;
        let Some(buffer) = project.buffers.get_mut(&layer.id) else {
            return;
        };

        let r = self.radius.max(0.5);
        let x0 = ((center.x - r - 1.0).floor().max(0.0)) as u32;
        let y0 = ((center.y - r - 1.0).floor().max(0.0)) as u32;
        let x1 = (((center.x + r + 1.0).ceil() as i64).clamp(0, buffer.width() as i64)) as u32;
        let y1 = (((center.y + r + 1.0).ceil() as i64).clamp(0, buffer.height() as i64)) as u32;

        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as f32 + 0.5 - center.x;
                let dy = y as f32 + 0.5 - center.y;
                let dist = (dx * dx + dy * dy).sqrt();
                let mut cov = (r - dist + 0.5).clamp(0.0, 1.0);
                if cov <= 0.0 {
                    continue;
                }
                cov *= clip_factor(
                    selection.as_ref(),
                    layer,
                    Pos2::new(x as f32 + 0.5, y as f32 + 0.5),
                    canvas_w,
                    canvas_h,
                );
                if cov <= 0.0 {
                    continue;
                }

                let px = buffer.get_pixel_mut(x, y);
                if self.erase {
                    px.0[3] = (px.0[3] as f32 * (1.0 - cov)).round() as u8;
                } else {
                    let sa = self.color[3] as f32 / 255.0 * cov;
                    let da = px.0[3] as f32 / 255.0;
                    let oa = sa + da * (1.0 - sa);
                    if oa > 0.0 {
                        for c in 0..3 {
                            let s = self.color[c] as f32;
                            let d = px.0[c] as f32;
                            px.0[c] = ((s * sa + d * da * (1.0 - sa)) / oa).round() as u8;
                        }
                    }
                    px.0[3] = (oa * 255.0).round() as u8;
                }

                if let BrushState::Stroking {
                    min_x,
                    min_y,
                    max_x,
                    max_y,
                    dirty,
                    ..
                } = &mut self.state
                {
                    if *dirty {
                        *min_x = (*min_x).min(x);
                        *min_y = (*min_y).min(y);
                        *max_x = (*max_x).max(x + 1);
                        *max_y = (*max_y).max(y + 1);
                    } else {
                        *min_x = x;
                        *min_y = y;
                        *max_x = x + 1;
                        *max_y = y + 1;
                        *dirty = true;
                    }
                }
            }
        }
    }
}

/// Selection clip for a layer-local pixel centre: the mask value at its world
/// position, as a 0–1 factor. No selection means no clipping; positions off
/// the canvas are fully clipped.
fn clip_factor(
    selection: Option<&SelectionMask>,
    layer: &Layer,
    local_center: Pos2,
    canvas_w: u32,
    canvas_h: u32,
) -> f32 {
    let Some(mask) = selection else {
        return 1.0;
    };
    let world = layer.transform.apply(local_center);
    let x = world.x.floor();
    let y = world.y.floor();
    if x < 0.0 || y < 0.0 || x >= canvas_w as f32 || y >= canvas_h as f32 {
        return 0.0;
    }
    mask.get(x as u32, y as u32) as f32 / 255.0
}
