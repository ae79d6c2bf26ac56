//! Free transform: one tool that scales, moves, and rotates the active
//! layer. A drag on a handle scales, a drag on the body moves, a drag
//! outside the frame rotates about the layer centre. The layer updates live;
//! release commits a single [`Command::SetTransform`].
//!
//! Handle geometry works in "frame space": world coordinates with the
//! layer's rotation and translation undone, where the layer spans the
//! axis-aligned rect from the origin to `(w·sx, h·sy)`. Pointer deltas
//! rotated into that space feed the shared [`resize_rect`] policy, and the
//! resulting rect maps back to a scale plus a translation.

use egui::{Pos2, Rect};
use uuid::Uuid;

use super::{HANDLE_GRAB_RADIUS, PointerInput, ToolEvent};
use crate::geom::{Handle, hit_handle, resize_rect};
use crate::history::Command;
use crate::project::{Layer, ProjectState};
use crate::transform::{Transform, snap_rotation};

#[derive(Debug, Clone, Copy)]
enum FreeState {
    Idle,
    Moving {
        layer: Uuid,
        start: Transform,
        start_pos: Pos2,
    },
    Resizing {
        layer: Uuid,
        start: Transform,
        layer_size: (u32, u32),
        min_size: (u32, u32),
        handle: Handle,
        grab_frame: Pos2,
    },
    Rotating {
        layer: Uuid,
        start: Transform,
        pivot_local: Pos2,
        grab_angle: f32,
    },
}

pub struct FreeTransformTool {
    state: FreeState,
    /// Rotation pivot in layer-local coordinates; the layer centre when unset.
    pivot: Option<Pos2>,
}

impl Default for FreeTransformTool {
    fn default() -> Self {
        Self::new()
    }
}

impl FreeTransformTool {
    pub fn new() -> Self {
        Self {
            state: FreeState::Idle,
            pivot: None,
        }
    }

    /// Move the rotation pivot to a world-space point (snapped into the
    /// active layer's local space). Persists across gestures until cleared.
    pub fn set_pivot_world(&mut self, pos: Pos2, project: &ProjectState) {
        if let Some(layer) = project.active() {
            self.pivot = Some(layer.transform.apply_inverse(pos));
        }
    }

    pub fn clear_pivot(&mut self) {
        self.pivot = None;
    }

    pub fn pointer_down(&mut self, input: PointerInput, project: &ProjectState) -> Vec<ToolEvent> {
        if let Some(reason) = project.transform_block_reason() {
            return vec![ToolEvent::Warning(reason.to_string())];
        }
        let Some(layer) = project.active() else {
            return Vec::new();
        };
        let start = layer.transform;
        let frame_pos = frame_point(&start, input.pos);

        match hit_handle(frame_rect(layer), frame_pos, HANDLE_GRAB_RADIUS) {
            Some(Handle::Body) => {
                self.state = FreeState::Moving {
                    layer: layer.id,
                    start,
                    start_pos: input.pos,
                };
            }
            Some(handle) => {
                self.state = FreeState::Resizing {
                    layer: layer.id,
                    start,
                    layer_size: (layer.width, layer.height),
                    min_size: layer.min_size(),
                    handle,
                    grab_frame: frame_pos,
                };
            }
            None => {
                let pivot_local = self.pivot.unwrap_or_else(|| {
                    Pos2::new(layer.width as f32 / 2.0, layer.height as f32 / 2.0)
                });
                let pivot_world = start.apply(pivot_local);
                let v = input.pos - pivot_world;
                self.state = FreeState::Rotating {
                    layer: layer.id,
                    start,
                    pivot_local,
                    grab_angle: v.y.atan2(v.x).to_degrees(),
                };
            }
        }
        Vec::new()
    }

    pub fn pointer_move(&mut self, input: PointerInput, project: &mut ProjectState) -> Vec<ToolEvent> {
        match self.state {
            FreeState::Idle => {}
            FreeState::Moving {
                layer,
                start,
                start_pos,
            } => {
                let delta = input.pos - start_pos;
                if let Some(l) = project.layer_mut(layer) {
                    l.transform = Transform {
                        translate_x: start.translate_x + delta.x,
                        translate_y: start.translate_y + delta.y,
                        ..start
                    }
                    .rounded();
                }
            }
            FreeState::Resizing {
                layer,
                start,
                layer_size,
                min_size,
                handle,
                grab_frame,
            } => {
                let (w, h) = (layer_size.0 as f32, layer_size.1 as f32);
                let rect0 = Rect::from_two_pos(
                    Pos2::ZERO,
                    Pos2::new(w * start.scale_x, h * start.scale_y),
                );
                let delta = frame_point(&start, input.pos) - grab_frame;
                let rect = resize_rect(
                    rect0,
                    handle,
                    delta,
                    input.modifiers.shift,
                    min_size.0 as f32 * start.scale_x.abs(),
                    min_size.1 as f32 * start.scale_y.abs(),
                );

                let scale_x = rect.width() / w * start.scale_x.signum();
                let scale_y = rect.height() / h * start.scale_y.signum();
                // Frame position of the local origin: the min corner for a
                // positive scale, the max corner for a flipped axis.
                let origin = Pos2::new(
                    if start.scale_x >= 0.0 { rect.min.x } else { rect.max.x },
                    if start.scale_y >= 0.0 { rect.min.y } else { rect.max.y },
                );
                let (s, c) = start.rotation_degrees.to_radians().sin_cos();
                if let Some(l) = project.layer_mut(layer) {
                    l.transform = Transform {
                        translate_x: start.translate_x + c * origin.x - s * origin.y,
                        translate_y: start.translate_y + s * origin.x + c * origin.y,
                        scale_x,
                        scale_y,
                        rotation_degrees: start.rotation_degrees,
                    }
                    .rounded();
                }
            }
            FreeState::Rotating {
                layer,
                start,
                pivot_local,
                grab_angle,
            } => {
                let pivot_world = start.apply(pivot_local);
                let v = input.pos - pivot_world;
                let mut degrees =
                    start.rotation_degrees + v.y.atan2(v.x).to_degrees() - grab_angle;
                if project.metadata.settings.rotation_snap || input.modifiers.shift {
                    degrees = snap_rotation(degrees);
                }
                if let Some(l) = project.layer_mut(layer) {
                    l.transform = start.with_rotation_about(pivot_local, degrees).rounded();
                }
            }
        }
        Vec::new()
    }

    pub fn pointer_up(&mut self, input: PointerInput, project: &mut ProjectState) -> Vec<ToolEvent> {
        self.pointer_move(input, project);
        let state = std::mem::replace(&mut self.state, FreeState::Idle);
        let (layer, start) = match state {
            FreeState::Idle => return Vec::new(),
            FreeState::Moving { layer, start, .. }
            | FreeState::Resizing { layer, start, .. }
            | FreeState::Rotating { layer, start, .. } => (layer, start),
        };
        let Some(l) = project.layer(layer) else {
            return Vec::new();
        };
        if l.transform == start {
            return Vec::new();
        }
        vec![ToolEvent::Commit(Command::SetTransform {
            layer,
            before: start,
            after: l.transform,
        })]
    }

    /// Revert the live preview to the placement at pointer-down.
    pub fn cancel(&mut self, project: &mut ProjectState) {
        let state = std::mem::replace(&mut self.state, FreeState::Idle);
        let (layer, start) = match state {
            FreeState::Idle => return,
            FreeState::Moving { layer, start, .. }
            | FreeState::Resizing { layer, start, .. }
            | FreeState::Rotating { layer, start, .. } => (layer, start),
        };
        if let Some(l) = project.layer_mut(layer) {
            l.transform = start;
        }
    }
}

/// World point with the layer's rotation and translation undone.
fn frame_point(t: &Transform, p: Pos2) -> Pos2 {
    let (s, c) = t.rotation_degrees.to_radians().sin_cos();
    let dx = p.x - t.translate_x;
    let dy = p.y - t.translate_y;
    Pos2::new(c * dx + s * dy, -s * dx + c * dy)
}

/// The layer's footprint in frame space (normalized for flipped axes).
fn frame_rect(layer: &Layer) -> Rect {
    Rect::from_two_pos(
        Pos2::ZERO,
        Pos2::new(
            layer.width as f32 * layer.transform.scale_x,
            layer.height as f32 * layer.transform.scale_y,
        ),
    )
}
