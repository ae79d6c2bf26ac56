//! Text-box resize: drag the frame handles of a text layer to change its
//! wrap box. Unlike free transform this edits the layer's pixel dimensions
//! (the text re-wraps and re-rasterizes), never its scale. Text boxes keep a
//! usable minimum size.

use egui::{Pos2, Rect};
use uuid::Uuid;

use super::{HANDLE_GRAB_RADIUS, PointerInput, ToolEvent};
use crate::geom::{Handle, hit_handle, resize_rect};
use crate::history::{Command, LayerGeometry};
use crate::project::ProjectState;
use crate::transform::Transform;

#[derive(Debug, Clone, Copy)]
enum TextResizeState {
    Idle,
    Resizing {
        layer: Uuid,
        start: Transform,
        start_size: (u32, u32),
        min_size: (u32, u32),
        handle: Handle,
        grab_frame: Pos2,
    },
}

pub struct TextResizeTool {
    state: TextResizeState,
}

impl Default for TextResizeTool {
    fn default() -> Self {
        Self::new()
    }
}

impl TextResizeTool {
    pub fn new() -> Self {
        Self {
            state: TextResizeState::Idle,
        }
    }

    pub fn pointer_down(&mut self, input: PointerInput, project: &ProjectState) -> Vec<ToolEvent> {
        if let Some(reason) = project.transform_block_reason() {
            return vec![ToolEvent::Warning(reason.to_string())];
        }
        let Some(layer) = project.active() else {
            return Vec::new();
        };
        if !layer.is_text() {
            return vec![ToolEvent::Warning("Not a text layer".to_string())];
        }

        let start = layer.transform;
        let frame_pos = frame_point(&start, input.pos);
        let rect = Rect::from_two_pos(
            Pos2::ZERO,
            Pos2::new(
                layer.width as f32 * start.scale_x,
                layer.height as f32 * start.scale_y,
            ),
        );
        match hit_handle(rect, frame_pos, HANDLE_GRAB_RADIUS) {
            Some(handle) if handle != Handle::Body => {
                self.state = TextResizeState::Resizing {
                    layer: layer.id,
                    start,
                    start_size: (layer.width, layer.height),
                    min_size: layer.min_size(),
                    handle,
                    grab_frame: frame_pos,
                };
            }
            _ => {}
        }
        Vec::new()
    }

    pub fn pointer_move(&mut self, input: PointerInput, project: &mut ProjectState) -> Vec<ToolEvent> {
        let TextResizeState::Resizing {
            layer,
            start,
            start_size,
            min_size,
            handle,
            grab_frame,
        } = self.state
        else {
            return Vec::new();
        };

        let (w, h) = (start_size.0 as f32, start_size.1 as f32);
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

        let width = ((rect.width() / start.scale_x.abs()).round() as u32).max(min_size.0);
        let height = ((rect.height() / start.scale_y.abs()).round() as u32).max(min_size.1);
        let origin = Pos2::new(
            if start.scale_x >= 0.0 { rect.min.x } else { rect.max.x },
            if start.scale_y >= 0.0 { rect.min.y } else { rect.max.y },
        );
        let (s, c) = start.rotation_degrees.to_radians().sin_cos();
        if let Some(l) = project.layer_mut(layer) {
            l.width = width;
            l.height = height;
            l.transform = Transform {
                translate_x: start.translate_x + c * origin.x - s * origin.y,
                translate_y: start.translate_y + s * origin.x + c * origin.y,
                ..start
            }
            .rounded();
        }
        Vec::new()
    }

    pub fn pointer_up(&mut self, input: PointerInput, project: &mut ProjectState) -> Vec<ToolEvent> {
        self.pointer_move(input, project);
        let TextResizeState::Resizing {
            layer,
            start,
            start_size,
            ..
        } = std::mem::replace(&mut self.state, TextResizeState::Idle)
        else {
            return Vec::new();
        };
        let Some(l) = project.layer(layer) else {
            return Vec::new();
        };
        let before = LayerGeometry {
            width: start_size.0,
            height: start_size.1,
            transform: start,
        };
        let after = LayerGeometry::of(l);
        if before == after {
            return Vec::new();
        }
        vec![ToolEvent::Commit(Command::TextResize {
            layer,
            before,
            after,
        })]
    }

    pub fn cancel(&mut self, project: &mut ProjectState) {
        if let TextResizeState::Resizing {
            layer,
            start,
            start_size,
            ..
        } = std::mem::replace(&mut self.state, TextResizeState::Idle)
        {
            if let Some(l) = project.layer_mut(layer) {
                l.width = start_size.0;
                l.height = start_size.1;
                l.transform = start;
            }
        }
    }
}

fn frame_point(t: &Transform, p: Pos2) -> Pos2 {
    let (s, c) = t.rotation_degrees.to_radians().sin_cos();
    let dx = p.x - t.translate_x;
    let dy = p.y - t.translate_y;
    Pos2::new(c * dx + s * dy, -s * dx + c * dy)
}
