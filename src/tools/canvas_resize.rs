//! Canvas resize: drag handles on the canvas boundary to grow or shrink the
//! document. Layers keep their world positions relative to the new origin;
//! pixels are never resampled. The canvas-sized selection mask is dropped by
//! the commit and restored on undo.

use egui::{Pos2, Rect, Vec2};

use super::{HANDLE_GRAB_RADIUS, PointerInput, ToolEvent};
use crate::geom::{Handle, hit_handle, resize_rect};
use crate::history::{CanvasGeometry, Command};
use crate::project::ProjectState;

#[derive(Debug, Clone, Copy)]
enum ResizeState {
    Idle,
    Dragging {
        handle: Handle,
        grab: Pos2,
        start_rect: Rect,
    },
}

/// Created per gesture from the current canvas; the working rect starts as
/// `(0, 0)..(width, height)` in canvas coordinates.
pub struct CanvasResizeTool {
    rect: Rect,
    original: Rect,
    state: ResizeState,
}

impl CanvasResizeTool {
    pub fn new(project: &ProjectState) -> Self {
        let rect = Rect::from_min_size(
            Pos2::ZERO,
            Vec2::new(project.width() as f32, project.height() as f32),
        );
        Self {
            rect,
            original: rect,
            state: ResizeState::Idle,
        }
    }

    pub fn pointer_down(&mut self, input: PointerInput) -> Vec<ToolEvent> {
        // The body does not drag: moving the whole canvas is meaningless.
        match hit_handle(self.rect, input.pos, HANDLE_GRAB_RADIUS) {
            Some(handle) if handle != Handle::Body => {
                self.state = ResizeState::Dragging {
                    handle,
                    grab: input.pos,
                    start_rect: self.rect,
                };
            }
            _ => {}
        }
        Vec::new()
    }

    pub fn pointer_move(&mut self, input: PointerInput) -> Vec<ToolEvent> {
        if let ResizeState::Dragging {
            handle,
            grab,
            start_rect,
        } = self.state
        {
            self.rect = resize_rect(
                start_rect,
                handle,
                input.pos - grab,
                input.modifiers.shift,
                1.0,
                1.0,
            );
        }
        Vec::new()
    }

    pub fn pointer_up(&mut self, input: PointerInput) -> Vec<ToolEvent> {
        self.pointer_move(input);
        self.state = ResizeState::Idle;
        Vec::new()
    }

    /// Build the resize command for the adjusted rect. Growing past the old
    /// top/left edge shifts every layer so world content stays put.
    pub fn commit(&mut self, project: &ProjectState) -> Vec<ToolEvent> {
        let rect = self.rect;
        self.rect = self.original;
        self.state = ResizeState::Idle;
        if rect == self.original {
            return Vec::new();
        }

        let width = (rect.width().round() as i64).max(1) as u32;
        let height = (rect.height().round() as i64).max(1) as u32;
        let shift = Vec2::new(-rect.min.x.round(), -rect.min.y.round());

        let after = CanvasGeometry {
            width,
            height,
            layer_transforms: project
                .metadata
                .layers
                .iter()
                .map(|l| {
                    let mut t = l.transform;
                    t.translate_x += shift.x;
                    t.translate_y += shift.y;
                    (l.id, t)
                })
                .collect(),
        };
        vec![ToolEvent::Commit(Command::ResizeCanvas {
            before: CanvasGeometry::of(project),
            after,
            before_selection: project.selection.clone(),
        })]
    }

    pub fn cancel(&mut self) {
        self.rect = self.original;
        self.state = ResizeState::Idle;
    }

    pub fn preview_rect(&self) -> Rect {
        self.rect
    }
}
