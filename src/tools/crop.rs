//! Crop tool: draw a rectangle over the canvas, optionally adjust it by its
//! handles, then apply. The crop bakes the layer's current transform into
//! pixels — the cropped buffer is cut from the layer as rendered, and the
//! placement resets to a plain translation at the crop origin.

use egui::{Pos2, Rect};

use super::{HANDLE_GRAB_RADIUS, PointerInput, ToolEvent};
use crate::compositor;
use crate::geom::{Handle, hit_handle, rect_to_pixels, resize_rect};
use crate::history::{Command, LayerGeometry};
use crate::project::ProjectState;
use crate::text::FontStore;
use crate::transform::Transform;

#[derive(Debug, Clone, Copy)]
enum CropState {
    Idle,
    Drawing {
        start: Pos2,
        current: Pos2,
    },
    /// Rect placed; handles adjust it until the host applies or cancels.
    Adjusting {
        rect: Rect,
        drag: Option<(Handle, Pos2, Rect)>,
    },
}

pub struct CropTool {
    state: CropState,
}

impl Default for CropTool {
    fn default() -> Self {
        Self::new()
    }
}

impl CropTool {
    pub fn new() -> Self {
        Self {
            state: CropState::Idle,
        }
    }

    pub fn pointer_down(&mut self, input: PointerInput, project: &ProjectState) -> Vec<ToolEvent> {
        match self.state {
            CropState::Idle | CropState::Drawing { .. } => {
                if let Some(reason) = project.paint_block_reason() {
                    return vec![ToolEvent::Warning(reason.to_string())];
                }
                self.state = CropState::Drawing {
                    start: input.pos,
                    current: input.pos,
                };
            }
            CropState::Adjusting { rect, .. } => {
                match hit_handle(rect, input.pos, HANDLE_GRAB_RADIUS) {
                    Some(handle) => {
                        self.state = CropState::Adjusting {
                            rect,
                            drag: Some((handle, input.pos, rect)),
                        };
                    }
                    // Clicking away from the rect starts a fresh one.
                    None => {
                        self.state = CropState::Drawing {
                            start: input.pos,
                            current: input.pos,
                        };
                    }
                }
            }
        }
        Vec::new()
    }

    pub fn pointer_move(&mut self, input: PointerInput) -> Vec<ToolEvent> {
        match &mut self.state {
            CropState::Idle => {}
            CropState::Drawing { current, .. } => *current = input.pos,
            CropState::Adjusting { rect, drag } => {
                if let Some((handle, grab, start_rect)) = drag {
                    *rect = resize_rect(
                        *start_rect,
                        *handle,
                        input.pos - *grab,
                        input.modifiers.shift,
                        1.0,
                        1.0,
                    );
                }
            }
        }
        Vec::new()
    }

    pub fn pointer_up(&mut self, input: PointerInput, project: &ProjectState) -> Vec<ToolEvent> {
        self.pointer_move(input);
        match self.state {
            CropState::Idle => {}
            CropState::Drawing { start, current } => {
                let rect = clamp_to_canvas(Rect::from_two_pos(start, current), project);
                self.state = if rect.width() >= 1.0 && rect.height() >= 1.0 {
                    CropState::Adjusting { rect, drag: None }
                } else {
                    CropState::Idle
                };
            }
            CropState::Adjusting { rect, .. } => {
                self.state = CropState::Adjusting {
                    rect: clamp_to_canvas(rect, project),
                    drag: None,
                };
            }
        }
        Vec::new()
    }

    /// Apply the placed rect to the active layer.
    pub fn commit(&mut self, project: &ProjectState, fonts: &FontStore) -> Vec<ToolEvent> {
        let CropState::Adjusting { rect, .. } = self.state else {
            return Vec::new();
        };
        if let Some(reason) = project.paint_block_reason() {
            return vec![ToolEvent::Warning(reason.to_string())];
        }
        let Some(id) = project.active_layer else {
            return Vec::new();
        };
        let (Some(layer), Some(buffer)) = (project.layer(id), project.buffer(id)) else {
            return Vec::new();
        };
        self.state = CropState::Idle;

        let (x, y, w, h) = rect_to_pixels(clamp_to_canvas(rect, project));
        let rendered = compositor::render_layer_alone(project, id, fonts);
        let after_buffer =
            image::imageops::crop_imm(&rendered, x.max(0) as u32, y.max(0) as u32, w, h).to_image();

        vec![ToolEvent::Commit(Command::CropLayer {
            layer: id,
            before: LayerGeometry::of(layer),
            before_buffer: buffer.clone(),
            after: LayerGeometry {
                width: w,
                height: h,
                transform: Transform::from_translation(x as f32, y as f32),
            },
            after_buffer,
        })]
    }

    pub fn cancel(&mut self) {
        self.state = CropState::Idle;
    }

    /// The placed or in-progress rect, for overlay drawing.
    pub fn preview_rect(&self) -> Option<Rect> {
        match self.state {
            CropState::Idle => None,
            CropState::Drawing { start, current } => Some(Rect::from_two_pos(start, current)),
            CropState::Adjusting { rect, .. } => Some(rect),
        }
    }
}

fn clamp_to_canvas(rect: Rect, project: &ProjectState) -> Rect {
    rect.intersect(Rect::from_min_size(
        Pos2::ZERO,
        egui::Vec2::new(project.width() as f32, project.height() as f32),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::History;
    use image::Rgba;

    const RED: [u8; 4] = [255, 0, 0, 255];

    fn project() -> ProjectState {
        let mut p = ProjectState::new("crop-test", 200, 200);
        let id = p.metadata.layers[0].id;
        p.buffer_mut(id).unwrap().put_pixel(25, 25, Rgba(RED));
        p
    }

    fn commit_of(events: Vec<ToolEvent>) -> Command {
        assert_eq!(events.len(), 1, "{events:?}");
        match events.into_iter().next().unwrap() {
            ToolEvent::Commit(cmd) => cmd,
            other => panic!("expected commit, got {other:?}"),
        }
    }

    #[test]
    fn crop_cuts_pixels_and_resets_placement() {
        let mut p = project();
        let id = p.active_layer.unwrap();
        let fonts = FontStore::new();
        let snapshot = p.clone();

        let mut tool = CropTool::new();
        tool.pointer_down(PointerInput::at(20.0, 20.0), &p);
        tool.pointer_move(PointerInput::at(60.0, 60.0));
        tool.pointer_up(PointerInput::at(120.0, 120.0), &p);

        let mut history = History::default();
        history.push(commit_of(tool.commit(&p, &fonts)), &mut p);

        let layer = p.layer(id).unwrap();
        assert_eq!((layer.width, layer.height), (100, 100));
        assert_eq!(layer.transform, Transform::from_translation(20.0, 20.0));
        assert_eq!(p.buffer(id).unwrap().get_pixel(5, 5).0, RED);

        history.undo(&mut p);
        assert_eq!(p, snapshot);
    }

    #[test]
    fn handles_adjust_the_placed_rect() {
        let p = project();
        let fonts = FontStore::new();
        let mut tool = CropTool::new();
        tool.pointer_down(PointerInput::at(20.0, 20.0), &p);
        tool.pointer_up(PointerInput::at(120.0, 120.0), &p);

        // Grab the east edge and widen by 10.
        tool.pointer_down(PointerInput::at(120.0, 70.0), &p);
        tool.pointer_move(PointerInput::at(130.0, 70.0));
        tool.pointer_up(PointerInput::at(130.0, 70.0), &p);

        let Command::CropLayer { after, .. } = commit_of(tool.commit(&p, &fonts)) else {
            panic!();
        };
        assert_eq!((after.width, after.height), (110, 100));
    }

    #[test]
    fn rect_clamps_to_canvas() {
        let p = project();
        let mut tool = CropTool::new();
        tool.pointer_down(PointerInput::at(150.0, 150.0), &p);
        tool.pointer_up(PointerInput::at(400.0, 400.0), &p);
        assert_eq!(
            tool.preview_rect(),
            Some(Rect::from_two_pos(
                Pos2::new(150.0, 150.0),
                Pos2::new(200.0, 200.0)
            ))
        );
    }

    #[test]
    fn degenerate_rect_never_commits() {
        let p = project();
        let fonts = FontStore::new();
        let mut tool = CropTool::new();
        tool.pointer_down(PointerInput::at(50.0, 50.0), &p);
        tool.pointer_up(PointerInput::at(50.3, 50.3), &p);
        assert!(tool.commit(&p, &fonts).is_empty());
    }

    #[test]
    fn crop_bakes_a_translated_transform() {
        let mut p = project();
        let id = p.active_layer.unwrap();
        p.layer_mut(id).unwrap().transform = Transform::from_translation(10.0, 10.0);
        let fonts = FontStore::new();

        // The marker pixel renders at world (35, 35).
        let mut tool = CropTool::new();
        tool.pointer_down(PointerInput::at(30.0, 30.0), &p);
        tool.pointer_up(PointerInput::at(80.0, 80.0), &p);
        let mut history = History::default();
        history.push(commit_of(tool.commit(&p, &fonts)), &mut p);

        assert_eq!(p.buffer(id).unwrap().get_pixel(5, 5).0, RED);
        assert_eq!(
            p.layer(id).unwrap().transform,
            Transform::from_translation(30.0, 30.0)
        );
    }

    #[test]
    fn locked_layer_blocks_the_gesture() {
        let mut p = project();
        let id = p.active_layer.unwrap();
        p.layer_mut(id).unwrap().locked = true;
        let mut tool = CropTool::new();
        assert_eq!(
            tool.pointer_down(PointerInput::at(20.0, 20.0), &p),
            vec![ToolEvent::Warning("Layer is locked".into())]
        );
    }
}
