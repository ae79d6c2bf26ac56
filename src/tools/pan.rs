//! Pan tool: translates the viewport, never the document. Emits deltas for
//! the host to apply to its view offset.

use egui::Pos2;

use super::{PointerInput, ToolEvent};

#[derive(Debug, Clone, Copy)]
enum PanState {
    Idle,
    Panning { last: Pos2 },
}

pub struct PanTool {
    state: PanState,
}

impl Default for PanTool {
    fn default() -> Self {
        Self::new()
    }
}

impl PanTool {
    pub fn new() -> Self {
        Self {
            state: PanState::Idle,
        }
    }

    pub fn pointer_down(&mut self, input: PointerInput) -> Vec<ToolEvent> {
        self.state = PanState::Panning { last: input.pos };
        Vec::new()
    }

    pub fn pointer_move(&mut self, input: PointerInput) -> Vec<ToolEvent> {
        let PanState::Panning { last } = &mut self.state else {
            return Vec::new();
        };
        let delta = input.pos - *last;
        *last = input.pos;
        if delta == egui::Vec2::ZERO {
            return Vec::new();
        }
        vec![ToolEvent::Pan(delta)]
    }

    pub fn pointer_up(&mut self, input: PointerInput) -> Vec<ToolEvent> {
        let events = self.pointer_move(input);
        self.state = PanState::Idle;
        events
    }

    pub fn cancel(&mut self) {
        self.state = PanState::Idle;
    }
}
