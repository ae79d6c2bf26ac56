//! Move tool: drag the active layer by its translation. The layer follows
//! the pointer live; release commits a single transform edit.

use egui::Pos2;
use uuid::Uuid;

use super::{PointerInput, ToolEvent};
use crate::history::Command;
use crate::project::ProjectState;
use crate::transform::Transform;

#[derive(Debug, Clone, Copy)]
enum MoveState {
    Idle,
    Dragging {
        layer: Uuid,
        start: Transform,
        start_pos: Pos2,
    },
}

pub struct MoveTool {
    state: MoveState,
}

impl Default for MoveTool {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveTool {
    pub fn new() -> Self {
        Self {
            state: MoveState::Idle,
        }
    }

    pub fn pointer_down(&mut self, input: PointerInput, project: &ProjectState) -> Vec<ToolEvent> {
        if let Some(reason) = project.transform_block_reason() {
            return vec![ToolEvent::Warning(reason.to_string())];
        }
        let Some(layer) = project.active() else {
            return Vec::new();
        };
        self.state = MoveState::Dragging {
            layer: layer.id,
            start: layer.transform,
            start_pos: input.pos,
        };
        Vec::new()
    }

    pub fn pointer_move(&mut self, input: PointerInput, project: &mut ProjectState) -> Vec<ToolEvent> {
        let MoveState::Dragging {
            layer,
            start,
            start_pos,
        } = self.state
        else {
            return Vec::new();
        };
        let delta = input.pos - start_pos;
        if let Some(l) = project.layer_mut(layer) {
            l.transform = Transform {
                translate_x: start.translate_x + delta.x,
                translate_y: start.translate_y + delta.y,
                ..start
            }
            .rounded();
        }
        Vec::new()
    }

    pub fn pointer_up(&mut self, input: PointerInput, project: &mut ProjectState) -> Vec<ToolEvent> {
        self.pointer_move(input, project);
        let MoveState::Dragging { layer, start, .. } =
            std::mem::replace(&mut self.state, MoveState::Idle)
        else {
            return Vec::new();
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

    /// Put the layer back where the drag started.
    pub fn cancel(&mut self, project: &mut ProjectState) {
        if let MoveState::Dragging { layer, start, .. } =
            std::mem::replace(&mut self.state, MoveState::Idle)
        {
            if let Some(l) = project.layer_mut(layer) {
                l.transform = start;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::History;

    fn project() -> ProjectState {
        ProjectState::new("move-test", 64, 64)
    }

    #[test]
    fn drag_translates_and_commits() {
        let mut p = project();
        let id = p.metadata.layers[0].id;
        let mut tool = MoveTool::new();

        tool.pointer_down(PointerInput::at(10.0, 10.0), &p);
        tool.pointer_move(PointerInput::at(14.0, 12.0), &mut p);
        assert_eq!(p.layer(id).unwrap().transform.translate_x, 4.0);

        let events = tool.pointer_up(PointerInput::at(25.5, 13.25), &mut p);
        let t = p.layer(id).unwrap().transform;
        assert_eq!((t.translate_x, t.translate_y), (15.5, 3.25));

        assert_eq!(
            events,
            vec![ToolEvent::Commit(Command::SetTransform {
                layer: id,
                before: Transform::IDENTITY,
                after: t,
            })]
        );
    }

    #[test]
    fn committed_move_undoes_cleanly() {
        let mut p = project();
        let id = p.metadata.layers[0].id;
        let mut history = History::default();
        let mut tool = MoveTool::new();

        tool.pointer_down(PointerInput::at(0.0, 0.0), &p);
        let events = tool.pointer_up(PointerInput::at(30.0, -7.0), &mut p);
        let ToolEvent::Commit(cmd) = events.into_iter().next().unwrap() else {
            panic!();
        };
        history.push(cmd, &mut p);

        history.undo(&mut p);
        assert_eq!(p.layer(id).unwrap().transform, Transform::IDENTITY);
        history.redo(&mut p);
        assert_eq!(p.layer(id).unwrap().transform.translate_x, 30.0);
    }

    #[test]
    fn zero_delta_release_commits_nothing() {
        let mut p = project();
        let mut tool = MoveTool::new();
        tool.pointer_down(PointerInput::at(5.0, 5.0), &p);
        assert!(tool.pointer_up(PointerInput::at(5.0, 5.0), &mut p).is_empty());
    }

    #[test]
    fn cancel_restores_start_placement() {
        let mut p = project();
        let id = p.metadata.layers[0].id;
        let mut tool = MoveTool::new();
        tool.pointer_down(PointerInput::at(0.0, 0.0), &p);
        tool.pointer_move(PointerInput::at(50.0, 50.0), &mut p);
        tool.cancel(&mut p);
        assert_eq!(p.layer(id).unwrap().transform, Transform::IDENTITY);
    }

    #[test]
    fn locked_layer_warns() {
        let mut p = project();
        let id = p.metadata.layers[0].id;
        p.layer_mut(id).unwrap().locked = true;
        let mut tool = MoveTool::new();
        assert_eq!(
            tool.pointer_down(PointerInput::at(0.0, 0.0), &p),
            vec![ToolEvent::Warning("Layer is locked".into())]
        );
    }
}
