//! Layer pick tool: click a point to make the topmost visible layer under
//! it active. Stateless — a click either resolves to a layer or does
//! nothing.

use super::{PointerInput, ToolEvent};
use crate::project::ProjectState;

#[derive(Default)]
pub struct PickTool;

impl PickTool {
    pub fn new() -> Self {
        Self
    }

    pub fn pointer_down(&mut self, input: PointerInput, project: &ProjectState) -> Vec<ToolEvent> {
        // Layer order is z-order, index 0 topmost.
        for layer in &project.metadata.layers {
            if !layer.visible {
                continue;
            }
            let local = layer.transform.apply_inverse(input.pos);
            if local.x >= 0.0
                && local.y >= 0.0
                && local.x < layer.width as f32
                && local.y < layer.height as f32
            {
                return vec![ToolEvent::SetActiveLayer(layer.id)];
            }
        }
        Vec::new()
    }
}
