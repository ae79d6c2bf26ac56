//! Interactive tools: pointer-driven finite state machines that turn drag
//! gestures into committed, undoable commands.
//!
//! Each tool is a plain struct whose state is an explicit enum; transitions
//! are ordinary methods taking a [`PointerInput`] plus access to the project,
//! and return [`ToolEvent`]s instead of touching panels directly. That keeps
//! every gesture testable without a live event loop: feed positions in,
//! assert on the returned events.
//!
//! Only one tool captures pointer input at a time; hosts call `cancel` on
//! the outgoing tool when switching. `cancel` (also the right response to
//! pointer-cancel/pointer-leave) behaves exactly like pointer-up before the
//! commit threshold: transient snapshots are dropped and nothing is pushed.

pub mod brush;
pub mod canvas_resize;
pub mod crop;
pub mod free_transform;
pub mod move_tool;
pub mod pan;
pub mod pick;
pub mod select_shape;
pub mod text_resize;

pub use brush::BrushTool;
pub use canvas_resize::CanvasResizeTool;
pub use crop::CropTool;
pub use free_transform::FreeTransformTool;
pub use move_tool::MoveTool;
pub use pan::PanTool;
pub use pick::PickTool;
pub use select_shape::{FuzzySelectTool, LassoTool, PolygonSelectTool, RectangleSelectTool};
pub use text_resize::TextResizeTool;

use egui::{Modifiers, Pos2, Vec2};
use uuid::Uuid;

use crate::history::Command;
use crate::mask::{SelectionMask, SelectionMode, combine};
use crate::project::ProjectState;

/// Pointer capture radius for rect/transform handles, in canvas units.
pub const HANDLE_GRAB_RADIUS: f32 = 6.0;

/// One pointer callback's worth of input: position in canvas coordinates
/// plus the modifier-key state. Tools never read input outside of what they
/// are handed here.
#[derive(Debug, Clone, Copy)]
pub struct PointerInput {
    pub pos: Pos2,
    pub modifiers: Modifiers,
}

impl PointerInput {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            pos: Pos2::new(x, y),
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// What a tool transition asks of its host.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolEvent {
    /// Non-fatal, user-actionable: the gesture was aborted and no state
    /// changed ("No active layer", "Layer is locked", ...).
    Warning(String),
    /// A finished discrete edit; the host pushes it to history. Tools emit
    /// exactly one commit per completed gesture.
    Commit(Command),
    /// The pick tool chose a new active layer.
    SetActiveLayer(Uuid),
    /// The pan tool moved the viewport by this canvas-space delta.
    Pan(Vec2),
}

/// Selection combine mode implied by the modifier keys held at commit time:
/// no modifiers replace, shift adds, ctrl subtracts, shift+ctrl intersects.
pub fn selection_mode(modifiers: &Modifiers) -> SelectionMode {
    match (modifiers.shift, modifiers.ctrl) {
        (false, false) => SelectionMode::Replace,
        (true, false) => SelectionMode::Add,
        (false, true) => SelectionMode::Subtract,
        (true, true) => SelectionMode::Intersect,
    }
}

/// Fold a tool-produced mask into the project's current selection and build
/// the command for it. A combine that ends all-zero clears the selection.
pub(crate) fn selection_commit(
    project: &ProjectState,
    incoming: SelectionMask,
    mode: SelectionMode,
) -> Command {
    let existing = project
        .selection
        .clone()
        .unwrap_or_else(|| SelectionMask::empty(project.width(), project.height()));
    let combined = combine(&existing, &incoming, mode);
    let after = if combined.is_empty() {
        None
    } else {
        Some(combined)
    };
    Command::SetSelection {
        before: project.selection.clone(),
        after,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_mapping_matches_convention() {
        let none = Modifiers::NONE;
        let shift = Modifiers {
            shift: true,
            ..Modifiers::NONE
        };
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        };
        let both = Modifiers {
            shift: true,
            ctrl: true,
            ..Modifiers::NONE
        };
        assert_eq!(selection_mode(&none), SelectionMode::Replace);
        assert_eq!(selection_mode(&shift), SelectionMode::Add);
        assert_eq!(selection_mode(&ctrl), SelectionMode::Subtract);
        assert_eq!(selection_mode(&both), SelectionMode::Intersect);
    }
}
