use std::collections::VecDeque;

use image::RgbaImage;
use uuid::Uuid;

use crate::log_warn;
use crate::mask::SelectionMask;
use crate::project::{BasicText, Layer, ProjectState};
use crate::transform::Transform;

// ============================================================================
// SNAPSHOT PAYLOADS
// ============================================================================

/// A rectangular patch of layer pixels, the memory-efficient undo unit for
/// paint strokes.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelPatch {
    pub layer: Uuid,
    pub min_x: u32,
    pub min_y: u32,
    pub width: u32,
    pub height: u32,
    /// RGBA bytes, row-major, `width × height × 4`.
    pub pixels: Vec<u8>,
}

impl PixelPatch {
    /// Capture a region of `buffer`, clamped to its bounds.
    pub fn capture(
        layer: Uuid,
        buffer: &RgbaImage,
        min_x: u32,
        min_y: u32,
        max_x: u32,
        max_y: u32,
    ) -> Self {
        let min_x = min_x.min(buffer.width());
        let min_y = min_y.min(buffer.height());
        let max_x = max_x.min(buffer.width()).max(min_x);
        let max_y = max_y.min(buffer.height()).max(min_y);
        let width = max_x - min_x;
        let height = max_y - min_y;

        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in min_y..max_y {
            for x in min_x..max_x {
                pixels.extend_from_slice(&buffer.get_pixel(x, y).0);
            }
        }
        Self {
            layer,
            min_x,
            min_y,
            width,
            height,
            pixels,
        }
    }

    /// Write the patch back into the layer buffer it was captured from.
    pub fn apply(&self, project: &mut ProjectState) {
        let Some(buffer) = project.buffer_mut(self.layer) else {
            log_warn!("PixelPatch::apply: no buffer for layer {}", self.layer);
            return;
        };
        let mut idx = 0usize;
        for y in 0..self.height {
            for x in 0..self.width {
                let bx = self.min_x + x;
                let by = self.min_y + y;
                if bx < buffer.width() && by < buffer.height() {
                    let px = image::Rgba([
                        self.pixels[idx],
                        self.pixels[idx + 1],
                        self.pixels[idx + 2],
                        self.pixels[idx + 3],
                    ]);
                    buffer.put_pixel(bx, by, px);
                }
                idx += 4;
            }
        }
    }

    pub fn memory_bytes(&self) -> usize {
        self.pixels.len()
    }
}

/// A layer's size and placement, snapshotted around geometry edits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerGeometry {
    pub width: u32,
    pub height: u32,
    pub transform: Transform,
}

impl LayerGeometry {
    pub fn of(layer: &Layer) -> Self {
        Self {
            width: layer.width,
            height: layer.height,
            transform: layer.transform,
        }
    }
}

/// Canvas size plus every layer's placement, snapshotted around canvas
/// resizes (which shift all layers to the new origin).
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasGeometry {
    pub width: u32,
    pub height: u32,
    pub layer_transforms: Vec<(Uuid, Transform)>,
}

impl CanvasGeometry {
    pub fn of(project: &ProjectState) -> Self {
        Self {
            width: project.width(),
            height: project.height(),
            layer_transforms: project
                .metadata
                .layers
                .iter()
                .map(|l| (l.id, l.transform))
                .collect(),
        }
    }

    fn restore_into(&self, project: &mut ProjectState) {
        project.metadata.width = self.width;
        project.metadata.height = self.height;
        for (id, transform) in &self.layer_transforms {
            if let Some(layer) = project.layer_mut(*id) {
                layer.transform = *transform;
            }
        }
    }
}

// ============================================================================
// COMMAND — one reversible edit, dispatched by pattern match
// ============================================================================

/// A reversible edit. Every variant carries its own before/after payload
/// keyed by stable layer IDs, so replaying never depends on live references.
///
/// Contract: `apply` then `revert` restores the exact prior observable state.
/// Neither is reentrant; history never runs one inside the other.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    SetTransform {
        layer: Uuid,
        before: Transform,
        after: Transform,
    },
    /// Text layers re-wrap on size change; only geometry is stored.
    TextResize {
        layer: Uuid,
        before: LayerGeometry,
        after: LayerGeometry,
    },
    /// Crop replaces the buffer and resets the placement, so both sides keep
    /// a full pixel copy for byte-exact undo.
    CropLayer {
        layer: Uuid,
        before: LayerGeometry,
        before_buffer: RgbaImage,
        after: LayerGeometry,
        after_buffer: RgbaImage,
    },
    ResizeCanvas {
        before: CanvasGeometry,
        after: CanvasGeometry,
        /// The selection is canvas-sized, so a resize drops it; undo brings
        /// it back.
        before_selection: Option<SelectionMask>,
    },
    SetSelection {
        before: Option<SelectionMask>,
        after: Option<SelectionMask>,
    },
    PaintStroke {
        erase: bool,
        before: PixelPatch,
        after: PixelPatch,
    },
    AddLayer {
        index: usize,
        layer: Layer,
        buffer: Option<RgbaImage>,
        /// Active layer before the add, restored on undo.
        active_before: Option<Uuid>,
    },
    /// Retains the full layer plus buffer so undo restores it exactly.
    DeleteLayer {
        index: usize,
        layer: Layer,
        buffer: Option<RgbaImage>,
        active_before: Option<Uuid>,
    },
    MoveLayer {
        from: usize,
        to: usize,
    },
    SetOpacity {
        layer: Uuid,
        before: f32,
        after: f32,
    },
    SetVisibility {
        layer: Uuid,
        before: bool,
        after: bool,
    },
    RenameLayer {
        layer: Uuid,
        before: String,
        after: String,
    },
    /// Convert a text layer to raster so pixel tools become legal on it.
    RasterizeText {
        layer: Uuid,
        before_text: BasicText,
        before_size: (u32, u32),
        buffer: RgbaImage,
    },
}

impl Command {
    pub fn apply(&self, project: &mut ProjectState) {
        match self {
            Command::SetTransform { layer, after, .. } => {
                if let Some(l) = project.layer_mut(*layer) {
                    l.transform = *after;
                }
            }
            Command::TextResize { layer, after, .. } => {
                set_geometry(project, *layer, after);
            }
            Command::CropLayer {
                layer,
                after,
                after_buffer,
                ..
            } => {
                set_geometry(project, *layer, after);
                project.buffers.insert(*layer, after_buffer.clone());
            }
            Command::ResizeCanvas { after, .. } => {
                after.restore_into(project);
                project.selection = None;
            }
            Command::SetSelection { after, .. } => {
                project.selection = after.clone();
            }
            Command::PaintStroke { after, .. } => {
                after.apply(project);
            }
            Command::AddLayer {
                index,
                layer,
                buffer,
                ..
            } => {
                project.insert_layer(*index, layer.clone(), buffer.clone());
            }
            Command::DeleteLayer { layer, .. } => {
                project.remove_layer(layer.id);
            }
            Command::MoveLayer { from, to } => {
                move_layer(project, *from, *to);
            }
            Command::SetOpacity { layer, after, .. } => {
                if let Some(l) = project.layer_mut(*layer) {
                    l.opacity = *after;
                }
            }
            Command::SetVisibility { layer, after, .. } => {
                if let Some(l) = project.layer_mut(*layer) {
                    l.visible = *after;
                }
            }
            Command::RenameLayer { layer, after, .. } => {
                if let Some(l) = project.layer_mut(*layer) {
                    l.name = after.clone();
                }
            }
            Command::RasterizeText { layer, buffer, .. } => {
                let (w, h) = (buffer.width(), buffer.height());
                if let Some(l) = project.layer_mut(*layer) {
                    l.basic_text = None;
                    l.width = w;
                    l.height = h;
                }
                project.buffers.insert(*layer, buffer.clone());
            }
        }
    }

    pub fn revert(&self, project: &mut ProjectState) {
        match self {
            Command::SetTransform { layer, before, .. } => {
                if let Some(l) = project.layer_mut(*layer) {
                    l.transform = *before;
                }
            }
            Command::TextResize { layer, before, .. } => {
                set_geometry(project, *layer, before);
            }
            Command::CropLayer {
                layer,
                before,
                before_buffer,
                ..
            } => {
                set_geometry(project, *layer, before);
                project.buffers.insert(*layer, before_buffer.clone());
            }
            Command::ResizeCanvas {
                before,
                before_selection,
                ..
            } => {
                before.restore_into(project);
                project.selection = before_selection.clone();
            }
            Command::SetSelection { before, .. } => {
                project.selection = before.clone();
            }
            Command::PaintStroke { before, .. } => {
                before.apply(project);
            }
            Command::AddLayer {
                layer,
                active_before,
                ..
            } => {
                project.remove_layer(layer.id);
                project.active_layer = *active_before;
            }
            Command::DeleteLayer {
                index,
                layer,
                buffer,
                active_before,
            } => {
                project.insert_layer(*index, layer.clone(), buffer.clone());
                project.active_layer = *active_before;
            }
            Command::MoveLayer { from, to } => {
                move_layer(project, *to, *from);
            }
            Command::SetOpacity { layer, before, .. } => {
                if let Some(l) = project.layer_mut(*layer) {
                    l.opacity = *before;
                }
            }
            Command::SetVisibility { layer, before, .. } => {
                if let Some(l) = project.layer_mut(*layer) {
                    l.visible = *before;
                }
            }
            Command::RenameLayer { layer, before, .. } => {
                if let Some(l) = project.layer_mut(*layer) {
                    l.name = before.clone();
                }
            }
            Command::RasterizeText {
                layer,
                before_text,
                before_size,
                ..
            } => {
                if let Some(l) = project.layer_mut(*layer) {
                    l.basic_text = Some(before_text.clone());
                    l.width = before_size.0;
                    l.height = before_size.1;
                }
                project.buffers.remove(layer);
            }
        }
    }

    pub fn description(&self) -> String {
        match self {
            Command::SetTransform { .. } => "Transform Layer".into(),
            Command::TextResize { .. } => "Resize Text Layer".into(),
            Command::CropLayer { .. } => "Crop Layer".into(),
            Command::ResizeCanvas { after, .. } => {
                format!("Resize Canvas to {}×{}", after.width, after.height)
            }
            Command::SetSelection { after, .. } => {
                if after.is_some() {
                    "Select".into()
                } else {
                    "Deselect".into()
                }
            }
            Command::PaintStroke { erase, .. } => {
                if *erase {
                    "Eraser Stroke".into()
                } else {
                    "Brush Stroke".into()
                }
            }
            Command::AddLayer { layer, .. } => format!("Add Layer: {}", layer.name),
            Command::DeleteLayer { layer, .. } => format!("Delete Layer: {}", layer.name),
            Command::MoveLayer { from, to } => format!("Move Layer {from} → {to}"),
            Command::SetOpacity { after, .. } => format!("Layer Opacity: {after:.0}%"),
            Command::SetVisibility { after, .. } => {
                if *after {
                    "Show Layer".into()
                } else {
                    "Hide Layer".into()
                }
            }
            Command::RenameLayer { before, after, .. } => {
                format!("Rename: {before} → {after}")
            }
            Command::RasterizeText { .. } => "Rasterize Text Layer".into(),
        }
    }

    /// Approximate retained bytes, used by the history memory cap.
    pub fn memory_bytes(&self) -> usize {
        match self {
            Command::CropLayer {
                before_buffer,
                after_buffer,
                ..
            } => before_buffer.as_raw().len() + after_buffer.as_raw().len(),
            Command::ResizeCanvas {
                before_selection, ..
            } => before_selection.as_ref().map_or(0, |m| m.memory_bytes()),
            Command::SetSelection { before, after } => {
                before.as_ref().map_or(0, |m| m.memory_bytes())
                    + after.as_ref().map_or(0, |m| m.memory_bytes())
            }
            Command::PaintStroke { before, after, .. } => {
                before.memory_bytes() + after.memory_bytes()
            }
            Command::AddLayer { buffer, .. } | Command::DeleteLayer { buffer, .. } => {
                buffer.as_ref().map_or(0, |b| b.as_raw().len())
            }
            Command::RasterizeText { buffer, .. } => buffer.as_raw().len(),
            _ => std::mem::size_of::<Command>(),
        }
    }
}

fn set_geometry(project: &mut ProjectState, id: Uuid, geometry: &LayerGeometry) {
    if let Some(l) = project.layer_mut(id) {
        l.width = geometry.width;
        l.height = geometry.height;
        l.transform = geometry.transform;
    }
}

fn move_layer(project: &mut ProjectState, from: usize, to: usize) {
    let layers = &mut project.metadata.layers;
    if layers.is_empty() {
        return;
    }
    // Clamp both ends: an out-of-range destination lands on the last slot,
    // and reverting from that slot must find the layer there again.
    let from = from.min(layers.len() - 1);
    let layer = layers.remove(from);
    layers.insert(to.min(layers.len()), layer);
}

// ============================================================================
// HISTORY — two stacks, count limit, memory cap
// ============================================================================

/// Undo/redo history. Pushing a command applies it and clears the redo
/// stack; branching history is not supported.
pub struct History {
    undo_stack: VecDeque<Command>,
    redo_stack: VecDeque<Command>,
    max_len: usize,
    max_memory_bytes: Option<usize>,
    total_memory: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(50)
    }
}

impl History {
    pub fn new(max_len: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_len,
            max_memory_bytes: Some(100 * 1024 * 1024),
            total_memory: 0,
        }
    }

    /// Apply `command` to the project and record it.
    pub fn push(&mut self, command: Command, project: &mut ProjectState) {
        command.apply(project);
        for cmd in self.redo_stack.drain(..) {
            self.total_memory = self.total_memory.saturating_sub(cmd.memory_bytes());
        }
        self.total_memory += command.memory_bytes();
        self.undo_stack.push_back(command);
        self.prune();
    }

    /// No-op returning `None` when the undo stack is empty.
    pub fn undo(&mut self, project: &mut ProjectState) -> Option<String> {
        let command = self.undo_stack.pop_back()?;
        let description = command.description();
        command.revert(project);
        self.redo_stack.push_back(command);
        Some(description)
    }

    pub fn redo(&mut self, project: &mut ProjectState) -> Option<String> {
        let command = self.redo_stack.pop_back()?;
        let description = command.description();
        command.apply(project);
        self.undo_stack.push_back(command);
        Some(description)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Descriptions of pending undos, most recent first.
    pub fn undo_history(&self) -> Vec<String> {
        self.undo_stack
            .iter()
            .rev()
            .map(Command::description)
            .collect()
    }

    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.total_memory = 0;
    }

    fn prune(&mut self) {
        while self.undo_stack.len() > self.max_len {
            if let Some(removed) = self.undo_stack.pop_front() {
                self.total_memory = self.total_memory.saturating_sub(removed.memory_bytes());
            }
        }
        if let Some(max_bytes) = self.max_memory_bytes {
            while self.total_memory > max_bytes && self.undo_stack.len() > 1 {
                if let Some(removed) = self.undo_stack.pop_front() {
                    self.total_memory = self.total_memory.saturating_sub(removed.memory_bytes());
                }
            }
        }
    }
}
