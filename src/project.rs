use std::collections::HashMap;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StrataError;
use crate::fill::SampleScope;
use crate::mask::SelectionMask;
use crate::text::TextAlignment;
use crate::transform::Transform;

/// Drop shadow parameters applied when compositing a layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shadow {
    pub offset_x: f32,
    pub offset_y: f32,
    pub blur: f32,
    pub color: [u8; 4],
}

/// Properties of a plain-text layer, rendered on demand instead of owning a
/// pixel buffer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BasicText {
    pub content: String,
    pub font_family: String,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub color: [u8; 4],
    pub alignment: TextAlignment,
    /// Line spacing as a multiple of the font size.
    pub line_height: f32,
    /// Extra horizontal advance per glyph, in pixels.
    pub letter_spacing: f32,
}

impl BasicText {
    pub fn new(content: impl Into<String>, font_family: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            font_family: font_family.into(),
            font_size: 24.0,
            bold: false,
            italic: false,
            color: [0, 0, 0, 255],
            alignment: TextAlignment::Left,
            line_height: 1.2,
            letter_spacing: 0.0,
        }
    }
}

/// Minimum layer dimensions enforced by the interactive resize tools.
pub const MIN_LAYER_SIZE: (u32, u32) = (1, 1);
pub const MIN_TEXT_LAYER_SIZE: (u32, u32) = (50, 20);

/// One editable unit: a raster buffer placed by a transform, or a text block
/// rasterized on demand when `basic_text` is present.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: Uuid,
    pub name: String,
    pub visible: bool,
    /// 0–100.
    pub opacity: f32,
    pub locked: bool,
    pub width: u32,
    pub height: u32,
    pub transform: Transform,
    pub shadow: Option<Shadow>,
    pub basic_text: Option<BasicText>,
}

impl Layer {
    pub fn new_raster(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            visible: true,
            opacity: 100.0,
            locked: false,
            width,
            height,
            transform: Transform::IDENTITY,
            shadow: None,
            basic_text: None,
        }
    }

    pub fn new_text(name: impl Into<String>, text: BasicText, width: u32, height: u32) -> Self {
        Self {
            basic_text: Some(text),
            ..Self::new_raster(name, width, height)
        }
    }

    pub fn is_text(&self) -> bool {
        self.basic_text.is_some()
    }

    pub fn min_size(&self) -> (u32, u32) {
        if self.is_text() {
            MIN_TEXT_LAYER_SIZE
        } else {
            MIN_LAYER_SIZE
        }
    }

    /// Layer opacity as a 0–1 compositing alpha.
    pub fn alpha(&self) -> f32 {
        (self.opacity / 100.0).clamp(0.0, 1.0)
    }
}

/// Per-project tool settings. Threaded explicitly through the code that needs
/// them — there is no global configuration singleton.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectSettings {
    pub fuzzy_tolerance: f32,
    /// Whether fuzzy selection floods contiguously or scans the whole canvas.
    pub fuzzy_contiguous: bool,
    pub sample_scope: SampleScope,
    pub rotation_snap: bool,
    pub background: [u8; 4],
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            fuzzy_tolerance: 5.0,
            fuzzy_contiguous: true,
            sample_scope: SampleScope::ActiveLayer,
            rotation_snap: false,
            background: [0, 0, 0, 0],
        }
    }
}

/// Serializable project description. Layer order is z-order: index 0 renders
/// topmost.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub layers: Vec<Layer>,
    pub settings: ProjectSettings,
}

/// The single open document: metadata plus the ID-keyed pixel-buffer arena
/// and the active selection. Commands address layers by ID, never by live
/// reference, so undo/redo stays safe to replay.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectState {
    pub metadata: ProjectMetadata,
    pub buffers: HashMap<Uuid, RgbaImage>,
    pub selection: Option<SelectionMask>,
    pub active_layer: Option<Uuid>,
}

impl ProjectState {
    /// New project with one transparent base layer covering the canvas.
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        let base = Layer::new_raster("Background", width, height);
        let id = base.id;
        let mut buffers = HashMap::new();
        buffers.insert(id, RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0])));
        Self {
            metadata: ProjectMetadata {
                name: name.into(),
                width,
                height,
                layers: vec![base],
                settings: ProjectSettings::default(),
            },
            buffers,
            selection: None,
            active_layer: Some(id),
        }
    }

    pub fn width(&self) -> u32 {
        self.metadata.width
    }

    pub fn height(&self) -> u32 {
        self.metadata.height
    }

    pub fn layer_index(&self, id: Uuid) -> Option<usize> {
        self.metadata.layers.iter().position(|l| l.id == id)
    }

    pub fn layer(&self, id: Uuid) -> Option<&Layer> {
        self.metadata.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_mut(&mut self, id: Uuid) -> Option<&mut Layer> {
        self.metadata.layers.iter_mut().find(|l| l.id == id)
    }

    pub fn buffer(&self, id: Uuid) -> Option<&RgbaImage> {
        self.buffers.get(&id)
    }

    pub fn buffer_mut(&mut self, id: Uuid) -> Option<&mut RgbaImage> {
        self.buffers.get_mut(&id)
    }

    pub fn active(&self) -> Option<&Layer> {
        self.active_layer.and_then(|id| self.layer(id))
    }

    /// Insert a layer (and its buffer, for raster layers) at the given
    /// z-index and make it active.
    pub fn insert_layer(&mut self, index: usize, layer: Layer, buffer: Option<RgbaImage>) {
        let id = layer.id;
        let index = index.min(self.metadata.layers.len());
        self.metadata.layers.insert(index, layer);
        if let Some(buf) = buffer {
            self.buffers.insert(id, buf);
        }
        self.active_layer = Some(id);
    }

    /// Remove a layer, returning it together with its buffer so a delete
    /// command can restore it on undo.
    pub fn remove_layer(&mut self, id: Uuid) -> Option<(usize, Layer, Option<RgbaImage>)> {
        let index = self.layer_index(id)?;
        let layer = self.metadata.layers.remove(index);
        let buffer = self.buffers.remove(&id);
        if self.active_layer == Some(id) {
            self.active_layer = self.metadata.layers.first().map(|l| l.id);
        }
        Some((index, layer, buffer))
    }

    /// Message for the `warning` callback when the active layer cannot take a
    /// destructive pixel edit, or `None` when the edit is allowed.
    pub fn paint_block_reason(&self) -> Option<&'static str> {
        let Some(layer) = self.active() else {
            return Some("No active layer");
        };
        if layer.locked {
            return Some("Layer is locked");
        }
        if layer.is_text() {
            return Some("Text layer must be rasterized first");
        }
        None
    }

    /// Like [`paint_block_reason`](Self::paint_block_reason) but for edits
    /// that only move geometry (text layers are fine).
    pub fn transform_block_reason(&self) -> Option<&'static str> {
        let Some(layer) = self.active() else {
            return Some("No active layer");
        };
        if layer.locked {
            return Some("Layer is locked");
        }
        None
    }

    /// Check the structural invariants: unique layer IDs, and a one-to-one
    /// correspondence between non-text layers and stored buffers.
    pub fn validate(&self) -> Result<(), StrataError> {
        let mut seen = std::collections::HashSet::new();
        for layer in &self.metadata.layers {
            if !seen.insert(layer.id) {
                return Err(StrataError::DuplicateLayerId(layer.id));
            }
            if layer.is_text() {
                if self.buffers.contains_key(&layer.id) {
                    return Err(StrataError::OrphanLayerImage(layer.id));
                }
            } else if !self.buffers.contains_key(&layer.id) {
                return Err(StrataError::MissingLayerImage(layer.id));
            }
        }
        for id in self.buffers.keys() {
            if !seen.contains(id) {
                return Err(StrataError::OrphanLayerImage(*id));
            }
        }
        Ok(())
    }
}
