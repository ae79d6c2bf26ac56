//! The editing session facade: one project, its undo history, the font
//! store, and the viewport offset, behind the small API a host shell drives.
//! Tools stay decoupled from the session — they return [`ToolEvent`]s and
//! the host feeds those through [`Editor::handle_events`].

use egui::Vec2;
use image::RgbaImage;
use uuid::Uuid;

use crate::compositor;
use crate::error::StrataError;
use crate::history::{Command, History};
use crate::io::{self, ProjectArchive};
use crate::log_info;
use crate::project::{BasicText, Layer, ProjectState};
use crate::text::{self, FontStore};
use crate::tools::ToolEvent;

pub struct Editor {
    pub project: ProjectState,
    pub history: History,
    pub fonts: FontStore,
    /// Canvas-space offset of the viewport, accumulated from pan events.
    pub viewport_offset: Vec2,
    warnings: Vec<String>,
}

impl Editor {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            project: ProjectState::new(name, width, height),
            history: History::default(),
            fonts: FontStore::new(),
            viewport_offset: Vec2::ZERO,
            warnings: Vec::new(),
        }
    }

    /// Apply a command through history.
    pub fn push(&mut self, command: Command) {
        self.history.push(command, &mut self.project);
    }

    pub fn undo(&mut self) -> Option<String> {
        self.history.undo(&mut self.project)
    }

    pub fn redo(&mut self) -> Option<String> {
        self.history.redo(&mut self.project)
    }

    /// Route a batch of tool events into the session.
    pub fn handle_events(&mut self, events: Vec<ToolEvent>) {
        for event in events {
            match event {
                ToolEvent::Commit(command) => self.push(command),
                ToolEvent::Warning(message) => {
                    crate::log_warn!("tool: {message}");
                    self.warnings.push(message);
                }
                ToolEvent::SetActiveLayer(id) => {
                    if self.project.layer(id).is_some() {
                        self.project.active_layer = Some(id);
                    }
                }
                ToolEvent::Pan(delta) => self.viewport_offset += delta,
            }
        }
    }

    /// Drain pending user-facing warnings, oldest first.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    pub fn render(&self) -> RgbaImage {
        compositor::render(&self.project, &self.fonts)
    }

    // ------------------------------------------------------------------
    // Layer convenience commands
    // ------------------------------------------------------------------

    /// Add a transparent canvas-sized raster layer on top; returns its ID.
    pub fn add_raster_layer(&mut self, name: impl Into<String>) -> Uuid {
        let layer = Layer::new_raster(name, self.project.width(), self.project.height());
        let id = layer.id;
        let buffer = RgbaImage::new(self.project.width(), self.project.height());
        self.push(Command::AddLayer {
            index: 0,
            layer,
            buffer: Some(buffer),
            active_before: self.project.active_layer,
        });
        id
    }

    pub fn add_text_layer(
        &mut self,
        name: impl Into<String>,
        text: BasicText,
        width: u32,
        height: u32,
    ) -> Uuid {
        let layer = Layer::new_text(name, text, width, height);
        let id = layer.id;
        self.push(Command::AddLayer {
            index: 0,
            layer,
            buffer: None,
            active_before: self.project.active_layer,
        });
        id
    }

    /// Duplicate the active layer directly above itself; returns the copy's
    /// ID.
    pub fn duplicate_active_layer(&mut self) -> Option<Uuid> {
        let id = self.project.active_layer?;
        let index = self.project.layer_index(id)?;
        let mut copy = self.project.layer(id)?.clone();
        copy.id = Uuid::new_v4();
        copy.name = format!("{} copy", copy.name);
        let copy_id = copy.id;
        let buffer = self.project.buffer(id).cloned();
        self.push(Command::AddLayer {
            index,
            layer: copy,
            buffer,
            active_before: Some(id),
        });
        Some(copy_id)
    }

    /// Delete the active layer. Refuses to delete the last one.
    pub fn delete_active_layer(&mut self) -> bool {
        let Some(id) = self.project.active_layer else {
            return false;
        };
        if self.project.metadata.layers.len() <= 1 {
            self.warnings.push("Cannot delete the last layer".to_string());
            return false;
        }
        let Some(index) = self.project.layer_index(id) else {
            return false;
        };
        let layer = self.project.metadata.layers[index].clone();
        let buffer = self.project.buffer(id).cloned();
        self.push(Command::DeleteLayer {
            index,
            layer,
            buffer,
            active_before: Some(id),
        });
        true
    }

    /// Bake the active text layer to raster pixels so paint tools work on
    /// it. No-op on raster layers.
    pub fn rasterize_active_text(&mut self) -> Result<(), StrataError> {
        let Some(layer) = self.project.active() else {
            return Ok(());
        };
        let Some(text) = layer.basic_text.clone() else {
            return Ok(());
        };
        let (id, width, height) = (layer.id, layer.width, layer.height);
        let font = self.fonts.get(&text.font_family)?;
        let buffer = text::rasterize(font, &text, width, height);
        self.push(Command::RasterizeText {
            layer: id,
            before_text: text,
            before_size: (width, height),
            buffer,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    pub fn save(&self) -> Result<ProjectArchive, StrataError> {
        io::pack_project(&self.project)
    }

    /// Replace the session with a loaded archive. On failure the current
    /// project and history are untouched.
    pub fn load(&mut self, archive: &ProjectArchive) -> Result<(), StrataError> {
        let project = io::unpack_project(archive)?;
        log_info!("opened project \"{}\"", project.metadata.name);
        self.project = project;
        self.history.clear();
        self.viewport_offset = Vec2::ZERO;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_layer_activates_it_and_undo_restores_previous_active() {
        let mut editor = Editor::new("session", 64, 64);
        let background = editor.project.active_layer;
        let id = editor.add_raster_layer("Layer 2");
        assert_eq!(editor.project.active_layer, Some(id));

        editor.undo();
        assert!(editor.project.layer(id).is_none());
        assert_eq!(editor.project.active_layer, background);
    }

    #[test]
    fn duplicate_copies_pixels_under_a_new_id() {
        let mut editor = Editor::new("session", 16, 16);
        let original = editor.project.active_layer.unwrap();
        editor
            .project
            .buffer_mut(original)
            .unwrap()
            .put_pixel(2, 2, image::Rgba([9, 9, 9, 255]));

        let copy = editor.duplicate_active_layer().unwrap();
        assert_ne!(copy, original);
        assert_eq!(editor.project.active_layer, Some(copy));
        assert_eq!(editor.project.layer_index(copy), Some(0));
        assert_eq!(
            editor.project.buffer(copy).unwrap(),
            editor.project.buffer(original).unwrap()
        );
        assert_eq!(editor.project.layer(copy).unwrap().name, "Background copy");
    }

    #[test]
    fn last_layer_cannot_be_deleted() {
        let mut editor = Editor::new("session", 64, 64);
        assert!(!editor.delete_active_layer());
        assert_eq!(
            editor.take_warnings(),
            vec!["Cannot delete the last layer".to_string()]
        );
        assert_eq!(editor.project.metadata.layers.len(), 1);
    }

    #[test]
    fn delete_and_undo_restore_the_layer() {
        let mut editor = Editor::new("session", 64, 64);
        let id = editor.add_raster_layer("Layer 2");
        assert!(editor.delete_active_layer());
        assert!(editor.project.layer(id).is_none());

        editor.undo();
        assert!(editor.project.layer(id).is_some());
        assert_eq!(editor.project.active_layer, Some(id));
    }

    #[test]
    fn pan_events_accumulate_in_the_viewport() {
        let mut editor = Editor::new("session", 64, 64);
        editor.handle_events(vec![
            ToolEvent::Pan(Vec2::new(3.0, 0.0)),
            ToolEvent::Pan(Vec2::new(-1.0, 4.0)),
        ]);
        assert_eq!(editor.viewport_offset, Vec2::new(2.0, 4.0));
    }

    #[test]
    fn warnings_are_collected_and_drained() {
        let mut editor = Editor::new("session", 64, 64);
        editor.handle_events(vec![ToolEvent::Warning("Layer is locked".into())]);
        assert_eq!(editor.take_warnings(), vec!["Layer is locked".to_string()]);
        assert!(editor.take_warnings().is_empty());
    }

    #[test]
    fn failed_load_keeps_the_open_project() {
        let mut editor = Editor::new("session", 64, 64);
        editor.add_raster_layer("Layer 2");
        let before = editor.project.clone();

        let archive = ProjectArchive {
            metadata_json: None,
            layer_images: Default::default(),
        };
        assert!(editor.load(&archive).is_err());
        assert_eq!(editor.project, before);
        assert!(editor.history.can_undo(), "history survives a failed load");
    }

    #[test]
    fn save_load_round_trips_the_session() {
        let mut editor = Editor::new("session", 32, 32);
        editor.add_raster_layer("Layer 2");
        let archive = editor.save().unwrap();

        let mut other = Editor::new("blank", 8, 8);
        other.load(&archive).unwrap();
        assert_eq!(other.project.metadata, editor.project.metadata);
        assert!(!other.history.can_undo());
    }

    #[test]
    fn rasterize_without_the_font_fails_cleanly() {
        let mut editor = Editor::new("session", 64, 64);
        editor.add_text_layer("caption", BasicText::new("hi", "NoSuchFont"), 100, 40);
        let err = editor.rasterize_active_text().unwrap_err();
        assert!(matches!(err, StrataError::UnknownFont(_)));
        assert!(editor.project.active().unwrap().is_text());
    }
}
