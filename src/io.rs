//! Persistence boundary. The engine never touches an archive format; it
//! exchanges a [`ProjectArchive`] value with the packaging layer: one JSON
//! metadata document plus one PNG per raster layer, keyed by layer ID.
//! Text layers persist no image — they re-rasterize from their metadata.

use std::collections::HashMap;
use std::io::Cursor;

use image::{ImageFormat, ImageOutputFormat, RgbaImage};
use uuid::Uuid;

use crate::error::StrataError;
use crate::log_info;
use crate::project::{ProjectMetadata, ProjectState};

/// The wire form of a project, as handed to/received from the packaging
/// collaborator.
#[derive(Clone, Debug)]
pub struct ProjectArchive {
    /// `None` models a malformed archive with a missing metadata document.
    pub metadata_json: Option<String>,
    /// PNG-encoded pixels per raster layer.
    pub layer_images: HashMap<Uuid, Vec<u8>>,
}

/// Serialize a project into its archive form.
pub fn pack_project(project: &ProjectState) -> Result<ProjectArchive, StrataError> {
    project.validate()?;
    let metadata_json = serde_json::to_string_pretty(&project.metadata)?;

    let mut layer_images = HashMap::new();
    for layer in &project.metadata.layers {
        if layer.is_text() {
            continue;
        }
        let buffer = project
            .buffer(layer.id)
            .ok_or(StrataError::MissingLayerImage(layer.id))?;
        layer_images.insert(layer.id, encode_png(buffer)?);
    }

    log_info!(
        "packed project \"{}\" ({} layers, {} images)",
        project.metadata.name,
        project.metadata.layers.len(),
        layer_images.len()
    );
    Ok(ProjectArchive {
        metadata_json: Some(metadata_json),
        layer_images,
    })
}

/// Deserialize an archive into a fresh project.
///
/// On any failure the caller's previously loaded project is untouched: this
/// returns a new `ProjectState` or an error, never a partial mutation.
pub fn unpack_project(archive: &ProjectArchive) -> Result<ProjectState, StrataError> {
    let json = archive
        .metadata_json
        .as_deref()
        .ok_or(StrataError::MissingMetadata)?;
    let metadata: ProjectMetadata = serde_json::from_str(json)?;

    let mut buffers = HashMap::new();
    for layer in &metadata.layers {
        if layer.is_text() {
            continue;
        }
        let bytes = archive
            .layer_images
            .get(&layer.id)
            .ok_or(StrataError::MissingLayerImage(layer.id))?;
        buffers.insert(layer.id, decode_png(bytes)?);
    }

    let active_layer = metadata.layers.first().map(|l| l.id);
    let project = ProjectState {
        metadata,
        buffers,
        selection: None,
        active_layer,
    };
    project.validate()?;
    log_info!("unpacked project \"{}\"", project.metadata.name);
    Ok(project)
}

pub fn encode_png(buffer: &RgbaImage) -> Result<Vec<u8>, StrataError> {
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(buffer.clone())
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
    Ok(bytes)
}

pub fn decode_png(bytes: &[u8]) -> Result<RgbaImage, StrataError> {
    Ok(image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{BasicText, Layer};
    use image::Rgba;

    fn sample_project() -> ProjectState {
        let mut p = ProjectState::new("roundtrip", 12, 10);
        let id = p.metadata.layers[0].id;
        p.buffer_mut(id)
            .unwrap()
            .put_pixel(3, 4, Rgba([200, 10, 30, 255]));

        let text = Layer::new_text("caption", BasicText::new("hello", "Sans"), 100, 40);
        p.metadata.layers.insert(0, text);
        p
    }

    #[test]
    fn pack_unpack_round_trips_metadata_and_pixels() {
        let project = sample_project();
        let archive = pack_project(&project).unwrap();
        let loaded = unpack_project(&archive).unwrap();

        assert_eq!(loaded.metadata, project.metadata);
        let raster_id = project.metadata.layers[1].id;
        assert_eq!(loaded.buffer(raster_id), project.buffer(raster_id));
    }

    #[test]
    fn text_layers_persist_no_image() {
        let project = sample_project();
        let archive = pack_project(&project).unwrap();
        let text_id = project.metadata.layers[0].id;
        assert!(!archive.layer_images.contains_key(&text_id));
        assert_eq!(archive.layer_images.len(), 1);
    }

    #[test]
    fn missing_metadata_is_a_load_failure() {
        let project = sample_project();
        let mut archive = pack_project(&project).unwrap();
        archive.metadata_json = None;
        assert!(matches!(
            unpack_project(&archive),
            Err(StrataError::MissingMetadata)
        ));
    }

    #[test]
    fn missing_layer_image_is_a_load_failure() {
        let project = sample_project();
        let mut archive = pack_project(&project).unwrap();
        archive.layer_images.clear();
        assert!(matches!(
            unpack_project(&archive),
            Err(StrataError::MissingLayerImage(_))
        ));
    }

    #[test]
    fn garbage_metadata_is_a_load_failure() {
        let archive = ProjectArchive {
            metadata_json: Some("{not json".to_string()),
            layer_images: HashMap::new(),
        };
        assert!(matches!(
            unpack_project(&archive),
            Err(StrataError::Metadata(_))
        ));
    }
}
