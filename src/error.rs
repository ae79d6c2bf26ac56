use thiserror::Error;
use uuid::Uuid;

/// Structural failures — fatal to the operation that raised them.
///
/// User-actionable warnings ("No active layer", "Layer is locked") are not
/// errors; tools report those as plain strings through
/// [`crate::tools::ToolEvent::Warning`] and abort the gesture.
#[derive(Debug, Error)]
pub enum StrataError {
    #[error("project archive is missing its metadata document")]
    MissingMetadata,

    #[error("project metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("layer image: {0}")]
    Image(#[from] image::ImageError),

    #[error("no image stored for raster layer {0}")]
    MissingLayerImage(Uuid),

    #[error("image stored for unknown or text layer {0}")]
    OrphanLayerImage(Uuid),

    #[error("duplicate layer id {0}")]
    DuplicateLayerId(Uuid),

    #[error("invalid font data for family \"{0}\"")]
    InvalidFont(String),

    #[error("no font registered for family \"{0}\"")]
    UnknownFont(String),
}
