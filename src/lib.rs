//! Strata: the engine of a layered raster image editor.
//!
//! Everything here is headless — the crate owns the document model (layers,
//! transforms, selection), the interactive tool state machines, the undoable
//! command history, and the CPU compositor, while a host shell owns windows,
//! panels, and input routing. Hosts drive the engine through [`editor::Editor`]
//! and the tool types in [`tools`], and draw whatever
//! [`compositor::render`] returns.

pub mod compositor;
pub mod editor;
pub mod error;
pub mod fill;
pub mod geom;
pub mod history;
pub mod io;
pub mod logger;
pub mod mask;
pub mod project;
pub mod text;
pub mod tools;
pub mod transform;

pub use editor::Editor;
pub use error::StrataError;
pub use history::{Command, History};
pub use mask::{SelectionMask, SelectionMode};
pub use project::{BasicText, Layer, ProjectState};
pub use transform::Transform;
