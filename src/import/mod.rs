//! # Mesh Import
//!
//! Loads Wavefront OBJ files and splices them into a [`DrawContext`] as one
//! group node with a child per shape. Parsing never touches the scene, so
//! it can run on a worker thread through [`spawn_import`] while the render
//! loop keeps drawing.
//!
//! ```no_run
//! use meshview::gfx::device::RecordingDevice;
//! use meshview::gfx::scene::DrawContext;
//! use meshview::import::load_obj;
//!
//! let mut context = DrawContext::with_default_effects(Box::new(RecordingDevice::new())).unwrap();
//! let imported = load_obj("teapot.obj").unwrap();
//! let group = imported.splice(&mut context).unwrap();
//! assert!(context.graph().contains(group));
//! ```
//!
//! [`DrawContext`]: crate::gfx::scene::DrawContext

pub mod job;
pub mod obj;

use thiserror::Error;

use crate::gfx::device::DeviceError;

pub use job::spawn_import;
pub use obj::{load_obj, ImportedMaterial, ImportedScene, ImportedShape};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to parse OBJ file: {0}")]
    Load(#[from] tobj::LoadError),

    #[error("'{0}' contains no triangles")]
    EmptyScene(String),

    #[error("parent node is no longer part of the scene")]
    MissingParent,

    #[error("scene lock was poisoned by a panicking thread")]
    Poisoned,

    #[error(transparent)]
    Device(#[from] DeviceError),
}
