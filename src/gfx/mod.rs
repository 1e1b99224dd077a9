//! # Graphics Module
//!
//! Scene graph, draw dispatch and the abstractions they render through.
//!
//! ## Architecture Overview
//!
//! - **Device** ([`device`]) - The [`GraphicsDevice`](device::GraphicsDevice) contract, uniform values and GPU resource handles
//! - **Effects** ([`effects`]) - Shader programs with effect-wide and per-drawable uniforms, plus shading properties
//! - **Drawables** ([`drawables`]) - Geometry and point lights carried by scene nodes
//! - **Scene** ([`scene`]) - Transform node arena, draw context and the two-pass dispatcher
//! - **Camera** ([`camera`]) - Lazily cached view matrix, orbit controller and perspective projection
//! - **Geometry** ([`geometry`]) - Procedural meshes and normal reconstruction
//! - **Bounds** ([`bounds`]) - Axis-aligned boxes used to frame imported meshes
//!
//! ## Usage
//!
//! Everything is reached through a [`DrawContext`](scene::DrawContext):
//!
//! ```no_run
//! use meshview::gfx::device::RecordingDevice;
//! use meshview::gfx::scene::DrawContext;
//!
//! let mut context = DrawContext::with_default_effects(Box::new(RecordingDevice::new())).unwrap();
//! let stats = context.render_frame().unwrap();
//! assert_eq!(stats.drawables, 0);
//! ```

pub mod bounds;
pub mod camera;
pub mod device;
pub mod drawables;
pub mod effects;
pub mod geometry;
pub mod scene;

// Re-export commonly used types
pub use camera::{Camera, OrbitCameraController, PerspectiveProjection};
pub use device::{GraphicsDevice, RecordingDevice};
pub use scene::{DrawContext, NodeId, SceneGraph};
