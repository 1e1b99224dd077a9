//! # Scene Management Module
//!
//! The hierarchical scene and the per-frame draw dispatch over it.
//!
//! ## Key Components
//!
//! - [`SceneGraph`] - Arena of transform nodes under one root
//! - [`Node`] - Local position, scale and rotation plus an optional [`Drawable`](crate::gfx::drawables::Drawable)
//! - [`DrawContext`] - Owns the graph, the camera, the device and the registered effects
//! - [`collect_draw_requests`] / [`execute_draw_requests`] - The two passes of one frame
//!
//! ## Usage
//!
//! ```no_run
//! use cgmath::Vector3;
//! use meshview::gfx::device::RecordingDevice;
//! use meshview::gfx::effects::ForwardPhongEffect;
//! use meshview::gfx::scene::DrawContext;
//!
//! let mut context = DrawContext::with_default_effects(Box::new(RecordingDevice::new())).unwrap();
//! let phong = context.effect_id(ForwardPhongEffect::NAME).unwrap();
//! let property = context.create_property(phong);
//!
//! let sphere = context.create_sphere(property, 32, 16, 1.0);
//! let root = context.root();
//! context.create_child(root, Some(sphere));
//!
//! let light = context.create_point_light(Vector3::new(1.0, 1.0, 1.0), 10.0).unwrap();
//! context.create_child(root, Some(light));
//!
//! let stats = context.draw();
//! assert_eq!(stats.batches, 2);
//! ```

pub mod context;
pub mod dispatch;
pub mod node;

pub use context::{DrawContext, EffectRegistry, SharedScene};
pub use dispatch::{
    clear_frame, collect_draw_requests, execute_draw_requests, reset_device_state, DrawRequests, DrawStats,
};
pub use node::{Node, NodeId, SceneGraph};
