// src/lib.rs
//! meshview
//!
//! A 3D mesh viewer built on a hierarchical scene graph and an effect-batched
//! draw dispatcher, rendered with wgpu and winit.

pub mod app;
pub mod config;
pub mod gfx;
pub mod import;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::MeshViewer;
pub use config::ViewerConfig;
