// src/wgpu_utils/mod.rs
//! wgpu backend of the graphics device
//!
//! [`WgpuDevice`] implements [`GraphicsDevice`](crate::gfx::device::GraphicsDevice)
//! on top of wgpu. The helpers it is built from are public for reuse.

pub mod pipeline_cache;
pub mod texture_resource;
pub mod uniform_layout;
pub mod wgpu_device;

// Re-export main types
pub use pipeline_cache::{FixedFunctionState, PipelineCache, PipelineKey};
pub use texture_resource::TextureResource;
pub use uniform_layout::{UniformField, UniformLayout};
pub use wgpu_device::WgpuDevice;
