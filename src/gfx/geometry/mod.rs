//! # Procedural Geometry Generation
//!
//! Mesh data generated in code: the sphere used to visualise point lights, a
//! unit cube for the default scene, and vertex normal reconstruction for
//! imported meshes that ship without normals.
//!
//! ## Usage
//!
//! ```rust
//! use meshview::gfx::geometry::{generate_sphere, compute_vertex_normals};
//!
//! let sphere = generate_sphere(16, 8, 0.1);
//! assert_eq!(sphere.vertex_count(), 2 + 7 * 16);
//!
//! let normals = compute_vertex_normals(&sphere.positions, &sphere.indices);
//! assert_eq!(normals.len(), sphere.positions.len());
//! ```

pub mod primitives;

use cgmath::Vector3;

pub use primitives::*;

/// Indexed triangle mesh data ready for upload.
#[derive(Debug, Clone, Default)]
pub struct GeometryData {
    pub positions: Vec<Vector3<f32>>,
    pub normals: Vec<Vector3<f32>>,
    /// Triangle indices (counter-clockwise winding)
    pub indices: Vec<u32>,
}

impl GeometryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}
