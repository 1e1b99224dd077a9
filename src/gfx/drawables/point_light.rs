use std::sync::Arc;

use cgmath::Vector3;

use super::Geometry;
use crate::gfx::device::GraphicsDevice;
use crate::gfx::effects::SharedProperty;

/// A point light, drawn as the context's shared light sphere.
#[derive(Debug, Clone)]
pub struct PointLight {
    pub color: Vector3<f32>,
    pub radius: f32,
    sentinel: Arc<Geometry>,
}

impl PointLight {
    pub(crate) fn new(color: Vector3<f32>, radius: f32, sentinel: Arc<Geometry>) -> Self {
        Self {
            color,
            radius,
            sentinel,
        }
    }

    /// The sphere every point light of the context shares.
    pub fn sentinel(&self) -> &Arc<Geometry> {
        &self.sentinel
    }

    pub fn shading_property(&self) -> Option<&SharedProperty> {
        self.sentinel.shading_property()
    }

    pub fn draw(&self, device: &mut dyn GraphicsDevice) {
        self.sentinel.draw(device);
    }
}
