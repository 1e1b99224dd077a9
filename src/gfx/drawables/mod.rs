//! # Drawables
//!
//! Renderable payloads carried by scene nodes. A [`Drawable`] wraps one of a
//! closed set of kinds ([`Geometry`], [`PointLight`]) together with the world
//! transform the dispatcher caches on it each frame.

use cgmath::{Matrix4, SquareMatrix, Vector3};

use crate::gfx::device::GraphicsDevice;
use crate::gfx::effects::{EffectId, SharedProperty};

pub mod geometry;
pub mod point_light;

pub use geometry::{Geometry, VertexAttribute, NORMAL_ATTRIBUTE, POSITION_ATTRIBUTE};
pub use point_light::PointLight;

#[derive(Debug, Clone)]
pub enum DrawableKind {
    Geometry(Geometry),
    PointLight(PointLight),
}

#[derive(Debug, Clone)]
pub struct Drawable {
    name: String,
    transformation: Matrix4<f32>,
    kind: DrawableKind,
}

impl Drawable {
    pub fn new(kind: DrawableKind) -> Self {
        Self {
            name: String::new(),
            transformation: Matrix4::identity(),
            kind,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &DrawableKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut DrawableKind {
        &mut self.kind
    }

    /// World transform cached by the last dispatch.
    pub fn transformation(&self) -> Matrix4<f32> {
        self.transformation
    }

    pub fn set_transformation(&mut self, transformation: Matrix4<f32>) {
        self.transformation = transformation;
    }

    /// Translation part of the cached world transform.
    pub fn world_position(&self) -> Vector3<f32> {
        self.transformation.w.truncate()
    }

    pub fn shading_property(&self) -> Option<&SharedProperty> {
        match &self.kind {
            DrawableKind::Geometry(geometry) => geometry.shading_property(),
            DrawableKind::PointLight(light) => light.shading_property(),
        }
    }

    /// The effect that draws this drawable, if it has a property.
    pub fn effect(&self) -> Option<EffectId> {
        self.shading_property().map(|property| property.effect())
    }

    pub fn as_point_light(&self) -> Option<&PointLight> {
        match &self.kind {
            DrawableKind::PointLight(light) => Some(light),
            DrawableKind::Geometry(_) => None,
        }
    }

    pub fn as_point_light_mut(&mut self) -> Option<&mut PointLight> {
        match &mut self.kind {
            DrawableKind::PointLight(light) => Some(light),
            DrawableKind::Geometry(_) => None,
        }
    }

    pub fn as_geometry(&self) -> Option<&Geometry> {
        match &self.kind {
            DrawableKind::Geometry(geometry) => Some(geometry),
            DrawableKind::PointLight(_) => None,
        }
    }

    pub fn as_geometry_mut(&mut self) -> Option<&mut Geometry> {
        match &mut self.kind {
            DrawableKind::Geometry(geometry) => Some(geometry),
            DrawableKind::PointLight(_) => None,
        }
    }

    pub fn draw(&self, device: &mut dyn GraphicsDevice) {
        match &self.kind {
            DrawableKind::Geometry(geometry) => geometry.draw(device),
            DrawableKind::PointLight(light) => light.draw(device),
        }
    }
}

impl From<Geometry> for Drawable {
    fn from(geometry: Geometry) -> Self {
        Drawable::new(DrawableKind::Geometry(geometry))
    }
}

impl From<PointLight> for Drawable {
    fn from(light: PointLight) -> Self {
        Drawable::new(DrawableKind::PointLight(light))
    }
}
