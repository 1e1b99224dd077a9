use std::sync::Arc;

use cgmath::Vector3;
use log::debug;

use crate::gfx::bounds::BoundingBox;
use crate::gfx::device::{
    AttributeFormat, Buffer, BufferTarget, BufferUsage, GraphicsDevice, IndexType, PrimitiveMode, VertexArray,
};
use crate::gfx::effects::{Effect, SharedProperty};

/// A vertex stream a geometry can feed to an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub name: &'static str,
    pub format: AttributeFormat,
}

pub const POSITION_ATTRIBUTE: VertexAttribute = VertexAttribute {
    name: "vPosition",
    format: AttributeFormat::Float32x3,
};

pub const NORMAL_ATTRIBUTE: VertexAttribute = VertexAttribute {
    name: "vNormal",
    format: AttributeFormat::Float32x3,
};

/// Static indexed triangle geometry.
///
/// Positions and normals live in one vertex buffer, positions first and
/// normals right after them. Each stream's byte offset is `None` when the
/// stream is absent.
#[derive(Debug, Clone)]
pub struct Geometry {
    vertex_array: Arc<VertexArray>,
    buffer: Arc<Buffer>,
    element_count: usize,
    element_offset: usize,
    position_offset: Option<usize>,
    normal_offset: Option<usize>,
    bounds: Option<BoundingBox>,
    property: Option<SharedProperty>,
}

fn flatten(vectors: &[Vector3<f32>]) -> Vec<f32> {
    vectors.iter().flat_map(|v| [v.x, v.y, v.z]).collect()
}

impl Geometry {
    /// Uploads `elements`, `positions` and `normals` once.
    pub fn new(
        device: &mut dyn GraphicsDevice,
        elements: &[u32],
        positions: &[Vector3<f32>],
        normals: &[Vector3<f32>],
    ) -> Self {
        let position_bytes = positions.len() * POSITION_ATTRIBUTE.format.size();
        let normal_bytes = normals.len() * NORMAL_ATTRIBUTE.format.size();

        let vertex_array = device.create_vertex_array(elements, BufferUsage::Static);
        let mut buffer = device.create_buffer(BufferTarget::Vertex, BufferUsage::Static);
        buffer.load_data(device, None, position_bytes + normal_bytes);

        let mut position_offset = None;
        if !positions.is_empty() {
            buffer.load_sub_data(device, 0, bytemuck::cast_slice(&flatten(positions)));
            position_offset = Some(0);
        }

        let mut normal_offset = None;
        if !normals.is_empty() {
            buffer.load_sub_data(device, position_bytes, bytemuck::cast_slice(&flatten(normals)));
            normal_offset = Some(position_bytes);
        }

        Self {
            vertex_array: Arc::new(vertex_array),
            buffer: Arc::new(buffer),
            element_count: elements.len(),
            element_offset: 0,
            position_offset,
            normal_offset,
            bounds: BoundingBox::from_positions(positions),
            property: None,
        }
    }

    /// Draws a sub-range of already uploaded data.
    pub fn from_shared(
        vertex_array: Arc<VertexArray>,
        buffer: Arc<Buffer>,
        element_count: usize,
        element_offset: usize,
        position_offset: Option<usize>,
        normal_offset: Option<usize>,
    ) -> Self {
        Self {
            vertex_array,
            buffer,
            element_count,
            element_offset,
            position_offset,
            normal_offset,
            bounds: None,
            property: None,
        }
    }

    pub fn vertex_array(&self) -> &Arc<VertexArray> {
        &self.vertex_array
    }

    pub fn buffer(&self) -> &Arc<Buffer> {
        &self.buffer
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }

    pub fn element_offset(&self) -> usize {
        self.element_offset
    }

    pub fn position_offset(&self) -> Option<usize> {
        self.position_offset
    }

    pub fn normal_offset(&self) -> Option<usize> {
        self.normal_offset
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }

    pub fn shading_property(&self) -> Option<&SharedProperty> {
        self.property.as_ref()
    }

    /// Attaches `property` and binds the streams `effect` (the property's
    /// effect) declares.
    pub fn set_shading_property(&mut self, device: &mut dyn GraphicsDevice, effect: &Effect, property: SharedProperty) {
        device.bind_vertex_array(self.vertex_array.id());
        self.enable_attribute(device, effect, POSITION_ATTRIBUTE, self.position_offset);
        self.enable_attribute(device, effect, NORMAL_ATTRIBUTE, self.normal_offset);
        device.unbind_vertex_array();

        self.property = Some(property);
    }

    /// Binds one stream, only if it is present and `effect` declares it.
    fn enable_attribute(
        &self,
        device: &mut dyn GraphicsDevice,
        effect: &Effect,
        attribute: VertexAttribute,
        offset: Option<usize>,
    ) {
        let Some(offset) = offset else {
            return;
        };
        let Some(&location) = effect.attributes().get(attribute.name) else {
            if cfg!(debug_assertions) {
                debug!("{} does not bind '{}'", effect.name(), attribute.name);
            }
            return;
        };
        let vertex_array = self.vertex_array.id();
        device.attrib_pointer(vertex_array, self.buffer.id(), location, attribute.format, offset);
        device.enable_attrib(vertex_array, location);
    }

    /// One indexed triangle-list draw over the stored element range.
    pub fn draw(&self, device: &mut dyn GraphicsDevice) {
        device.bind_vertex_array(self.vertex_array.id());
        device.draw_elements(
            PrimitiveMode::Triangles,
            self.element_count,
            IndexType::U32,
            self.element_offset * IndexType::U32.size(),
        );
    }
}
