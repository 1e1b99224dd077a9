//! # Graphics Device
//!
//! The collaborator every drawable and effect renders through. The scene core
//! never touches a GPU API directly; it creates programs, buffers and vertex
//! arrays, toggles fixed-function state and issues indexed draws through
//! [`GraphicsDevice`].
//!
//! Two implementations ship with the crate:
//!
//! - [`RecordingDevice`] keeps every call in memory (tests, headless use)
//! - [`WgpuDevice`](crate::wgpu_utils::WgpuDevice) renders to a window surface

use std::borrow::Cow;

use cgmath::Vector4;

pub mod error;
pub mod recording;
pub mod resources;
pub mod uniform;

pub use error::{DeviceError, UniformError};
pub use recording::{DeviceCommand, DrawCall, RecordingDevice, RecordingHandle};
pub use resources::{Buffer, Program, ReleaseGuard, ReleaseQueue, ResourceId, ResourceKind, VertexArray};
pub use uniform::{Uniform, UniformDecl, UniformType, UniformValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunc {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    Increment,
    IncrementWrap,
    Decrement,
    DecrementWrap,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    Front,
    Back,
    FrontAndBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    Cw,
    Ccw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendEquation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// Buffers selected by [`GraphicsDevice::clear_buffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClearBuffer {
    Color,
    Depth,
    Stencil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    pub fn size(self) -> usize {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Vertex,
    Index,
    Uniform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Static,
    Dynamic,
    Stream,
}

/// Layout of one vertex attribute stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
}

impl AttributeFormat {
    pub fn size(self) -> usize {
        match self {
            AttributeFormat::Float32 => 4,
            AttributeFormat::Float32x2 => 8,
            AttributeFormat::Float32x3 => 12,
            AttributeFormat::Float32x4 => 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDecl {
    pub name: String,
    pub location: u32,
    pub format: AttributeFormat,
}

impl AttributeDecl {
    pub fn new(name: impl Into<String>, location: u32, format: AttributeFormat) -> Self {
        Self {
            name: name.into(),
            location,
            format,
        }
    }
}

/// Shader source plus the interface the program exposes.
///
/// Uniform locations are assigned in declaration order, which is also the
/// order members appear in the shader's uniform block.
#[derive(Debug, Clone)]
pub struct ProgramSource {
    pub label: String,
    pub wgsl: Cow<'static, str>,
    pub uniforms: Vec<UniformDecl>,
    pub attributes: Vec<AttributeDecl>,
}

/// Create, bind and draw primitives plus fixed-function state.
pub trait GraphicsDevice: Send {
    fn create_program(&mut self, source: &ProgramSource) -> Result<Program, DeviceError>;
    fn create_buffer(&mut self, target: BufferTarget, usage: BufferUsage) -> Buffer;
    /// Creates a vertex array bound to an index buffer holding `elements`.
    fn create_vertex_array(&mut self, elements: &[u32], usage: BufferUsage) -> VertexArray;

    fn load_buffer_data(&mut self, buffer: ResourceId, data: Option<&[u8]>, size: usize);
    fn load_buffer_sub_data(&mut self, buffer: ResourceId, offset: usize, data: &[u8]);

    fn bind_vertex_array(&mut self, vertex_array: ResourceId);
    fn unbind_vertex_array(&mut self);
    fn attrib_pointer(
        &mut self,
        vertex_array: ResourceId,
        buffer: ResourceId,
        location: u32,
        format: AttributeFormat,
        offset: usize,
    );
    fn enable_attrib(&mut self, vertex_array: ResourceId, location: u32);
    fn disable_attrib(&mut self, vertex_array: ResourceId, location: u32);

    fn bind_program(&mut self, program: ResourceId);
    fn unbind_program(&mut self);
    fn apply_uniform(&mut self, program: ResourceId, uniform: &Uniform);

    fn set_color_mask(&mut self, red: bool, green: bool, blue: bool, alpha: bool);
    fn enable_depth_test(&mut self, enabled: bool);
    fn set_depth_func(&mut self, func: CompareFunc);
    fn set_depth_range(&mut self, near: f32, far: f32);
    fn enable_depth_mask(&mut self, enabled: bool);
    fn enable_stencil_test(&mut self, enabled: bool);
    fn set_stencil_func(&mut self, func: CompareFunc, reference: i32, mask: u32);
    fn set_stencil_op(&mut self, stencil_fail: StencilOp, depth_fail: StencilOp, pass: StencilOp);
    fn enable_cull_face(&mut self, enabled: bool);
    fn set_cull_face(&mut self, face: Face);
    fn set_front_face(&mut self, front_face: FrontFace);
    fn enable_blend(&mut self, enabled: bool);
    fn set_blend_func(&mut self, src: BlendFactor, dst: BlendFactor);
    fn set_blend_equation(&mut self, equation: BlendEquation);
    fn clear_buffer(&mut self, buffer: ClearBuffer);
    fn clear_color(&mut self, color: Vector4<f32>);
    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32);

    fn draw_elements(&mut self, mode: PrimitiveMode, count: usize, index_type: IndexType, byte_offset: usize);
    fn draw_elements_instanced(
        &mut self,
        mode: PrimitiveMode,
        count: usize,
        index_type: IndexType,
        byte_offset: usize,
        instances: u32,
    );

    /// Frees every resource whose last handle was dropped.
    fn collect_garbage(&mut self);

    fn begin_frame(&mut self) {
        self.collect_garbage();
    }

    /// Submits whatever the frame recorded.
    fn end_frame(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn resize(&mut self, _width: u32, _height: u32) {}
}
