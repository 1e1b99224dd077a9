//! # Recording Device
//!
//! A [`GraphicsDevice`] that performs no rendering and records every call.
//!
//! Buffer contents, element lists and the uniform values live in program
//! state are kept so a draw call can be inspected exactly as a GPU would have
//! seen it. The log sits behind a [`RecordingHandle`] that stays readable
//! after the device itself is boxed into a draw context.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use cgmath::Vector4;

use super::resources::{Buffer, Program, ReleaseQueue, ResourceId, ResourceKind, VertexArray};
use super::uniform::{Uniform, UniformValue};
use super::{
    AttributeFormat, BlendEquation, BlendFactor, BufferTarget, BufferUsage, ClearBuffer, CompareFunc,
    DeviceError, Face, FrontFace, GraphicsDevice, IndexType, PrimitiveMode, ProgramSource, StencilOp,
};

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    CreateProgram { id: ResourceId, label: String },
    CreateBuffer { id: ResourceId, target: BufferTarget, usage: BufferUsage },
    CreateVertexArray { id: ResourceId, elements: usize },
    LoadBufferData { id: ResourceId, size: usize },
    LoadBufferSubData { id: ResourceId, offset: usize, len: usize },
    BindVertexArray(ResourceId),
    UnbindVertexArray,
    AttribPointer { vertex_array: ResourceId, buffer: ResourceId, location: u32, format: AttributeFormat, offset: usize },
    EnableAttrib { vertex_array: ResourceId, location: u32 },
    DisableAttrib { vertex_array: ResourceId, location: u32 },
    BindProgram(ResourceId),
    UnbindProgram,
    ApplyUniform { program: ResourceId, name: String, value: UniformValue },
    ColorMask(bool, bool, bool, bool),
    DepthTest(bool),
    DepthFunc(CompareFunc),
    DepthRange(f32, f32),
    DepthMask(bool),
    StencilTest(bool),
    StencilFunc(CompareFunc, i32, u32),
    StencilOp(StencilOp, StencilOp, StencilOp),
    CullFace(bool),
    CullFaceMode(Face),
    FrontFace(FrontFace),
    Blend(bool),
    BlendFunc(BlendFactor, BlendFactor),
    BlendEquation(BlendEquation),
    Clear(ClearBuffer),
    ClearColor(Vector4<f32>),
    Viewport(u32, u32, u32, u32),
    Draw(DrawCall),
    Release { kind: ResourceKind, id: ResourceId },
}

/// A draw call together with the program state it was issued under.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub program: Option<ResourceId>,
    pub vertex_array: Option<ResourceId>,
    pub mode: PrimitiveMode,
    pub count: usize,
    pub index_type: IndexType,
    pub byte_offset: usize,
    pub instances: u32,
    /// Uniform values held by the bound program at draw time.
    pub uniforms: BTreeMap<String, UniformValue>,
}

impl DrawCall {
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct AttribBinding {
    buffer: ResourceId,
    format: AttributeFormat,
    offset: usize,
    enabled: bool,
}

#[derive(Debug, Default)]
pub struct RecordingLog {
    commands: Vec<DeviceCommand>,
    buffers: BTreeMap<ResourceId, Vec<u8>>,
    elements: BTreeMap<ResourceId, Vec<u32>>,
    attribs: BTreeMap<ResourceId, BTreeMap<u32, AttribBinding>>,
    program_state: BTreeMap<ResourceId, BTreeMap<String, UniformValue>>,
    bound_program: Option<ResourceId>,
    bound_vertex_array: Option<ResourceId>,
}

/// Shared read access to what a [`RecordingDevice`] recorded.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandle(Arc<Mutex<RecordingLog>>);

impl RecordingHandle {
    fn lock(&self) -> MutexGuard<'_, RecordingLog> {
        match self.0.lock() {
            Ok(log) => log,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.lock().commands.clone()
    }

    pub fn draw_calls(&self) -> Vec<DrawCall> {
        self.lock()
            .commands
            .iter()
            .filter_map(|command| match command {
                DeviceCommand::Draw(call) => Some(call.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn buffer_contents(&self, buffer: ResourceId) -> Option<Vec<u8>> {
        self.lock().buffers.get(&buffer).cloned()
    }

    pub fn elements(&self, vertex_array: ResourceId) -> Option<Vec<u32>> {
        self.lock().elements.get(&vertex_array).cloned()
    }

    /// Enabled attribute locations of a vertex array with their byte offsets.
    pub fn enabled_attribs(&self, vertex_array: ResourceId) -> BTreeMap<u32, usize> {
        self.lock()
            .attribs
            .get(&vertex_array)
            .map(|bindings| {
                bindings
                    .iter()
                    .filter(|(_, binding)| binding.enabled)
                    .map(|(location, binding)| (*location, binding.offset))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Reads back the vertices a draw call references.
    ///
    /// Resolves each index of the draw's element range against the stream
    /// bound at `location` and returns the `f32` components per vertex.
    pub fn fetch_vertices(&self, call: &DrawCall, location: u32) -> Option<Vec<Vec<f32>>> {
        let log = self.lock();
        let vertex_array = call.vertex_array?;
        let elements = log.elements.get(&vertex_array)?;
        let binding = log.attribs.get(&vertex_array)?.get(&location)?;
        if !binding.enabled {
            return None;
        }
        let data = log.buffers.get(&binding.buffer)?;
        let first = call.byte_offset / call.index_type.size();
        let stride = binding.format.size();

        elements
            .get(first..first + call.count)?
            .iter()
            .map(|&index| {
                let start = binding.offset + index as usize * stride;
                let bytes = data.get(start..start + stride)?;
                Some(
                    bytes
                        .chunks_exact(4)
                        .map(|word| f32::from_ne_bytes([word[0], word[1], word[2], word[3]]))
                        .collect(),
                )
            })
            .collect()
    }

    pub fn clear(&self) {
        self.lock().commands.clear();
    }
}

/// In-memory device recording every call into a [`RecordingHandle`].
#[derive(Debug)]
pub struct RecordingDevice {
    log: RecordingHandle,
    releases: Arc<ReleaseQueue>,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self {
            log: RecordingHandle::default(),
            releases: ReleaseQueue::new(),
        }
    }

    pub fn handle(&self) -> RecordingHandle {
        self.log.clone()
    }

    fn record(&self, command: DeviceCommand) {
        self.log.lock().commands.push(command);
    }

    fn attrib(&self, vertex_array: ResourceId, location: u32, f: impl FnOnce(&mut AttribBinding)) {
        let mut log = self.log.lock();
        if let Some(binding) = log
            .attribs
            .get_mut(&vertex_array)
            .and_then(|bindings| bindings.get_mut(&location))
        {
            f(binding);
        }
    }

    fn draw(&mut self, mode: PrimitiveMode, count: usize, index_type: IndexType, byte_offset: usize, instances: u32) {
        let mut log = self.log.lock();
        let program = log.bound_program;
        let uniforms = program
            .and_then(|id| log.program_state.get(&id).cloned())
            .unwrap_or_default();
        let call = DrawCall {
            program,
            vertex_array: log.bound_vertex_array,
            mode,
            count,
            index_type,
            byte_offset,
            instances,
            uniforms,
        };
        log.commands.push(DeviceCommand::Draw(call));
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_program(&mut self, source: &ProgramSource) -> Result<Program, DeviceError> {
        let mut uniforms = BTreeMap::new();
        for (location, decl) in source.uniforms.iter().enumerate() {
            let uniform = Uniform::new(decl.name.clone(), location as u32, decl.ty.default_value(decl.len));
            if uniforms.insert(decl.name.clone(), uniform).is_some() {
                return Err(DeviceError::ProgramCreation {
                    label: source.label.clone(),
                    reason: format!("uniform '{}' declared twice", decl.name),
                });
            }
        }
        let attributes = source
            .attributes
            .iter()
            .map(|decl| (decl.name.clone(), decl.location))
            .collect();

        let guard = self.releases.allocate(ResourceKind::Program);
        let id = guard.id();
        {
            let mut log = self.log.lock();
            log.program_state.insert(
                id,
                uniforms
                    .values()
                    .map(|u: &Uniform| (u.name().to_string(), u.value().clone()))
                    .collect(),
            );
            log.commands.push(DeviceCommand::CreateProgram {
                id,
                label: source.label.clone(),
            });
        }
        Ok(Program::new(guard, source.label.clone(), uniforms, attributes))
    }

    fn create_buffer(&mut self, target: BufferTarget, usage: BufferUsage) -> Buffer {
        let guard = self.releases.allocate(ResourceKind::Buffer);
        let id = guard.id();
        {
            let mut log = self.log.lock();
            log.buffers.insert(id, Vec::new());
            log.commands.push(DeviceCommand::CreateBuffer { id, target, usage });
        }
        Buffer::new(guard, target, usage)
    }

    fn create_vertex_array(&mut self, elements: &[u32], _usage: BufferUsage) -> VertexArray {
        let guard = self.releases.allocate(ResourceKind::VertexArray);
        let id = guard.id();
        {
            let mut log = self.log.lock();
            log.elements.insert(id, elements.to_vec());
            log.attribs.insert(id, BTreeMap::new());
            log.commands.push(DeviceCommand::CreateVertexArray {
                id,
                elements: elements.len(),
            });
        }
        VertexArray::new(guard, elements.len())
    }

    fn load_buffer_data(&mut self, buffer: ResourceId, data: Option<&[u8]>, size: usize) {
        let mut log = self.log.lock();
        let mut contents = vec![0u8; size];
        if let Some(data) = data {
            contents[..data.len()].copy_from_slice(data);
        }
        log.buffers.insert(buffer, contents);
        log.commands.push(DeviceCommand::LoadBufferData { id: buffer, size });
    }

    fn load_buffer_sub_data(&mut self, buffer: ResourceId, offset: usize, data: &[u8]) {
        let mut log = self.log.lock();
        if let Some(contents) = log.buffers.get_mut(&buffer) {
            contents[offset..offset + data.len()].copy_from_slice(data);
        }
        log.commands.push(DeviceCommand::LoadBufferSubData {
            id: buffer,
            offset,
            len: data.len(),
        });
    }

    fn bind_vertex_array(&mut self, vertex_array: ResourceId) {
        let mut log = self.log.lock();
        log.bound_vertex_array = Some(vertex_array);
        log.commands.push(DeviceCommand::BindVertexArray(vertex_array));
    }

    fn unbind_vertex_array(&mut self) {
        let mut log = self.log.lock();
        log.bound_vertex_array = None;
        log.commands.push(DeviceCommand::UnbindVertexArray);
    }

    fn attrib_pointer(
        &mut self,
        vertex_array: ResourceId,
        buffer: ResourceId,
        location: u32,
        format: AttributeFormat,
        offset: usize,
    ) {
        let mut log = self.log.lock();
        let binding = AttribBinding {
            buffer,
            format,
            offset,
            enabled: false,
        };
        log.attribs.entry(vertex_array).or_default().insert(location, binding);
        log.commands.push(DeviceCommand::AttribPointer {
            vertex_array,
            buffer,
            location,
            format,
            offset,
        });
    }

    fn enable_attrib(&mut self, vertex_array: ResourceId, location: u32) {
        self.attrib(vertex_array, location, |binding| binding.enabled = true);
        self.record(DeviceCommand::EnableAttrib { vertex_array, location });
    }

    fn disable_attrib(&mut self, vertex_array: ResourceId, location: u32) {
        self.attrib(vertex_array, location, |binding| binding.enabled = false);
        self.record(DeviceCommand::DisableAttrib { vertex_array, location });
    }

    fn bind_program(&mut self, program: ResourceId) {
        let mut log = self.log.lock();
        log.bound_program = Some(program);
        log.commands.push(DeviceCommand::BindProgram(program));
    }

    fn unbind_program(&mut self) {
        let mut log = self.log.lock();
        log.bound_program = None;
        log.commands.push(DeviceCommand::UnbindProgram);
    }

    fn apply_uniform(&mut self, program: ResourceId, uniform: &Uniform) {
        let mut log = self.log.lock();
        log.program_state
            .entry(program)
            .or_default()
            .insert(uniform.name().to_string(), uniform.value().clone());
        log.commands.push(DeviceCommand::ApplyUniform {
            program,
            name: uniform.name().to_string(),
            value: uniform.value().clone(),
        });
    }

    fn set_color_mask(&mut self, red: bool, green: bool, blue: bool, alpha: bool) {
        self.record(DeviceCommand::ColorMask(red, green, blue, alpha));
    }

    fn enable_depth_test(&mut self, enabled: bool) {
        self.record(DeviceCommand::DepthTest(enabled));
    }

    fn set_depth_func(&mut self, func: CompareFunc) {
        self.record(DeviceCommand::DepthFunc(func));
    }

    fn set_depth_range(&mut self, near: f32, far: f32) {
        self.record(DeviceCommand::DepthRange(near, far));
    }

    fn enable_depth_mask(&mut self, enabled: bool) {
        self.record(DeviceCommand::DepthMask(enabled));
    }

    fn enable_stencil_test(&mut self, enabled: bool) {
        self.record(DeviceCommand::StencilTest(enabled));
    }

    fn set_stencil_func(&mut self, func: CompareFunc, reference: i32, mask: u32) {
        self.record(DeviceCommand::StencilFunc(func, reference, mask));
    }

    fn set_stencil_op(&mut self, stencil_fail: StencilOp, depth_fail: StencilOp, pass: StencilOp) {
        self.record(DeviceCommand::StencilOp(stencil_fail, depth_fail, pass));
    }

    fn enable_cull_face(&mut self, enabled: bool) {
        self.record(DeviceCommand::CullFace(enabled));
    }

    fn set_cull_face(&mut self, face: Face) {
        self.record(DeviceCommand::CullFaceMode(face));
    }

    fn set_front_face(&mut self, front_face: FrontFace) {
        self.record(DeviceCommand::FrontFace(front_face));
    }

    fn enable_blend(&mut self, enabled: bool) {
        self.record(DeviceCommand::Blend(enabled));
    }

    fn set_blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.record(DeviceCommand::BlendFunc(src, dst));
    }

    fn set_blend_equation(&mut self, equation: BlendEquation) {
        self.record(DeviceCommand::BlendEquation(equation));
    }

    fn clear_buffer(&mut self, buffer: ClearBuffer) {
        self.record(DeviceCommand::Clear(buffer));
    }

    fn clear_color(&mut self, color: Vector4<f32>) {
        self.record(DeviceCommand::ClearColor(color));
    }

    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.record(DeviceCommand::Viewport(x, y, width, height));
    }

    fn draw_elements(&mut self, mode: PrimitiveMode, count: usize, index_type: IndexType, byte_offset: usize) {
        self.draw(mode, count, index_type, byte_offset, 1);
    }

    fn draw_elements_instanced(
        &mut self,
        mode: PrimitiveMode,
        count: usize,
        index_type: IndexType,
        byte_offset: usize,
        instances: u32,
    ) {
        self.draw(mode, count, index_type, byte_offset, instances);
    }

    fn collect_garbage(&mut self) {
        let released = self.releases.drain();
        let mut log = self.log.lock();
        for (kind, id) in released {
            match kind {
                ResourceKind::Program => {
                    log.program_state.remove(&id);
                }
                ResourceKind::Buffer => {
                    log.buffers.remove(&id);
                }
                ResourceKind::VertexArray => {
                    log.elements.remove(&id);
                    log.attribs.remove(&id);
                }
            }
            log.commands.push(DeviceCommand::Release { kind, id });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::device::{AttributeDecl, UniformDecl, UniformType};

    fn source() -> ProgramSource {
        ProgramSource {
            label: "test".to_string(),
            wgsl: "".into(),
            uniforms: vec![
                UniformDecl::new("mvp", UniformType::Mat4),
                UniformDecl::new("tint", UniformType::Vec3),
            ],
            attributes: vec![AttributeDecl::new("vPosition", 0, AttributeFormat::Float32x3)],
        }
    }

    #[test]
    fn test_program_introspection_assigns_locations_in_order() {
        let mut device = RecordingDevice::new();
        let program = device.create_program(&source()).unwrap();

        assert_eq!(program.uniforms()["mvp"].location(), 0);
        assert_eq!(program.uniforms()["tint"].location(), 1);
        assert_eq!(program.uniforms()["tint"].uniform_type(), UniformType::Vec3);
        assert_eq!(program.attribute_location("vPosition"), Some(0));
        assert_eq!(program.attribute_location("vNormal"), None);
    }

    #[test]
    fn test_duplicate_uniform_fails() {
        let mut device = RecordingDevice::new();
        let mut source = source();
        source.uniforms.push(UniformDecl::new("tint", UniformType::Vec3));
        assert!(matches!(
            device.create_program(&source),
            Err(DeviceError::ProgramCreation { .. })
        ));
    }

    #[test]
    fn test_draw_snapshots_program_state() {
        let mut device = RecordingDevice::new();
        let handle = device.handle();
        let program = device.create_program(&source()).unwrap();
        let mut tint = program.uniforms()["tint"].clone();
        tint.set_value(cgmath::Vector3::new(1.0f32, 0.5, 0.25));

        device.bind_program(program.id());
        device.apply_uniform(program.id(), &tint);
        device.draw_elements(PrimitiveMode::Triangles, 3, IndexType::U32, 0);

        let calls = handle.draw_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, Some(program.id()));
        assert_eq!(
            calls[0].uniform("tint"),
            Some(&UniformValue::Vec3(cgmath::Vector3::new(1.0, 0.5, 0.25)))
        );
    }

    #[test]
    fn test_collect_garbage_frees_dropped_resources() {
        let mut device = RecordingDevice::new();
        let handle = device.handle();
        let vao = device.create_vertex_array(&[0, 1, 2], BufferUsage::Static);
        let id = vao.id();
        assert!(handle.elements(id).is_some());

        device.collect_garbage();
        assert!(handle.elements(id).is_some());

        drop(vao);
        device.collect_garbage();
        assert!(handle.elements(id).is_none());
        assert!(handle.commands().contains(&DeviceCommand::Release {
            kind: ResourceKind::VertexArray,
            id
        }));
    }
}
