//! wgpu implementation of the graphics device
//!
//! GL-style calls are recorded during the frame and replayed in a single
//! render pass by [`GraphicsDevice::end_frame`]:
//!
//! - every program packs its declared uniforms into one uniform block; each
//!   draw snapshots the block of the bound program into a per-frame arena and
//!   binds it at a dynamic offset
//! - fixed-function state plus the enabled vertex streams select a cached
//!   render pipeline
//! - depth range maps to the viewport depth bounds; the depth buffer has no
//!   stencil aspect so stencil state is accepted and ignored

use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroU64;
use std::ops::Range;
use std::sync::Arc;

use cgmath::Vector4;
use log::{debug, info, trace, warn};

use super::pipeline_cache::{FixedFunctionState, PipelineCache, PipelineKey, PipelineProgram};
use super::texture_resource::TextureResource;
use super::uniform_layout::UniformLayout;
use crate::gfx::device::{
    AttributeFormat, BlendEquation, BlendFactor, Buffer, BufferTarget, BufferUsage, ClearBuffer, CompareFunc,
    DeviceError, Face, FrontFace, GraphicsDevice, IndexType, PrimitiveMode, Program, ProgramSource, ReleaseQueue,
    ResourceId, ResourceKind, StencilOp, Uniform, VertexArray,
};

struct GpuProgram {
    label: String,
    module: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    layout: UniformLayout,
    block: Vec<u8>,
    attributes: Vec<u32>,
}

struct GpuBuffer {
    target: BufferTarget,
    buffer: Option<wgpu::Buffer>,
    size: usize,
}

#[derive(Debug, Clone, Copy)]
struct AttribBinding {
    buffer: ResourceId,
    format: AttributeFormat,
    offset: usize,
    enabled: bool,
}

struct GpuVertexArray {
    index_buffer: Option<wgpu::Buffer>,
    element_count: usize,
    attribs: BTreeMap<u32, AttribBinding>,
}

#[derive(Debug, Clone, Copy)]
struct Viewport {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    min_depth: f32,
    max_depth: f32,
}

struct RecordedDraw {
    key: PipelineKey,
    vertex_array: ResourceId,
    vertex_buffers: Vec<(ResourceId, u64)>,
    indices: Range<u32>,
    instances: u32,
    uniform_offset: u32,
    viewport: Viewport,
}

fn padded(data: &[u8]) -> Vec<u8> {
    let mut bytes = data.to_vec();
    bytes.resize(data.len().next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT as usize), 0);
    bytes
}

/// [`GraphicsDevice`] rendering to a window surface through wgpu.
pub struct WgpuDevice {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    pipelines: PipelineCache,
    releases: Arc<ReleaseQueue>,

    programs: HashMap<ResourceId, GpuProgram>,
    buffers: HashMap<ResourceId, GpuBuffer>,
    vertex_arrays: HashMap<ResourceId, GpuVertexArray>,

    state: FixedFunctionState,
    bound_program: Option<ResourceId>,
    bound_vertex_array: Option<ResourceId>,
    viewport: Option<(u32, u32, u32, u32)>,
    depth_range: (f32, f32),
    clear_color: wgpu::Color,
    pending_color_clear: Option<wgpu::Color>,
    pending_depth_clear: bool,

    uniform_alignment: usize,
    uniform_arena: Vec<u8>,
    uniform_buffer: Option<wgpu::Buffer>,
    draws: Vec<RecordedDraw>,
}

impl WgpuDevice {
    /// Creates a device rendering into `window`.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<Self, DeviceError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| DeviceError::Initialization(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| DeviceError::Initialization(e.to_string()))?;
        info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("meshview device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| DeviceError::Initialization(e.to_string()))?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| DeviceError::Surface("surface reports no formats".to_string()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = TextureResource::create_depth_texture(&device, &config, "depth_texture");
        let uniform_alignment = device.limits().min_uniform_buffer_offset_alignment as usize;

        Ok(Self {
            surface,
            device: Arc::new(device),
            queue: Arc::new(queue),
            config,
            depth_texture,
            pipelines: PipelineCache::new(format, TextureResource::DEPTH_FORMAT),
            releases: ReleaseQueue::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            state: FixedFunctionState::default(),
            bound_program: None,
            bound_vertex_array: None,
            viewport: None,
            depth_range: (0.0, 1.0),
            clear_color: wgpu::Color::BLACK,
            pending_color_clear: None,
            pending_depth_clear: false,
            uniform_alignment,
            uniform_arena: Vec::new(),
            uniform_buffer: None,
            draws: Vec::new(),
        })
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn current_viewport(&self) -> Viewport {
        let (x, y, width, height) = self.viewport.unwrap_or((0, 0, self.config.width, self.config.height));
        let x = x.min(self.config.width - 1);
        let y = y.min(self.config.height - 1);
        Viewport {
            x: x as f32,
            y: y as f32,
            width: width.clamp(1, self.config.width - x) as f32,
            height: height.clamp(1, self.config.height - y) as f32,
            min_depth: self.depth_range.0.clamp(0.0, 1.0),
            max_depth: self.depth_range.1.clamp(0.0, 1.0),
        }
    }

    fn upload_uniform_arena(&mut self) {
        if self.uniform_arena.is_empty() {
            return;
        }
        let needed = self.uniform_arena.len() as u64;
        let too_small = self
            .uniform_buffer
            .as_ref()
            .is_none_or(|buffer| buffer.size() < needed);
        if too_small {
            let size = needed.next_power_of_two().max(4096);
            debug!("Growing uniform arena to {} bytes", size);
            self.uniform_buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("uniform arena"),
                size,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
        }
        if let Some(buffer) = &self.uniform_buffer {
            self.queue.write_buffer(buffer, 0, &self.uniform_arena);
        }
    }

    fn create_bind_groups(&self) -> HashMap<ResourceId, wgpu::BindGroup> {
        let mut bind_groups = HashMap::new();
        let Some(buffer) = &self.uniform_buffer else {
            return bind_groups;
        };
        for draw in &self.draws {
            let id = draw.key.program;
            if bind_groups.contains_key(&id) {
                continue;
            }
            let Some(program) = self.programs.get(&id) else {
                continue;
            };
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&program.label),
                layout: &program.bind_group_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer,
                        offset: 0,
                        size: NonZeroU64::new(program.layout.size() as u64),
                    }),
                }],
            });
            bind_groups.insert(id, bind_group);
        }
        bind_groups
    }

    fn prepare_pipelines(&mut self) {
        for draw in &self.draws {
            let Some(program) = self.programs.get(&draw.key.program) else {
                continue;
            };
            self.pipelines.prepare(
                &self.device,
                &draw.key,
                PipelineProgram {
                    label: &program.label,
                    module: &program.module,
                    layout: &program.pipeline_layout,
                },
            );
        }
    }

    fn record_draw(&mut self, mode: PrimitiveMode, count: usize, index_type: IndexType, byte_offset: usize, instances: u32) {
        let (Some(program_id), Some(vertex_array_id)) = (self.bound_program, self.bound_vertex_array) else {
            warn!("Draw issued without a bound program and vertex array");
            return;
        };
        if self.state.culls_everything() || count == 0 || instances == 0 {
            return;
        }
        let (Some(program), Some(vertex_array)) =
            (self.programs.get(&program_id), self.vertex_arrays.get(&vertex_array_id))
        else {
            warn!("Draw references released resources");
            return;
        };

        let enabled: Vec<(u32, AttribBinding)> = vertex_array
            .attribs
            .iter()
            .filter(|(location, binding)| binding.enabled && program.attributes.contains(location))
            .map(|(location, binding)| (*location, *binding))
            .collect();
        if enabled.len() != program.attributes.len() {
            trace!("'{}' needs attributes {:?}, skipping draw", program.label, program.attributes);
            return;
        }

        // indices are always uploaded as u32
        let first = (byte_offset / index_type.size()) as u32;
        let last = (first as usize + count).min(vertex_array.element_count) as u32;

        let uniform_offset = self.uniform_arena.len().next_multiple_of(self.uniform_alignment);
        self.uniform_arena.resize(uniform_offset, 0);
        self.uniform_arena.extend_from_slice(&program.block);

        let draw = RecordedDraw {
            key: PipelineKey {
                program: program_id,
                mode,
                attributes: enabled.iter().map(|(location, binding)| (*location, binding.format)).collect(),
                state: self.state,
            },
            vertex_array: vertex_array_id,
            vertex_buffers: enabled
                .iter()
                .map(|(_, binding)| (binding.buffer, binding.offset as u64))
                .collect(),
            indices: first..last,
            instances,
            uniform_offset: uniform_offset as u32,
            viewport: self.current_viewport(),
        };
        self.draws.push(draw);
    }

    fn attrib(&mut self, vertex_array: ResourceId, location: u32, f: impl FnOnce(&mut AttribBinding)) {
        match self
            .vertex_arrays
            .get_mut(&vertex_array)
            .and_then(|vao| vao.attribs.get_mut(&location))
        {
            Some(binding) => f(binding),
            None => debug!("Attribute {} of {:?} has no pointer", location, vertex_array),
        }
    }
}

impl GraphicsDevice for WgpuDevice {
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

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&source.label),
            source: wgpu::ShaderSource::Wgsl(source.wgsl.clone()),
        });
        if let Some(e) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(DeviceError::ProgramCreation {
                label: source.label.clone(),
                reason: e.to_string(),
            });
        }

        let layout = UniformLayout::new(&source.uniforms);
        let mut block = vec![0u8; layout.size()];
        for uniform in uniforms.values() {
            layout.write(&mut block, uniform);
        }

        let bind_group_layout = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} Uniforms", source.label)),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(layout.size() as u64),
                },
                count: None,
            }],
        });
        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Layout", source.label)),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let guard = self.releases.allocate(ResourceKind::Program);
        let id = guard.id();
        self.programs.insert(
            id,
            GpuProgram {
                label: source.label.clone(),
                module,
                bind_group_layout,
                pipeline_layout,
                layout,
                block,
                attributes: source.attributes.iter().map(|a| a.location).collect(),
            },
        );
        let attributes = source
            .attributes
            .iter()
            .map(|decl| (decl.name.clone(), decl.location))
            .collect();
        debug!("Created program '{}' as {:?}", source.label, id);
        Ok(Program::new(guard, source.label.clone(), uniforms, attributes))
    }

    fn create_buffer(&mut self, target: BufferTarget, usage: BufferUsage) -> Buffer {
        let guard = self.releases.allocate(ResourceKind::Buffer);
        self.buffers.insert(
            guard.id(),
            GpuBuffer {
                target,
                buffer: None,
                size: 0,
            },
        );
        Buffer::new(guard, target, usage)
    }

    fn create_vertex_array(&mut self, elements: &[u32], _usage: BufferUsage) -> VertexArray {
        let guard = self.releases.allocate(ResourceKind::VertexArray);
        let index_buffer = (!elements.is_empty()).then(|| {
            let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Index Buffer"),
                size: (elements.len() * 4) as u64,
                usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.queue.write_buffer(&buffer, 0, bytemuck::cast_slice(elements));
            buffer
        });
        self.vertex_arrays.insert(
            guard.id(),
            GpuVertexArray {
                index_buffer,
                element_count: elements.len(),
                attribs: BTreeMap::new(),
            },
        );
        VertexArray::new(guard, elements.len())
    }

    fn load_buffer_data(&mut self, buffer: ResourceId, data: Option<&[u8]>, size: usize) {
        let Some(gpu_buffer) = self.buffers.get_mut(&buffer) else {
            warn!("Loading data into unknown buffer {:?}", buffer);
            return;
        };
        let usage = match gpu_buffer.target {
            BufferTarget::Vertex => wgpu::BufferUsages::VERTEX,
            BufferTarget::Index => wgpu::BufferUsages::INDEX,
            BufferTarget::Uniform => wgpu::BufferUsages::UNIFORM,
        } | wgpu::BufferUsages::COPY_DST;

        let allocation = size.max(1).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT as usize);
        let wgpu_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Vertex Buffer"),
            size: allocation as u64,
            usage,
            mapped_at_creation: false,
        });
        if let Some(data) = data {
            self.queue.write_buffer(&wgpu_buffer, 0, &padded(&data[..data.len().min(size)]));
        }
        gpu_buffer.buffer = Some(wgpu_buffer);
        gpu_buffer.size = size;
    }

    fn load_buffer_sub_data(&mut self, buffer: ResourceId, offset: usize, data: &[u8]) {
        let Some(GpuBuffer {
            buffer: Some(wgpu_buffer),
            size,
            ..
        }) = self.buffers.get(&buffer)
        else {
            warn!("Loading sub data into unallocated buffer {:?}", buffer);
            return;
        };
        if offset + data.len() > *size {
            warn!("Sub data of {} bytes at {} overflows {:?}", data.len(), offset, buffer);
            return;
        }
        if offset % wgpu::COPY_BUFFER_ALIGNMENT as usize != 0 {
            warn!("Unaligned sub data offset {} for {:?}", offset, buffer);
            return;
        }
        self.queue.write_buffer(wgpu_buffer, offset as u64, &padded(data));
    }

    fn bind_vertex_array(&mut self, vertex_array: ResourceId) {
        self.bound_vertex_array = Some(vertex_array);
    }

    fn unbind_vertex_array(&mut self) {
        self.bound_vertex_array = None;
    }

    fn attrib_pointer(
        &mut self,
        vertex_array: ResourceId,
        buffer: ResourceId,
        location: u32,
        format: AttributeFormat,
        offset: usize,
    ) {
        if let Some(vao) = self.vertex_arrays.get_mut(&vertex_array) {
            let enabled = vao.attribs.get(&location).is_some_and(|b| b.enabled);
            vao.attribs.insert(
                location,
                AttribBinding {
                    buffer,
                    format,
                    offset,
                    enabled,
                },
            );
        }
    }

    fn enable_attrib(&mut self, vertex_array: ResourceId, location: u32) {
        self.attrib(vertex_array, location, |binding| binding.enabled = true);
    }

    fn disable_attrib(&mut self, vertex_array: ResourceId, location: u32) {
        self.attrib(vertex_array, location, |binding| binding.enabled = false);
    }

    fn bind_program(&mut self, program: ResourceId) {
        self.bound_program = Some(program);
    }

    fn unbind_program(&mut self) {
        self.bound_program = None;
    }

    fn apply_uniform(&mut self, program: ResourceId, uniform: &Uniform) {
        let Some(gpu_program) = self.programs.get_mut(&program) else {
            return;
        };
        if !gpu_program.layout.write(&mut gpu_program.block, uniform) && cfg!(debug_assertions) {
            debug!("'{}' has no uniform '{}'", gpu_program.label, uniform.name());
        }
    }

    fn set_color_mask(&mut self, red: bool, green: bool, blue: bool, alpha: bool) {
        self.state.color_mask = [red, green, blue, alpha];
    }

    fn enable_depth_test(&mut self, enabled: bool) {
        self.state.depth_test = enabled;
    }

    fn set_depth_func(&mut self, func: CompareFunc) {
        self.state.depth_func = func;
    }

    fn set_depth_range(&mut self, near: f32, far: f32) {
        self.depth_range = (near, far);
    }

    fn enable_depth_mask(&mut self, enabled: bool) {
        self.state.depth_write = enabled;
    }

    fn enable_stencil_test(&mut self, enabled: bool) {
        if enabled {
            trace!("Stencil test requested, depth target has no stencil aspect");
        }
    }

    fn set_stencil_func(&mut self, _func: CompareFunc, _reference: i32, _mask: u32) {}

    fn set_stencil_op(&mut self, _stencil_fail: StencilOp, _depth_fail: StencilOp, _pass: StencilOp) {}

    fn enable_cull_face(&mut self, enabled: bool) {
        self.state.cull_enabled = enabled;
    }

    fn set_cull_face(&mut self, face: Face) {
        self.state.cull_face = face;
    }

    fn set_front_face(&mut self, front_face: FrontFace) {
        self.state.front_face = front_face;
    }

    fn enable_blend(&mut self, enabled: bool) {
        self.state.blend_enabled = enabled;
    }

    fn set_blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.state.blend_src = src;
        self.state.blend_dst = dst;
    }

    fn set_blend_equation(&mut self, equation: BlendEquation) {
        self.state.blend_equation = equation;
    }

    /// Clears only take effect before the first draw of a frame.
    fn clear_buffer(&mut self, buffer: ClearBuffer) {
        if !self.draws.is_empty() {
            trace!("Ignoring {:?} clear after draws were recorded", buffer);
            return;
        }
        match buffer {
            ClearBuffer::Color => self.pending_color_clear = Some(self.clear_color),
            ClearBuffer::Depth => self.pending_depth_clear = true,
            ClearBuffer::Stencil => {}
        }
    }

    fn clear_color(&mut self, color: Vector4<f32>) {
        self.clear_color = wgpu::Color {
            r: color.x as f64,
            g: color.y as f64,
            b: color.z as f64,
            a: color.w as f64,
        };
    }

    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.viewport = Some((x, y, width, height));
    }

    fn draw_elements(&mut self, mode: PrimitiveMode, count: usize, index_type: IndexType, byte_offset: usize) {
        self.record_draw(mode, count, index_type, byte_offset, 1);
    }

    fn draw_elements_instanced(
        &mut self,
        mode: PrimitiveMode,
        count: usize,
        index_type: IndexType,
        byte_offset: usize,
        instances: u32,
    ) {
        self.record_draw(mode, count, index_type, byte_offset, instances);
    }

    fn collect_garbage(&mut self) {
        for (kind, id) in self.releases.drain() {
            trace!("Releasing {} {:?}", kind.label(), id);
            match kind {
                ResourceKind::Program => {
                    self.programs.remove(&id);
                    self.pipelines.evict_program(id);
                }
                ResourceKind::Buffer => {
                    self.buffers.remove(&id);
                }
                ResourceKind::VertexArray => {
                    self.vertex_arrays.remove(&id);
                }
            }
        }
    }

    fn begin_frame(&mut self) {
        self.collect_garbage();
        self.draws.clear();
        self.uniform_arena.clear();
        self.pending_color_clear = None;
        self.pending_depth_clear = false;
    }

    fn end_frame(&mut self) -> Result<(), DeviceError> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                self.draws.clear();
                return Err(DeviceError::Surface("surface lost, reconfigured".to_string()));
            }
            Err(e) => {
                self.draws.clear();
                return Err(DeviceError::Surface(e.to_string()));
            }
        };

        self.upload_uniform_arena();
        self.prepare_pipelines();
        let bind_groups = self.create_bind_groups();

        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: match self.pending_color_clear {
                            Some(color) => wgpu::LoadOp::Clear(color),
                            None => wgpu::LoadOp::Load,
                        },
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: if self.pending_depth_clear {
                            wgpu::LoadOp::Clear(1.0)
                        } else {
                            wgpu::LoadOp::Load
                        },
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            'draws: for draw in &self.draws {
                let (Some(pipeline), Some(bind_group), Some(vertex_array)) = (
                    self.pipelines.get(&draw.key),
                    bind_groups.get(&draw.key.program),
                    self.vertex_arrays.get(&draw.vertex_array),
                ) else {
                    continue;
                };
                let Some(index_buffer) = &vertex_array.index_buffer else {
                    continue;
                };

                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, bind_group, &[draw.uniform_offset]);
                for (slot, (buffer, offset)) in draw.vertex_buffers.iter().enumerate() {
                    let Some(buffer) = self.buffers.get(buffer).and_then(|b| b.buffer.as_ref()) else {
                        continue 'draws;
                    };
                    render_pass.set_vertex_buffer(slot as u32, buffer.slice(*offset..));
                }
                render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);

                let v = draw.viewport;
                render_pass.set_viewport(v.x, v.y, v.width, v.height, v.min_depth, v.max_depth);
                render_pass.draw_indexed(draw.indices.clone(), 0, 0..draw.instances);
            }
        }

        trace!("Submitting {} draws", self.draws.len());
        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        self.draws.clear();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = TextureResource::create_depth_texture(&self.device, &self.config, "depth_texture");
        self.viewport = None;
    }
}
