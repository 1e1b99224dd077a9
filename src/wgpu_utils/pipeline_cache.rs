// src/wgpu_utils/pipeline_cache.rs
//! Render pipeline caching for the wgpu device
//!
//! GL-style fixed-function state is folded into a [`PipelineKey`]. Pipelines
//! are created lazily the first time a key is drawn with and reused after.

use std::collections::HashMap;

use log::debug;
use wgpu::*;

use crate::gfx::device::{
    AttributeFormat, BlendEquation, BlendFactor, CompareFunc, Face as CullFace, FrontFace as Winding, PrimitiveMode,
    ResourceId,
};

/// Fixed-function state as last set through the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedFunctionState {
    pub color_mask: [bool; 4],
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_func: CompareFunc,
    pub cull_enabled: bool,
    pub cull_face: CullFace,
    pub front_face: Winding,
    pub blend_enabled: bool,
    pub blend_src: BlendFactor,
    pub blend_dst: BlendFactor,
    pub blend_equation: BlendEquation,
}

impl Default for FixedFunctionState {
    fn default() -> Self {
        Self {
            color_mask: [true; 4],
            depth_test: true,
            depth_write: true,
            depth_func: CompareFunc::Less,
            cull_enabled: false,
            cull_face: CullFace::Back,
            front_face: Winding::Ccw,
            blend_enabled: false,
            blend_src: BlendFactor::One,
            blend_dst: BlendFactor::Zero,
            blend_equation: BlendEquation::Add,
        }
    }
}

impl FixedFunctionState {
    /// GL skips depth writes while the depth test is off.
    pub fn depth_stencil(&self, format: TextureFormat) -> DepthStencilState {
        let (depth_write_enabled, depth_compare) = if self.depth_test {
            (self.depth_write, compare_function(self.depth_func))
        } else {
            (false, CompareFunction::Always)
        };
        DepthStencilState {
            format,
            depth_write_enabled,
            depth_compare,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }
    }

    pub fn blend(&self) -> Option<BlendState> {
        if !self.blend_enabled {
            return None;
        }
        let component = BlendComponent {
            src_factor: blend_factor(self.blend_src),
            dst_factor: blend_factor(self.blend_dst),
            operation: blend_operation(self.blend_equation),
        };
        Some(BlendState {
            color: component,
            alpha: component,
        })
    }

    pub fn color_writes(&self) -> ColorWrites {
        let [r, g, b, a] = self.color_mask;
        let mut writes = ColorWrites::empty();
        if r {
            writes |= ColorWrites::RED;
        }
        if g {
            writes |= ColorWrites::GREEN;
        }
        if b {
            writes |= ColorWrites::BLUE;
        }
        if a {
            writes |= ColorWrites::ALPHA;
        }
        writes
    }

    /// `None` when culling is off or both faces are culled (handled by
    /// skipping the draw).
    pub fn cull_mode(&self) -> Option<Face> {
        if !self.cull_enabled {
            return None;
        }
        match self.cull_face {
            CullFace::Front => Some(Face::Front),
            CullFace::Back => Some(Face::Back),
            CullFace::FrontAndBack => None,
        }
    }

    pub fn culls_everything(&self) -> bool {
        self.cull_enabled && self.cull_face == CullFace::FrontAndBack
    }
}

/// Everything a render pipeline is built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub program: ResourceId,
    pub mode: PrimitiveMode,
    /// One vertex buffer per enabled attribute, sorted by location.
    pub attributes: Vec<(u32, AttributeFormat)>,
    pub state: FixedFunctionState,
}

/// Compiled parts of a program a pipeline needs.
pub struct PipelineProgram<'a> {
    pub label: &'a str,
    pub module: &'a ShaderModule,
    pub layout: &'a PipelineLayout,
}

/// Lazily created pipelines keyed by program and state.
pub struct PipelineCache {
    color_format: TextureFormat,
    depth_format: TextureFormat,
    pipelines: HashMap<PipelineKey, RenderPipeline>,
}

impl PipelineCache {
    pub fn new(color_format: TextureFormat, depth_format: TextureFormat) -> Self {
        Self {
            color_format,
            depth_format,
            pipelines: HashMap::new(),
        }
    }

    /// Creates the pipeline for `key` unless it already exists.
    pub fn prepare(&mut self, device: &Device, key: &PipelineKey, program: PipelineProgram<'_>) {
        if self.pipelines.contains_key(key) {
            return;
        }
        debug!("Creating pipeline #{} for '{}'", self.pipelines.len(), program.label);
        let pipeline = self.create_pipeline(device, key, program);
        self.pipelines.insert(key.clone(), pipeline);
    }

    pub fn get(&self, key: &PipelineKey) -> Option<&RenderPipeline> {
        self.pipelines.get(key)
    }

    /// Drops every pipeline built from `program`.
    pub fn evict_program(&mut self, program: ResourceId) {
        self.pipelines.retain(|key, _| key.program != program);
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    fn create_pipeline(&self, device: &Device, key: &PipelineKey, program: PipelineProgram<'_>) -> RenderPipeline {
        let attributes: Vec<[VertexAttribute; 1]> = key
            .attributes
            .iter()
            .map(|&(location, format)| {
                [VertexAttribute {
                    format: vertex_format(format),
                    offset: 0,
                    shader_location: location,
                }]
            })
            .collect();
        let vertex_buffers: Vec<VertexBufferLayout> = key
            .attributes
            .iter()
            .zip(&attributes)
            .map(|(&(_, format), attribute)| VertexBufferLayout {
                array_stride: format.size() as BufferAddress,
                step_mode: VertexStepMode::Vertex,
                attributes: attribute,
            })
            .collect();

        let color_targets = [Some(ColorTargetState {
            format: self.color_format,
            blend: key.state.blend(),
            write_mask: key.state.color_writes(),
        })];

        device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(program.label),
            layout: Some(program.layout),
            vertex: VertexState {
                module: program.module,
                entry_point: Some("vs_main"),
                buffers: &vertex_buffers,
                compilation_options: PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: program.module,
                entry_point: Some("fs_main"),
                targets: &color_targets,
                compilation_options: PipelineCompilationOptions::default(),
            }),
            primitive: PrimitiveState {
                topology: primitive_topology(key.mode),
                strip_index_format: match key.mode {
                    PrimitiveMode::LineStrip | PrimitiveMode::TriangleStrip => Some(IndexFormat::Uint32),
                    _ => None,
                },
                front_face: match key.state.front_face {
                    Winding::Ccw => FrontFace::Ccw,
                    Winding::Cw => FrontFace::Cw,
                },
                cull_mode: key.state.cull_mode(),
                polygon_mode: PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(key.state.depth_stencil(self.depth_format)),
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }
}

pub fn compare_function(func: CompareFunc) -> CompareFunction {
    match func {
        CompareFunc::Never => CompareFunction::Never,
        CompareFunc::Less => CompareFunction::Less,
        CompareFunc::Equal => CompareFunction::Equal,
        CompareFunc::LessEqual => CompareFunction::LessEqual,
        CompareFunc::Greater => CompareFunction::Greater,
        CompareFunc::NotEqual => CompareFunction::NotEqual,
        CompareFunc::GreaterEqual => CompareFunction::GreaterEqual,
        CompareFunc::Always => CompareFunction::Always,
    }
}

pub fn blend_factor(factor: BlendFactor) -> wgpu::BlendFactor {
    match factor {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
        BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
        BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
    }
}

pub fn blend_operation(equation: BlendEquation) -> BlendOperation {
    match equation {
        BlendEquation::Add => BlendOperation::Add,
        BlendEquation::Subtract => BlendOperation::Subtract,
        BlendEquation::ReverseSubtract => BlendOperation::ReverseSubtract,
        BlendEquation::Min => BlendOperation::Min,
        BlendEquation::Max => BlendOperation::Max,
    }
}

pub fn primitive_topology(mode: PrimitiveMode) -> PrimitiveTopology {
    match mode {
        PrimitiveMode::Points => PrimitiveTopology::PointList,
        PrimitiveMode::Lines => PrimitiveTopology::LineList,
        PrimitiveMode::LineStrip => PrimitiveTopology::LineStrip,
        PrimitiveMode::Triangles => PrimitiveTopology::TriangleList,
        PrimitiveMode::TriangleStrip => PrimitiveTopology::TriangleStrip,
    }
}

pub fn vertex_format(format: AttributeFormat) -> VertexFormat {
    match format {
        AttributeFormat::Float32 => VertexFormat::Float32,
        AttributeFormat::Float32x2 => VertexFormat::Float32x2,
        AttributeFormat::Float32x3 => VertexFormat::Float32x3,
        AttributeFormat::Float32x4 => VertexFormat::Float32x4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_matches_reset_defaults() {
        let state = FixedFunctionState::default();
        let depth = state.depth_stencil(TextureFormat::Depth32Float);
        assert!(depth.depth_write_enabled);
        assert_eq!(depth.depth_compare, CompareFunction::Less);
        assert_eq!(state.blend(), None);
        assert_eq!(state.color_writes(), ColorWrites::ALL);
        assert_eq!(state.cull_mode(), None);
    }

    #[test]
    fn test_disabled_depth_test_never_writes() {
        let state = FixedFunctionState {
            depth_test: false,
            depth_func: CompareFunc::Greater,
            ..Default::default()
        };
        let depth = state.depth_stencil(TextureFormat::Depth32Float);
        assert!(!depth.depth_write_enabled);
        assert_eq!(depth.depth_compare, CompareFunction::Always);
    }

    #[test]
    fn test_blend_and_mask_mapping() {
        let state = FixedFunctionState {
            blend_enabled: true,
            blend_src: BlendFactor::SrcAlpha,
            blend_dst: BlendFactor::OneMinusSrcAlpha,
            color_mask: [true, false, true, false],
            cull_enabled: true,
            cull_face: CullFace::Front,
            ..Default::default()
        };
        let blend = state.blend().unwrap();
        assert_eq!(blend.color.src_factor, wgpu::BlendFactor::SrcAlpha);
        assert_eq!(blend.color.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
        assert_eq!(blend.alpha.operation, BlendOperation::Add);
        assert_eq!(state.color_writes(), ColorWrites::RED | ColorWrites::BLUE);
        assert_eq!(state.cull_mode(), Some(Face::Front));
        assert!(!state.culls_everything());
    }

    #[test]
    fn test_keys_differ_by_state() {
        let key = PipelineKey {
            program: ResourceId(1),
            mode: PrimitiveMode::Triangles,
            attributes: vec![(0, AttributeFormat::Float32x3)],
            state: FixedFunctionState::default(),
        };
        let mut other = key.clone();
        assert_eq!(key, other);
        other.state.depth_write = false;
        assert_ne!(key, other);
    }
}
