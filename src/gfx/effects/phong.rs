use cgmath::{Matrix, Matrix4, SquareMatrix, Vector3};

use super::EffectProgram;
use crate::gfx::camera::Camera;
use crate::gfx::device::{
    AttributeDecl, AttributeFormat, DeviceError, GraphicsDevice, ProgramSource, UniformDecl, UniformType,
};
use crate::gfx::drawables::Drawable;

/// Number of point lights one Phong draw applies.
pub const MAX_LIGHTS: usize = 10;

/// Per-pixel Phong shading lit by up to [`MAX_LIGHTS`] point lights.
///
/// Light data is effect-wide and indexed by slot: `lightPosition[i]`,
/// `lightRadius[i]` and `lightColor[i]`, with positions in view space. The
/// first lights of the batch's light list fill the slots; the rest are dropped.
#[derive(Debug)]
pub struct ForwardPhongEffect {
    program: EffectProgram,
    ambient: Vector3<f32>,
}

impl ForwardPhongEffect {
    pub const NAME: &'static str = "ForwardPhongEffect";

    pub const DIFFUSE_COLOR: &'static str = "diffuseColor";
    pub const SPECULAR_COLOR: &'static str = "specularColor";
    pub const DIFFUSE_REFLECTION: &'static str = "diffuseReflection";
    pub const SPECULAR_REFLECTION: &'static str = "specularReflection";
    pub const SHININESS: &'static str = "shininess";

    pub const MVP_MAT: &'static str = "modelViewProjMat";
    pub const MV_MAT: &'static str = "modelViewMat";
    pub const NORMAL_MAT: &'static str = "normalMat";
    pub const LIGHT_AMBIENT: &'static str = "lightAmbient";
    pub const LIGHT_COUNT: &'static str = "lightCount";
    pub const LIGHT_POSITION: &'static str = "lightPosition";
    pub const LIGHT_RADIUS: &'static str = "lightRadius";
    pub const LIGHT_COLOR: &'static str = "lightColor";

    /// Uniform name of one light slot's field, e.g. `lightColor[3]`.
    pub fn light_uniform(field: &str, index: usize) -> String {
        format!("{field}[{index}]")
    }

    fn light_fields() -> [(&'static str, UniformType); 3] {
        [
            (Self::LIGHT_POSITION, UniformType::Vec3),
            (Self::LIGHT_RADIUS, UniformType::Float),
            (Self::LIGHT_COLOR, UniformType::Vec3),
        ]
    }

    fn effect_uniform_names() -> Vec<String> {
        let mut names: Vec<String> = [
            Self::MVP_MAT,
            Self::MV_MAT,
            Self::NORMAL_MAT,
            Self::LIGHT_AMBIENT,
            Self::LIGHT_COUNT,
        ]
        .iter()
        .map(|name| name.to_string())
        .collect();
        for i in 0..MAX_LIGHTS {
            for (field, _) in Self::light_fields() {
                names.push(Self::light_uniform(field, i));
            }
        }
        names
    }

    fn drawable_uniform_names() -> [&'static str; 5] {
        [
            Self::DIFFUSE_COLOR,
            Self::DIFFUSE_REFLECTION,
            Self::SPECULAR_COLOR,
            Self::SPECULAR_REFLECTION,
            Self::SHININESS,
        ]
    }

    /// Declaration order matches the members of the shader's uniform block.
    pub fn source() -> ProgramSource {
        let mut uniforms = vec![
            UniformDecl::new(Self::MVP_MAT, UniformType::Mat4),
            UniformDecl::new(Self::MV_MAT, UniformType::Mat4),
            UniformDecl::new(Self::NORMAL_MAT, UniformType::Mat4),
            UniformDecl::new(Self::LIGHT_AMBIENT, UniformType::Vec3),
            UniformDecl::new(Self::LIGHT_COUNT, UniformType::Int),
            UniformDecl::new(Self::DIFFUSE_COLOR, UniformType::Vec3),
            UniformDecl::new(Self::DIFFUSE_REFLECTION, UniformType::Float),
            UniformDecl::new(Self::SPECULAR_COLOR, UniformType::Vec3),
            UniformDecl::new(Self::SPECULAR_REFLECTION, UniformType::Float),
            UniformDecl::new(Self::SHININESS, UniformType::Float),
        ];
        for i in 0..MAX_LIGHTS {
            for (field, ty) in Self::light_fields() {
                uniforms.push(UniformDecl::new(Self::light_uniform(field, i), ty));
            }
        }

        ProgramSource {
            label: Self::NAME.to_string(),
            wgsl: include_str!("phong.wgsl").into(),
            uniforms,
            attributes: vec![
                AttributeDecl::new("vPosition", 0, AttributeFormat::Float32x3),
                AttributeDecl::new("vNormal", 1, AttributeFormat::Float32x3),
            ],
        }
    }

    pub fn new(device: &mut dyn GraphicsDevice) -> Result<Self, DeviceError> {
        let program = device.create_program(&Self::source())?;
        Ok(Self {
            program: EffectProgram::partition(
                program,
                Self::effect_uniform_names(),
                Self::drawable_uniform_names(),
            ),
            ambient: Vector3::new(0.1, 0.1, 0.1),
        })
    }

    pub(crate) fn program(&self) -> &EffectProgram {
        &self.program
    }

    pub fn ambient(&self) -> Vector3<f32> {
        self.ambient
    }

    pub fn set_ambient(&mut self, ambient: Vector3<f32>) {
        self.ambient = ambient;
    }

    pub fn draw(
        &mut self,
        device: &mut dyn GraphicsDevice,
        camera: &Camera,
        drawables: &[&Drawable],
        lights: &[&Drawable],
    ) {
        let program = self.program.id();
        device.bind_program(program);

        let view = camera.view_matrix();
        let projection = camera.projection_matrix();

        let applied = lights.len().min(MAX_LIGHTS);
        self.program.set(Self::LIGHT_AMBIENT, self.ambient);
        self.program.set(Self::LIGHT_COUNT, applied as i32);
        for (i, drawable) in lights.iter().take(applied).enumerate() {
            let Some(light) = drawable.as_point_light() else {
                continue;
            };
            let position = view * drawable.world_position().extend(1.0);
            self.program
                .set(&Self::light_uniform(Self::LIGHT_POSITION, i), position.truncate());
            self.program
                .set(&Self::light_uniform(Self::LIGHT_RADIUS, i), light.radius);
            self.program
                .set(&Self::light_uniform(Self::LIGHT_COLOR, i), light.color);
        }

        for drawable in drawables {
            let model_view = view * drawable.transformation();
            let normal_mat = model_view
                .invert()
                .unwrap_or_else(Matrix4::identity)
                .transpose();
            self.program.set(Self::MVP_MAT, projection * model_view);
            self.program.set(Self::MV_MAT, model_view);
            self.program.set(Self::NORMAL_MAT, normal_mat);
            self.program.apply_effect_uniforms(device);

            if let Some(property) = drawable.shading_property() {
                property.apply(device, program);
            }

            drawable.draw(device);
        }

        device.unbind_vertex_array();
        device.unbind_program();
    }
}
