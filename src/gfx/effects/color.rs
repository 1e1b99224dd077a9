use cgmath::Vector3;

use super::EffectProgram;
use crate::gfx::camera::Camera;
use crate::gfx::device::{
    AttributeDecl, AttributeFormat, DeviceError, GraphicsDevice, ProgramSource, Uniform, UniformDecl, UniformType,
};
use crate::gfx::drawables::Drawable;

/// Unlit single-color shading. Point lights are drawn in their own color.
#[derive(Debug)]
pub struct ColorEffect {
    program: EffectProgram,
}

impl ColorEffect {
    pub const NAME: &'static str = "ColorEffect";

    pub const MVP_MAT: &'static str = "modelViewProjMat";
    pub const COLOR: &'static str = "color";

    pub fn source() -> ProgramSource {
        ProgramSource {
            label: Self::NAME.to_string(),
            wgsl: include_str!("color.wgsl").into(),
            uniforms: vec![
                UniformDecl::new(Self::MVP_MAT, UniformType::Mat4),
                UniformDecl::new(Self::COLOR, UniformType::Vec3),
            ],
            attributes: vec![AttributeDecl::new("vPosition", 0, AttributeFormat::Float32x3)],
        }
    }

    pub fn new(device: &mut dyn GraphicsDevice) -> Result<Self, DeviceError> {
        let program = device.create_program(&Self::source())?;
        Ok(Self {
            program: EffectProgram::partition(program, [Self::MVP_MAT], [Self::COLOR]),
        })
    }

    pub(crate) fn program(&self) -> &EffectProgram {
        &self.program
    }

    pub fn draw(&mut self, device: &mut dyn GraphicsDevice, camera: &Camera, drawables: &[&Drawable]) {
        let program = self.program.id();
        device.bind_program(program);

        let view = camera.view_matrix();
        let projection = camera.projection_matrix();
        for drawable in drawables {
            self.program
                .set(Self::MVP_MAT, projection * view * drawable.transformation());
            self.program.apply_effect_uniforms(device);

            if let Some(property) = drawable.shading_property() {
                let light_color = drawable.as_point_light().map(|light| light.color);
                property.apply_with(device, program, |uniform| light_override(uniform, light_color));
            }

            drawable.draw(device);
        }

        device.unbind_vertex_array();
        device.unbind_program();
    }
}

fn light_override(uniform: &Uniform, light_color: Option<Vector3<f32>>) -> Option<Uniform> {
    let color = light_color?;
    if uniform.name() != ColorEffect::COLOR {
        return None;
    }
    let mut uniform = uniform.clone();
    uniform.try_set_value(color).ok()?;
    Some(uniform)
}
