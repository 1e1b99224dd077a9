//! # Shading Effects
//!
//! An effect owns a compiled program, splits the program's uniforms into
//! effect-wide values (camera, lights) and per-drawable values (material
//! parameters), and draws one batch of drawables per frame.
//!
//! The set of effects is closed: [`Effect`] is an enum over
//! [`ColorEffect`] and [`ForwardPhongEffect`], so batch dispatch is an
//! exhaustive match.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::gfx::camera::Camera;
use crate::gfx::device::{GraphicsDevice, Program, ResourceId, Uniform, UniformValue};
use crate::gfx::drawables::Drawable;

pub mod color;
pub mod phong;
pub mod property;

pub use color::ColorEffect;
pub use phong::{ForwardPhongEffect, MAX_LIGHTS};
pub use property::{ShadingProperty, SharedProperty};

/// Index of an effect registered in a draw context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EffectId(pub usize);

/// A program with its uniforms partitioned into effect-wide and per-drawable sets.
#[derive(Debug)]
pub struct EffectProgram {
    program: Program,
    effect_uniforms: BTreeMap<String, Uniform>,
    drawable_uniforms: BTreeMap<String, Uniform>,
}

impl EffectProgram {
    /// Picks the named uniforms out of `program`.
    ///
    /// Names the program does not declare are skipped. In debug builds a
    /// warning is logged for each, for every name placed in both sets and
    /// for every program uniform placed in neither.
    pub fn partition<E, D>(program: Program, effect_names: E, drawable_names: D) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        let pick = |names: Vec<String>| -> BTreeMap<String, Uniform> {
            names
                .into_iter()
                .filter_map(|name| match program.uniforms().get(&name) {
                    Some(uniform) => Some((name, uniform.clone())),
                    None => {
                        if cfg!(debug_assertions) {
                            warn!("Program '{}' has no uniform '{}'", program.label(), name);
                        }
                        None
                    }
                })
                .collect()
        };
        let effect_uniforms = pick(effect_names.into_iter().map(|n| n.as_ref().to_string()).collect());
        let drawable_uniforms = pick(drawable_names.into_iter().map(|n| n.as_ref().to_string()).collect());

        let partitioned = Self {
            program,
            effect_uniforms,
            drawable_uniforms,
        };
        if cfg!(debug_assertions) {
            let (shared, unassigned) = partitioned.partition_gaps();
            for name in shared {
                warn!(
                    "Uniform '{}' of '{}' is both effect-wide and per-drawable",
                    name,
                    partitioned.program.label()
                );
            }
            for name in unassigned {
                warn!(
                    "Uniform '{}' of '{}' is neither effect-wide nor per-drawable",
                    name,
                    partitioned.program.label()
                );
            }
        }
        partitioned
    }

    /// Names claimed by both sets, and program uniforms claimed by neither.
    /// Both are empty for a well-formed effect.
    pub fn partition_gaps(&self) -> (Vec<String>, Vec<String>) {
        let shared = self
            .effect_uniforms
            .keys()
            .filter(|name| self.drawable_uniforms.contains_key(*name))
            .cloned()
            .collect();
        let unassigned = self
            .program
            .uniforms()
            .keys()
            .filter(|name| !self.effect_uniforms.contains_key(*name) && !self.drawable_uniforms.contains_key(*name))
            .cloned()
            .collect();
        (shared, unassigned)
    }

    pub fn id(&self) -> ResourceId {
        self.program.id()
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn attributes(&self) -> &BTreeMap<String, u32> {
        self.program.attributes()
    }

    pub fn effect_uniforms(&self) -> &BTreeMap<String, Uniform> {
        &self.effect_uniforms
    }

    pub fn drawable_uniforms(&self) -> &BTreeMap<String, Uniform> {
        &self.drawable_uniforms
    }

    /// Stores an effect-wide value; unknown names are skipped.
    pub fn set(&mut self, name: &str, value: impl Into<UniformValue>) {
        match self.effect_uniforms.get_mut(name) {
            Some(uniform) => uniform.set_value(value),
            None => {
                if cfg!(debug_assertions) {
                    debug!("'{}' has no effect uniform '{}'", self.program.label(), name);
                }
            }
        }
    }

    pub fn apply_effect_uniforms(&self, device: &mut dyn GraphicsDevice) {
        for uniform in self.effect_uniforms.values() {
            device.apply_uniform(self.program.id(), uniform);
        }
    }

    /// A fresh property holding the default of every per-drawable uniform.
    pub fn create_property(&self, effect: EffectId) -> ShadingProperty {
        ShadingProperty::new(effect, self.drawable_uniforms.clone())
    }
}

/// The effects a drawable can be shaded with.
#[derive(Debug)]
pub enum Effect {
    Color(ColorEffect),
    ForwardPhong(ForwardPhongEffect),
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::Color(_) => ColorEffect::NAME,
            Effect::ForwardPhong(_) => ForwardPhongEffect::NAME,
        }
    }

    fn program(&self) -> &EffectProgram {
        match self {
            Effect::Color(effect) => effect.program(),
            Effect::ForwardPhong(effect) => effect.program(),
        }
    }

    pub fn program_id(&self) -> ResourceId {
        self.program().id()
    }

    /// Attribute name to location, as queried from the program.
    pub fn attributes(&self) -> &BTreeMap<String, u32> {
        self.program().attributes()
    }

    /// Maximum number of lights one draw applies.
    pub fn light_capacity(&self) -> usize {
        match self {
            Effect::Color(_) => 0,
            Effect::ForwardPhong(_) => MAX_LIGHTS,
        }
    }

    pub fn create_property(&self, id: EffectId) -> ShadingProperty {
        self.program().create_property(id)
    }

    /// Draws one batch: binds the program once, then sets uniforms and issues
    /// each drawable's draw call.
    pub fn draw(
        &mut self,
        device: &mut dyn GraphicsDevice,
        camera: &Camera,
        drawables: &[&Drawable],
        lights: &[&Drawable],
    ) {
        match self {
            Effect::Color(effect) => effect.draw(device, camera, drawables),
            Effect::ForwardPhong(effect) => effect.draw(device, camera, drawables, lights),
        }
    }
}

impl From<ColorEffect> for Effect {
    fn from(effect: ColorEffect) -> Self {
        Effect::Color(effect)
    }
}

impl From<ForwardPhongEffect> for Effect {
    fn from(effect: ForwardPhongEffect) -> Self {
        Effect::ForwardPhong(effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::device::{ProgramSource, RecordingDevice, UniformDecl, UniformType};

    #[test]
    fn test_phong_partition_covers_program() {
        let mut device = RecordingDevice::new();
        let effect = ForwardPhongEffect::new(&mut device).unwrap();
        let program = effect.program();

        assert_eq!(program.drawable_uniforms().len(), 5);
        assert_eq!(program.effect_uniforms().len(), 5 + 3 * MAX_LIGHTS);
        assert_eq!(
            program.effect_uniforms().len() + program.drawable_uniforms().len(),
            program.program().uniforms().len()
        );
        assert!(program
            .effect_uniforms()
            .keys()
            .all(|name| !program.drawable_uniforms().contains_key(name)));
        assert!(program.effect_uniforms().contains_key("lightColor[9]"));
        assert_eq!(program.partition_gaps(), (Vec::new(), Vec::new()));
    }

    #[test]
    fn test_partition_gaps_report_overlap_and_leftover() {
        let mut device = RecordingDevice::new();
        let program = device
            .create_program(&ProgramSource {
                label: "abc".to_string(),
                wgsl: "".into(),
                uniforms: vec![
                    UniformDecl::new("a", UniformType::Float),
                    UniformDecl::new("b", UniformType::Float),
                    UniformDecl::new("c", UniformType::Float),
                ],
                attributes: Vec::new(),
            })
            .unwrap();

        // sizes add up to the program's three uniforms but the sets are wrong
        let partitioned = EffectProgram::partition(program, ["a", "b"], ["b"]);
        assert_eq!(partitioned.effect_uniforms().len() + partitioned.drawable_uniforms().len(), 3);

        let (shared, unassigned) = partitioned.partition_gaps();
        assert_eq!(shared, vec!["b".to_string()]);
        assert_eq!(unassigned, vec!["c".to_string()]);
    }

    #[test]
    fn test_create_property_holds_typed_defaults() {
        let mut device = RecordingDevice::new();
        let effect: Effect = ForwardPhongEffect::new(&mut device).unwrap().into();
        let property = effect.create_property(EffectId(3));

        assert_eq!(property.effect(), EffectId(3));
        assert_eq!(
            property.param_names(),
            vec![
                ForwardPhongEffect::DIFFUSE_COLOR,
                ForwardPhongEffect::DIFFUSE_REFLECTION,
                ForwardPhongEffect::SHININESS,
                ForwardPhongEffect::SPECULAR_COLOR,
                ForwardPhongEffect::SPECULAR_REFLECTION,
            ]
        );
        assert_eq!(
            property.param(ForwardPhongEffect::SHININESS),
            Some(UniformValue::Float(0.0))
        );
        assert_eq!(effect.light_capacity(), MAX_LIGHTS);
    }

    #[test]
    fn test_unknown_names_are_skipped() {
        let mut device = RecordingDevice::new();
        let program = device.create_program(&ColorEffect::source()).unwrap();
        let partitioned = EffectProgram::partition(program, ["modelViewProjMat", "missing"], ["color"]);

        assert_eq!(partitioned.effect_uniforms().len(), 1);
        assert!(!partitioned.effect_uniforms().contains_key("missing"));

        // setting an unknown effect uniform is a no-op
        let mut partitioned = partitioned;
        partitioned.set("missing", 1.0f32);
    }
}
