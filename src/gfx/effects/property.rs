//! # Shading Properties
//!
//! A named bag of per-drawable uniform values bound to one effect.
//!
//! Properties are created by an effect's factory (see
//! [`DrawContext::create_property`](crate::gfx::scene::DrawContext::create_property)),
//! pre-populated with one slot per per-drawable uniform, and shared between
//! drawables through [`SharedProperty`]. Each slot keeps the type the program
//! declared for it.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::warn;

use super::EffectId;
use crate::gfx::device::{GraphicsDevice, ResourceId, Uniform, UniformError, UniformValue};

/// A property shared by every drawable that holds it.
pub type SharedProperty = Arc<ShadingProperty>;

#[derive(Debug)]
pub struct ShadingProperty {
    effect: EffectId,
    values: RwLock<BTreeMap<String, Uniform>>,
}

impl ShadingProperty {
    pub(crate) fn new(effect: EffectId, values: BTreeMap<String, Uniform>) -> Self {
        Self {
            effect,
            values: RwLock::new(values),
        }
    }

    /// The effect this property was created by.
    pub fn effect(&self) -> EffectId {
        self.effect
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Uniform>> {
        match self.values.read() {
            Ok(values) => values,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Uniform>> {
        match self.values.write() {
            Ok(values) => values,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Sets a parameter, keeping its declared type.
    ///
    /// Unknown names are skipped (with a debug diagnostic).
    ///
    /// # Panics
    /// Panics when `value` does not have the parameter's declared type.
    pub fn set_param(&self, name: &str, value: impl Into<UniformValue>) {
        match self.try_set_param(name, value) {
            Ok(()) => {}
            Err(UniformError::UnknownParameter(name)) => {
                if cfg!(debug_assertions) {
                    warn!("Shading property has no parameter '{}', value ignored", name);
                }
            }
            Err(err) => panic!("shading property type contract violated: {err}"),
        }
    }

    pub fn try_set_param(&self, name: &str, value: impl Into<UniformValue>) -> Result<(), UniformError> {
        let mut values = self.write();
        let uniform = values
            .get_mut(name)
            .ok_or_else(|| UniformError::UnknownParameter(name.to_string()))?;
        uniform.try_set_value(value)
    }

    pub fn param(&self, name: &str) -> Option<UniformValue> {
        self.read().get(name).map(|uniform| uniform.value().clone())
    }

    pub fn param_names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Applies every stored value to `program`.
    pub fn apply(&self, device: &mut dyn GraphicsDevice, program: ResourceId) {
        for uniform in self.read().values() {
            device.apply_uniform(program, uniform);
        }
    }

    /// Applies every stored value, letting `substitute` replace some of them.
    pub(crate) fn apply_with(
        &self,
        device: &mut dyn GraphicsDevice,
        program: ResourceId,
        substitute: impl Fn(&Uniform) -> Option<Uniform>,
    ) {
        for uniform in self.read().values() {
            match substitute(uniform) {
                Some(replaced) => device.apply_uniform(program, &replaced),
                None => device.apply_uniform(program, uniform),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::device::UniformType;
    use cgmath::Vector3;

    fn property() -> ShadingProperty {
        let mut values = BTreeMap::new();
        values.insert(
            "diffuseColor".to_string(),
            Uniform::new("diffuseColor", 0, UniformType::Vec3.default_value(1)),
        );
        values.insert(
            "shininess".to_string(),
            Uniform::new("shininess", 1, UniformType::Float.default_value(1)),
        );
        ShadingProperty::new(EffectId(0), values)
    }

    #[test]
    fn test_set_param_keeps_type() {
        let property = property();
        property.set_param("diffuseColor", Vector3::new(1.0f32, 0.0, 0.0));
        property.set_param("shininess", 32.0f32);

        assert_eq!(
            property.param("diffuseColor"),
            Some(UniformValue::Vec3(Vector3::new(1.0, 0.0, 0.0)))
        );
        assert_eq!(property.param("shininess"), Some(UniformValue::Float(32.0)));
    }

    #[test]
    #[should_panic(expected = "type contract")]
    fn test_set_param_mismatch_is_fatal() {
        let property = property();
        property.set_param("shininess", 32i32);
    }

    #[test]
    fn test_try_set_param_never_coerces() {
        let property = property();
        let err = property.try_set_param("shininess", 32.0f64).unwrap_err();
        assert!(matches!(err, UniformError::TypeMismatch { .. }));
        assert_eq!(property.param("shininess"), Some(UniformValue::Float(0.0)));
    }

    #[test]
    fn test_unknown_param_is_skipped() {
        let property = property();
        property.set_param("roughness", 0.5f32);
        assert_eq!(property.param("roughness"), None);
        assert_eq!(
            property.try_set_param("roughness", 0.5f32),
            Err(UniformError::UnknownParameter("roughness".to_string()))
        );
    }
}
