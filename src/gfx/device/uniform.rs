//! # Uniform Values
//!
//! Type-tagged uniform values shared by programs, effects and shading properties.
//!
//! Every uniform slot carries a [`UniformValue`] whose variant is fixed when the
//! program is introspected. Storing a value of any other variant is a contract
//! violation: [`Uniform::set_value`] panics, [`Uniform::try_set_value`] reports
//! a [`UniformError::TypeMismatch`].

use cgmath::{Matrix2, Matrix3, Matrix4, SquareMatrix, Vector2, Vector3, Vector4, Zero};

use super::error::UniformError;

/// The declared type of a uniform slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Int,
    UInt,
    Float,
    Double,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
    IntArray,
    UIntArray,
    FloatArray,
    DoubleArray,
    Vec2Array,
    Vec3Array,
    Vec4Array,
    Mat2Array,
    Mat3Array,
    Mat4Array,
}

impl UniformType {
    /// Returns the element type of an array type, or `self` for scalar types.
    pub fn element(self) -> UniformType {
        match self {
            UniformType::IntArray => UniformType::Int,
            UniformType::UIntArray => UniformType::UInt,
            UniformType::FloatArray => UniformType::Float,
            UniformType::DoubleArray => UniformType::Double,
            UniformType::Vec2Array => UniformType::Vec2,
            UniformType::Vec3Array => UniformType::Vec3,
            UniformType::Vec4Array => UniformType::Vec4,
            UniformType::Mat2Array => UniformType::Mat2,
            UniformType::Mat3Array => UniformType::Mat3,
            UniformType::Mat4Array => UniformType::Mat4,
            scalar => scalar,
        }
    }

    pub fn is_array(self) -> bool {
        self.element() != self
    }

    /// Produces the default value used when a fresh slot is created.
    ///
    /// Matrices default to identity, everything else to zero. Array types are
    /// filled with `len` default elements.
    pub fn default_value(self, len: usize) -> UniformValue {
        match self {
            UniformType::Int => UniformValue::Int(0),
            UniformType::UInt => UniformValue::UInt(0),
            UniformType::Float => UniformValue::Float(0.0),
            UniformType::Double => UniformValue::Double(0.0),
            UniformType::Vec2 => UniformValue::Vec2(Vector2::zero()),
            UniformType::Vec3 => UniformValue::Vec3(Vector3::zero()),
            UniformType::Vec4 => UniformValue::Vec4(Vector4::zero()),
            UniformType::Mat2 => UniformValue::Mat2(Matrix2::identity()),
            UniformType::Mat3 => UniformValue::Mat3(Matrix3::identity()),
            UniformType::Mat4 => UniformValue::Mat4(Matrix4::identity()),
            UniformType::IntArray => UniformValue::IntArray(vec![0; len]),
            UniformType::UIntArray => UniformValue::UIntArray(vec![0; len]),
            UniformType::FloatArray => UniformValue::FloatArray(vec![0.0; len]),
            UniformType::DoubleArray => UniformValue::DoubleArray(vec![0.0; len]),
            UniformType::Vec2Array => UniformValue::Vec2Array(vec![Vector2::zero(); len]),
            UniformType::Vec3Array => UniformValue::Vec3Array(vec![Vector3::zero(); len]),
            UniformType::Vec4Array => UniformValue::Vec4Array(vec![Vector4::zero(); len]),
            UniformType::Mat2Array => UniformValue::Mat2Array(vec![Matrix2::identity(); len]),
            UniformType::Mat3Array => UniformValue::Mat3Array(vec![Matrix3::identity(); len]),
            UniformType::Mat4Array => UniformValue::Mat4Array(vec![Matrix4::identity(); len]),
        }
    }
}

/// A uniform value tagged with its type.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Int(i32),
    UInt(u32),
    Float(f32),
    Double(f64),
    Vec2(Vector2<f32>),
    Vec3(Vector3<f32>),
    Vec4(Vector4<f32>),
    Mat2(Matrix2<f32>),
    Mat3(Matrix3<f32>),
    Mat4(Matrix4<f32>),
    IntArray(Vec<i32>),
    UIntArray(Vec<u32>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    Vec2Array(Vec<Vector2<f32>>),
    Vec3Array(Vec<Vector3<f32>>),
    Vec4Array(Vec<Vector4<f32>>),
    Mat2Array(Vec<Matrix2<f32>>),
    Mat3Array(Vec<Matrix3<f32>>),
    Mat4Array(Vec<Matrix4<f32>>),
}

impl UniformValue {
    pub fn uniform_type(&self) -> UniformType {
        match self {
            UniformValue::Int(_) => UniformType::Int,
            UniformValue::UInt(_) => UniformType::UInt,
            UniformValue::Float(_) => UniformType::Float,
            UniformValue::Double(_) => UniformType::Double,
            UniformValue::Vec2(_) => UniformType::Vec2,
            UniformValue::Vec3(_) => UniformType::Vec3,
            UniformValue::Vec4(_) => UniformType::Vec4,
            UniformValue::Mat2(_) => UniformType::Mat2,
            UniformValue::Mat3(_) => UniformType::Mat3,
            UniformValue::Mat4(_) => UniformType::Mat4,
            UniformValue::IntArray(_) => UniformType::IntArray,
            UniformValue::UIntArray(_) => UniformType::UIntArray,
            UniformValue::FloatArray(_) => UniformType::FloatArray,
            UniformValue::DoubleArray(_) => UniformType::DoubleArray,
            UniformValue::Vec2Array(_) => UniformType::Vec2Array,
            UniformValue::Vec3Array(_) => UniformType::Vec3Array,
            UniformValue::Vec4Array(_) => UniformType::Vec4Array,
            UniformValue::Mat2Array(_) => UniformType::Mat2Array,
            UniformValue::Mat3Array(_) => UniformType::Mat3Array,
            UniformValue::Mat4Array(_) => UniformType::Mat4Array,
        }
    }

    /// Flattens the value into the `f32`/`i32`/`u32` words a shader reads,
    /// one inner `Vec` per element (scalar values yield a single element).
    ///
    /// Matrices are emitted column by column, matching cgmath's storage.
    pub fn element_words(&self) -> Vec<Vec<[u8; 4]>> {
        fn f(x: f32) -> [u8; 4] {
            x.to_ne_bytes()
        }
        fn vec2(v: &Vector2<f32>) -> Vec<[u8; 4]> {
            vec![f(v.x), f(v.y)]
        }
        fn vec3(v: &Vector3<f32>) -> Vec<[u8; 4]> {
            vec![f(v.x), f(v.y), f(v.z)]
        }
        fn vec4(v: &Vector4<f32>) -> Vec<[u8; 4]> {
            vec![f(v.x), f(v.y), f(v.z), f(v.w)]
        }
        fn mat2(m: &Matrix2<f32>) -> Vec<[u8; 4]> {
            [m.x, m.y].iter().flat_map(vec2).collect()
        }
        fn mat3(m: &Matrix3<f32>) -> Vec<[u8; 4]> {
            [m.x, m.y, m.z].iter().flat_map(vec3).collect()
        }
        fn mat4(m: &Matrix4<f32>) -> Vec<[u8; 4]> {
            [m.x, m.y, m.z, m.w].iter().flat_map(vec4).collect()
        }

        match self {
            UniformValue::Int(v) => vec![vec![v.to_ne_bytes()]],
            UniformValue::UInt(v) => vec![vec![v.to_ne_bytes()]],
            UniformValue::Float(v) => vec![vec![f(*v)]],
            UniformValue::Double(v) => vec![vec![f(*v as f32)]],
            UniformValue::Vec2(v) => vec![vec2(v)],
            UniformValue::Vec3(v) => vec![vec3(v)],
            UniformValue::Vec4(v) => vec![vec4(v)],
            UniformValue::Mat2(m) => vec![mat2(m)],
            UniformValue::Mat3(m) => vec![mat3(m)],
            UniformValue::Mat4(m) => vec![mat4(m)],
            UniformValue::IntArray(vs) => vs.iter().map(|v| vec![v.to_ne_bytes()]).collect(),
            UniformValue::UIntArray(vs) => vs.iter().map(|v| vec![v.to_ne_bytes()]).collect(),
            UniformValue::FloatArray(vs) => vs.iter().map(|v| vec![f(*v)]).collect(),
            UniformValue::DoubleArray(vs) => vs.iter().map(|v| vec![f(*v as f32)]).collect(),
            UniformValue::Vec2Array(vs) => vs.iter().map(vec2).collect(),
            UniformValue::Vec3Array(vs) => vs.iter().map(vec3).collect(),
            UniformValue::Vec4Array(vs) => vs.iter().map(vec4).collect(),
            UniformValue::Mat2Array(ms) => ms.iter().map(mat2).collect(),
            UniformValue::Mat3Array(ms) => ms.iter().map(mat3).collect(),
            UniformValue::Mat4Array(ms) => ms.iter().map(mat4).collect(),
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for UniformValue {
                fn from(value: $ty) -> Self {
                    UniformValue::$variant(value)
                }
            }
        )*
    };
}

impl_from_value! {
    i32 => Int,
    u32 => UInt,
    f32 => Float,
    f64 => Double,
    Vector2<f32> => Vec2,
    Vector3<f32> => Vec3,
    Vector4<f32> => Vec4,
    Matrix2<f32> => Mat2,
    Matrix3<f32> => Mat3,
    Matrix4<f32> => Mat4,
    Vec<i32> => IntArray,
    Vec<u32> => UIntArray,
    Vec<f32> => FloatArray,
    Vec<f64> => DoubleArray,
    Vec<Vector2<f32>> => Vec2Array,
    Vec<Vector3<f32>> => Vec3Array,
    Vec<Vector4<f32>> => Vec4Array,
    Vec<Matrix2<f32>> => Mat2Array,
    Vec<Matrix3<f32>> => Mat3Array,
    Vec<Matrix4<f32>> => Mat4Array,
}

/// Declaration of one uniform in a program's interface.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformDecl {
    pub name: String,
    pub ty: UniformType,
    /// Element count for array types; ignored for scalars.
    pub len: usize,
}

impl UniformDecl {
    pub fn new(name: impl Into<String>, ty: UniformType) -> Self {
        Self {
            name: name.into(),
            ty,
            len: 1,
        }
    }

    pub fn array(name: impl Into<String>, ty: UniformType, len: usize) -> Self {
        debug_assert!(ty.is_array(), "array declaration needs an array type");
        Self {
            name: name.into(),
            ty,
            len,
        }
    }
}

/// A named uniform slot bound to a program location.
#[derive(Debug, Clone, PartialEq)]
pub struct Uniform {
    name: String,
    location: u32,
    value: UniformValue,
}

impl Uniform {
    pub fn new(name: impl Into<String>, location: u32, value: UniformValue) -> Self {
        Self {
            name: name.into(),
            location,
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> u32 {
        self.location
    }

    pub fn value(&self) -> &UniformValue {
        &self.value
    }

    pub fn uniform_type(&self) -> UniformType {
        self.value.uniform_type()
    }

    /// Stores a new value of the slot's declared type.
    ///
    /// # Panics
    /// Panics when `value` has a different type than the slot.
    pub fn set_value(&mut self, value: impl Into<UniformValue>) {
        if let Err(err) = self.try_set_value(value) {
            panic!("uniform value has to keep its declared type: {err}");
        }
    }

    pub fn try_set_value(&mut self, value: impl Into<UniformValue>) -> Result<(), UniformError> {
        let value = value.into();
        let expected = self.value.uniform_type();
        let found = value.uniform_type();
        if expected != found {
            return Err(UniformError::TypeMismatch {
                name: self.name.clone(),
                expected,
                found,
            });
        }
        self.value = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_value_same_type() {
        let mut uniform = Uniform::new("shininess", 3, UniformType::Float.default_value(1));
        uniform.set_value(32.0f32);
        assert_eq!(uniform.value(), &UniformValue::Float(32.0));
        assert_eq!(uniform.location(), 3);
    }

    #[test]
    fn test_try_set_value_rejects_mismatch() {
        let mut uniform = Uniform::new("diffuseColor", 0, UniformType::Vec3.default_value(1));
        let err = uniform.try_set_value(1.0f32).unwrap_err();
        assert_eq!(
            err,
            UniformError::TypeMismatch {
                name: "diffuseColor".to_string(),
                expected: UniformType::Vec3,
                found: UniformType::Float,
            }
        );
        // value untouched, no coercion
        assert_eq!(uniform.value(), &UniformValue::Vec3(Vector3::zero()));
    }

    #[test]
    #[should_panic(expected = "declared type")]
    fn test_set_value_mismatch_panics() {
        let mut uniform = Uniform::new("lightCount", 0, UniformType::Int.default_value(1));
        uniform.set_value(1.0f64);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(
            UniformType::Mat4.default_value(1),
            UniformValue::Mat4(Matrix4::identity())
        );
        assert_eq!(
            UniformType::FloatArray.default_value(3),
            UniformValue::FloatArray(vec![0.0; 3])
        );
        assert_eq!(UniformType::Vec3Array.element(), UniformType::Vec3);
        assert!(!UniformType::Vec3.is_array());
    }

    #[test]
    fn test_element_words_matrix_is_column_major() {
        let m = Matrix2::new(1.0f32, 2.0, 3.0, 4.0);
        let words = UniformValue::Mat2(m).element_words();
        let floats: Vec<f32> = words[0].iter().map(|w| f32::from_ne_bytes(*w)).collect();
        assert_eq!(floats, vec![1.0, 2.0, 3.0, 4.0]);
    }
}
