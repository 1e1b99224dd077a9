// src/wgpu_utils/uniform_layout.rs
//! Packing of declared uniforms into a single WGSL uniform block
//!
//! Members are laid out in declaration order following the WGSL rules for the
//! `uniform` address space, so a shader struct declaring the same members in
//! the same order reads the bytes written here.

use std::collections::HashMap;

use crate::gfx::device::{Uniform, UniformDecl, UniformType};

fn round_up(align: usize, n: usize) -> usize {
    n.div_ceil(align) * align
}

/// `(columns, rows)` of a non-array type; scalars are 1x1, vectors 1xN.
fn shape(ty: UniformType) -> (usize, usize) {
    match ty.element() {
        UniformType::Vec2 => (1, 2),
        UniformType::Vec3 => (1, 3),
        UniformType::Vec4 => (1, 4),
        UniformType::Mat2 => (2, 2),
        UniformType::Mat3 => (3, 3),
        UniformType::Mat4 => (4, 4),
        _ => (1, 1),
    }
}

/// Alignment and size of a vector with `rows` 4-byte components.
fn vector_layout(rows: usize) -> (usize, usize) {
    match rows {
        1 => (4, 4),
        2 => (8, 8),
        3 => (16, 12),
        _ => (16, 16),
    }
}

/// Where one declared member lives inside the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformField {
    pub offset: usize,
    pub ty: UniformType,
    pub len: usize,
    /// Distance between array elements; element size for non-arrays.
    pub stride: usize,
    /// Distance between matrix columns.
    pub column_stride: usize,
}

/// Byte layout of one uniform block.
#[derive(Debug, Clone, Default)]
pub struct UniformLayout {
    fields: HashMap<String, UniformField>,
    size: usize,
}

impl UniformLayout {
    pub fn new(decls: &[UniformDecl]) -> Self {
        let mut fields = HashMap::new();
        let mut offset = 0;
        let mut block_align = 16;

        for decl in decls {
            let (columns, rows) = shape(decl.ty);
            let (column_align, column_size) = vector_layout(rows);
            let column_stride = round_up(column_align, column_size);
            let element_size = if columns == 1 {
                column_size
            } else {
                columns * column_stride
            };

            let (align, stride, len) = if decl.ty.is_array() {
                // uniform arrays need 16-byte aligned elements
                let align = round_up(16, column_align);
                (align, round_up(16, element_size), decl.len)
            } else {
                (column_align, element_size, 1)
            };

            offset = round_up(align, offset);
            fields.insert(
                decl.name.clone(),
                UniformField {
                    offset,
                    ty: decl.ty,
                    len,
                    stride,
                    column_stride,
                },
            );
            offset += if decl.ty.is_array() { stride * len } else { element_size };
            block_align = block_align.max(align);
        }

        Self {
            fields,
            size: round_up(block_align, offset.max(16)),
        }
    }

    /// Block size in bytes, rounded up to the block alignment.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn field(&self, name: &str) -> Option<&UniformField> {
        self.fields.get(name)
    }

    /// Writes `uniform` into its slot of `block`. Returns false for names
    /// outside the layout or values of another type.
    pub fn write(&self, block: &mut [u8], uniform: &Uniform) -> bool {
        let Some(field) = self.fields.get(uniform.name()) else {
            return false;
        };
        if field.ty != uniform.uniform_type() {
            return false;
        }

        let (_, rows) = shape(field.ty);
        for (i, words) in uniform.value().element_words().iter().take(field.len).enumerate() {
            let base = field.offset + i * field.stride;
            for (k, word) in words.iter().enumerate() {
                let at = base + (k / rows) * field.column_stride + (k % rows) * 4;
                if let Some(slot) = block.get_mut(at..at + 4) {
                    slot.copy_from_slice(word);
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::effects::{ColorEffect, ForwardPhongEffect};
    use cgmath::{Matrix3, Vector3};

    #[test]
    fn test_phong_block_layout() {
        let layout = UniformLayout::new(&ForwardPhongEffect::source().uniforms);

        let offset = |name: &str| layout.field(name).unwrap().offset;
        assert_eq!(offset("modelViewProjMat"), 0);
        assert_eq!(offset("modelViewMat"), 64);
        assert_eq!(offset("normalMat"), 128);
        assert_eq!(offset("lightAmbient"), 192);
        assert_eq!(offset("lightCount"), 204);
        assert_eq!(offset("diffuseColor"), 208);
        assert_eq!(offset("diffuseReflection"), 220);
        assert_eq!(offset("specularColor"), 224);
        assert_eq!(offset("specularReflection"), 236);
        assert_eq!(offset("shininess"), 240);

        // light slots pack like an array of {vec3, f32, vec3} structs
        for i in 0..10 {
            assert_eq!(offset(&format!("lightPosition[{i}]")), 256 + 32 * i);
            assert_eq!(offset(&format!("lightRadius[{i}]")), 268 + 32 * i);
            assert_eq!(offset(&format!("lightColor[{i}]")), 272 + 32 * i);
        }
        assert_eq!(layout.size(), 576);
    }

    #[test]
    fn test_color_block_layout() {
        let layout = UniformLayout::new(&ColorEffect::source().uniforms);
        assert_eq!(layout.field("color").unwrap().offset, 64);
        assert_eq!(layout.size(), 80);
    }

    #[test]
    fn test_mat3_columns_are_padded() {
        let layout = UniformLayout::new(&[
            UniformDecl::new("m", UniformType::Mat3),
            UniformDecl::new("after", UniformType::Float),
        ]);
        assert_eq!(layout.field("after").unwrap().offset, 48);

        let mut block = vec![0u8; layout.size()];
        let m = Matrix3::<f32>::from_cols(
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(4.0, 5.0, 6.0),
            Vector3::new(7.0, 8.0, 9.0),
        );
        assert!(layout.write(&mut block, &Uniform::new("m", 0, m.into())));

        let read = |at: usize| f32::from_ne_bytes([block[at], block[at + 1], block[at + 2], block[at + 3]]);
        assert_eq!(read(16), 4.0);
        assert_eq!(read(28), 0.0);
        assert_eq!(read(40), 9.0);
    }

    #[test]
    fn test_float_array_elements_use_16_byte_stride() {
        let layout = UniformLayout::new(&[UniformDecl::array("weights", UniformType::FloatArray, 3)]);
        let field = layout.field("weights").unwrap();
        assert_eq!(field.stride, 16);
        assert_eq!(layout.size(), 48);

        let mut block = vec![0u8; layout.size()];
        let uniform = Uniform::new("weights", 0, vec![1.0f32, 2.0, 3.0].into());
        assert!(layout.write(&mut block, &uniform));
        assert_eq!(f32::from_ne_bytes([block[32], block[33], block[34], block[35]]), 3.0);
    }

    #[test]
    fn test_write_rejects_unknown_or_mistyped() {
        let layout = UniformLayout::new(&[UniformDecl::new("x", UniformType::Float)]);
        let mut block = vec![0u8; layout.size()];
        assert!(!layout.write(&mut block, &Uniform::new("y", 0, 1.0f32.into())));
        assert!(!layout.write(&mut block, &Uniform::new("x", 0, 1i32.into())));
    }
}
