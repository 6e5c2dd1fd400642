//! Tagged uniform values and WGSL uniform-buffer packing.
//!
//! Each pass declares its uniforms as `(name, UniformValue)` pairs at
//! construction. The variant fixes the WGSL type; replacing a value later
//! must keep the variant, so a runtime type mismatch becomes a
//! construction-time shape. Values are packed into the pass's params buffer
//! at draw time following WGSL uniform address-space layout rules, with
//! struct fields laid out in declaration order.

/// A uniform value with its WGSL type baked into the variant.
///
/// `FloatArray` is packed as `array<vec4<f32>, N>` (four floats per
/// element) because WGSL uniform arrays have a 16-byte element stride;
/// shaders index it as `w[i / 4u][i % 4u]`.
#[derive(Clone, Debug, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec4([f32; 4]),
    Mat4([[f32; 4]; 4]),
    FloatArray(Vec<f32>),
}

impl UniformValue {
    /// WGSL alignment of this value in the uniform address space.
    pub fn alignment(&self) -> usize {
        match self {
            UniformValue::Float(_) => 4,
            UniformValue::Vec2(_) => 8,
            UniformValue::Vec4(_) | UniformValue::Mat4(_) | UniformValue::FloatArray(_) => 16,
        }
    }

    /// Packed byte size of this value.
    pub fn size(&self) -> usize {
        match self {
            UniformValue::Float(_) => 4,
            UniformValue::Vec2(_) => 8,
            UniformValue::Vec4(_) => 16,
            UniformValue::Mat4(_) => 64,
            UniformValue::FloatArray(values) => 16 * values.len().div_ceil(4),
        }
    }

    /// True when `other` carries the same WGSL type.
    pub fn same_type(&self, other: &UniformValue) -> bool {
        match (self, other) {
            (UniformValue::Float(_), UniformValue::Float(_)) => true,
            (UniformValue::Vec2(_), UniformValue::Vec2(_)) => true,
            (UniformValue::Vec4(_), UniformValue::Vec4(_)) => true,
            (UniformValue::Mat4(_), UniformValue::Mat4(_)) => true,
            (UniformValue::FloatArray(a), UniformValue::FloatArray(b)) => a.len() == b.len(),
            _ => false,
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        match self {
            UniformValue::Float(v) => out.extend_from_slice(&v.to_le_bytes()),
            UniformValue::Vec2(v) => out.extend_from_slice(bytemuck::cast_slice(v)),
            UniformValue::Vec4(v) => out.extend_from_slice(bytemuck::cast_slice(v)),
            UniformValue::Mat4(m) => {
                for column in m {
                    out.extend_from_slice(bytemuck::cast_slice(column));
                }
            }
            UniformValue::FloatArray(values) => {
                out.extend_from_slice(bytemuck::cast_slice(values));
                // Zero-fill the tail of the last vec4 element.
                let tail = (4 - values.len() % 4) % 4;
                out.extend_from_slice(&[0u8; 4].repeat(tail));
            }
        }
    }
}

fn align_to(offset: usize, alignment: usize) -> usize {
    offset.div_ceil(alignment) * alignment
}

/// Byte offset of each value when packed in declaration order.
pub fn layout_offsets(values: &[(&'static str, UniformValue)]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(values.len());
    let mut offset = 0usize;
    for (_, value) in values {
        offset = align_to(offset, value.alignment());
        offsets.push(offset);
        offset += value.size();
    }
    offsets
}

/// Total packed size, rounded up to the 16-byte struct alignment.
pub fn packed_size(values: &[(&'static str, UniformValue)]) -> usize {
    let mut offset = 0usize;
    for (_, value) in values {
        offset = align_to(offset, value.alignment());
        offset += value.size();
    }
    align_to(offset.max(16), 16)
}

/// Packs values into a byte buffer matching the WGSL struct layout.
pub fn pack(values: &[(&'static str, UniformValue)]) -> Vec<u8> {
    let total = packed_size(values);
    let mut out = Vec::with_capacity(total);
    for (_, value) in values {
        let aligned = align_to(out.len(), value.alignment());
        out.resize(aligned, 0);
        value.write(&mut out);
    }
    out.resize(total, 0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_then_vec4_pads_to_alignment() {
        let values = vec![
            ("threshold", UniformValue::Float(0.5)),
            ("tint", UniformValue::Vec4([1.0, 2.0, 3.0, 4.0])),
        ];
        assert_eq!(layout_offsets(&values), vec![0, 16]);
        assert_eq!(packed_size(&values), 32);

        let bytes = pack(&values);
        assert_eq!(bytes.len(), 32);
        // Padding between the scalar and the vec4 must be zeroed.
        assert_eq!(&bytes[4..16], &[0u8; 12]);
    }

    #[test]
    fn vec2_alignment_is_eight() {
        let values = vec![
            ("a", UniformValue::Float(1.0)),
            ("b", UniformValue::Vec2([2.0, 3.0])),
        ];
        assert_eq!(layout_offsets(&values), vec![0, 8]);
    }

    #[test]
    fn float_array_packs_as_vec4_elements() {
        let values = vec![("weights", UniformValue::FloatArray(vec![0.1; 5]))];
        // Five floats round up to two vec4 elements.
        assert_eq!(packed_size(&values), 32);

        let bytes = pack(&values);
        let floats: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(floats.len(), 8);
        assert_eq!(floats[4], 0.1);
        assert_eq!(floats[5], 0.0);
    }

    #[test]
    fn mat4_occupies_sixty_four_bytes() {
        let values = vec![("m", UniformValue::Mat4([[0.0; 4]; 4]))];
        assert_eq!(packed_size(&values), 64);
        assert_eq!(pack(&values).len(), 64);
    }

    #[test]
    fn empty_declaration_still_meets_minimum_size() {
        assert_eq!(packed_size(&[]), 16);
        assert_eq!(pack(&[]).len(), 16);
    }

    #[test]
    fn same_type_checks_variant_and_array_length() {
        let a = UniformValue::FloatArray(vec![0.0; 4]);
        let b = UniformValue::FloatArray(vec![1.0; 4]);
        let c = UniformValue::FloatArray(vec![1.0; 3]);
        assert!(a.same_type(&b));
        assert!(!a.same_type(&c));
        assert!(!a.same_type(&UniformValue::Vec4([0.0; 4])));
    }
}
