use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// One output vertex, laid out to match the WGSL `Vertex` struct in a
/// storage buffer (48 bytes, `vec3` members padded to 16).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// World-space position.
    pub position: [f32; 3],
    _pad0: f32,
    /// Unit surface normal.
    pub normal: [f32; 3],
    _pad1: f32,
    /// Linear RGBA color.
    pub color: [f32; 4],
}

const _: () = assert!(size_of::<Vertex>() == 48);

impl Vertex {
    /// Size of one vertex in the storage buffer.
    pub const SIZE: u64 = size_of::<Self>() as u64;

    const ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: 0,
            shader_location: 0,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: 16,
            shader_location: 1,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x4,
            offset: 32,
            shader_location: 2,
        },
    ];

    /// Build a vertex from glam vectors.
    #[must_use]
    pub fn new(position: Vec3, normal: Vec3, color: Vec4) -> Self {
        Self {
            position: position.to_array(),
            _pad0: 0.0,
            normal: normal.to_array(),
            _pad1: 0.0,
            color: color.to_array(),
        }
    }

    /// Position as a glam vector.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    /// Normal as a glam vector.
    #[must_use]
    pub fn normal(&self) -> Vec3 {
        Vec3::from_array(self.normal)
    }

    /// Layout for binding the generated buffer as a vertex buffer:
    /// position at location 0, normal at 1, color at 2.
    #[must_use]
    pub fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::SIZE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_match_storage_offsets() {
        assert_eq!(std::mem::offset_of!(Vertex, position), 0);
        assert_eq!(std::mem::offset_of!(Vertex, normal), 16);
        assert_eq!(std::mem::offset_of!(Vertex, color), 32);

        let layout = Vertex::buffer_layout();
        assert_eq!(layout.array_stride, 48);
        let offsets: Vec<u64> =
            layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 16, 32]);
    }

    #[test]
    fn padding_is_zeroed() {
        let v = Vertex::new(Vec3::ONE, Vec3::Y, Vec4::ONE);
        let words: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&v));
        assert_eq!(words[3], 0.0);
        assert_eq!(words[7], 0.0);
        assert_eq!(v.position(), Vec3::ONE);
        assert_eq!(v.normal(), Vec3::Y);
    }
}
