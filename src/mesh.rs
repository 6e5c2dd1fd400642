//! Mesh geometry: vertex format, GPU upload, and procedural primitives.
//!
//! The authored scene is built entirely from procedural primitives; there is
//! no asset import path. Generators are pure (vertices + indices) so they
//! can be tested without a device; [`Mesh::upload`] does the GPU half.

use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::gpu::GpuContext;

/// A 3D vertex with position, normal, and texture coordinates.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex3d {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    /// Vertex buffer layout for pipeline creation.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex3d>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// GPU-resident mesh geometry.
pub struct Mesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl Mesh {
    /// Uploads vertices and indices to the GPU.
    pub fn upload(gpu: &GpuContext, label: &str, vertices: &[Vertex3d], indices: &[u32]) -> Self {
        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }
    }

    /// A flat plane in the XZ plane, facing +Y.
    pub fn plane(gpu: &GpuContext, size: f32) -> Self {
        let (vertices, indices) = plane_geometry(size);
        Self::upload(gpu, "Plane Mesh", &vertices, &indices)
    }

    /// An axis-aligned cube.
    pub fn cube(gpu: &GpuContext, size: f32) -> Self {
        let (vertices, indices) = cube_geometry(size);
        Self::upload(gpu, "Cube Mesh", &vertices, &indices)
    }

    /// A UV sphere.
    pub fn sphere(gpu: &GpuContext, radius: f32, rings: u32, segments: u32) -> Self {
        let (vertices, indices) = sphere_geometry(radius, rings, segments);
        Self::upload(gpu, "Sphere Mesh", &vertices, &indices)
    }

    /// A torus around the Y axis.
    pub fn torus(gpu: &GpuContext, radius: f32, tube: f32, segments: u32, sides: u32) -> Self {
        let (vertices, indices) = torus_geometry(radius, tube, segments, sides);
        Self::upload(gpu, "Torus Mesh", &vertices, &indices)
    }
}

pub fn plane_geometry(size: f32) -> (Vec<Vertex3d>, Vec<u32>) {
    let h = size * 0.5;
    let n = [0.0, 1.0, 0.0];
    let vertices = vec![
        Vertex3d::new([-h, 0.0, -h], n, [0.0, 0.0]),
        Vertex3d::new([h, 0.0, -h], n, [1.0, 0.0]),
        Vertex3d::new([h, 0.0, h], n, [1.0, 1.0]),
        Vertex3d::new([-h, 0.0, h], n, [0.0, 1.0]),
    ];
    let indices = vec![0, 2, 1, 0, 3, 2];
    (vertices, indices)
}

pub fn cube_geometry(size: f32) -> (Vec<Vertex3d>, Vec<u32>) {
    let h = size * 0.5;
    // One face per normal so shading stays flat.
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, tangent, bitangent) in faces {
        let n = Vec3::from(normal);
        let t = Vec3::from(tangent);
        let b = Vec3::from(bitangent);
        let base = vertices.len() as u32;
        for (u, v) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let p = (n + t * u + b * v) * h;
            vertices.push(Vertex3d::new(
                p.to_array(),
                normal,
                [(u + 1.0) * 0.5, (v + 1.0) * 0.5],
            ));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}

pub fn sphere_geometry(radius: f32, rings: u32, segments: u32) -> (Vec<Vertex3d>, Vec<u32>) {
    let rings = rings.max(2);
    let segments = segments.max(3);

    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for ring in 0..=rings {
        let v = ring as f32 / rings as f32;
        let phi = v * std::f32::consts::PI;
        for segment in 0..=segments {
            let u = segment as f32 / segments as f32;
            let theta = u * std::f32::consts::TAU;
            let normal = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            vertices.push(Vertex3d::new(
                (normal * radius).to_array(),
                normal.to_array(),
                [u, v],
            ));
        }
    }

    let stride = segments + 1;
    for ring in 0..rings {
        for segment in 0..segments {
            let a = ring * stride + segment;
            let b = a + stride;
            indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
        }
    }
    (vertices, indices)
}

pub fn torus_geometry(radius: f32, tube: f32, segments: u32, sides: u32) -> (Vec<Vertex3d>, Vec<u32>) {
    let segments = segments.max(3);
    let sides = sides.max(3);

    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for segment in 0..=segments {
        let u = segment as f32 / segments as f32;
        let theta = u * std::f32::consts::TAU;
        let ring_center = Vec3::new(theta.cos() * radius, 0.0, theta.sin() * radius);
        for side in 0..=sides {
            let v = side as f32 / sides as f32;
            let phi = v * std::f32::consts::TAU;
            let normal = Vec3::new(
                theta.cos() * phi.cos(),
                phi.sin(),
                theta.sin() * phi.cos(),
            );
            vertices.push(Vertex3d::new(
                (ring_center + normal * tube).to_array(),
                normal.to_array(),
                [u, v],
            ));
        }
    }

    let stride = sides + 1;
    for segment in 0..segments {
        for side in 0..sides {
            let a = segment * stride + side;
            let b = a + stride;
            indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
        }
    }
    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normals_are_unit(vertices: &[Vertex3d]) -> bool {
        vertices
            .iter()
            .all(|v| (Vec3::from(v.normal).length() - 1.0).abs() < 1e-4)
    }

    #[test]
    fn plane_is_two_triangles() {
        let (vertices, indices) = plane_geometry(10.0);
        assert_eq!(vertices.len(), 4);
        assert_eq!(indices.len(), 6);
        assert!(normals_are_unit(&vertices));
    }

    #[test]
    fn cube_has_flat_faces() {
        let (vertices, indices) = cube_geometry(2.0);
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);
        assert!(normals_are_unit(&vertices));
        // Every vertex sits on the cube surface.
        for v in &vertices {
            let p = Vec3::from(v.position);
            assert!((p.abs().max_element() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let (vertices, indices) = sphere_geometry(3.0, 8, 12);
        assert!(!indices.is_empty());
        assert!(normals_are_unit(&vertices));
        for v in &vertices {
            assert!((Vec3::from(v.position).length() - 3.0).abs() < 1e-4);
        }
    }

    #[test]
    fn torus_indices_stay_in_bounds() {
        let (vertices, indices) = torus_geometry(2.0, 0.5, 16, 8);
        let max = *indices.iter().max().unwrap() as usize;
        assert!(max < vertices.len());
        assert!(normals_are_unit(&vertices));
    }
}
