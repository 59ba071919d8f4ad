//! Template mesh replicated across all instances.
//!
//! CPU-side geometry with GPU buffer factories and the procedural
//! builders used by the demo scene and tests.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;

/// Vertex format shared by the template builders and the surface shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Template mesh geometry (single submesh).
pub struct MeshTemplate {
    vertices: Vec<MeshVertex>,
    indices: Vec<u32>,
}

impl MeshTemplate {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn vertices(&self) -> &[MeshVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }

    pub fn create_vertex_buffer(&self, device: &wgpu::Device) -> wgpu::Buffer {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Cloner Template Vertex Buffer"),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        })
    }

    pub fn create_index_buffer(&self, device: &wgpu::Device) -> wgpu::Buffer {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Cloner Template Index Buffer"),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        })
    }

    /// Unit cube centered at the origin with flat-shaded faces.
    pub fn cube() -> Self {
        let face = |normal: Vec3, u: Vec3, v: Vec3| -> [MeshVertex; 4] {
            let origin = normal * 0.5;
            let corner = |du: f32, dv: f32| MeshVertex {
                position: (origin + u * du + v * dv).to_array(),
                normal: normal.to_array(),
            };
            [
                corner(-0.5, -0.5),
                corner(0.5, -0.5),
                corner(0.5, 0.5),
                corner(-0.5, 0.5),
            ]
        };

        let faces = [
            face(Vec3::X, Vec3::Y, Vec3::Z),
            face(Vec3::NEG_X, Vec3::Z, Vec3::Y),
            face(Vec3::Y, Vec3::Z, Vec3::X),
            face(Vec3::NEG_Y, Vec3::X, Vec3::Z),
            face(Vec3::Z, Vec3::X, Vec3::Y),
            face(Vec3::NEG_Z, Vec3::Y, Vec3::X),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (f, quad) in faces.iter().enumerate() {
            let base = (f * 4) as u32;
            vertices.extend_from_slice(quad);
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self { vertices, indices }
    }

    /// UV sphere with the given ring/segment resolution (minimum 3 each).
    pub fn uv_sphere(rings: u32, segments: u32) -> Self {
        let rings = rings.max(3);
        let segments = segments.max(3);

        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for r in 0..=rings {
            let phi = std::f32::consts::PI * r as f32 / rings as f32;
            let y = phi.cos();
            let ring_radius = phi.sin();
            for s in 0..=segments {
                let theta = std::f32::consts::TAU * s as f32 / segments as f32;
                let n = Vec3::new(ring_radius * theta.cos(), y, ring_radius * theta.sin());
                vertices.push(MeshVertex {
                    position: (n * 0.5).to_array(),
                    normal: n.to_array(),
                });
            }
        }

        let stride = segments + 1;
        for r in 0..rings {
            for s in 0..segments {
                let a = r * stride + s;
                let b = a + stride;
                indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }

        Self { vertices, indices }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_size() {
        assert_eq!(std::mem::size_of::<MeshVertex>(), 24);
    }

    #[test]
    fn test_cube_counts() {
        let cube = MeshTemplate::cube();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.index_count(), 36);
        for &i in cube.indices() {
            assert!(i < 24);
        }
    }

    #[test]
    fn test_cube_normals_are_axis_aligned() {
        let cube = MeshTemplate::cube();
        for v in cube.vertices() {
            let n = Vec3::from(v.normal);
            assert!((n.length() - 1.0).abs() < 1e-6);
            // Exactly one axis component
            let nonzero = [n.x, n.y, n.z].iter().filter(|c| c.abs() > 1e-6).count();
            assert_eq!(nonzero, 1);
        }
    }

    #[test]
    fn test_sphere_counts() {
        let sphere = MeshTemplate::uv_sphere(8, 12);
        assert_eq!(sphere.vertex_count(), (8 + 1) * (12 + 1));
        assert_eq!(sphere.index_count(), 8 * 12 * 6);
    }

    #[test]
    fn test_sphere_vertices_on_surface() {
        let sphere = MeshTemplate::uv_sphere(6, 8);
        for v in sphere.vertices() {
            let p = Vec3::from(v.position);
            assert!((p.length() - 0.5).abs() < 1e-4);
        }
    }
}
