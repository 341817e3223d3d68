use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Interleaved vertex: position, normal, uv.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// The mesh primitives the pipeline knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshKind {
    /// Unit cube centered at the origin, per-face normals.
    Cube,
    /// Unit quad in the XZ plane at y = 0, normal +Y.
    Quad,
    /// Two-triangle quad spanning NDC, for the lighting pass.
    FullscreenQuad,
}

/// CPU-side mesh data; uploaded once per [`MeshKind`] and cached.
#[derive(Debug, Clone)]
pub struct CpuMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}

impl CpuMesh {
    pub fn build(kind: MeshKind) -> Self {
        match kind {
            MeshKind::Cube => Self::unit_cube(),
            MeshKind::Quad => Self::unit_quad(),
            MeshKind::FullscreenQuad => Self::fullscreen_quad(),
        }
    }

    /// 24 vertices (4 per face, per-face normals), 36 indices, CCW winding
    /// seen from outside.
    pub fn unit_cube() -> Self {
        let mut mesh = Self {
            vertices: Vec::with_capacity(24),
            indices: Vec::with_capacity(36),
        };

        // (normal, four corners CCW when viewed against the normal)
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            (
                [0.0, 0.0, 1.0],
                [
                    [-0.5, -0.5, 0.5],
                    [0.5, -0.5, 0.5],
                    [0.5, 0.5, 0.5],
                    [-0.5, 0.5, 0.5],
                ],
            ),
            (
                [0.0, 0.0, -1.0],
                [
                    [0.5, -0.5, -0.5],
                    [-0.5, -0.5, -0.5],
                    [-0.5, 0.5, -0.5],
                    [0.5, 0.5, -0.5],
                ],
            ),
            (
                [1.0, 0.0, 0.0],
                [
                    [0.5, -0.5, 0.5],
                    [0.5, -0.5, -0.5],
                    [0.5, 0.5, -0.5],
                    [0.5, 0.5, 0.5],
                ],
            ),
            (
                [-1.0, 0.0, 0.0],
                [
                    [-0.5, -0.5, -0.5],
                    [-0.5, -0.5, 0.5],
                    [-0.5, 0.5, 0.5],
                    [-0.5, 0.5, -0.5],
                ],
            ),
            (
                [0.0, 1.0, 0.0],
                [
                    [-0.5, 0.5, 0.5],
                    [0.5, 0.5, 0.5],
                    [0.5, 0.5, -0.5],
                    [-0.5, 0.5, -0.5],
                ],
            ),
            (
                [0.0, -1.0, 0.0],
                [
                    [-0.5, -0.5, -0.5],
                    [0.5, -0.5, -0.5],
                    [0.5, -0.5, 0.5],
                    [-0.5, -0.5, 0.5],
                ],
            ),
        ];

        const UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

        for (normal, corners) in faces {
            mesh.push_face(normal, corners, UVS);
        }
        mesh
    }

    /// Ground plane. Scaled up by the placement transform, so uv tiles are
    /// left at unit scale.
    pub fn unit_quad() -> Self {
        let mut mesh = Self {
            vertices: Vec::with_capacity(4),
            indices: Vec::with_capacity(6),
        };
        mesh.push_face(
            [0.0, 1.0, 0.0],
            [
                [-0.5, 0.0, 0.5],
                [0.5, 0.0, 0.5],
                [0.5, 0.0, -0.5],
                [-0.5, 0.0, -0.5],
            ],
            [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        );
        mesh
    }

    /// NDC-spanning quad; v is flipped so uv (0,0) lands at the top-left of
    /// the render target.
    pub fn fullscreen_quad() -> Self {
        let mut mesh = Self {
            vertices: Vec::with_capacity(4),
            indices: Vec::with_capacity(6),
        };
        mesh.push_face(
            [0.0, 0.0, 1.0],
            [
                [-1.0, -1.0, 0.0],
                [1.0, -1.0, 0.0],
                [1.0, 1.0, 0.0],
                [-1.0, 1.0, 0.0],
            ],
            [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]],
        );
        mesh
    }

    fn push_face(&mut self, normal: [f32; 3], corners: [[f32; 3]; 4], uvs: [[f32; 2]; 4]) {
        let base = self.vertices.len() as u16;
        for (position, uv) in corners.into_iter().zip(uvs) {
            self.vertices.push(Vertex {
                position,
                normal,
                uv,
            });
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

/// Uploaded mesh buffers.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn upload(device: &wgpu::Device, mesh: &CpuMesh, label: &str) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }
}

/// Keyed store of uploaded primitives. Each [`MeshKind`] is generated and
/// uploaded at most once per device.
#[derive(Default)]
pub struct MeshCache {
    meshes: HashMap<MeshKind, GpuMesh>,
}

impl MeshCache {
    /// Uploads the primitive if it is not resident yet.
    pub fn ensure(&mut self, device: &wgpu::Device, kind: MeshKind) -> &GpuMesh {
        self.meshes
            .entry(kind)
            .or_insert_with(|| GpuMesh::upload(device, &CpuMesh::build(kind), "pyre mesh"))
    }

    pub fn get(&self, kind: MeshKind) -> Option<&GpuMesh> {
        self.meshes.get(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_24_vertices_and_36_indices() {
        let cube = CpuMesh::unit_cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
    }

    #[test]
    fn cube_normals_are_axis_aligned_units() {
        for v in CpuMesh::unit_cube().vertices {
            let [x, y, z] = v.normal;
            assert_eq!(x.abs() + y.abs() + z.abs(), 1.0);
        }
    }

    #[test]
    fn cube_indices_are_in_range() {
        let cube = CpuMesh::unit_cube();
        assert!(
            cube.indices
                .iter()
                .all(|&i| (i as usize) < cube.vertices.len())
        );
    }

    #[test]
    fn quad_lies_in_ground_plane() {
        let quad = CpuMesh::unit_quad();
        assert_eq!(quad.vertices.len(), 4);
        for v in quad.vertices {
            assert_eq!(v.position[1], 0.0);
            assert_eq!(v.normal, [0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn fullscreen_quad_spans_ndc() {
        let quad = CpuMesh::fullscreen_quad();
        for v in &quad.vertices {
            assert_eq!(v.position[0].abs(), 1.0);
            assert_eq!(v.position[1].abs(), 1.0);
        }
        // uv is v-flipped relative to NDC y
        let top_left = quad
            .vertices
            .iter()
            .find(|v| v.position == [-1.0, 1.0, 0.0])
            .unwrap();
        assert_eq!(top_left.uv, [0.0, 0.0]);
    }
}
