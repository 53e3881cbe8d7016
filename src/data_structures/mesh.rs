//! Indexed triangle meshes.
//!
//! [`Mesh`] is the data model shared by the whole crate: primitives, L-system
//! output, cloth, LOD levels and loaded OBJ files all end up as a `Mesh`, and
//! the renderer uploads it as-is.

use std::collections::HashMap;

use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, SquareMatrix, Transform, Vector2, Vector3, Zero};

use crate::math::{safe_normalize, Aabb};

/// Types that describe their own vertex buffer layout.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
}

impl ModelVertex {
    pub fn new(position: [f32; 3], tex_coords: [f32; 2]) -> Self {
        Self {
            position,
            tex_coords,
            ..Default::default()
        }
    }

    pub fn pos(&self) -> Vector3<f32> {
        self.position.into()
    }
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MeshError {
    #[error("index {index} out of range for mesh with {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("a polygon needs at least 3 points, got {0}")]
    TooFewPoints(usize),
    #[error("index buffer length {0} is not a multiple of 3")]
    BrokenIndexBuffer(usize),
}

/// An indexed triangle list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Build from raw buffers, checking that every index is in range.
    pub fn from_parts(
        name: &str,
        vertices: Vec<ModelVertex>,
        indices: Vec<u32>,
    ) -> Result<Self, MeshError> {
        if indices.len() % 3 != 0 {
            return Err(MeshError::BrokenIndexBuffer(indices.len()));
        }
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertex_count: vertices.len(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            vertices,
            indices,
        })
    }

    /// Append a vertex and return its index.
    pub fn add_vertex(&mut self, vertex: ModelVertex) -> u32 {
        self.vertices.push(vertex);
        (self.vertices.len() - 1) as u32
    }

    pub fn add_triangle(&mut self, a: u32, b: u32, c: u32) -> Result<(), MeshError> {
        for index in [a, b, c] {
            if index as usize >= self.vertices.len() {
                return Err(MeshError::IndexOutOfRange {
                    index,
                    vertex_count: self.vertices.len(),
                });
            }
        }
        self.indices.extend_from_slice(&[a, b, c]);
        Ok(())
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn position(&self, index: u32) -> Vector3<f32> {
        self.vertices[index as usize].pos()
    }

    /// Iterate triangle corner positions. Triangles with out-of-range indices are skipped.
    pub fn triangles(&self) -> impl Iterator<Item = [Vector3<f32>; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(move |c| {
            let a = self.vertices.get(c[0] as usize)?;
            let b = self.vertices.get(c[1] as usize)?;
            let d = self.vertices.get(c[2] as usize)?;
            Some([a.pos(), b.pos(), d.pos()])
        })
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter().map(ModelVertex::pos))
    }

    pub fn surface_area(&self) -> f32 {
        self.triangles()
            .map(|[a, b, c]| (b - a).cross(c - a).magnitude() * 0.5)
            .sum()
    }

    /// Signed volume enclosed by the mesh. Positive for closed meshes with
    /// counter-clockwise (outward) winding.
    pub fn signed_volume(&self) -> f32 {
        self.triangles()
            .map(|[a, b, c]| a.dot(b.cross(c)) / 6.0)
            .sum()
    }

    /// Recompute smooth normals, weighting each face normal by its area.
    pub fn compute_normals(&mut self) {
        let mut normals = vec![Vector3::zero(); self.vertices.len()];
        for c in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (c[0] as usize, c[1] as usize, c[2] as usize);
            if i0 >= normals.len() || i1 >= normals.len() || i2 >= normals.len() {
                continue;
            }
            let p0 = self.vertices[i0].pos();
            let p1 = self.vertices[i1].pos();
            let p2 = self.vertices[i2].pos();
            // The cross product's length is twice the area, which gives us the weighting for free
            let face = (p1 - p0).cross(p2 - p0);
            normals[i0] += face;
            normals[i1] += face;
            normals[i2] += face;
        }
        for (vertex, normal) in self.vertices.iter_mut().zip(normals) {
            vertex.normal = safe_normalize(normal).into();
        }
    }

    /// Tangents for normal mapping, averaged over the triangles sharing a vertex.
    pub fn compute_tangents(&mut self) {
        let mut tangents = vec![Vector3::zero(); self.vertices.len()];
        let mut triangles_included = vec![0u32; self.vertices.len()];

        for c in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (c[0] as usize, c[1] as usize, c[2] as usize);
            if i0 >= tangents.len() || i1 >= tangents.len() || i2 >= tangents.len() {
                continue;
            }
            let v0 = self.vertices[i0];
            let v1 = self.vertices[i1];
            let v2 = self.vertices[i2];

            let delta_pos1 = v1.pos() - v0.pos();
            let delta_pos2 = v2.pos() - v0.pos();
            let delta_uv1 = Vector2::from(v1.tex_coords) - Vector2::from(v0.tex_coords);
            let delta_uv2 = Vector2::from(v2.tex_coords) - Vector2::from(v0.tex_coords);

            // Solving the following system of equations gives us the tangent:
            //     delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
            //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
            let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
            if det.abs() < f32::EPSILON {
                continue;
            }
            let r = 1.0 / det;
            let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;

            for i in [i0, i1, i2] {
                tangents[i] += tangent;
                triangles_included[i] += 1;
            }
        }

        for ((vertex, tangent), n) in self.vertices.iter_mut().zip(tangents).zip(triangles_included) {
            if n > 0 {
                vertex.tangent = safe_normalize(tangent / n as f32).into();
            }
        }
    }

    /// Apply an affine transform to positions; normals use the inverse transpose.
    pub fn transform(&mut self, matrix: &Matrix4<f32>) {
        let linear = Matrix3::new(
            matrix.x.x, matrix.x.y, matrix.x.z, matrix.y.x, matrix.y.y, matrix.y.z, matrix.z.x,
            matrix.z.y, matrix.z.z,
        );
        let normal_matrix = linear
            .invert()
            .map(|m| m.transpose())
            .unwrap_or(linear);
        for vertex in &mut self.vertices {
            let p = matrix.transform_point(cgmath::Point3::from(vertex.position));
            vertex.position = p.into();
            let n = normal_matrix * Vector3::from(vertex.normal);
            vertex.normal = safe_normalize(n).into();
            let t = linear * Vector3::from(vertex.tangent);
            vertex.tangent = safe_normalize(t).into();
        }
    }

    /// Append another mesh, offsetting its indices.
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i + offset));
    }

    /// Merge vertices whose positions lie within `eps` of each other.
    ///
    /// Uses a hash grid with cell size `eps`, so only neighbouring cells are
    /// compared. Triangles that collapse are dropped. Returns the number of
    /// removed vertices.
    pub fn weld(&mut self, eps: f32) -> usize {
        let eps = eps.max(f32::EPSILON);
        let cell = |p: Vector3<f32>| {
            (
                (p.x / eps).floor() as i64,
                (p.y / eps).floor() as i64,
                (p.z / eps).floor() as i64,
            )
        };
        let mut grid: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
        let mut remap = Vec::with_capacity(self.vertices.len());
        let mut welded: Vec<ModelVertex> = Vec::new();

        for vertex in &self.vertices {
            let p = vertex.pos();
            let (cx, cy, cz) = cell(p);
            let mut found = None;
            'search: for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        if let Some(candidates) = grid.get(&(cx + dx, cy + dy, cz + dz)) {
                            for &candidate in candidates {
                                if (welded[candidate as usize].pos() - p).magnitude2() <= eps * eps {
                                    found = Some(candidate);
                                    break 'search;
                                }
                            }
                        }
                    }
                }
            }
            let index = match found {
                Some(index) => index,
                None => {
                    welded.push(*vertex);
                    let index = (welded.len() - 1) as u32;
                    grid.entry((cx, cy, cz)).or_default().push(index);
                    index
                }
            };
            remap.push(index);
        }

        let removed = self.vertices.len() - welded.len();
        let mut indices = Vec::with_capacity(self.indices.len());
        for c in self.indices.chunks_exact(3) {
            let (Some(&a), Some(&b), Some(&d)) = (
                remap.get(c[0] as usize),
                remap.get(c[1] as usize),
                remap.get(c[2] as usize),
            ) else {
                continue;
            };
            if a != b && b != d && a != d {
                indices.extend_from_slice(&[a, b, d]);
            }
        }
        self.vertices = welded;
        self.indices = indices;
        removed
    }

    // Primitive builders

    /// A single counter-clockwise triangle in the xy plane.
    pub fn triangle() -> Self {
        let mut mesh = Self::new("triangle");
        mesh.vertices = vec![
            ModelVertex::new([-1.0, -1.0, 0.0], [0.0, 1.0]),
            ModelVertex::new([1.0, -1.0, 0.0], [1.0, 1.0]),
            ModelVertex::new([0.0, 1.0, 0.0], [0.5, 0.0]),
        ];
        mesh.indices = vec![0, 1, 2];
        mesh.compute_normals();
        mesh
    }

    /// A textured quad of the given size centred on the origin, facing +z.
    pub fn quad(width: f32, height: f32) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        let mut mesh = Self::new("quad");
        mesh.vertices = vec![
            ModelVertex::new([-hw, -hh, 0.0], [0.0, 1.0]),
            ModelVertex::new([hw, -hh, 0.0], [1.0, 1.0]),
            ModelVertex::new([hw, hh, 0.0], [1.0, 0.0]),
            ModelVertex::new([-hw, hh, 0.0], [0.0, 0.0]),
        ];
        mesh.indices = vec![0, 1, 2, 0, 2, 3];
        mesh.compute_normals();
        mesh.compute_tangents();
        mesh
    }

    /// An axis aligned cube with flat shaded faces (24 vertices).
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        // (normal, up) per face; the remaining axis is normal x up
        let faces: [([f32; 3], [f32; 3]); 6] = [
            ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ];
        let mut mesh = Self::new("cube");
        for (normal, up) in faces {
            let n = Vector3::from(normal);
            let u = Vector3::from(up);
            let r = u.cross(n);
            let base = mesh.vertices.len() as u32;
            let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
            for (sx, sy) in corners {
                let p = (n + r * sx + u * sy) * h;
                mesh.vertices.push(ModelVertex {
                    position: p.into(),
                    tex_coords: [(sx + 1.0) / 2.0, (1.0 - sy) / 2.0],
                    normal,
                    tangent: r.into(),
                });
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }

    /// Latitude/longitude sphere. `sectors >= 3`, `stacks >= 2`.
    pub fn uv_sphere(radius: f32, sectors: u32, stacks: u32) -> Self {
        let sectors = sectors.max(3);
        let stacks = stacks.max(2);
        let mut mesh = Self::new("uv_sphere");
        for stack in 0..=stacks {
            let v = stack as f32 / stacks as f32;
            let phi = std::f32::consts::PI * v;
            for sector in 0..=sectors {
                let u = sector as f32 / sectors as f32;
                let theta = std::f32::consts::TAU * u;
                let n = Vector3::new(phi.sin() * theta.cos(), phi.cos(), -phi.sin() * theta.sin());
                mesh.vertices.push(ModelVertex {
                    position: (n * radius).into(),
                    tex_coords: [u, v],
                    normal: n.into(),
                    tangent: [-theta.sin(), 0.0, -theta.cos()],
                });
            }
        }
        let ring = sectors + 1;
        for stack in 0..stacks {
            for sector in 0..sectors {
                let a = stack * ring + sector;
                let b = a + ring;
                if stack != 0 {
                    mesh.indices.extend_from_slice(&[a, b, a + 1]);
                }
                if stack != stacks - 1 {
                    mesh.indices.extend_from_slice(&[a + 1, b, b + 1]);
                }
            }
        }
        mesh
    }

    /// A flat grid in the xz plane facing +y with `cols x rows` cells.
    pub fn grid(width: f32, depth: f32, cols: u32, rows: u32) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        let mut mesh = Self::new("grid");
        for r in 0..=rows {
            let v = r as f32 / rows as f32;
            for c in 0..=cols {
                let u = c as f32 / cols as f32;
                mesh.vertices.push(ModelVertex {
                    position: [(u - 0.5) * width, 0.0, (v - 0.5) * depth],
                    tex_coords: [u, v],
                    normal: [0.0, 1.0, 0.0],
                    tangent: [1.0, 0.0, 0.0],
                });
            }
        }
        mesh.indices = grid_indices(cols, rows);
        mesh
    }

    /// Triangle fan over a convex polygon outline.
    pub fn polygon(points: &[Vector3<f32>]) -> Result<Self, MeshError> {
        if points.len() < 3 {
            return Err(MeshError::TooFewPoints(points.len()));
        }
        let mut mesh = Self::new("polygon");
        let bounds = Aabb::from_points(points.iter().copied());
        let extent = bounds.extent();
        for p in points {
            let u = if extent.x > 0.0 { (p.x - bounds.min.x) / extent.x } else { 0.0 };
            let v = if extent.y > 0.0 { 1.0 - (p.y - bounds.min.y) / extent.y } else { 0.0 };
            mesh.vertices.push(ModelVertex::new((*p).into(), [u, v]));
        }
        for i in 1..(points.len() as u32 - 1) {
            mesh.indices.extend_from_slice(&[0, i, i + 1]);
        }
        mesh.compute_normals();
        Ok(mesh)
    }
}

/// Indices for a `(cols + 1) x (rows + 1)` row-major vertex lattice.
pub(crate) fn grid_indices(cols: u32, rows: u32) -> Vec<u32> {
    let stride = cols + 1;
    let mut indices = Vec::with_capacity((cols * rows * 6) as usize);
    for r in 0..rows {
        for c in 0..cols {
            let i0 = r * stride + c;
            let i1 = i0 + 1;
            let i2 = i0 + stride;
            let i3 = i2 + 1;
            // counter-clockwise seen from +y
            indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
        }
    }
    indices
}
