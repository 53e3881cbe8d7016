//! Skybox faces and cube map lookup.
//!
//! A calm procedural gradient is the default background; photographs can be
//! used instead via [`Skybox::from_faces`].

use cgmath::{Vector2, Vector3, Vector4};

use crate::data_structures::{
    cpu_texture::{self, CpuTexture, Filter, WrapMode},
    mesh::Mesh,
};

/// Cube faces in the order the GPU expects the array layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CubeFace {
    PosX = 0,
    NegX = 1,
    PosY = 2,
    NegY = 3,
    PosZ = 4,
    NegZ = 5,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PosX,
        CubeFace::NegX,
        CubeFace::PosY,
        CubeFace::NegY,
        CubeFace::PosZ,
        CubeFace::NegZ,
    ];

    /// Direction through the face at texture coordinates `uv` (not normalised).
    pub fn direction(self, uv: Vector2<f32>) -> Vector3<f32> {
        let sc = 2.0 * uv.x - 1.0;
        let tc = 2.0 * uv.y - 1.0;
        match self {
            CubeFace::PosX => Vector3::new(1.0, -tc, -sc),
            CubeFace::NegX => Vector3::new(-1.0, -tc, sc),
            CubeFace::PosY => Vector3::new(sc, 1.0, tc),
            CubeFace::NegY => Vector3::new(sc, -1.0, -tc),
            CubeFace::PosZ => Vector3::new(sc, -tc, 1.0),
            CubeFace::NegZ => Vector3::new(-sc, -tc, -1.0),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SkyboxError {
    #[error("skybox face {face:?} is {width}x{height}, faces must be square")]
    NotSquare { face: CubeFace, width: u32, height: u32 },
    #[error("skybox face {face:?} is {size} pixels wide, expected {expected}")]
    SizeMismatch { face: CubeFace, size: u32, expected: u32 },
}

/// Pick the cube face a direction points at and the texture coordinates on it.
///
/// Returns `None` for the zero vector.
pub fn face_uv(direction: Vector3<f32>) -> Option<(CubeFace, Vector2<f32>)> {
    let (ax, ay, az) = (direction.x.abs(), direction.y.abs(), direction.z.abs());
    let (face, sc, tc, ma) = if ax >= ay && ax >= az {
        if direction.x >= 0.0 {
            (CubeFace::PosX, -direction.z, -direction.y, ax)
        } else {
            (CubeFace::NegX, direction.z, -direction.y, ax)
        }
    } else if ay >= az {
        if direction.y >= 0.0 {
            (CubeFace::PosY, direction.x, direction.z, ay)
        } else {
            (CubeFace::NegY, direction.x, -direction.z, ay)
        }
    } else if direction.z >= 0.0 {
        (CubeFace::PosZ, direction.x, -direction.y, az)
    } else {
        (CubeFace::NegZ, -direction.x, -direction.y, az)
    };
    if ma <= 0.0 {
        return None;
    }
    Some((
        face,
        Vector2::new((sc / ma + 1.0) * 0.5, (tc / ma + 1.0) * 0.5),
    ))
}

#[derive(Clone, Debug)]
pub struct Skybox {
    faces: [CpuTexture; 6],
}

impl Skybox {
    /// Faces ordered +X, -X, +Y, -Y, +Z, -Z. All must be square and equally sized.
    pub fn from_faces(faces: [CpuTexture; 6]) -> Result<Self, SkyboxError> {
        let expected = faces[0].width();
        for (face, texture) in CubeFace::ALL.into_iter().zip(faces.iter()) {
            let (width, height) = texture.dimensions();
            if width != height {
                return Err(SkyboxError::NotSquare { face, width, height });
            }
            if width != expected {
                return Err(SkyboxError::SizeMismatch {
                    face,
                    size: width,
                    expected,
                });
            }
        }
        Ok(Self { faces })
    }

    /// Vertical gradient: `ground` below the horizon, `horizon` at it and `zenith` straight up.
    pub fn gradient(
        size: u32,
        horizon: Vector4<f32>,
        zenith: Vector4<f32>,
        ground: Vector4<f32>,
    ) -> Self {
        let size = size.max(1);
        let faces = CubeFace::ALL.map(|face| {
            let image = image::RgbaImage::from_fn(size, size, |x, y| {
                let uv = Vector2::new(
                    (x as f32 + 0.5) / size as f32,
                    (y as f32 + 0.5) / size as f32,
                );
                let dir = cgmath::InnerSpace::normalize(face.direction(uv));
                let colour = if dir.y >= 0.0 {
                    cpu_texture::lerp(horizon, zenith, dir.y)
                } else {
                    cpu_texture::lerp(horizon, ground, -dir.y)
                };
                cpu_texture::to_rgba(colour)
            });
            CpuTexture::new(image).unwrap_or_else(|_| CpuTexture::solid(1, 1, [0, 0, 0, 255]))
        });
        Self { faces }
    }

    pub fn face_size(&self) -> u32 {
        self.faces[0].width()
    }

    pub fn faces(&self) -> &[CpuTexture; 6] {
        &self.faces
    }

    pub fn face(&self, face: CubeFace) -> &CpuTexture {
        &self.faces[face as usize]
    }

    /// Colour seen when looking along `direction`.
    pub fn sample(&self, direction: Vector3<f32>) -> Option<Vector4<f32>> {
        let (face, uv) = face_uv(direction)?;
        Some(self.face(face).sample(uv, Filter::Bilinear, WrapMode::Clamp))
    }

    /// A cube of edge length 2 around the origin with its faces pointing inwards.
    pub fn mesh() -> Mesh {
        let mut mesh = Mesh::cube(2.0);
        mesh.name = "skybox".to_string();
        for tri in mesh.indices.chunks_exact_mut(3) {
            tri.swap(1, 2);
        }
        for vertex in &mut mesh.vertices {
            vertex.normal = vertex.normal.map(|n| -n);
        }
        mesh
    }
}
