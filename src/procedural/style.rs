//! Geometric style transforms applied to finished meshes.

use cgmath::Vector3;

use crate::data_structures::mesh::Mesh;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Style {
    /// Stretch vertically by `stretch`.
    Anime { stretch: f32 },
    /// Scale x and y away from the mesh centre by `1 + distortion`, leaving z alone.
    Retro { distortion: f32 },
    /// Grow everything above `pivot_y` by `head_scale`.
    Chibi { head_scale: f32, pivot_y: f32 },
}

impl Style {
    /// `"anime"`, `"retro"` or `"chibi"` with default factors.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "anime" => Some(Style::Anime { stretch: 2.0 }),
            "retro" => Some(Style::Retro { distortion: 1.5 }),
            "chibi" => Some(Style::Chibi {
                head_scale: 1.8,
                pivot_y: 0.0,
            }),
            _ => None,
        }
    }

    pub fn apply(&self, mesh: &mut Mesh) {
        if mesh.vertices.is_empty() {
            return;
        }
        let center = mesh.bounds().center();
        for vertex in &mut mesh.vertices {
            vertex.position = self.transform(Vector3::from(vertex.position), center).into();
        }
        mesh.compute_normals();
        mesh.compute_tangents();
    }

    fn transform(&self, p: Vector3<f32>, center: Vector3<f32>) -> Vector3<f32> {
        match *self {
            Style::Anime { stretch } => Vector3::new(p.x, p.y * stretch, p.z),
            Style::Retro { distortion } => Vector3::new(
                p.x + (p.x - center.x) * distortion,
                p.y + (p.y - center.y) * distortion,
                p.z,
            ),
            Style::Chibi {
                head_scale,
                pivot_y,
            } => {
                if p.y <= pivot_y {
                    return p;
                }
                let pivot = Vector3::new(center.x, pivot_y, center.z);
                pivot + (p - pivot) * head_scale
            }
        }
    }
}
