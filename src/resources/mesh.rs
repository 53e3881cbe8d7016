use crate::data_structures::mesh::{Mesh, MeshError, ModelVertex};

/**
 * Obj files don't always come with normals and never come with tangents, so
 * both are calculated here when missing.
 *
 * Texture coordinates are flipped vertically because obj files put the
 * origin in the bottom-left corner while wgpu puts it in the top-left.
 */
pub fn convert_models(models: &[tobj::Model], file_name: &str) -> Vec<Result<Mesh, MeshError>> {
    models
        .iter()
        .map(|m| {
            let vertices = (0..m.mesh.positions.len() / 3)
                .map(|i| ModelVertex {
                    position: [
                        m.mesh.positions[i * 3],
                        m.mesh.positions[i * 3 + 1],
                        m.mesh.positions[i * 3 + 2],
                    ],
                    tex_coords: [
                        m.mesh.texcoords.get(i * 2).map_or(0.0, |f| *f),
                        1.0 - m.mesh.texcoords.get(i * 2 + 1).map_or(0.0, |f| *f),
                    ],
                    normal: [
                        m.mesh.normals.get(i * 3).map_or(0.0, |f| *f),
                        m.mesh.normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                        m.mesh.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
                    ],
                    // We'll calculate these later
                    tangent: [0.0; 3],
                })
                .collect::<Vec<_>>();

            let name = if m.name.is_empty() {
                file_name.to_string()
            } else {
                format!("{file_name}:{}", m.name)
            };
            let mut mesh = Mesh::from_parts(&name, vertices, m.mesh.indices.clone())?;
            if m.mesh.normals.is_empty() {
                log::debug!("{name} has no normals, computing them");
                mesh.compute_normals();
            }
            mesh.compute_tangents();
            Ok(mesh)
        })
        .collect()
}

