//! Level of detail through vertex clustering.
//!
//! Space is cut into cubic cells; all vertices in a cell collapse into their
//! average and triangles that lose a corner disappear. Each coarser level is
//! clustered from the previous one, so triangle counts never go up.

use std::collections::HashMap;

use cgmath::{InnerSpace, Vector2, Vector3, Zero};

use crate::data_structures::mesh::{Mesh, ModelVertex};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LodConfig {
    /// Number of levels including the original mesh.
    pub levels: usize,
    /// Cell size of level 1 as a fraction of the bounding box diagonal.
    pub base_cell: f32,
    /// Factor between the cell sizes of consecutive levels.
    pub cell_growth: f32,
    /// Level 0 is used closer than this distance.
    pub base_distance: f32,
    /// Factor between the distance thresholds of consecutive levels.
    pub distance_growth: f32,
    /// Relative band around a threshold in which the current level is kept.
    pub hysteresis: f32,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            levels: 4,
            base_cell: 0.05,
            cell_growth: 2.0,
            base_distance: 10.0,
            distance_growth: 2.0,
            hysteresis: 0.1,
        }
    }
}

/// Collapse all vertices sharing a grid cell of size `cell_size` into one.
pub fn simplify(mesh: &Mesh, cell_size: f32) -> Mesh {
    if cell_size <= 0.0 || !cell_size.is_finite() {
        return mesh.clone();
    }
    let key = |p: Vector3<f32>| {
        (
            (p.x / cell_size).floor() as i64,
            (p.y / cell_size).floor() as i64,
            (p.z / cell_size).floor() as i64,
        )
    };

    struct Cluster {
        position: Vector3<f32>,
        normal: Vector3<f32>,
        tex_coords: Vector2<f32>,
        count: f32,
    }
    let mut cluster_of: HashMap<(i64, i64, i64), usize> = HashMap::new();
    let mut clusters: Vec<Cluster> = Vec::new();
    let mut remap = Vec::with_capacity(mesh.vertices.len());
    for vertex in &mesh.vertices {
        let index = *cluster_of.entry(key(vertex.pos())).or_insert_with(|| {
            clusters.push(Cluster {
                position: Vector3::zero(),
                normal: Vector3::zero(),
                tex_coords: Vector2::zero(),
                count: 0.0,
            });
            clusters.len() - 1
        });
        let cluster = &mut clusters[index];
        cluster.position += vertex.pos();
        cluster.normal += Vector3::from(vertex.normal);
        cluster.tex_coords += Vector2::from(vertex.tex_coords);
        cluster.count += 1.0;
        remap.push(index as u32);
    }

    let mut out = Mesh::new(&mesh.name);
    out.vertices = clusters
        .iter()
        .map(|c| {
            let normal = if c.normal.magnitude2() > 0.0 {
                c.normal.normalize()
            } else {
                c.normal
            };
            ModelVertex {
                position: (c.position / c.count).into(),
                tex_coords: (c.tex_coords / c.count).into(),
                normal: normal.into(),
                tangent: [0.0; 3],
            }
        })
        .collect();
    for tri in mesh.indices.chunks_exact(3) {
        let (Some(&a), Some(&b), Some(&c)) = (
            remap.get(tri[0] as usize),
            remap.get(tri[1] as usize),
            remap.get(tri[2] as usize),
        ) else {
            continue;
        };
        if a != b && b != c && a != c {
            out.indices.extend_from_slice(&[a, b, c]);
        }
    }
    out.compute_tangents();
    out
}

#[derive(Clone, Debug)]
pub struct LodLevel {
    pub mesh: Mesh,
    pub cell_size: f32,
    /// This level is chosen for distances below this value.
    pub max_distance: f32,
}

#[derive(Clone, Debug)]
pub struct LodModel {
    pub levels: Vec<LodLevel>,
    hysteresis: f32,
}

impl LodModel {
    pub fn generate(mesh: &Mesh, config: &LodConfig) -> Self {
        let count = config.levels.max(1);
        let diagonal = if mesh.vertices.is_empty() {
            0.0
        } else {
            mesh.bounds().extent().magnitude()
        };
        let mut levels = vec![LodLevel {
            mesh: mesh.clone(),
            cell_size: 0.0,
            max_distance: config.base_distance,
        }];
        let mut cell = diagonal * config.base_cell;
        let mut distance = config.base_distance;
        for _ in 1..count {
            distance *= config.distance_growth;
            let previous = &levels[levels.len() - 1].mesh;
            let simplified = simplify(previous, cell);
            levels.push(LodLevel {
                mesh: simplified,
                cell_size: cell,
                max_distance: distance,
            });
            cell *= config.cell_growth;
        }
        log::debug!(
            "Generated {} LOD levels for {}: {:?} triangles",
            levels.len(),
            mesh.name,
            levels.iter().map(|l| l.mesh.triangle_count()).collect::<Vec<_>>()
        );
        Self {
            levels,
            hysteresis: config.hysteresis.max(0.0),
        }
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn mesh(&self, level: usize) -> &Mesh {
        &self.levels[level.min(self.levels.len() - 1)].mesh
    }

    /// First level whose threshold lies beyond `distance`, the coarsest otherwise.
    pub fn select(&self, distance: f32) -> usize {
        self.levels
            .iter()
            .position(|l| distance < l.max_distance)
            .unwrap_or(self.levels.len() - 1)
    }

    /// Like [`LodModel::select`], but keeps `current` while `distance` stays
    /// within the hysteresis band around the thresholds next to it. Stops
    /// levels from flickering when an object hovers around a threshold.
    pub fn select_with_hysteresis(&self, current: usize, distance: f32) -> usize {
        let current = current.min(self.levels.len() - 1);
        let target = self.select(distance);
        if target > current {
            let edge = self.levels[current].max_distance * (1.0 + self.hysteresis);
            if distance < edge {
                return current;
            }
        } else if target < current {
            let edge = self.levels[current - 1].max_distance * (1.0 - self.hysteresis);
            if distance >= edge {
                return current;
            }
        }
        target
    }
}
