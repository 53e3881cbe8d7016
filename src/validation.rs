//! Malformation checks for meshes.
//!
//! Topology is judged on positions, not on vertex indices: vertices that
//! only differ in normal or texture coordinates (hard edges, uv seams) count
//! as the same corner. Only vertices identical in every attribute are
//! reported as duplicates.

use std::collections::HashMap;

use cgmath::{InnerSpace, Vector3};

use crate::data_structures::mesh::Mesh;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValidationConfig {
    /// Triangles with a smaller area are degenerate.
    pub degenerate_area: f32,
    /// Positions closer than this are the same point.
    pub weld_epsilon: f32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            degenerate_area: 1e-8,
            weld_epsilon: 1e-5,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Issue {
    IndexOutOfRange { triangle: usize, index: u32 },
    DegenerateTriangle { triangle: usize, area: f32 },
    NonFiniteVertex { vertex: u32 },
    /// More than two triangles share the edge.
    NonManifoldEdge { a: u32, b: u32, count: usize },
    /// Only one triangle uses the edge.
    BoundaryEdge { a: u32, b: u32 },
    /// Two triangles traverse the shared edge in the same direction.
    InconsistentWinding { a: u32, b: u32 },
    DuplicateVertex { first: u32, duplicate: u32 },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
    pub vertex_count: usize,
    pub triangle_count: usize,
}

impl ValidationReport {
    /// Closed two-manifold: every edge is shared by exactly two triangles.
    pub fn is_watertight(&self) -> bool {
        !self.issues.iter().any(|i| {
            matches!(
                i,
                Issue::IndexOutOfRange { .. }
                    | Issue::BoundaryEdge { .. }
                    | Issue::NonManifoldEdge { .. }
            )
        })
    }

    /// Renderable without artefacts. Open boundaries and duplicates are allowed.
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(|i| {
            matches!(
                i,
                Issue::IndexOutOfRange { .. }
                    | Issue::DegenerateTriangle { .. }
                    | Issue::NonFiniteVertex { .. }
                    | Issue::NonManifoldEdge { .. }
                    | Issue::InconsistentWinding { .. }
            )
        })
    }

    pub fn count<F: Fn(&Issue) -> bool>(&self, filter: F) -> usize {
        self.issues.iter().filter(|i| filter(i)).count()
    }
}

/// Map every vertex to the first vertex at the same position.
fn canonical_vertices(mesh: &Mesh, eps: f32) -> Vec<u32> {
    let eps = eps.max(f32::EPSILON);
    let cell = |p: Vector3<f32>| {
        (
            (p.x / eps).floor() as i64,
            (p.y / eps).floor() as i64,
            (p.z / eps).floor() as i64,
        )
    };
    let mut grid: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    let mut canonical = Vec::with_capacity(mesh.vertices.len());
    for (i, vertex) in mesh.vertices.iter().enumerate() {
        let p = vertex.pos();
        let (cx, cy, cz) = cell(p);
        let mut found = None;
        'search: for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    for &j in grid.get(&(cx + dx, cy + dy, cz + dz)).into_iter().flatten() {
                        if (mesh.vertices[j as usize].pos() - p).magnitude2() <= eps * eps {
                            found = Some(j);
                            break 'search;
                        }
                    }
                }
            }
        }
        match found {
            Some(j) => canonical.push(j),
            None => {
                grid.entry((cx, cy, cz)).or_default().push(i as u32);
                canonical.push(i as u32);
            }
        }
    }
    canonical
}

pub fn validate(mesh: &Mesh, config: &ValidationConfig) -> ValidationReport {
    let mut issues = Vec::new();
    let vertex_count = mesh.vertices.len();

    for (i, vertex) in mesh.vertices.iter().enumerate() {
        let finite = vertex.position.iter().all(|c| c.is_finite());
        if !finite {
            issues.push(Issue::NonFiniteVertex { vertex: i as u32 });
        }
    }

    let canonical = canonical_vertices(mesh, config.weld_epsilon);
    for (i, &c) in canonical.iter().enumerate() {
        if c as usize != i && mesh.vertices[c as usize] == mesh.vertices[i] {
            issues.push(Issue::DuplicateVertex {
                first: c,
                duplicate: i as u32,
            });
        }
    }

    // directed uses of each undirected edge, keyed by canonical corners
    let mut edges: HashMap<(u32, u32), Vec<(u32, u32)>> = HashMap::new();
    for (t, tri) in mesh.indices.chunks_exact(3).enumerate() {
        if let Some(&index) = tri.iter().find(|&&i| i as usize >= vertex_count) {
            issues.push(Issue::IndexOutOfRange { triangle: t, index });
            continue;
        }
        let tri = [tri[0], tri[1], tri[2]];
        let p = tri.map(|i| mesh.vertices[i as usize].pos());
        let area = (p[1] - p[0]).cross(p[2] - p[0]).magnitude() * 0.5;
        if !(area >= config.degenerate_area) {
            issues.push(Issue::DegenerateTriangle { triangle: t, area });
            continue;
        }
        let c = tri.map(|i| canonical[i as usize]);
        for k in 0..3 {
            let (from, to) = (c[k], c[(k + 1) % 3]);
            edges
                .entry((from.min(to), from.max(to)))
                .or_default()
                .push((from, to));
        }
    }

    let mut keys: Vec<&(u32, u32)> = edges.keys().collect();
    keys.sort();
    for key in keys {
        let uses = &edges[key];
        let (a, b) = *key;
        match uses.len() {
            1 => issues.push(Issue::BoundaryEdge { a, b }),
            2 => {
                if uses[0] == uses[1] {
                    issues.push(Issue::InconsistentWinding { a, b });
                }
            }
            count => issues.push(Issue::NonManifoldEdge { a, b, count }),
        }
    }

    if !issues.is_empty() {
        log::debug!("{} has {} issues", mesh.name, issues.len());
    }
    ValidationReport {
        issues,
        vertex_count,
        triangle_count: mesh.triangle_count(),
    }
}

/// Expected distance between two landmark vertices.
#[derive(Clone, Debug, PartialEq)]
pub struct ProportionRule {
    pub name: String,
    pub a: u32,
    pub b: u32,
    pub expected: f32,
    pub tolerance: f32,
}

impl ProportionRule {
    pub fn new(name: &str, a: u32, b: u32, expected: f32, tolerance: f32) -> Self {
        Self {
            name: name.to_string(),
            a,
            b,
            expected,
            tolerance,
        }
    }

    /// Jaw width between two landmarks: 5 units, give or take 0.5.
    pub fn jaw_width(a: u32, b: u32) -> Self {
        Self::new("jaw width", a, b, 5.0, 0.5)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProportionResult {
    pub name: String,
    /// `None` when a landmark index does not exist.
    pub measured: Option<f32>,
    pub expected: f32,
    pub passed: bool,
}

pub fn check_proportions(mesh: &Mesh, rules: &[ProportionRule]) -> Vec<ProportionResult> {
    rules
        .iter()
        .map(|rule| {
            let measured = match (
                mesh.vertices.get(rule.a as usize),
                mesh.vertices.get(rule.b as usize),
            ) {
                (Some(a), Some(b)) => Some((b.pos() - a.pos()).magnitude()),
                _ => None,
            };
            let passed = measured.is_some_and(|m| (m - rule.expected).abs() <= rule.tolerance);
            if !passed {
                log::warn!(
                    "Malformation in {}: {} is {:?}, expected {} ± {}",
                    mesh.name,
                    rule.name,
                    measured,
                    rule.expected,
                    rule.tolerance
                );
            }
            ProportionResult {
                name: rule.name.clone(),
                measured,
                expected: rule.expected,
                passed,
            }
        })
        .collect()
}

/// Indices of vertices farther than `max_distance` from `center`.
pub fn vertices_outside_radius(mesh: &Mesh, center: Vector3<f32>, max_distance: f32) -> Vec<u32> {
    mesh.vertices
        .iter()
        .enumerate()
        .filter(|(_, v)| (v.pos() - center).magnitude() > max_distance)
        .map(|(i, _)| i as u32)
        .collect()
}
