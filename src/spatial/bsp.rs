//! Binary space partitioning over triangles.
//!
//! Each node splits space with the plane of one of its triangles. Triangles
//! in front of the plane go to the front child, those behind to the back
//! child, and triangles crossing the plane are cut in two. Triangles lying in
//! the plane stay at the node.
//!
//! For a closed mesh with outward facing triangles the empty children carry
//! meaning: falling off the front of the tree means outside, falling off the
//! back means inside.

use cgmath::{InnerSpace, Vector3};

use crate::math::{Plane, Side};

pub type Triangle = [Vector3<f32>; 3];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BspConfig {
    pub max_depth: u32,
    /// Distance below which a point counts as lying in a plane.
    pub epsilon: f32,
    /// Number of triangles tried as splitting plane at each node.
    pub candidates: usize,
}

impl Default for BspConfig {
    fn default() -> Self {
        Self {
            max_depth: 1024,
            epsilon: 1e-5,
            candidates: 16,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Location {
    Inside,
    Outside,
}

#[derive(Clone, Debug)]
struct Node {
    plane: Plane,
    triangles: Vec<Triangle>,
    front: Option<usize>,
    back: Option<usize>,
    depth: u32,
    /// Hit the depth limit; holds every remaining triangle unsplit.
    capped: bool,
}

#[derive(Clone, Debug)]
pub struct BspTree {
    nodes: Vec<Node>,
    root: Option<usize>,
    config: BspConfig,
}

impl BspTree {
    pub fn build(triangles: &[Triangle], config: BspConfig) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: None,
            config,
        };
        let usable: Vec<Triangle> = triangles
            .iter()
            .copied()
            .filter(|t| Plane::from_points(t[0], t[1], t[2]).is_some())
            .collect();
        if usable.len() < triangles.len() {
            log::warn!(
                "Skipped {} degenerate triangles while building BSP tree",
                triangles.len() - usable.len()
            );
        }
        tree.build_nodes(usable);
        log::debug!(
            "Built BSP tree: {} input triangles, {} after splits, {} nodes, depth {}",
            triangles.len(),
            tree.triangle_count(),
            tree.node_count(),
            tree.depth()
        );
        tree
    }

    fn build_nodes(&mut self, triangles: Vec<Triangle>) {
        // (triangles, depth, parent and whether this is its front child)
        let mut pending: Vec<(Vec<Triangle>, u32, Option<(usize, bool)>)> = vec![(triangles, 0, None)];
        while let Some((triangles, depth, parent)) = pending.pop() {
            if triangles.is_empty() {
                continue;
            }
            let Some(plane) = self.choose_plane(&triangles) else {
                continue;
            };
            let idx = self.nodes.len();
            self.nodes.push(Node {
                plane,
                triangles: Vec::new(),
                front: None,
                back: None,
                depth,
                capped: false,
            });
            match parent {
                Some((p, true)) => self.nodes[p].front = Some(idx),
                Some((p, false)) => self.nodes[p].back = Some(idx),
                None => self.root = Some(idx),
            }

            if depth >= self.config.max_depth {
                log::warn!(
                    "BSP depth limit {} reached with {} triangles left unsplit",
                    self.config.max_depth,
                    triangles.len()
                );
                let node = &mut self.nodes[idx];
                node.triangles = triangles;
                node.capped = true;
                continue;
            }

            let mut coplanar = Vec::new();
            let mut front = Vec::new();
            let mut back = Vec::new();
            for triangle in triangles {
                split_triangle(&plane, &triangle, self.config.epsilon, &mut coplanar, &mut front, &mut back);
            }
            self.nodes[idx].triangles = coplanar;
            pending.push((back, depth + 1, Some((idx, false))));
            pending.push((front, depth + 1, Some((idx, true))));
        }
    }

    /// Pick the candidate plane with the fewest splits, ties broken by balance.
    fn choose_plane(&self, triangles: &[Triangle]) -> Option<Plane> {
        let stride = (triangles.len() / self.config.candidates.max(1)).max(1);
        let mut best: Option<(usize, Plane)> = None;
        for candidate in triangles.iter().step_by(stride).take(self.config.candidates.max(1)) {
            let Some(plane) = Plane::from_points(candidate[0], candidate[1], candidate[2]) else {
                continue;
            };
            let (mut front, mut back, mut splits) = (0usize, 0usize, 0usize);
            for t in triangles {
                let sides = t.map(|p| plane.classify(p, self.config.epsilon));
                let any_front = sides.contains(&Side::Front);
                let any_back = sides.contains(&Side::Back);
                match (any_front, any_back) {
                    (true, true) => splits += 1,
                    (true, false) => front += 1,
                    (false, true) => back += 1,
                    (false, false) => {}
                }
            }
            let score = splits * 8 + front.abs_diff(back);
            if best.is_none_or(|(s, _)| score < s) {
                best = Some((score, plane));
            }
        }
        best.map(|(_, plane)| plane)
    }

    /// Inside/outside test, meaningful for closed meshes with outward normals.
    ///
    /// Points on a splitting plane are resolved by checking both sides; a
    /// point on the surface counts as inside. Reaching a node that was cut
    /// off by `max_depth` falls back to a ray parity test.
    pub fn locate(&self, p: Vector3<f32>) -> Location {
        let mut pending: Vec<usize> = self.root.into_iter().collect();
        while let Some(idx) = pending.pop() {
            let node = &self.nodes[idx];
            if node.capped {
                if self.ray_parity(p) == Location::Inside {
                    return Location::Inside;
                }
                continue;
            }
            let side = node.plane.classify(p, self.config.epsilon);
            if side != Side::Back {
                // an empty front child is outside: nothing to follow
                pending.extend(node.front);
            }
            if side != Side::Front {
                match node.back {
                    Some(back) => pending.push(back),
                    None => return Location::Inside,
                }
            }
        }
        Location::Outside
    }

    /// Count crossings of a ray from `p` with every stored triangle.
    fn ray_parity(&self, p: Vector3<f32>) -> Location {
        // skewed so it rarely grazes edges of axis aligned geometry
        let dir = Vector3::new(0.5377, 0.6421, 0.5465);
        let crossings = self
            .nodes
            .iter()
            .flat_map(|n| n.triangles.iter())
            .filter(|t| ray_hits_triangle(p, dir, t))
            .count();
        if crossings % 2 == 1 {
            Location::Inside
        } else {
            Location::Outside
        }
    }

    /// All triangles ordered from farthest to nearest as seen from `eye`.
    pub fn back_to_front(&self, eye: Vector3<f32>) -> Vec<Triangle> {
        enum Step {
            Visit(usize),
            Emit(usize),
        }
        let mut out = Vec::with_capacity(self.triangle_count());
        let mut pending: Vec<Step> = self.root.into_iter().map(Step::Visit).collect();
        while let Some(step) = pending.pop() {
            match step {
                Step::Emit(idx) => out.extend_from_slice(&self.nodes[idx].triangles),
                Step::Visit(idx) => {
                    let node = &self.nodes[idx];
                    let (far, near) = if node.plane.signed_distance(eye) >= 0.0 {
                        (node.back, node.front)
                    } else {
                        (node.front, node.back)
                    };
                    // pushed in reverse: far subtree, this node, near subtree
                    pending.extend(near.map(Step::Visit));
                    pending.push(Step::Emit(idx));
                    pending.extend(far.map(Step::Visit));
                }
            }
        }
        out
    }

    /// Number of stored triangles, counting split pieces separately.
    pub fn triangle_count(&self) -> usize {
        self.nodes.iter().map(|n| n.triangles.len()).sum()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}

/// Sort one triangle into coplanar, front and back lists, cutting it when it
/// straddles the plane.
fn split_triangle(
    plane: &Plane,
    triangle: &Triangle,
    eps: f32,
    coplanar: &mut Vec<Triangle>,
    front: &mut Vec<Triangle>,
    back: &mut Vec<Triangle>,
) {
    let dist = triangle.map(|p| plane.signed_distance(p));
    let sides = dist.map(|d| {
        if d > eps {
            Side::Front
        } else if d < -eps {
            Side::Back
        } else {
            Side::On
        }
    });
    let any_front = sides.contains(&Side::Front);
    let any_back = sides.contains(&Side::Back);
    match (any_front, any_back) {
        (false, false) => coplanar.push(*triangle),
        (true, false) => front.push(*triangle),
        (false, true) => back.push(*triangle),
        (true, true) => {
            let mut front_poly = Vec::with_capacity(4);
            let mut back_poly = Vec::with_capacity(4);
            for i in 0..3 {
                let j = (i + 1) % 3;
                let (a, b) = (triangle[i], triangle[j]);
                match sides[i] {
                    Side::Front => front_poly.push(a),
                    Side::Back => back_poly.push(a),
                    Side::On => {
                        front_poly.push(a);
                        back_poly.push(a);
                    }
                }
                let crosses = matches!(
                    (sides[i], sides[j]),
                    (Side::Front, Side::Back) | (Side::Back, Side::Front)
                );
                if crosses {
                    let t = dist[i] / (dist[i] - dist[j]);
                    let p = a + (b - a) * t;
                    front_poly.push(p);
                    back_poly.push(p);
                }
            }
            fan(&front_poly, front);
            fan(&back_poly, back);
        }
    }
}

fn fan(polygon: &[Vector3<f32>], out: &mut Vec<Triangle>) {
    for i in 1..polygon.len().saturating_sub(1) {
        out.push([polygon[0], polygon[i], polygon[i + 1]]);
    }
}

/// Möller-Trumbore, counting only hits strictly ahead of `origin`.
fn ray_hits_triangle(origin: Vector3<f32>, dir: Vector3<f32>, t: &Triangle) -> bool {
    let e1 = t[1] - t[0];
    let e2 = t[2] - t[0];
    let h = dir.cross(e2);
    let a = e1.dot(h);
    if a.abs() < 1e-12 {
        return false;
    }
    let f = 1.0 / a;
    let s = origin - t[0];
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return false;
    }
    let q = s.cross(e1);
    let v = f * dir.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return false;
    }
    f * e2.dot(q) > 1e-7
}
