//! Point octree with bounded depth.
//!
//! Nodes live in a flat arena and refer to their children by index. A leaf
//! splits into eight octants once it holds more than `leaf_capacity` points,
//! unless it already sits at `max_depth`. Leaves at the maximum depth keep
//! every point they receive.

use cgmath::{InnerSpace, Vector3};

use crate::math::Aabb;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OctreeConfig {
    pub max_depth: u32,
    pub leaf_capacity: usize,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            leaf_capacity: 8,
        }
    }
}

#[derive(Clone, Debug)]
struct Node {
    bounds: Aabb,
    depth: u32,
    items: Vec<(Vector3<f32>, usize)>,
    children: Option<[usize; 8]>,
}

impl Node {
    fn leaf(bounds: Aabb, depth: u32) -> Self {
        Self {
            bounds,
            depth,
            items: Vec::new(),
            children: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Octree {
    nodes: Vec<Node>,
    config: OctreeConfig,
    len: usize,
    saturated: bool,
}

impl Octree {
    pub fn new(bounds: Aabb, config: OctreeConfig) -> Self {
        Self {
            nodes: vec![Node::leaf(bounds, 0)],
            config,
            len: 0,
            saturated: false,
        }
    }

    /// Build a tree that tightly encloses `points`; ids are the point indices.
    pub fn build(points: &[Vector3<f32>], config: OctreeConfig) -> Self {
        let mut bounds = Aabb::from_points(points.iter().copied());
        if bounds.is_empty() {
            bounds = Aabb::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.0));
        }
        let mut tree = Self::new(bounds, config);
        for (id, &p) in points.iter().enumerate() {
            tree.insert(p, id);
        }
        log::debug!(
            "Built octree over {} points: {} nodes, depth {}",
            tree.len,
            tree.node_count(),
            tree.depth()
        );
        tree
    }

    pub fn bounds(&self) -> Aabb {
        self.nodes[0].bounds
    }

    pub fn config(&self) -> OctreeConfig {
        self.config
    }

    /// Returns false, leaving the tree untouched, for points outside the root bounds.
    pub fn insert(&mut self, point: Vector3<f32>, id: usize) -> bool {
        if !self.nodes[0].bounds.contains(point) {
            return false;
        }
        let mut idx = 0;
        while let Some(children) = self.nodes[idx].children {
            idx = children[self.nodes[idx].bounds.octant_of(point)];
        }
        self.nodes[idx].items.push((point, id));
        self.len += 1;
        self.split_if_full(idx);
        true
    }

    fn split_if_full(&mut self, start: usize) {
        let mut pending = vec![start];
        while let Some(idx) = pending.pop() {
            let node = &self.nodes[idx];
            if node.items.len() <= self.config.leaf_capacity {
                continue;
            }
            if node.depth >= self.config.max_depth {
                if !self.saturated {
                    log::warn!(
                        "Octree leaf at max depth {} holds {} points, more than the capacity of {}",
                        node.depth,
                        node.items.len(),
                        self.config.leaf_capacity
                    );
                    self.saturated = true;
                }
                continue;
            }
            let bounds = node.bounds;
            let depth = node.depth + 1;
            let first = self.nodes.len();
            for octant in 0..8 {
                self.nodes.push(Node::leaf(bounds.octant(octant), depth));
            }
            let children = std::array::from_fn(|i| first + i);
            let items = std::mem::take(&mut self.nodes[idx].items);
            self.nodes[idx].children = Some(children);
            for (p, id) in items {
                let child = children[bounds.octant_of(p)];
                self.nodes[child].items.push((p, id));
            }
            pending.extend(children);
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest node; a lone root has depth 0.
    pub fn depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Ids of all points inside `region` (inclusive).
    pub fn query_aabb(&self, region: &Aabb) -> Vec<usize> {
        let mut hits = Vec::new();
        let mut stack = vec![0];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if !node.bounds.intersects(region) {
                continue;
            }
            match node.children {
                Some(children) => stack.extend(children),
                None => hits.extend(
                    node.items
                        .iter()
                        .filter(|(p, _)| region.contains(*p))
                        .map(|(_, id)| *id),
                ),
            }
        }
        hits
    }

    /// Ids of all points within `radius` of `center` (inclusive).
    pub fn query_radius(&self, center: Vector3<f32>, radius: f32) -> Vec<usize> {
        let r2 = radius * radius;
        let mut hits = Vec::new();
        let mut stack = vec![0];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if !node.bounds.intersects_sphere(center, radius) {
                continue;
            }
            match node.children {
                Some(children) => stack.extend(children),
                None => hits.extend(
                    node.items
                        .iter()
                        .filter(|(p, _)| (p - center).magnitude2() <= r2)
                        .map(|(_, id)| *id),
                ),
            }
        }
        hits
    }

    /// Closest stored point to `point` as `(id, distance)`.
    ///
    /// Subtrees whose box is farther away than the best candidate so far are
    /// skipped; children are visited nearest box first.
    pub fn nearest(&self, point: Vector3<f32>) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        let mut stack = vec![(0usize, self.nodes[0].bounds.distance_squared_to(point))];
        while let Some((idx, box_d2)) = stack.pop() {
            if best.is_some_and(|(_, d2)| box_d2 > d2) {
                continue;
            }
            let node = &self.nodes[idx];
            match node.children {
                Some(children) => {
                    let mut ordered: Vec<(usize, f32)> = children
                        .iter()
                        .map(|&c| (c, self.nodes[c].bounds.distance_squared_to(point)))
                        .collect();
                    // farthest first so the nearest ends on top of the stack
                    ordered.sort_by(|a, b| b.1.total_cmp(&a.1));
                    stack.extend(ordered);
                }
                None => {
                    for (p, id) in &node.items {
                        let d2 = (p - point).magnitude2();
                        if best.is_none_or(|(_, best_d2)| d2 < best_d2) {
                            best = Some((*id, d2));
                        }
                    }
                }
            }
        }
        best.map(|(id, d2)| (id, d2.sqrt()))
    }

    /// Check that every point lies inside its leaf and that only leaves at the
    /// maximum depth exceed the leaf capacity.
    pub fn check_invariants(&self) -> bool {
        self.nodes.iter().all(|node| {
            let placed = node.items.iter().all(|(p, _)| node.bounds.contains(*p));
            let sized = node.items.len() <= self.config.leaf_capacity
                || node.depth >= self.config.max_depth;
            let leaf_only = node.children.is_none() || node.items.is_empty();
            placed && sized && leaf_only
        })
    }
}
