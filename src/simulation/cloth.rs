//! Mass-spring cloth.
//!
//! The cloth is a `(cols + 1) x (rows + 1)` lattice of point masses hanging in
//! the xy plane, top row at y = 0. Three kinds of springs connect them:
//! stretch springs between direct neighbours, shear springs across each cell
//! diagonal and bend springs skipping one point. Time stepping uses Verlet
//! integration followed by a number of distance-constraint passes.

use cgmath::{InnerSpace, Quaternion, Rotation, Vector3, Zero};

use crate::data_structures::mesh::{self, Mesh, ModelVertex};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpringKind {
    Stretch,
    Shear,
    Bend,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spring {
    pub a: usize,
    pub b: usize,
    pub rest_length: f32,
    pub kind: SpringKind,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClothConfig {
    /// Stiffness of each spring kind, in [0, 1] for constraint relaxation.
    pub stretch: f32,
    pub shear: f32,
    pub bend: f32,
    /// Fraction of velocity lost per step.
    pub damping: f32,
    /// Constraint passes per step.
    pub iterations: u32,
    pub gravity: f32,
}

impl Default for ClothConfig {
    fn default() -> Self {
        Self {
            stretch: 1.0,
            shear: 0.5,
            bend: 0.2,
            damping: 0.01,
            iterations: 8,
            gravity: 9.81,
        }
    }
}

impl ClothConfig {
    pub fn stiffness(&self, kind: SpringKind) -> f32 {
        match kind {
            SpringKind::Stretch => self.stretch,
            SpringKind::Shear => self.shear,
            SpringKind::Bend => self.bend,
        }
    }
}

/// Solid sphere the cloth cannot enter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphereCollider {
    pub center: Vector3<f32>,
    pub radius: f32,
}

#[derive(Clone, Debug)]
pub struct Cloth {
    pub positions: Vec<Vector3<f32>>,
    previous: Vec<Vector3<f32>>,
    pinned: Vec<bool>,
    pub springs: Vec<Spring>,
    pub collider: Option<SphereCollider>,
    pub config: ClothConfig,
    cols: u32,
    rows: u32,
}

impl Cloth {
    pub fn grid(width: f32, height: f32, cols: u32, rows: u32, config: ClothConfig) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        let mut positions = Vec::with_capacity(((cols + 1) * (rows + 1)) as usize);
        for r in 0..=rows {
            for c in 0..=cols {
                positions.push(Vector3::new(
                    (c as f32 / cols as f32 - 0.5) * width,
                    -(r as f32 / rows as f32) * height,
                    0.0,
                ));
            }
        }

        let idx = |c: u32, r: u32| (r * (cols + 1) + c) as usize;
        let mut springs = Vec::new();
        let mut connect = |a: usize, b: usize, kind: SpringKind| {
            springs.push(Spring {
                a,
                b,
                rest_length: (positions[b] - positions[a]).magnitude(),
                kind,
            });
        };
        for r in 0..=rows {
            for c in 0..=cols {
                if c < cols {
                    connect(idx(c, r), idx(c + 1, r), SpringKind::Stretch);
                }
                if r < rows {
                    connect(idx(c, r), idx(c, r + 1), SpringKind::Stretch);
                }
                if c < cols && r < rows {
                    connect(idx(c, r), idx(c + 1, r + 1), SpringKind::Shear);
                    connect(idx(c + 1, r), idx(c, r + 1), SpringKind::Shear);
                }
                if c + 2 <= cols {
                    connect(idx(c, r), idx(c + 2, r), SpringKind::Bend);
                }
                if r + 2 <= rows {
                    connect(idx(c, r), idx(c, r + 2), SpringKind::Bend);
                }
            }
        }

        let count = positions.len();
        Self {
            previous: positions.clone(),
            positions,
            pinned: vec![false; count],
            springs,
            collider: None,
            config,
            cols,
            rows,
        }
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn index(&self, col: u32, row: u32) -> usize {
        (row * (self.cols + 1) + col) as usize
    }

    /// Fix a point in place. Returns false for an out of range index.
    pub fn pin(&mut self, index: usize) -> bool {
        match self.pinned.get_mut(index) {
            Some(pinned) => {
                *pinned = true;
                true
            }
            None => false,
        }
    }

    pub fn pin_top_row(&mut self) {
        for c in 0..=self.cols {
            let i = self.index(c, 0);
            self.pinned[i] = true;
        }
    }

    pub fn is_pinned(&self, index: usize) -> bool {
        self.pinned.get(index).copied().unwrap_or(false)
    }

    /// Rotate the whole cloth about the origin, then move it by `offset`.
    ///
    /// Rigid motions keep every spring at its rest length.
    pub fn place(&mut self, rotation: Quaternion<f32>, offset: Vector3<f32>) {
        for (p, q) in self.positions.iter_mut().zip(self.previous.iter_mut()) {
            *p = rotation.rotate_vector(*p) + offset;
            *q = rotation.rotate_vector(*q) + offset;
        }
    }

    pub fn step(&mut self, dt: f32) {
        let gravity = Vector3::new(0.0, -self.config.gravity, 0.0) * dt * dt;
        let keep = 1.0 - self.config.damping.clamp(0.0, 1.0);
        for i in 0..self.positions.len() {
            if self.pinned[i] {
                continue;
            }
            let velocity = (self.positions[i] - self.previous[i]) * keep;
            self.previous[i] = self.positions[i];
            self.positions[i] += velocity + gravity;
        }
        for _ in 0..self.config.iterations {
            self.satisfy_constraints();
        }
        self.collide();
    }

    fn satisfy_constraints(&mut self) {
        for spring in &self.springs {
            let (a, b) = (spring.a, spring.b);
            let delta = self.positions[b] - self.positions[a];
            let d = delta.magnitude();
            if d <= f32::EPSILON {
                continue;
            }
            let k = self.config.stiffness(spring.kind).clamp(0.0, 1.0);
            let correction = delta * ((d - spring.rest_length) / d) * k;
            match (self.pinned[a], self.pinned[b]) {
                (true, true) => {}
                (false, true) => self.positions[a] += correction,
                (true, false) => self.positions[b] -= correction,
                (false, false) => {
                    self.positions[a] += correction * 0.5;
                    self.positions[b] -= correction * 0.5;
                }
            }
        }
    }

    fn collide(&mut self) {
        let Some(sphere) = self.collider else {
            return;
        };
        for (i, p) in self.positions.iter_mut().enumerate() {
            if self.pinned[i] {
                continue;
            }
            let offset = *p - sphere.center;
            let d = offset.magnitude();
            if d < sphere.radius {
                let normal = if d > f32::EPSILON {
                    offset / d
                } else {
                    Vector3::unit_y()
                };
                *p = sphere.center + normal * sphere.radius;
            }
        }
    }

    /// Elastic energy `sum k/2 (|b - a| - rest)^2` over all springs.
    pub fn spring_energy(&self) -> f32 {
        self.springs
            .iter()
            .map(|s| {
                let stretch = (self.positions[s.b] - self.positions[s.a]).magnitude() - s.rest_length;
                0.5 * self.config.stiffness(s.kind) * stretch * stretch
            })
            .sum()
    }

    fn energy_gradient(&self) -> Vec<Vector3<f32>> {
        let mut gradient = vec![Vector3::zero(); self.positions.len()];
        for s in &self.springs {
            let delta = self.positions[s.a] - self.positions[s.b];
            let d = delta.magnitude();
            if d <= f32::EPSILON {
                continue;
            }
            let g = delta / d * (self.config.stiffness(s.kind) * (d - s.rest_length));
            gradient[s.a] += g;
            gradient[s.b] -= g;
        }
        gradient
    }

    /// Minimise the spring energy by gradient descent, moving only free points.
    ///
    /// A step that would raise the energy is retried with half the step size,
    /// so the energy never increases. Returns the final energy.
    pub fn relax(&mut self, iterations: u32, step: f32) -> f32 {
        let mut energy = self.spring_energy();
        let mut step = step;
        for _ in 0..iterations {
            let gradient = self.energy_gradient();
            let start = self.positions.clone();
            let mut accepted = false;
            for _ in 0..16 {
                for (i, g) in gradient.iter().enumerate() {
                    if !self.pinned[i] {
                        self.positions[i] = start[i] - g * step;
                    }
                }
                let candidate = self.spring_energy();
                if candidate <= energy {
                    energy = candidate;
                    accepted = true;
                    break;
                }
                step *= 0.5;
            }
            if !accepted {
                self.positions = start;
                break;
            }
        }
        self.previous.clone_from(&self.positions);
        energy
    }

    /// Current shape as a mesh. In the rest pose it faces +z.
    pub fn to_mesh(&self) -> Mesh {
        let mut mesh = Mesh::new("cloth");
        for r in 0..=self.rows {
            for c in 0..=self.cols {
                let p = self.positions[self.index(c, r)];
                mesh.vertices.push(ModelVertex::new(
                    p.into(),
                    [c as f32 / self.cols as f32, r as f32 / self.rows as f32],
                ));
            }
        }
        mesh.indices = mesh::grid_indices(self.cols, self.rows);
        mesh.compute_normals();
        mesh.compute_tangents();
        mesh
    }
}
