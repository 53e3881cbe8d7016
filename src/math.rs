//! Vector helpers and shared geometric primitives.
//!
//! Everything here works on `cgmath` types with `f32` components, the same
//! representation the mesh and instance types use.

use cgmath::{Deg, InnerSpace, Rad, Vector3, Zero};

const EPSILON: f32 = 1e-6;

/// Normalise `v`, returning the zero vector instead of NaNs for zero-length input.
pub fn safe_normalize(v: Vector3<f32>) -> Vector3<f32> {
    let len = v.magnitude();
    if len <= EPSILON {
        Vector3::zero()
    } else {
        v / len
    }
}

/// Reflect `v` across the plane with normal `normal`.
///
/// The normal does not have to be unit length.
pub fn reflect(v: Vector3<f32>, normal: Vector3<f32>) -> Vector3<f32> {
    let n = safe_normalize(normal);
    v - n * (2.0 * v.dot(n))
}

/// Vector projection of `v` onto `onto`.
pub fn project(v: Vector3<f32>, onto: Vector3<f32>) -> Vector3<f32> {
    let denom = onto.magnitude2();
    if denom <= EPSILON {
        return Vector3::zero();
    }
    onto * (v.dot(onto) / denom)
}

/// Unsigned angle between two vectors. Zero if either of them has no length.
pub fn angle_between(a: Vector3<f32>, b: Vector3<f32>) -> Rad<f32> {
    let denom = a.magnitude() * b.magnitude();
    if denom <= EPSILON {
        return Rad(0.0);
    }
    Rad((a.dot(b) / denom).clamp(-1.0, 1.0).acos())
}

pub fn rotate_x_deg(p: Vector3<f32>, angle: f32) -> Vector3<f32> {
    let (s, c) = Rad::from(Deg(angle)).0.sin_cos();
    Vector3::new(p.x, p.y * c - p.z * s, p.y * s + p.z * c)
}

pub fn rotate_y_deg(p: Vector3<f32>, angle: f32) -> Vector3<f32> {
    let (s, c) = Rad::from(Deg(angle)).0.sin_cos();
    Vector3::new(p.x * c + p.z * s, p.y, -p.x * s + p.z * c)
}

pub fn rotate_z_deg(p: Vector3<f32>, angle: f32) -> Vector3<f32> {
    let (s, c) = Rad::from(Deg(angle)).0.sin_cos();
    Vector3::new(p.x * c - p.y * s, p.x * s + p.y * c, p.z)
}

/// Axis aligned bounding box.
///
/// An empty box has `min > max` on every axis so that expanding it by the
/// first point yields a zero-sized box around that point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Vector3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Vector3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Vector3<f32>>,
    {
        let mut aabb = Self::empty();
        for p in points {
            aabb.expand(p);
        }
        aabb
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expand(&mut self, p: Vector3<f32>) {
        self.min = Vector3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Vector3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        let mut out = *self;
        if !other.is_empty() {
            out.expand(other.min);
            out.expand(other.max);
        }
        out
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: Vector3<f32>) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Child box `index` (0..8) of an octree split at the center.
    ///
    /// Bit 0 selects the upper x half, bit 1 upper y and bit 2 upper z.
    pub fn octant(&self, index: usize) -> Aabb {
        let c = self.center();
        let pick = |bit: usize, lo: f32, mid: f32, hi: f32| {
            if index & bit != 0 { (mid, hi) } else { (lo, mid) }
        };
        let (x0, x1) = pick(1, self.min.x, c.x, self.max.x);
        let (y0, y1) = pick(2, self.min.y, c.y, self.max.y);
        let (z0, z1) = pick(4, self.min.z, c.z, self.max.z);
        Aabb::new(Vector3::new(x0, y0, z0), Vector3::new(x1, y1, z1))
    }

    /// Index of the octant a point falls into. Points on the split plane go up.
    pub fn octant_of(&self, p: Vector3<f32>) -> usize {
        let c = self.center();
        let mut index = 0;
        if p.x >= c.x {
            index |= 1;
        }
        if p.y >= c.y {
            index |= 2;
        }
        if p.z >= c.z {
            index |= 4;
        }
        index
    }

    /// Squared distance from `p` to the closest point of the box (zero inside).
    pub fn distance_squared_to(&self, p: Vector3<f32>) -> f32 {
        let dx = (self.min.x - p.x).max(0.0).max(p.x - self.max.x);
        let dy = (self.min.y - p.y).max(0.0).max(p.y - self.max.y);
        let dz = (self.min.z - p.z).max(0.0).max(p.z - self.max.z);
        dx * dx + dy * dy + dz * dz
    }

    pub fn intersects_sphere(&self, center: Vector3<f32>, radius: f32) -> bool {
        self.distance_squared_to(center) <= radius * radius
    }
}

/// Which side of a plane something lies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Front,
    Back,
    On,
}

/// Plane in Hessian normal form: `normal · p + d = 0` with a unit normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f32>,
    pub d: f32,
}

impl Plane {
    pub fn new(normal: Vector3<f32>, point: Vector3<f32>) -> Option<Self> {
        let normal = safe_normalize(normal);
        if normal.is_zero() {
            return None;
        }
        Some(Self {
            normal,
            d: -normal.dot(point),
        })
    }

    /// Plane through three counter-clockwise points. `None` for collinear input.
    pub fn from_points(a: Vector3<f32>, b: Vector3<f32>, c: Vector3<f32>) -> Option<Self> {
        Self::new((b - a).cross(c - a), a)
    }

    pub fn signed_distance(&self, p: Vector3<f32>) -> f32 {
        self.normal.dot(p) + self.d
    }

    pub fn classify(&self, p: Vector3<f32>, eps: f32) -> Side {
        let dist = self.signed_distance(p);
        if dist > eps {
            Side::Front
        } else if dist < -eps {
            Side::Back
        } else {
            Side::On
        }
    }
}
