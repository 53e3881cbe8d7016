//! Parametric curves: B-splines, NURBS and Catmull-Rom splines.
//!
//! B-spline and NURBS curves are defined over a knot vector and evaluated
//! with the Cox–de Boor recursion. With clamped knots the curve starts at the
//! first control point and ends at the last one.

use cgmath::{InnerSpace, Vector3, Vector4, Zero};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CurveError {
    #[error("degree {degree} needs at least {needed} control points, got {got}")]
    TooFewControlPoints {
        degree: usize,
        needed: usize,
        got: usize,
    },
    #[error("expected {expected} knots, got {got}")]
    KnotCount { expected: usize, got: usize },
    #[error("knots must be non-decreasing (index {0})")]
    DecreasingKnots(usize),
    #[error("expected {expected} weights, got {got}")]
    WeightCount { expected: usize, got: usize },
    #[error("weight {0} must be positive and finite")]
    InvalidWeight(usize),
    #[error("degree must be at least 1")]
    ZeroDegree,
}

#[derive(Clone, Debug, PartialEq)]
pub struct KnotVector {
    knots: Vec<f32>,
}

impl KnotVector {
    pub fn new(knots: Vec<f32>) -> Result<Self, CurveError> {
        if let Some(i) = knots.windows(2).position(|w| w[1] < w[0]) {
            return Err(CurveError::DecreasingKnots(i + 1));
        }
        Ok(Self { knots })
    }

    /// `degree + 1` repeated knots at 0 and 1 with evenly spaced inner knots.
    pub fn uniform_clamped(n_ctrl: usize, degree: usize) -> Result<Self, CurveError> {
        if degree == 0 {
            return Err(CurveError::ZeroDegree);
        }
        if n_ctrl <= degree {
            return Err(CurveError::TooFewControlPoints {
                degree,
                needed: degree + 1,
                got: n_ctrl,
            });
        }
        let inner = n_ctrl - degree - 1;
        let mut knots = vec![0.0; degree + 1];
        knots.extend((1..=inner).map(|i| i as f32 / (inner + 1) as f32));
        knots.extend(std::iter::repeat_n(1.0, degree + 1));
        Ok(Self { knots })
    }

    pub fn len(&self) -> usize {
        self.knots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.knots
    }

    /// Parameter range `[knots[p], knots[n]]` for `n` control points of degree `p`.
    pub fn domain(&self, degree: usize) -> (f32, f32) {
        let n = self.knots.len() - degree - 1;
        (self.knots[degree], self.knots[n])
    }

    /// Index `i` with `knots[i] <= t < knots[i + 1]` inside the domain. The
    /// end of the domain maps to the last non-empty span.
    pub fn span(&self, degree: usize, t: f32) -> usize {
        let n = self.knots.len() - degree - 1;
        let (lo, hi) = self.domain(degree);
        let t = t.clamp(lo, hi);
        if t >= hi {
            let mut i = n - 1;
            while i > degree && self.knots[i] >= hi {
                i -= 1;
            }
            return i;
        }
        let mut i = degree;
        while i < n - 1 && self.knots[i + 1] <= t {
            i += 1;
        }
        i
    }
}

/// Cox–de Boor basis function `N_{i,p}(t)`. The last basis function is 1 at
/// the very end of a clamped knot vector.
pub fn basis(i: usize, p: usize, t: f32, knots: &[f32]) -> f32 {
    if p == 0 {
        let (a, b) = (knots[i], knots[i + 1]);
        let last = knots[knots.len() - 1];
        return if (a <= t && t < b) || (t == last && b == last && a < b) {
            1.0
        } else {
            0.0
        };
    }
    let mut value = 0.0;
    let left = knots[i + p] - knots[i];
    if left > 0.0 {
        value += (t - knots[i]) / left * basis(i, p - 1, t, knots);
    }
    let right = knots[i + p + 1] - knots[i + 1];
    if right > 0.0 {
        value += (knots[i + p + 1] - t) / right * basis(i + 1, p - 1, t, knots);
    }
    value
}

fn check_knots(n_ctrl: usize, degree: usize, knots: &KnotVector) -> Result<(), CurveError> {
    if degree == 0 {
        return Err(CurveError::ZeroDegree);
    }
    if n_ctrl <= degree {
        return Err(CurveError::TooFewControlPoints {
            degree,
            needed: degree + 1,
            got: n_ctrl,
        });
    }
    let expected = n_ctrl + degree + 1;
    if knots.len() != expected {
        return Err(CurveError::KnotCount {
            expected,
            got: knots.len(),
        });
    }
    Ok(())
}

/// `n` evenly spaced parameters over `[lo, hi]`, both ends included.
fn parameters(lo: f32, hi: f32, n: usize) -> impl Iterator<Item = f32> {
    let n = n.max(2);
    (0..n).map(move |i| lo + (hi - lo) * i as f32 / (n - 1) as f32)
}

#[derive(Clone, Debug, PartialEq)]
pub struct BSplineCurve {
    pub degree: usize,
    pub control_points: Vec<Vector3<f32>>,
    pub knots: KnotVector,
}

impl BSplineCurve {
    pub fn new(
        degree: usize,
        control_points: Vec<Vector3<f32>>,
        knots: KnotVector,
    ) -> Result<Self, CurveError> {
        check_knots(control_points.len(), degree, &knots)?;
        Ok(Self {
            degree,
            control_points,
            knots,
        })
    }

    /// Curve with uniform clamped knots.
    pub fn clamped(degree: usize, control_points: Vec<Vector3<f32>>) -> Result<Self, CurveError> {
        let knots = KnotVector::uniform_clamped(control_points.len(), degree)?;
        Self::new(degree, control_points, knots)
    }

    pub fn domain(&self) -> (f32, f32) {
        self.knots.domain(self.degree)
    }

    pub fn evaluate(&self, t: f32) -> Vector3<f32> {
        let (lo, hi) = self.domain();
        let t = t.clamp(lo, hi);
        let span = self.knots.span(self.degree, t);
        let knots = self.knots.as_slice();
        (span - self.degree..=span)
            .map(|i| self.control_points[i] * basis(i, self.degree, t, knots))
            .fold(Vector3::zero(), |acc, p| acc + p)
    }

    pub fn sample(&self, n: usize) -> Vec<Vector3<f32>> {
        let (lo, hi) = self.domain();
        parameters(lo, hi, n).map(|t| self.evaluate(t)).collect()
    }
}

/// Rational B-spline: control points carry positive weights.
#[derive(Clone, Debug, PartialEq)]
pub struct NurbsCurve {
    pub degree: usize,
    pub control_points: Vec<Vector3<f32>>,
    pub weights: Vec<f32>,
    pub knots: KnotVector,
}

impl NurbsCurve {
    pub fn new(
        degree: usize,
        control_points: Vec<Vector3<f32>>,
        weights: Vec<f32>,
        knots: KnotVector,
    ) -> Result<Self, CurveError> {
        check_knots(control_points.len(), degree, &knots)?;
        if weights.len() != control_points.len() {
            return Err(CurveError::WeightCount {
                expected: control_points.len(),
                got: weights.len(),
            });
        }
        if let Some(i) = weights.iter().position(|w| !(w.is_finite() && *w > 0.0)) {
            return Err(CurveError::InvalidWeight(i));
        }
        Ok(Self {
            degree,
            control_points,
            weights,
            knots,
        })
    }

    pub fn domain(&self) -> (f32, f32) {
        self.knots.domain(self.degree)
    }

    pub fn evaluate(&self, t: f32) -> Vector3<f32> {
        let (lo, hi) = self.domain();
        let t = t.clamp(lo, hi);
        let span = self.knots.span(self.degree, t);
        let knots = self.knots.as_slice();
        // homogeneous accumulation: xyz weighted, w is the weight sum
        let h = (span - self.degree..=span).fold(Vector4::zero(), |acc: Vector4<f32>, i| {
            let nw = basis(i, self.degree, t, knots) * self.weights[i];
            acc + (self.control_points[i] * nw).extend(nw)
        });
        if h.w.abs() < f32::EPSILON {
            return self.control_points[span];
        }
        h.truncate() / h.w
    }

    pub fn sample(&self, n: usize) -> Vec<Vector3<f32>> {
        let (lo, hi) = self.domain();
        parameters(lo, hi, n).map(|t| self.evaluate(t)).collect()
    }
}

/// Uniform Catmull-Rom spline through its control points.
#[derive(Clone, Debug, PartialEq)]
pub struct CatmullRom {
    pub points: Vec<Vector3<f32>>,
    pub closed: bool,
}

impl CatmullRom {
    pub fn new(points: Vec<Vector3<f32>>, closed: bool) -> Result<Self, CurveError> {
        if points.len() < 2 {
            return Err(CurveError::TooFewControlPoints {
                degree: 3,
                needed: 2,
                got: points.len(),
            });
        }
        Ok(Self { points, closed })
    }

    pub fn segment_count(&self) -> usize {
        if self.closed {
            self.points.len()
        } else {
            self.points.len() - 1
        }
    }

    fn point(&self, i: isize) -> Vector3<f32> {
        let n = self.points.len() as isize;
        if self.closed {
            self.points[i.rem_euclid(n) as usize]
        } else if i < 0 {
            // mirror the first point so the end tangent follows the polygon
            self.points[0] * 2.0 - self.points[1]
        } else if i >= n {
            self.points[(n - 1) as usize] * 2.0 - self.points[(n - 2) as usize]
        } else {
            self.points[i as usize]
        }
    }

    /// `t` in `[0, 1]` covers the whole spline; it passes through every point.
    pub fn evaluate(&self, t: f32) -> Vector3<f32> {
        let segments = self.segment_count();
        let s = t.clamp(0.0, 1.0) * segments as f32;
        let i = (s.floor() as usize).min(segments - 1);
        let u = s - i as f32;
        let i = i as isize;
        let (p0, p1, p2, p3) = (
            self.point(i - 1),
            self.point(i),
            self.point(i + 1),
            self.point(i + 2),
        );
        let u2 = u * u;
        let u3 = u2 * u;
        let h0 = -0.5 * u3 + u2 - 0.5 * u;
        let h1 = 1.5 * u3 - 2.5 * u2 + 1.0;
        let h2 = -1.5 * u3 + 2.0 * u2 + 0.5 * u;
        let h3 = 0.5 * u3 - 0.5 * u2;
        p0 * h0 + p1 * h1 + p2 * h2 + p3 * h3
    }

    pub fn sample(&self, n: usize) -> Vec<Vector3<f32>> {
        parameters(0.0, 1.0, n).map(|t| self.evaluate(t)).collect()
    }
}

/// Total length of a sampled polyline.
pub fn polyline_length(points: &[Vector3<f32>]) -> f32 {
    points.windows(2).map(|w| (w[1] - w[0]).magnitude()).sum()
}
