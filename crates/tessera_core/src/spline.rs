//! Keyframe splines.
//!
//! [`SimpleSpline`] is a cubic Hermite spline whose tangents are derived
//! Catmull-Rom style from the neighbouring points, so the curve passes
//! through every control point. [`RotationalSpline`] is its orientation
//! counterpart, built on spherical quadrangle interpolation.
//!
//! Both splines are closed when the first and last points are equal; the
//! tangents at the seam are then computed across it.

use glam::{Quat, Vec3, Vec4};

use crate::math::{quat_exp, quat_log, squad};

/// Catmull-Rom style Hermite spline over `Vec3` control points.
#[derive(Debug, Clone, Default)]
pub struct SimpleSpline {
    points: Vec<Vec3>,
    tangents: Vec<Vec3>,
}

impl SimpleSpline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a spline from `points` and computes its tangents.
    #[must_use]
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut spline = Self {
            points: points.into_iter().collect(),
            tangents: Vec::new(),
        };
        spline.recalc_tangents();
        spline
    }

    pub fn add_point(&mut self, p: Vec3) {
        self.points.push(p);
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.tangents.clear();
    }

    #[inline]
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    #[inline]
    #[must_use]
    pub fn point(&self, index: usize) -> Option<Vec3> {
        self.points.get(index).copied()
    }

    /// Recomputes every tangent from the current control points.
    pub fn recalc_tangents(&mut self) {
        let n = self.points.len();
        self.tangents.clear();
        if n < 2 {
            self.tangents.resize(n, Vec3::ZERO);
            return;
        }

        let closed = self.points[0] == self.points[n - 1];
        self.tangents.reserve(n);
        for i in 0..n {
            let tangent = if i == 0 {
                if closed {
                    0.5 * (self.points[1] - self.points[n - 2])
                } else {
                    0.5 * (self.points[1] - self.points[0])
                }
            } else if i == n - 1 {
                if closed {
                    // Same as the first tangent
                    self.tangents[0]
                } else {
                    0.5 * (self.points[i] - self.points[i - 1])
                }
            } else {
                0.5 * (self.points[i + 1] - self.points[i - 1])
            };
            self.tangents.push(tangent);
        }
    }

    /// Evaluates the segment starting at `from_index` at local parameter `t`.
    ///
    /// The last point is returned as-is when `from_index` is the final
    /// control point, since there is no outgoing segment.
    #[must_use]
    pub fn interpolate(&self, from_index: usize, t: f32) -> Vec3 {
        let n = self.points.len();
        if n == 0 {
            return Vec3::ZERO;
        }
        let from_index = from_index.min(n - 1);
        if from_index + 1 == n {
            return self.points[from_index];
        }

        // Fast special cases
        if t == 0.0 {
            return self.points[from_index];
        } else if t == 1.0 {
            return self.points[from_index + 1];
        }

        let t2 = t * t;
        let t3 = t2 * t;
        let powers = Vec4::new(t3, t2, t, 1.0);

        // Hermite basis, rows of the coefficient matrix applied to powers
        let h1 = powers.dot(Vec4::new(2.0, -3.0, 0.0, 1.0));
        let h2 = powers.dot(Vec4::new(-2.0, 3.0, 0.0, 0.0));
        let h3 = powers.dot(Vec4::new(1.0, -2.0, 1.0, 0.0));
        let h4 = powers.dot(Vec4::new(1.0, -1.0, 0.0, 0.0));

        let p1 = self.points[from_index];
        let p2 = self.points[from_index + 1];
        let tan1 = self.tangents.get(from_index).copied().unwrap_or(Vec3::ZERO);
        let tan2 = self.tangents.get(from_index + 1).copied().unwrap_or(Vec3::ZERO);

        p1 * h1 + p2 * h2 + tan1 * h3 + tan2 * h4
    }
}

/// Orientation spline using squad between inner control quaternions.
#[derive(Debug, Clone, Default)]
pub struct RotationalSpline {
    points: Vec<Quat>,
    tangents: Vec<Quat>,
}

impl RotationalSpline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a spline from `points` and computes its inner control points.
    #[must_use]
    pub fn from_points(points: impl IntoIterator<Item = Quat>) -> Self {
        let mut spline = Self {
            points: points.into_iter().collect(),
            tangents: Vec::new(),
        };
        spline.recalc_tangents();
        spline
    }

    pub fn add_point(&mut self, q: Quat) {
        self.points.push(q);
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.tangents.clear();
    }

    #[inline]
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Recomputes the squad inner control points.
    ///
    /// `a_i = q_i * exp(-(log(q_i⁻¹ q_{i+1}) + log(q_i⁻¹ q_{i-1})) / 4)`
    pub fn recalc_tangents(&mut self) {
        let n = self.points.len();
        self.tangents.clear();
        if n < 2 {
            self.tangents.extend(self.points.iter().copied());
            return;
        }

        let closed = self.points[0] == self.points[n - 1];
        let inner = |prev: Quat, cur: Quat, next: Quat| {
            let inv = cur.inverse();
            let part1 = Vec4::from(quat_log(inv * next));
            let part2 = Vec4::from(quat_log(inv * prev));
            let pre_exp = Quat::from_vec4((part1 + part2) * -0.25);
            cur * quat_exp(pre_exp)
        };

        self.tangents.reserve(n);
        for i in 0..n {
            let cur = self.points[i];
            let tangent = if i == 0 {
                if closed {
                    inner(self.points[n - 2], cur, self.points[1])
                } else {
                    cur
                }
            } else if i == n - 1 {
                if closed {
                    self.tangents[0]
                } else {
                    cur
                }
            } else {
                inner(self.points[i - 1], cur, self.points[i + 1])
            };
            self.tangents.push(tangent);
        }
    }

    /// Evaluates the segment starting at `from_index` at local parameter `t`.
    #[must_use]
    pub fn interpolate(&self, from_index: usize, t: f32, shortest_path: bool) -> Quat {
        let n = self.points.len();
        if n == 0 {
            return Quat::IDENTITY;
        }
        let from_index = from_index.min(n - 1);
        if from_index + 1 == n {
            return self.points[from_index];
        }

        if t == 0.0 {
            return self.points[from_index];
        } else if t == 1.0 {
            return self.points[from_index + 1];
        }

        let p = self.points[from_index];
        let q = self.points[from_index + 1];
        let a = self.tangents.get(from_index).copied().unwrap_or(p);
        let b = self.tangents.get(from_index + 1).copied().unwrap_or(q);

        squad(t, p, a, b, q, shortest_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spline_passes_through_points() {
        let spline = SimpleSpline::from_points([
            Vec3::ZERO,
            Vec3::new(1.0, 2.0, 0.0),
            Vec3::new(3.0, 2.0, 1.0),
        ]);
        assert_eq!(spline.interpolate(0, 0.0), Vec3::ZERO);
        assert_eq!(spline.interpolate(0, 1.0), Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(spline.interpolate(2, 0.5), Vec3::new(3.0, 2.0, 1.0));
    }

    #[test]
    fn collinear_points_stay_on_line() {
        let spline = SimpleSpline::from_points([
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
        ]);
        let mid = spline.interpolate(1, 0.5);
        assert!((mid.x - 1.5).abs() < 1e-5);
        assert!(mid.y.abs() < 1e-6 && mid.z.abs() < 1e-6);
    }

    #[test]
    fn rotational_spline_endpoints() {
        let q0 = Quat::IDENTITY;
        let q1 = Quat::from_rotation_y(0.5);
        let q2 = Quat::from_rotation_y(1.0);
        let spline = RotationalSpline::from_points([q0, q1, q2]);
        assert_eq!(spline.interpolate(0, 0.0, true), q0);
        assert_eq!(spline.interpolate(1, 1.0, true), q2);
        let mid = spline.interpolate(0, 0.5, true);
        assert!(mid.angle_between(Quat::from_rotation_y(0.25)) < 1e-2);
    }
}
