//! Quaternion and vector helpers used by animation interpolation.
//!
//! `glam` always interpolates rotations along the shortest arc. Keyframe
//! animation needs the choice to be explicit (a track may opt out of the
//! shortest path), so `slerp`/`nlerp`/`squad` are provided here with a
//! `shortest_path` switch.

use glam::{Quat, Vec3, Vec4};

/// Below this `|cos|` distance from 1 slerp falls back to normalised lerp.
const SLERP_EPSILON: f32 = 1e-3;

/// Default tolerance used when comparing keyframe components.
pub const DEFAULT_TOLERANCE: f32 = 1e-3;

#[inline]
#[must_use]
pub fn real_equal(a: f32, b: f32, tolerance: f32) -> bool {
    (b - a).abs() <= tolerance
}

/// Component-wise tolerance comparison of two positions.
#[inline]
#[must_use]
pub fn position_equals(a: Vec3, b: Vec3, tolerance: f32) -> bool {
    real_equal(a.x, b.x, tolerance) && real_equal(a.y, b.y, tolerance) && real_equal(a.z, b.z, tolerance)
}

/// Returns `true` when the two orientations differ by at most
/// `tolerance_radians`, treating `q` and `-q` as the same rotation.
#[must_use]
pub fn quat_equals(a: Quat, b: Quat, tolerance_radians: f32) -> bool {
    let cos = a.dot(b).clamp(-1.0, 1.0);
    let angle = cos.acos();
    angle.abs() <= tolerance_radians || real_equal(angle, std::f32::consts::PI, tolerance_radians)
}

/// Rotation angle in radians of a unit quaternion, in `[0, 2π]`.
#[must_use]
pub fn quat_angle(q: Quat) -> f32 {
    let sqr_length = q.x * q.x + q.y * q.y + q.z * q.z;
    if sqr_length > 0.0 {
        2.0 * q.w.clamp(-1.0, 1.0).acos()
    } else {
        0.0
    }
}

/// Spherical linear interpolation from `p` (t = 0) to `q` (t = 1).
#[must_use]
pub fn slerp(t: f32, p: Quat, q: Quat, shortest_path: bool) -> Quat {
    let mut cos = p.dot(q);
    let mut target = Vec4::from(q);

    // Do we need to invert rotation?
    if cos < 0.0 && shortest_path {
        cos = -cos;
        target = -target;
    }

    let from = Vec4::from(p);
    if cos.abs() < 1.0 - SLERP_EPSILON {
        let sin = (1.0 - cos * cos).sqrt();
        let angle = sin.atan2(cos);
        let inv_sin = 1.0 / sin;
        let coeff0 = ((1.0 - t) * angle).sin() * inv_sin;
        let coeff1 = (t * angle).sin() * inv_sin;
        Quat::from_vec4(from * coeff0 + target * coeff1)
    } else {
        // Either the quaternions are very close (linear interpolation is
        // safe) or they are almost inverse of each other and there is no
        // unique great circle; lerp and renormalise in both cases.
        Quat::from_vec4(from * (1.0 - t) + target * t).normalize()
    }
}

/// Normalised linear interpolation from `p` (t = 0) to `q` (t = 1).
#[must_use]
pub fn nlerp(t: f32, p: Quat, q: Quat, shortest_path: bool) -> Quat {
    let from = Vec4::from(p);
    let mut target = Vec4::from(q);
    if p.dot(q) < 0.0 && shortest_path {
        target = -target;
    }
    Quat::from_vec4(from + (target - from) * t).normalize()
}

/// Quaternion logarithm of a unit quaternion (pure quaternion result).
#[must_use]
pub fn quat_log(q: Quat) -> Quat {
    let xyz = Vec3::new(q.x, q.y, q.z);
    if q.w.abs() < 1.0 {
        let angle = q.w.acos();
        let sin = angle.sin();
        if sin.abs() >= f32::EPSILON {
            let v = xyz * (angle / sin);
            return Quat::from_xyzw(v.x, v.y, v.z, 0.0);
        }
    }
    Quat::from_xyzw(xyz.x, xyz.y, xyz.z, 0.0)
}

/// Quaternion exponential of a pure quaternion.
#[must_use]
pub fn quat_exp(q: Quat) -> Quat {
    let xyz = Vec3::new(q.x, q.y, q.z);
    let angle = xyz.length();
    let sin = angle.sin();
    let v = if sin.abs() >= f32::EPSILON {
        xyz * (sin / angle)
    } else {
        xyz
    };
    Quat::from_xyzw(v.x, v.y, v.z, angle.cos())
}

/// Spherical quadrangle interpolation between `p` and `q` with inner
/// control points `a` and `b`.
#[must_use]
pub fn squad(t: f32, p: Quat, a: Quat, b: Quat, q: Quat, shortest_path: bool) -> Quat {
    let slerp_t = 2.0 * t * (1.0 - t);
    let slerp_p = slerp(t, p, q, shortest_path);
    let slerp_q = slerp(t, a, b, false);
    slerp(slerp_t, slerp_p, slerp_q, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn slerp_endpoints() {
        let p = Quat::IDENTITY;
        let q = Quat::from_rotation_y(FRAC_PI_2);
        assert!(slerp(0.0, p, q, true).abs_diff_eq(p, 1e-6));
        assert!(slerp(1.0, p, q, true).abs_diff_eq(q, 1e-6));
    }

    #[test]
    fn shortest_path_flips_target() {
        let p = Quat::IDENTITY;
        // Same orientation as a 90 degree turn, expressed in the far hemisphere
        let q = -Quat::from_rotation_y(FRAC_PI_2);
        let short = slerp(0.5, p, q, true);
        let long = slerp(0.5, p, q, false);
        assert!(quat_equals(short, Quat::from_rotation_y(FRAC_PI_2 * 0.5), 1e-4));
        assert!(!quat_equals(short, long, 1e-2));
    }

    #[test]
    fn log_exp_round_trip() {
        let q = Quat::from_rotation_x(1.2);
        let back = quat_exp(quat_log(q));
        assert!(back.abs_diff_eq(q, 1e-5));
    }

    #[test]
    fn angle_of_half_turn() {
        assert!(real_equal(quat_angle(Quat::from_rotation_z(PI)), PI, 1e-4));
        assert_eq!(quat_angle(Quat::IDENTITY), 0.0);
    }
}
