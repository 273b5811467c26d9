//! Interpolation helpers:
//! - lerp_vec3 (component-wise)
//! - slerp_quat (shortest-arc spherical interpolation)
//! - angle_between (shortest-arc angle between two rotations)
//! - euler_deg_to_quat / quat_to_euler_deg (intrinsic XYZ, degrees)

use crate::data::{sanitize_quat, Quat, Vec3, QUAT_IDENTITY};

/// Below this |dot| distance from 1 slerp degrades to normalized lerp.
const SLERP_LINEAR_THRESHOLD: f64 = 1e-6;

/// Linear interpolation of scalars.
#[inline]
pub fn lerp_f64(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[inline]
pub fn lerp_vec3(a: Vec3, b: Vec3, t: f64) -> Vec3 {
    [
        lerp_f64(a[0], b[0], t),
        lerp_f64(a[1], b[1], t),
        lerp_f64(a[2], b[2], t),
    ]
}

#[inline]
fn dot4(a: Quat, b: Quat) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3]
}

/// Unit-length copy of `q`; identity for a zero or non-finite input.
#[inline]
pub fn normalize_quat(q: Quat) -> Quat {
    let q = sanitize_quat(q);
    let len2 = dot4(q, q);
    if len2 > 0.0 && len2.is_finite() {
        let inv_len = len2.sqrt().recip();
        [q[0] * inv_len, q[1] * inv_len, q[2] * inv_len, q[3] * inv_len]
    } else {
        QUAT_IDENTITY
    }
}

/// Spherical interpolation from `a` to `b` along the shortest arc.
/// If dot < 0, `b` is negated first. Returns a normalized quaternion (x,y,z,w).
pub fn slerp_quat(a: Quat, b: Quat, t: f64) -> Quat {
    if t <= 0.0 {
        return a;
    }
    if t >= 1.0 {
        return b;
    }
    let a = normalize_quat(a);
    let mut b = normalize_quat(b);
    let mut cos_half = dot4(a, b);
    if cos_half < 0.0 {
        b = [-b[0], -b[1], -b[2], -b[3]];
        cos_half = -cos_half;
    }
    if cos_half >= 1.0 - SLERP_LINEAR_THRESHOLD {
        let q = [
            lerp_f64(a[0], b[0], t),
            lerp_f64(a[1], b[1], t),
            lerp_f64(a[2], b[2], t),
            lerp_f64(a[3], b[3], t),
        ];
        return normalize_quat(q);
    }
    let half = cos_half.min(1.0).acos();
    let sin_half = half.sin();
    let wa = ((1.0 - t) * half).sin() / sin_half;
    let wb = (t * half).sin() / sin_half;
    normalize_quat([
        a[0] * wa + b[0] * wb,
        a[1] * wa + b[1] * wb,
        a[2] * wa + b[2] * wb,
        a[3] * wa + b[3] * wb,
    ])
}

/// Shortest-arc angle in radians between two rotations. Missing/NaN components are read as
/// identity and both inputs are normalized.
pub fn angle_between(a: Quat, b: Quat) -> f64 {
    let a = normalize_quat(a);
    let b = normalize_quat(b);
    2.0 * dot4(a, b).abs().min(1.0).acos()
}

/// Intrinsic XYZ Euler angles in degrees -> quaternion. Non-finite angles read as 0.
pub fn euler_deg_to_quat(euler_deg: Vec3) -> Quat {
    let [x, y, z] = euler_deg.map(|d| if d.is_finite() { d.to_radians() } else { 0.0 });
    let (s1, c1) = (x * 0.5).sin_cos();
    let (s2, c2) = (y * 0.5).sin_cos();
    let (s3, c3) = (z * 0.5).sin_cos();
    [
        s1 * c2 * c3 + c1 * s2 * s3,
        c1 * s2 * c3 - s1 * c2 * s3,
        c1 * c2 * s3 + s1 * s2 * c3,
        c1 * c2 * c3 - s1 * s2 * s3,
    ]
}

/// Quaternion -> intrinsic XYZ Euler angles in degrees (gimbal case pins z to 0).
pub fn quat_to_euler_deg(q: Quat) -> Vec3 {
    let [x, y, z, w] = normalize_quat(q);
    let m11 = 1.0 - 2.0 * (y * y + z * z);
    let m12 = 2.0 * (x * y - z * w);
    let m13 = 2.0 * (x * z + y * w);
    let m22 = 1.0 - 2.0 * (x * x + z * z);
    let m23 = 2.0 * (y * z - x * w);
    let m32 = 2.0 * (y * z + x * w);
    let m33 = 1.0 - 2.0 * (x * x + y * y);

    let ey = m13.clamp(-1.0, 1.0).asin();
    let (ex, ez) = if m13.abs() < 0.999_999_9 {
        ((-m23).atan2(m33), (-m12).atan2(m11))
    } else {
        (m32.atan2(m22), 0.0)
    };
    [ex.to_degrees(), ey.to_degrees(), ez.to_degrees()]
}
