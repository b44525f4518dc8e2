//! Approximate float equality (spec.md §3): `|a-b| <= EPSILON`. Used for UV
//! and custom-normal matching during per-batch vertex dedup (§4.3.3) and for
//! the BSP overlap test's own axis-zero check (that one lives in the `bsp`
//! crate, which redefines the same constant to stay dependency-free of this
//! crate).

use glam::{Mat3, Mat4, Vec2, Vec3};

/// `STD_UV_CONNECT_LIMIT` in the source tool: the tolerance used to decide
/// whether two UV/normal values are "the same" for dedup purposes.
pub const EPSILON: f32 = 1.0 / 4096.0;

/// Applies a world matrix to a position (spec.md §4.3.5 step 1): `(x,y,z,1)`
/// through `mat`, xyz taken back out.
pub fn transform_point(mat: Mat4, p: Vec3) -> Vec3 {
    mat.transform_point3(p)
}

/// Applies a world matrix to a normal via the inverse-transpose of its
/// upper-left 3x3 (spec.md §4.3.5 step 2), renormalized.
pub fn transform_normal(mat: Mat4, n: Vec3) -> Vec3 {
    let normal_mat = Mat3::from_mat4(mat).inverse().transpose();
    (normal_mat * n).normalize()
}

/// `round_bb_float` (spec.md §4.3.5): ceiling-away-from-zero, used for the
/// per-batch quantized i16 bounding box.
pub fn round_away_from_zero(x: f32) -> i16 {
    let sign: f32 = if x < 0.0 { -1.0 } else { 1.0 };
    (sign * x.abs().ceil()) as i16
}

pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() <= EPSILON
}

pub fn approx_eq_v2(a: Vec2, b: Vec2) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

pub fn approx_eq_v3(a: Vec3, b: Vec3) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
}
