//! AABB<->triangle overlap test used by [`crate::BspTree::build`] to decide
//! which child a face belongs to. Separating-axis test over the three world
//! axes, the three triangle edges (via `project_point`, preserved verbatim),
//! and the triangle plane.

use glam::Vec3;

use crate::BoundingBox;

const STD_UV_CONNECT_LIMIT: f32 = 1.0 / 4096.0;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() <= STD_UV_CONNECT_LIMIT
}

fn proj_overlap(min_a: f32, max_a: f32, min_b: f32, max_b: f32) -> bool {
    !(max_a < min_b || max_b < min_a)
}

fn min_max(points: &[Vec3]) -> (Vec3, Vec3) {
    let mut min = points[0];
    let mut max = points[0];
    for &p in &points[1..] {
        if p.x < min.x {
            min.x = p.x;
        } else if p.x > max.x {
            max.x = p.x;
        }
        if p.y < min.y {
            min.y = p.y;
        } else if p.y > max.y {
            max.y = p.y;
        }
        if p.z < min.z {
            min.z = p.z;
        } else if p.z > max.z {
            max.z = p.z;
        }
    }
    (min, max)
}

fn separated(box_min: Vec3, box_max: Vec3, tri_min: Vec3, tri_max: Vec3) -> bool {
    !proj_overlap(box_min.x, box_max.x, tri_min.x, tri_max.x)
        || !proj_overlap(box_min.y, box_max.y, tri_min.y, tri_max.y)
        || !proj_overlap(box_min.z, box_max.z, tri_min.z, tri_max.z)
}

/// Preserved bit-for-bit from the legacy `_project_point` (spec.md §4.2.1,
/// §9 note 1): the `.x/.y/.z` assignments are not a textbook SAT projection.
/// Do not "fix" this; the emitted tree must match the legacy client.
fn project_point(pt: Vec3, v: Vec3) -> Vec3 {
    let l = if approx_eq(v.y, 0.0) { 0.0 } else { -pt.y / v.y };
    let proj_z = pt.x + l * v.x;

    let l = if approx_eq(v.z, 0.0) { 0.0 } else { -pt.z / v.z };
    let proj_y = pt.x + l * v.x;
    let proj_x = pt.y + l * v.y;

    Vec3::new(proj_x, proj_y, proj_z)
}

fn plane_box_overlap(normal: Vec3, vert: Vec3, bounds: &BoundingBox) -> bool {
    let mut v_max = Vec3::ZERO;
    for i in 0..3 {
        v_max[i] = if normal[i] > 0.0 {
            bounds.max[i] - vert[i]
        } else {
            bounds.min[i] - vert[i]
        };
    }
    normal.dot(v_max) >= 0.0
}

fn box_corners(bounds: &BoundingBox) -> [Vec3; 8] {
    let min = bounds.min;
    let max = bounds.max;
    [
        min,
        Vec3::new(min.x, max.y, min.z),
        Vec3::new(max.x, max.y, min.z),
        Vec3::new(max.x, min.y, min.z),
        max,
        Vec3::new(min.x, max.y, max.z),
        Vec3::new(max.x, max.y, max.z),
        Vec3::new(max.x, min.y, max.z),
    ]
}

fn edge_axis_separated(corners: &[Vec3; 8], tri: &[Vec3; 3], edge: Vec3) -> bool {
    let box_proj: Vec<Vec3> = corners.iter().map(|&p| project_point(p, edge)).collect();
    let tri_proj: Vec<Vec3> = tri.iter().map(|&p| project_point(p, edge)).collect();
    let (box_min, box_max) = min_max(&box_proj);
    let (tri_min, tri_max) = min_max(&tri_proj);
    separated(box_min, box_max, tri_min, tri_max)
}

/// Returns true if `bounds` and `tri` overlap: axis tests, then edge-cross
/// SAT via `project_point`, then the triangle plane against the box.
pub fn aabb_overlaps_triangle(bounds: &BoundingBox, tri: &[Vec3; 3]) -> bool {
    let (tri_min, tri_max) = min_max(tri);
    if separated(bounds.min, bounds.max, tri_min, tri_max) {
        return false;
    }

    let corners = box_corners(bounds);

    let e0 = tri[1] - tri[0];
    if edge_axis_separated(&corners, tri, e0) {
        return false;
    }

    let e1 = tri[2] - tri[1];
    if edge_axis_separated(&corners, tri, e1) {
        return false;
    }

    let e2 = tri[0] - tri[2];
    if edge_axis_separated(&corners, tri, e2) || !plane_box_overlap(e0.cross(e1), tri[0], bounds) {
        return false;
    }

    true
}
