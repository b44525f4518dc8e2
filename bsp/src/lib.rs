//! Recursive AABB-median-split BSP tree over a vertex pool and a u16
//! triangle-index stream, plus the AABB<->triangle overlap test it needs to
//! partition faces between children.

mod overlap;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

pub use overlap::aabb_overlaps_triangle;

pub const MAX_DEPTH: u32 = 16;
const MAX_DUPLICATION_RATIO: f32 = 1.3;
const MIN_SPLIT_RATIO: f32 = 0.2;

/// Plane orientation of a [`BspNode`]; `4` marks a leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i16)]
pub enum PlaneType {
    Yz = 0,
    Xz = 1,
    Xy = 2,
    Leaf = 4,
}

/// `BSPNode`, 16 bytes: `i16 plane_type`, `i16 children[2]`, `u16 num_faces`,
/// `u32 first_face`, `f32 dist`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct BspNode {
    pub plane_type: i16,
    pub children: [i16; 2],
    pub num_faces: u16,
    pub first_face: u32,
    pub dist: f32,
}

impl BspNode {
    fn leaf(num_faces: u16, first_face: u32) -> Self {
        Self {
            plane_type: PlaneType::Leaf as i16,
            children: [-1, -1],
            num_faces,
            first_face,
            dist: 0.0,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.plane_type == PlaneType::Leaf as i16
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    fn get(&self, axis: usize, which: usize) -> f32 {
        if which == 0 { self.min[axis] } else { self.max[axis] }
    }

    fn split(&self, axis: usize, dist: f32) -> (BoundingBox, BoundingBox) {
        let mut lo = *self;
        let mut hi = *self;
        lo.max[axis] = dist;
        hi.min[axis] = dist;
        (lo, hi)
    }
}

/// Flat, pre-order BSP tree. `nodes[0]` is the root; leaves hold their faces
/// as a contiguous run in `faces`.
pub struct BspTree {
    pub nodes: Vec<BspNode>,
    pub faces: Vec<u16>,
}

impl BspTree {
    /// Builds the tree over `triangle_indices` (a flat run of `u16` triples)
    /// using `vertices` for coordinates, starting from `bounds` and a soft
    /// leaf size of `node_size`.
    pub fn build(vertices: &[Vec3], triangle_indices: &[u16], bounds: BoundingBox, node_size: u32) -> Self {
        assert_eq!(
            triangle_indices.len() % 3,
            0,
            "bsp triangle-index stream length must be a multiple of three"
        );
        let face_count = (triangle_indices.len() / 3) as u32;
        let all_faces: Vec<u32> = (0..face_count).collect();

        let mut tree = BspTree { nodes: Vec::new(), faces: Vec::new() };
        tree.add_node(vertices, triangle_indices, bounds, &all_faces, 0, node_size);
        tree
    }

    fn triangle_verts(vertices: &[Vec3], triangle_indices: &[u16], face: u32) -> [Vec3; 3] {
        let base = face as usize * 3;
        [
            vertices[triangle_indices[base] as usize],
            vertices[triangle_indices[base + 1] as usize],
            vertices[triangle_indices[base + 2] as usize],
        ]
    }

    fn add_node(
        &mut self,
        vertices: &[Vec3],
        triangle_indices: &[u16],
        bounds: BoundingBox,
        face_ids: &[u32],
        depth: u32,
        node_size: u32,
    ) -> i16 {
        let index = self.nodes.len();
        self.nodes.push(BspNode::leaf(0, 0));

        if depth > MAX_DEPTH || face_ids.len() <= node_size as usize {
            self.finalize_leaf(index, face_ids);
            return index as i16;
        }

        let extent = bounds.extent();
        let axis = if extent.x > extent.y && extent.x > extent.z {
            0
        } else if extent.y > extent.x && extent.y > extent.z {
            1
        } else {
            2
        };

        let mut coords: Vec<f32> = Vec::with_capacity(face_ids.len() * 3);
        for &face in face_ids {
            for v in Self::triangle_verts(vertices, triangle_indices, face) {
                coords.push(v[axis]);
            }
        }
        coords.sort_by(|a, b| a.total_cmp(b));
        let mut split_dist = coords[coords.len() / 2];
        if split_dist <= bounds.get(axis, 0) || split_dist >= bounds.get(axis, 1) || split_dist == 0.0 {
            split_dist = (bounds.get(axis, 0) + bounds.get(axis, 1)) * 0.5;
        }

        let (lo_box, hi_box) = bounds.split(axis, split_dist);
        let mut lo_faces = Vec::new();
        let mut hi_faces = Vec::new();
        for &face in face_ids {
            let tri = Self::triangle_verts(vertices, triangle_indices, face);
            if overlap::aabb_overlaps_triangle(&lo_box, &tri) {
                lo_faces.push(face);
            }
            if overlap::aabb_overlaps_triangle(&hi_box, &tri) {
                hi_faces.push(face);
            }
        }

        let total = face_ids.len() as f32;
        let dup_ratio = (lo_faces.len() + hi_faces.len()) as f32 / total;
        let balance = lo_faces.len().min(hi_faces.len()) as f32 / total;
        let min_faces = node_size as f32 / 2.0;
        let should_fallback = dup_ratio > MAX_DUPLICATION_RATIO
            || (lo_faces.len() as f32) < min_faces
            || (hi_faces.len() as f32) < min_faces
            || (balance < MIN_SPLIT_RATIO && total <= node_size as f32 * 1.5);

        if should_fallback {
            self.finalize_leaf(index, face_ids);
            return index as i16;
        }

        let child_lo = if lo_faces.is_empty() {
            -1
        } else {
            self.add_node(vertices, triangle_indices, lo_box, &lo_faces, depth + 1, node_size)
        };
        let child_hi = if hi_faces.is_empty() {
            -1
        } else {
            self.add_node(vertices, triangle_indices, hi_box, &hi_faces, depth + 1, node_size)
        };

        self.nodes[index] = BspNode {
            plane_type: axis as i16,
            children: [child_lo, child_hi],
            num_faces: 0,
            first_face: 0,
            dist: split_dist,
        };
        index as i16
    }

    fn finalize_leaf(&mut self, index: usize, face_ids: &[u32]) {
        let first_face = self.faces.len() as u32;
        self.faces.extend(face_ids.iter().map(|&f| f as u16));
        self.nodes[index] = BspNode::leaf(face_ids.len() as u16, first_face);
    }
}
