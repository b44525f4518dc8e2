//! Borrowed views over a host mesh (spec.md §2, §4.1): this crate never owns
//! or copies vertex data, it reads slices the caller already has in memory
//! (loop/corner-indexed, matching the source tool's mesh representation) and
//! writes its own output buffers.

use glam::{Mat4, Vec2, Vec3};

use crate::attrs::{ColorLayer, DeformWeights};
use crate::color::Rgba;

/// One triangulated face: three loop indices into the parent mesh's
/// per-corner arrays, plus the originating polygon index (faces sharing a
/// polygon share material/flag lookups).
#[derive(Clone, Copy, Debug)]
pub struct CornerTri {
    pub loops: [u32; 3],
    pub poly: u32,
}

/// The render mesh: already triangulated, one material index per polygon.
#[derive(Clone, Copy)]
pub struct RenderMesh<'a> {
    pub positions: &'a [Vec3],
    pub loop_vertex: &'a [u32],
    pub corner_tris: &'a [CornerTri],
    pub face_material_index: &'a [i32],
    pub vertex_normals: &'a [Vec3],
    pub loop_normals: Option<&'a [Vec3]>,
}

/// A separate collision-only mesh (spec.md §4.3.6), carrying its own world
/// matrix since collision geometry may live on a different object.
#[derive(Clone, Copy)]
pub struct CollisionMesh<'a> {
    pub positions: &'a [Vec3],
    pub loop_vertex: &'a [u32],
    pub corner_tris: &'a [CornerTri],
    pub vertex_normals: &'a [Vec3],
    pub world_matrix: Mat4,
}

/// The fixed set of named attribute layers the batcher consults (spec.md
/// §4.1, §9 supplement 1): batch-map masks, light/blend maps, vertex color,
/// a second UV channel, and deform-group membership for collision filtering.
#[derive(Clone, Copy, Default)]
pub struct MeshAttributeLayers<'a> {
    pub batchmap_trans: Option<&'a [Rgba]>,
    pub batchmap_int: Option<&'a [Rgba]>,
    pub lightmap: Option<ColorLayer<'a>>,
    pub blendmap: Option<ColorLayer<'a>>,
    pub col: Option<ColorLayer<'a>>,
    pub uv0: Option<&'a [Vec2]>,
    pub uv1: Option<&'a [Vec2]>,
    pub deform_weights: Option<DeformWeights<'a>>,
}

/// One liquid polygon: a run of loops in [`LiquidMesh::loop_vertex`].
#[derive(Clone, Copy, Debug)]
pub struct LiquidPoly {
    pub loop_start: u32,
    pub loop_count: u32,
}

/// The liquid mesh (spec.md §4.4): a regular tile grid. `flag_layers` are
/// read as raw per-loop byte color directly (the legacy exporter bypasses
/// the generic per-loop/per-vertex color resolution for these, always
/// treating them as per-loop with alpha forced to full).
#[derive(Clone, Copy)]
pub struct LiquidMesh<'a> {
    pub positions: &'a [Vec3],
    pub loop_vertex: &'a [u32],
    pub polys: &'a [LiquidPoly],
    pub uv0: Option<&'a [Vec2]>,
    pub flag_layers: [Option<&'a [Rgba]>; 8],
    pub world_matrix: Mat4,
}
