//! Liquid tile/vertex grid encoder (spec.md §4.4): converts a regular grid
//! mesh into the fixed-layout `MLIQHeader`/`SMOLVert`/`SMOLTile` arrays the
//! legacy client expects.

use std::collections::HashMap;

use glam::Vec2;

use crate::color::Rgba;
use crate::input::LiquidMesh;
use crate::math::transform_point;
use crate::types::{LiquidHeader, LiquidTile, LiquidVertex};

/// Per-batcher-call liquid parameters (§6: "liquid parameters (optional)").
#[derive(Clone, Copy, Debug)]
pub struct LiquidConfig {
    pub x_tiles: u32,
    pub y_tiles: u32,
    pub mat_id: u16,
    pub is_water: bool,
}

/// `LiquidExporter::_process_mesh_data` (spec.md §4.4): builds the header,
/// the per-vertex height/flow-or-UV array, and the per-tile flag bytes.
///
/// Panics if `mesh`'s vertex count does not match `(x_tiles+1)*(y_tiles+1)`,
/// or if `is_water` is false and `mesh.uv0` is absent (magma requires a
/// `UVMap` layer, spec.md §7).
pub fn build_liquid(mesh: &LiquidMesh, config: LiquidConfig) -> (LiquidHeader, Vec<LiquidVertex>, Vec<LiquidTile>) {
    let expected_verts = ((config.x_tiles + 1) * (config.y_tiles + 1)) as usize;
    assert_eq!(
        mesh.positions.len(),
        expected_verts,
        "liquid mesh vertex count does not match a ({}+1)x({}+1) grid",
        config.x_tiles,
        config.y_tiles
    );

    let transformed: Vec<_> = mesh.positions.iter().map(|&p| transform_point(mesh.world_matrix, p)).collect();

    let mut liquid_corner = transformed[0];
    let mut best_sum = liquid_corner.x + liquid_corner.y;
    for &v in &transformed[1..] {
        let sum = v.x + v.y;
        if sum < best_sum {
            best_sum = sum;
            liquid_corner = v;
        }
    }

    let header = LiquidHeader {
        liquid_verts: [(config.x_tiles + 1) as i16, (config.y_tiles + 1) as i16],
        liquid_tiles: [config.x_tiles as i16, config.y_tiles as i16],
        liquid_corner: [liquid_corner.x, liquid_corner.y, liquid_corner.z],
        liquid_mat_id: config.mat_id,
    };

    let vertices = if config.is_water {
        transformed.iter().map(|&v| LiquidVertex::water(0, 0, 0, v.z)).collect()
    } else {
        build_magma_vertices(mesh, &transformed)
    };

    let tiles = build_tiles(mesh);

    (header, vertices, tiles)
}

fn build_magma_vertices(mesh: &LiquidMesh, transformed: &[glam::Vec3]) -> Vec<LiquidVertex> {
    let uv0 = mesh.uv0.expect("magma liquid requires a UVMap layer");

    // Fold every polygon's loop UVs into a per-vertex map, last write wins
    // (mirrors the original's unordered_map insertion over a single pass).
    let mut vertex_to_uv: HashMap<u32, Vec2> = HashMap::with_capacity(mesh.positions.len());
    for poly in mesh.polys {
        for i in 0..poly.loop_count {
            let loop_index = (poly.loop_start + i) as usize;
            let vertex_id = mesh.loop_vertex[loop_index];
            vertex_to_uv.insert(vertex_id, uv0[loop_index]);
        }
    }

    transformed
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let uv = vertex_to_uv.get(&(i as u32)).copied().unwrap_or(Vec2::ZERO);
            let s = (uv.x * 255.0).round() as i16;
            let t = (uv.y * 255.0).round() as i16;
            LiquidVertex::magma(s, t, v.z)
        })
        .collect()
}

fn build_tiles(mesh: &LiquidMesh) -> Vec<LiquidTile> {
    const PURE_BLUE: Rgba = Rgba::new(0, 0, 255, 255);

    mesh.polys
        .iter()
        .map(|poly| {
            let first_loop = poly.loop_start as usize;
            let mut flags_raw: u8 = 0;
            let mut not_rendered = false;
            let mut bit: u16 = 0x1;

            // Bits 0x1/0x2/0x4/0x8 are the legacy_liquid_type nibble; all
            // four are driven off layer 0's "not rendered" signal, a legacy
            // quirk preserved intentionally (spec.md §9 note 5).
            for layer in &mesh.flag_layers {
                if let Some(colors) = layer {
                    let is_checked = colors[first_loop] == PURE_BLUE;
                    if bit == 0x1 && is_checked {
                        not_rendered = true;
                    }
                    if bit <= 0x8 {
                        if not_rendered {
                            flags_raw |= bit as u8;
                        }
                    } else if is_checked {
                        flags_raw |= bit as u8;
                    }
                }
                bit <<= 1;
            }

            LiquidTile(flags_raw)
        })
        .collect()
}
