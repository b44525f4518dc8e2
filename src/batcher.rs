//! Geometry batcher (spec.md §4.3): classifies render triangles, sorts them
//! into batches, deduplicates vertices within each batch, transforms
//! positions/normals into world space, and emits the BSP and (optional)
//! liquid data alongside the vertex pool. The whole pipeline runs inside
//! [`GeometryBatcher::new`]; the result is a read-only, owned snapshot.

use std::collections::HashMap;

use bsp::{BoundingBox, BspNode, BspTree};
use glam::{Mat4, Vec2, Vec3};
use thiserror::Error;

use crate::color::{comp_color_key, grayscale_factor, Rgba};
use crate::input::{CollisionMesh, CornerTri, LiquidMesh, MeshAttributeLayers, RenderMesh};
use crate::liquid::{build_liquid, LiquidConfig};
use crate::math::{approx_eq_v2, approx_eq_v3, round_away_from_zero, transform_normal, transform_point};
use crate::types::{Batch, BatchFlags, BatchType, LiquidHeader, LiquidTile, LiquidVertex, TriangleMaterial, TriangleMaterialFlags};

/// The one caller-visible, non-fatal anomaly this crate raises (spec.md §7,
/// §9 note 4): a face's material index has no entry in `material_mapping`.
/// Accumulated during construction rather than aborting the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum BatcherNotice {
    #[error("face material index {face_material_index} has no entry in the material mapping (len {mapping_len})")]
    LooseMaterialId { face_material_index: i32, mapping_len: usize },
}

/// Per-batcher-call configuration (spec.md §6): everything that is a
/// constructor argument rather than derived from the mesh itself.
pub struct BatcherConfig<'a> {
    pub use_large_material_id: bool,
    pub use_vertex_color: bool,
    pub use_custom_normals: bool,
    /// Deform-group id marking "collision" membership; `None` disables the
    /// collision-detail check of §4.3.6 entirely (negative id in the source
    /// tool's contract).
    pub collision_group: Option<u32>,
    pub node_size: u32,
    pub mesh_matrix: Mat4,
    /// Required when a [`CollisionMesh`] is passed to [`GeometryBatcher::new`].
    pub collision_matrix: Option<Mat4>,
    /// External material index -> u16 material id.
    pub material_mapping: &'a [u16],
}

/// One corner's unpacked, dedup-relevant attributes (`BatchVertexInfo`,
/// spec.md §4.3.3).
#[derive(Clone, Copy)]
struct CornerInfo {
    local_index: u16,
    uv0: Vec2,
    uv1: Vec2,
    vcol0: Rgba,
    vcol1: Rgba,
    loop_normal: Vec3,
}

impl CornerInfo {
    fn default_unpacked() -> Self {
        Self {
            local_index: 0,
            uv0: Vec2::ZERO,
            uv1: Vec2::ZERO,
            vcol0: Rgba::new(0x7F, 0x7F, 0x7F, 0x00),
            vcol1: Rgba::new(0, 0, 0, 0),
            loop_normal: Vec3::ZERO,
        }
    }
}

/// The orchestrator of spec.md §4.3: owns the deduplicated vertex pool,
/// the triangle-index stream, the render batches, the BSP spatial index and,
/// when configured, the liquid tile grid. Runs to completion inside `new`;
/// everything after that is a read-only byte-range view (spec.md §5).
pub struct GeometryBatcher {
    batches: Vec<Batch>,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    uv0: Vec<Vec2>,
    uv1: Vec<Vec2>,
    vcol0: Vec<Rgba>,
    vcol1: Vec<Rgba>,
    triangle_indices: Vec<u16>,
    triangle_materials: Vec<TriangleMaterial>,
    bsp_nodes: Vec<BspNode>,
    bsp_faces: Vec<u16>,
    liquid: Option<(LiquidHeader, Vec<LiquidVertex>, Vec<LiquidTile>)>,
    trans_batch_count: u16,
    int_batch_count: u16,
    ext_batch_count: u16,
    bb_min: Vec3,
    bb_max: Vec3,
    notices: Vec<BatcherNotice>,
}

impl GeometryBatcher {
    pub fn new(
        mesh: &RenderMesh,
        collision: Option<&CollisionMesh>,
        attrs: &MeshAttributeLayers,
        config: &BatcherConfig,
        liquid: Option<(&LiquidMesh, LiquidConfig)>,
    ) -> Self {
        if collision.is_some() {
            assert!(
                config.collision_matrix.is_some(),
                "collision mesh is present but collision_matrix was not provided"
            );
        }

        let has_uv1 = attrs.uv1.is_some();
        let has_vcol0 = config.use_vertex_color;
        let has_vcol1 = attrs.blendmap.is_some();
        let use_custom_normals = config.use_custom_normals && mesh.loop_normals.is_some();

        let mut this = GeometryBatcher {
            batches: Vec::new(),
            positions: Vec::new(),
            normals: Vec::new(),
            uv0: Vec::new(),
            uv1: Vec::new(),
            vcol0: Vec::new(),
            vcol1: Vec::new(),
            triangle_indices: Vec::new(),
            triangle_materials: Vec::new(),
            bsp_nodes: Vec::new(),
            bsp_faces: Vec::new(),
            liquid: None,
            trans_batch_count: 0,
            int_batch_count: 0,
            ext_batch_count: 0,
            bb_min: Vec3::splat(f32::MAX),
            bb_max: Vec3::splat(f32::MIN),
            notices: Vec::new(),
        };

        this.process_render_triangles(mesh, attrs, config, has_uv1, has_vcol0, has_vcol1, use_custom_normals);

        if let (Some(collision_mesh), Some(collision_matrix)) = (collision, config.collision_matrix) {
            this.process_collision_triangles(collision_mesh, collision_matrix, has_uv1, has_vcol0, has_vcol1);
        }

        let bounds = BoundingBox::new(this.bb_min, this.bb_max);
        let tree = BspTree::build(&this.positions, &this.triangle_indices, bounds, config.node_size);
        this.bsp_nodes = tree.nodes;
        this.bsp_faces = tree.faces;

        if let Some((liquid_mesh, liquid_config)) = liquid {
            this.liquid = Some(build_liquid(liquid_mesh, liquid_config));
        }

        this
    }

    fn process_render_triangles(
        &mut self,
        mesh: &RenderMesh,
        attrs: &MeshAttributeLayers,
        config: &BatcherConfig,
        has_uv1: bool,
        has_vcol0: bool,
        has_vcol1: bool,
        use_custom_normals: bool,
    ) {
        let mut sorted: Vec<(usize, BatchType, u16)> = Vec::with_capacity(mesh.corner_tris.len());
        for (i, tri) in mesh.corner_tris.iter().enumerate() {
            let batch_type = classify_batch_type(tri, attrs);
            let mat_index = mesh.face_material_index[tri.poly as usize];
            let mat_id = if mat_index >= 0 && (mat_index as usize) < config.material_mapping.len() {
                config.material_mapping[mat_index as usize]
            } else {
                self.notices.push(BatcherNotice::LooseMaterialId {
                    face_material_index: mat_index,
                    mapping_len: config.material_mapping.len(),
                });
                0
            };
            sorted.push((i, batch_type, mat_id));
        }
        sorted.sort_by_key(|&(_, batch_type, mat_id)| (batch_type, mat_id));

        let mut vertex_map: HashMap<u32, Vec<CornerInfo>> = HashMap::new();
        let mut current: Option<(BatchType, u16, usize)> = None;

        for (tri_idx, batch_type, mat_id) in sorted {
            let needs_new_batch = match current {
                None => true,
                Some((cur_type, cur_mat, _)) => cur_type != batch_type || cur_mat != mat_id,
            };

            if needs_new_batch {
                if let Some((_, _, prev_idx)) = current {
                    self.close_batch(prev_idx);
                }
                let idx = self.open_batch(mat_id, config);
                match batch_type {
                    BatchType::Trans => self.trans_batch_count += 1,
                    BatchType::Int => self.int_batch_count += 1,
                    BatchType::Ext => self.ext_batch_count += 1,
                }
                vertex_map.clear();
                current = Some((batch_type, mat_id, idx));
            }

            let batch_idx = current.unwrap().2;
            self.emit_render_triangle(
                mesh,
                attrs,
                config,
                tri_idx,
                batch_idx,
                &mut vertex_map,
                has_uv1,
                has_vcol0,
                has_vcol1,
                use_custom_normals,
            );
        }

        if let Some((_, _, idx)) = current {
            self.close_batch(idx);
        }
    }

    fn close_batch(&mut self, batch_idx: usize) {
        self.batches[batch_idx].max_index = self.positions.len().saturating_sub(1) as u16;
    }

    fn open_batch(&mut self, mat_id: u16, config: &BatcherConfig) -> usize {
        let min_index = self.positions.len() as u16;
        let mut batch = Batch::new(self.triangle_indices.len() as u32, min_index, min_index, 0);

        if config.use_large_material_id && mat_id > 255 {
            batch.insert_flags(BatchFlags::LARGE_MATERIAL_ID);
            batch.set_large_material_id(mat_id);
        } else {
            batch.material_id = mat_id as u8;
            batch.set_quantized_bounds([i16::MAX, i16::MAX, i16::MAX], [i16::MIN, i16::MIN, i16::MIN]);
        }

        self.batches.push(batch);
        self.batches.len() - 1
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_render_triangle(
        &mut self,
        mesh: &RenderMesh,
        attrs: &MeshAttributeLayers,
        config: &BatcherConfig,
        tri_idx: usize,
        batch_idx: usize,
        vertex_map: &mut HashMap<u32, Vec<CornerInfo>>,
        has_uv1: bool,
        has_vcol0: bool,
        has_vcol1: bool,
        use_custom_normals: bool,
    ) {
        let tri = mesh.corner_tris[tri_idx];
        let material_id_byte = self.batches[batch_idx].material_id;
        let mut flags = TriangleMaterialFlags::RENDER;
        let mut collision_hits = 0u32;

        for loop_index in tri.loops {
            let loop_index = loop_index as usize;
            let vertex_id = mesh.loop_vertex[loop_index];
            let info = unpack_corner(loop_index, mesh, attrs, config, use_custom_normals, &mut flags);

            let local_index = self.dedup_or_create_render_vertex(
                vertex_id,
                info,
                mesh,
                config,
                batch_idx,
                has_uv1,
                has_vcol0,
                has_vcol1,
                use_custom_normals,
                vertex_map,
            );

            self.triangle_indices.push(local_index);
            self.batches[batch_idx].indices_count += 1;

            if let (Some(group), Some(deform)) = (config.collision_group, attrs.deform_weights) {
                if deform.is_member(vertex_id as usize, group) {
                    collision_hits += 1;
                }
            }
        }

        if collision_hits != 3 {
            flags.insert(TriangleMaterialFlags::DETAIL);
        }

        self.triangle_materials.push(TriangleMaterial::new(flags, material_id_byte));
    }

    #[allow(clippy::too_many_arguments)]
    fn dedup_or_create_render_vertex(
        &mut self,
        vertex_id: u32,
        info: CornerInfo,
        mesh: &RenderMesh,
        config: &BatcherConfig,
        batch_idx: usize,
        has_uv1: bool,
        has_vcol0: bool,
        has_vcol1: bool,
        use_custom_normals: bool,
        vertex_map: &mut HashMap<u32, Vec<CornerInfo>>,
    ) -> u16 {
        if let Some(entries) = vertex_map.get(&vertex_id) {
            for entry in entries {
                let matches = approx_eq_v2(entry.uv0, info.uv0)
                    && approx_eq_v2(entry.uv1, info.uv1)
                    && entry.vcol0 == info.vcol0
                    && entry.vcol1 == info.vcol1
                    && (!use_custom_normals || approx_eq_v3(entry.loop_normal, info.loop_normal));
                if matches {
                    return entry.local_index;
                }
            }
        }

        let local_index = self.positions.len() as u16;
        let mut info = info;
        info.local_index = local_index;

        let world_pos = transform_point(config.mesh_matrix, mesh.positions[vertex_id as usize]);
        self.positions.push(world_pos);

        let source_normal = if use_custom_normals { info.loop_normal } else { mesh.vertex_normals[vertex_id as usize] };
        self.normals.push(transform_normal(config.mesh_matrix, source_normal));

        self.uv0.push(info.uv0);
        if has_uv1 {
            self.uv1.push(info.uv1);
        }
        if has_vcol0 {
            self.vcol0.push(info.vcol0);
        }
        if has_vcol1 {
            self.vcol1.push(info.vcol1);
        }

        self.update_bounds(world_pos);
        if !config.use_large_material_id {
            self.update_batch_bounds(batch_idx, world_pos);
        }

        vertex_map.entry(vertex_id).or_default().push(info);
        local_index
    }

    fn process_collision_triangles(
        &mut self,
        collision: &CollisionMesh,
        collision_matrix: Mat4,
        has_uv1: bool,
        has_vcol0: bool,
        has_vcol1: bool,
    ) {
        let mut collision_map: HashMap<u32, u16> = HashMap::new();

        for tri in collision.corner_tris {
            for loop_index in tri.loops {
                let loop_index = loop_index as usize;
                let vertex_id = collision.loop_vertex[loop_index];

                let local_index = *collision_map.entry(vertex_id).or_insert_with(|| {
                    let local_index = self.positions.len() as u16;
                    let world_pos = transform_point(collision_matrix, collision.positions[vertex_id as usize]);
                    self.positions.push(world_pos);

                    let normal = transform_normal(collision_matrix, collision.vertex_normals[vertex_id as usize]);
                    self.normals.push(normal);

                    self.uv0.push(Vec2::ZERO);
                    if has_uv1 {
                        self.uv1.push(Vec2::ZERO);
                    }
                    if has_vcol0 {
                        self.vcol0.push(Rgba::new(0x7F, 0x7F, 0x7F, 0x00));
                    }
                    if has_vcol1 {
                        self.vcol1.push(Rgba::new(0, 0, 0, 0));
                    }

                    self.update_bounds(world_pos);
                    local_index
                });

                self.triangle_indices.push(local_index);
            }

            self.triangle_materials.push(TriangleMaterial::new(TriangleMaterialFlags::COLLISION, 0xFF));
        }
    }

    fn update_bounds(&mut self, p: Vec3) {
        self.bb_min = self.bb_min.min(p);
        self.bb_max = self.bb_max.max(p);
    }

    fn update_batch_bounds(&mut self, batch_idx: usize, p: Vec3) {
        let rounded = [round_away_from_zero(p.x), round_away_from_zero(p.y), round_away_from_zero(p.z)];
        let batch = &mut self.batches[batch_idx];
        let (mut min, mut max) = batch.quantized_bounds();
        for i in 0..3 {
            min[i] = min[i].min(rounded[i]);
            max[i] = max[i].max(rounded[i]);
        }
        batch.set_quantized_bounds(min, max);
    }

    pub fn batches(&self) -> &[u8] {
        bytemuck::cast_slice(&self.batches)
    }

    pub fn vertices(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn normals(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    pub fn tex_coords(&self) -> &[u8] {
        bytemuck::cast_slice(&self.uv0)
    }

    pub fn tex_coords2(&self) -> &[u8] {
        bytemuck::cast_slice(&self.uv1)
    }

    pub fn vertex_colors(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vcol0)
    }

    pub fn vertex_colors2(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vcol1)
    }

    pub fn triangle_indices(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangle_indices)
    }

    pub fn triangle_materials(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangle_materials)
    }

    pub fn bsp_nodes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.bsp_nodes)
    }

    pub fn bsp_faces(&self) -> &[u8] {
        bytemuck::cast_slice(&self.bsp_faces)
    }

    fn liquid_or_panic(&self) -> &(LiquidHeader, Vec<LiquidVertex>, Vec<LiquidTile>) {
        self.liquid.as_ref().expect("liquid data requested but no liquid parameters were configured")
    }

    pub fn liquid_header(&self) -> &[u8] {
        bytemuck::bytes_of(&self.liquid_or_panic().0)
    }

    pub fn liquid_vertices(&self) -> &[u8] {
        bytemuck::cast_slice(&self.liquid_or_panic().1)
    }

    pub fn liquid_tiles(&self) -> &[u8] {
        bytemuck::cast_slice(&self.liquid_or_panic().2)
    }

    pub fn trans_batch_count(&self) -> u16 {
        self.trans_batch_count
    }

    pub fn int_batch_count(&self) -> u16 {
        self.int_batch_count
    }

    pub fn ext_batch_count(&self) -> u16 {
        self.ext_batch_count
    }

    pub fn bb_min(&self) -> Vec3 {
        self.bb_min
    }

    pub fn bb_max(&self) -> Vec3 {
        self.bb_max
    }

    pub fn notices(&self) -> &[BatcherNotice] {
        &self.notices
    }

    pub fn batches_typed(&self) -> &[Batch] {
        &self.batches
    }

    pub fn positions_typed(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn triangle_indices_typed(&self) -> &[u16] {
        &self.triangle_indices
    }

    pub fn triangle_materials_typed(&self) -> &[TriangleMaterial] {
        &self.triangle_materials
    }

    pub fn bsp_nodes_typed(&self) -> &[BspNode] {
        &self.bsp_nodes
    }
}

fn classify_batch_type(tri: &CornerTri, attrs: &MeshAttributeLayers) -> BatchType {
    if attrs.batchmap_trans.is_none() && attrs.batchmap_int.is_none() {
        return BatchType::Ext;
    }

    if let Some(layer) = attrs.batchmap_trans {
        if tri.loops.iter().all(|&l| comp_color_key(layer[l as usize])) {
            return BatchType::Trans;
        }
    }
    if let Some(layer) = attrs.batchmap_int {
        if tri.loops.iter().all(|&l| comp_color_key(layer[l as usize])) {
            return BatchType::Int;
        }
    }
    BatchType::Ext
}

fn unpack_corner(
    loop_index: usize,
    mesh: &RenderMesh,
    attrs: &MeshAttributeLayers,
    config: &BatcherConfig,
    use_custom_normals: bool,
    tri_flags: &mut TriangleMaterialFlags,
) -> CornerInfo {
    let mut info = CornerInfo::default_unpacked();

    if config.use_vertex_color {
        if let Some(col_layer) = attrs.col {
            let color = col_layer.get(loop_index, mesh.loop_vertex);
            // Storage is BGR (spec.md §9 note 2): swap red and blue on read.
            info.vcol0 = Rgba::new(color.b, color.g, color.r, info.vcol0.a);

            if let Some(lightmap) = attrs.lightmap {
                let attenuation = grayscale_factor(lightmap.get(loop_index, mesh.loop_vertex));
                info.vcol0.a = attenuation;
                if attenuation > 0 {
                    tri_flags.insert(TriangleMaterialFlags::UNK01);
                }
            }
        }
    }

    if let Some(blendmap) = attrs.blendmap {
        info.vcol1.a = grayscale_factor(blendmap.get(loop_index, mesh.loop_vertex));
    }

    if let Some(uv0) = attrs.uv0 {
        let uv = uv0[loop_index];
        info.uv0 = Vec2::new(uv.x, 1.0 - uv.y);
    }
    if let Some(uv1) = attrs.uv1 {
        let uv = uv1[loop_index];
        info.uv1 = Vec2::new(uv.x, 1.0 - uv.y);
    }

    if use_custom_normals {
        info.loop_normal = mesh.loop_normals.expect("use_custom_normals resolved true without a loop-normal layer")[loop_index];
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::ColorLayer;
    use crate::input::MeshAttributeLayers;

    struct Quad {
        positions: Vec<Vec3>,
        loop_vertex: Vec<u32>,
        corner_tris: Vec<CornerTri>,
        face_material_index: Vec<i32>,
        vertex_normals: Vec<Vec3>,
    }

    // One unit square in XY at z=0, two triangles, loops 0..6 mapped to
    // vertices [0,1,2, 0,2,3] matching a typical quad fan.
    fn unit_quad(material_per_face: [i32; 2]) -> Quad {
        Quad {
            positions: vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
            loop_vertex: vec![0, 1, 2, 0, 2, 3],
            corner_tris: vec![
                CornerTri { loops: [0, 1, 2], poly: 0 },
                CornerTri { loops: [3, 4, 5], poly: 1 },
            ],
            face_material_index: material_per_face.to_vec(),
            vertex_normals: vec![Vec3::Z; 4],
        }
    }

    fn mesh_of(q: &Quad) -> RenderMesh {
        RenderMesh {
            positions: &q.positions,
            loop_vertex: &q.loop_vertex,
            corner_tris: &q.corner_tris,
            face_material_index: &q.face_material_index,
            vertex_normals: &q.vertex_normals,
            loop_normals: None,
        }
    }

    fn default_config(mapping: &[u16]) -> BatcherConfig {
        BatcherConfig {
            use_large_material_id: false,
            use_vertex_color: false,
            use_custom_normals: false,
            collision_group: None,
            node_size: 30,
            mesh_matrix: Mat4::IDENTITY,
            collision_matrix: None,
            material_mapping: mapping,
        }
    }

    #[test]
    fn s1_single_exterior_quad() {
        let quad = unit_quad([7, 7]);
        let mesh = mesh_of(&quad);
        let attrs = MeshAttributeLayers::default();
        let mapping = [0u16; 8]; // not used directly: mapping[7] below
        let mut mapping = mapping.to_vec();
        mapping[7] = 7;
        let config = default_config(&mapping);

        let batcher = GeometryBatcher::new(&mesh, None, &attrs, &config, None);

        assert_eq!(batcher.batches_typed().len(), 1);
        let batch = batcher.batches_typed()[0];
        assert_eq!(batch.material_id, 7);
        assert_eq!(batch.indices_count, 6);
        assert_eq!(batch.min_index, 0);
        assert_eq!(batch.max_index, 3);
        assert_eq!(batch.start_index, 0);
        assert_eq!(batcher.ext_batch_count(), 1);
        assert_eq!(batcher.trans_batch_count(), 0);
        assert_eq!(batcher.int_batch_count(), 0);
        assert_eq!(batcher.positions_typed().len(), 4);

        for tm in batcher.triangle_materials_typed() {
            assert!(tm.flags().contains(TriangleMaterialFlags::RENDER));
            assert_eq!(tm.material_id, 7);
        }

        assert_eq!(batcher.bb_min(), Vec3::ZERO);
        assert_eq!(batcher.bb_max(), Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn s2_trans_and_ext_batches_sort_trans_first() {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::new(3.0, 1.0, 0.0),
        ];
        let loop_vertex = vec![0u32, 1, 2, 3, 4, 5];
        let corner_tris =
            vec![CornerTri { loops: [0, 1, 2], poly: 0 }, CornerTri { loops: [3, 4, 5], poly: 1 }];
        let face_material_index = vec![0i32, 1];
        let vertex_normals = vec![Vec3::Z; 6];
        let mesh = RenderMesh {
            positions: &positions,
            loop_vertex: &loop_vertex,
            corner_tris: &corner_tris,
            face_material_index: &face_material_index,
            vertex_normals: &vertex_normals,
            loop_normals: None,
        };

        let keyed = Rgba::new(1, 1, 1, 1);
        let batchmap_trans = [keyed, keyed, keyed, Rgba::new(0, 0, 0, 0), Rgba::new(0, 0, 0, 0), Rgba::new(0, 0, 0, 0)];
        let mut attrs = MeshAttributeLayers::default();
        attrs.batchmap_trans = Some(&batchmap_trans);

        let mapping = [1u16, 2u16];
        let config = default_config(&mapping);

        let batcher = GeometryBatcher::new(&mesh, None, &attrs, &config, None);

        assert_eq!(batcher.trans_batch_count(), 1);
        assert_eq!(batcher.ext_batch_count(), 1);
        let batches = batcher.batches_typed();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].material_id, 1);
        assert_eq!(batches[0].indices_count, 3);
        assert_eq!(batches[0].start_index, 0);
        assert_eq!(batches[1].material_id, 2);
        assert_eq!(batches[1].indices_count, 3);
        assert_eq!(batches[1].start_index, 3);
    }

    #[test]
    fn s3_uv_seam_forces_duplicate_vertex() {
        let quad = unit_quad([0, 0]);
        let mesh = mesh_of(&quad);
        // Both endpoints of the shared edge (vertex 0 and vertex 2) get a
        // different UV in the second triangle, forcing two duplicates.
        let uv0 = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 0.9), // vertex 0, differs from loop 0's uv by > 1/4096
            Vec2::new(1.0, 0.9), // vertex 2, differs from loop 2's uv by > 1/4096
            Vec2::new(0.0, 1.0),
        ];
        let mut attrs = MeshAttributeLayers::default();
        attrs.uv0 = Some(&uv0);
        let mapping = [0u16];
        let config = default_config(&mapping);

        let batcher = GeometryBatcher::new(&mesh, None, &attrs, &config, None);
        assert_eq!(batcher.positions_typed().len(), 6);
    }

    #[test]
    fn s4_large_material_id_sets_flag_and_skips_quantized_bounds() {
        let quad = unit_quad([0, 0]);
        let mesh = mesh_of(&quad);
        let attrs = MeshAttributeLayers::default();
        let mapping = [300u16];
        let mut config = default_config(&mapping);
        config.use_large_material_id = true;

        let batcher = GeometryBatcher::new(&mesh, None, &attrs, &config, None);
        let batch = batcher.batches_typed()[0];
        assert!(batch.flags().contains(BatchFlags::LARGE_MATERIAL_ID));
        assert_eq!(batch.large_material_id(), 300);
        assert_eq!(batch.material_id, 0);
    }

    #[test]
    fn loose_material_id_is_recorded_not_fatal() {
        let quad = unit_quad([5, 5]);
        let mesh = mesh_of(&quad);
        let attrs = MeshAttributeLayers::default();
        let mapping: [u16; 0] = [];
        let config = default_config(&mapping);

        let batcher = GeometryBatcher::new(&mesh, None, &attrs, &config, None);
        assert_eq!(batcher.notices().len(), 1);
        assert!(matches!(batcher.notices()[0], BatcherNotice::LooseMaterialId { .. }));
    }

    #[test]
    fn collision_only_triangles_get_collision_material_and_dedupe_by_vertex() {
        let quad = unit_quad([0, 0]);
        let mesh = mesh_of(&quad);
        let attrs = MeshAttributeLayers::default();
        let mapping = [0u16];
        let mut config = default_config(&mapping);

        let collision_positions = quad.positions.clone();
        let collision_loop_vertex = vec![0u32, 1, 2, 0, 2, 3];
        let collision_tris =
            vec![CornerTri { loops: [0, 1, 2], poly: 0 }, CornerTri { loops: [3, 4, 5], poly: 0 }];
        let collision_normals = vec![Vec3::Z; 4];
        let collision = CollisionMesh {
            positions: &collision_positions,
            loop_vertex: &collision_loop_vertex,
            corner_tris: &collision_tris,
            vertex_normals: &collision_normals,
            world_matrix: Mat4::IDENTITY,
        };
        config.collision_matrix = Some(Mat4::IDENTITY);

        let batcher = GeometryBatcher::new(&mesh, Some(&collision), &attrs, &config, None);

        // 4 render verts + 4 distinct collision verts (shared edge dedups).
        assert_eq!(batcher.positions_typed().len(), 8);
        let collision_tms: Vec<_> =
            batcher.triangle_materials_typed().iter().filter(|tm| tm.flags().contains(TriangleMaterialFlags::COLLISION)).collect();
        assert_eq!(collision_tms.len(), 2);
        for tm in collision_tms {
            assert_eq!(tm.material_id, 0xFF);
        }
    }

    #[test]
    fn vertex_color_bgr_swap_and_lightmap_attenuation() {
        let quad = unit_quad([0, 0]);
        let mesh = mesh_of(&quad);
        let col = [Rgba::new(10, 20, 30, 255); 6];
        let lightmap = [Rgba::new(60, 60, 60, 255); 6];
        let mut attrs = MeshAttributeLayers::default();
        attrs.col = Some(ColorLayer::per_loop_bytes(&col));
        attrs.lightmap = Some(ColorLayer::per_loop_bytes(&lightmap));
        let mapping = [0u16];
        let mut config = default_config(&mapping);
        config.use_vertex_color = true;

        let batcher = GeometryBatcher::new(&mesh, None, &attrs, &config, None);

        let colors: &[Rgba] = bytemuck::cast_slice(batcher.vertex_colors());
        assert_eq!(colors[0].r, 30);
        assert_eq!(colors[0].g, 20);
        assert_eq!(colors[0].b, 10);
        assert_eq!(colors[0].a, 60);

        for tm in batcher.triangle_materials_typed() {
            assert!(tm.flags().contains(TriangleMaterialFlags::UNK01));
        }
    }
}
