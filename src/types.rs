//! Wire-format structs emitted by [`crate::batcher::GeometryBatcher`]
//! (spec.md §5, §6). Byte layouts match the legacy client's WMO group chunks
//! exactly; three C++ unions (`Batch`'s bounding-box/material-id region,
//! `LiquidVertex`'s water/magma region) are modeled as fixed-size byte blobs
//! with typed accessor methods rather than an unsafe Rust `union`.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

pub use bsp::BspNode;

pub const MOBA_SIZE: usize = 24;
pub const MOPY_SIZE: usize = 2;
pub const BSP_NODE_SIZE: usize = 16;
pub const MLIQ_HEADER_SIZE: usize = 22;
pub const SMOL_VERT_SIZE: usize = 8;
pub const SMOL_TILE_SIZE: usize = 1;

/// `material_index == 32767` marks the legacy "separate collision mesh"
/// sentinel (spec.md §4.3.6 note); this crate only emits the modern
/// dedicated-collision-mesh path, but the constant documents the value a
/// reader would otherwise see.
pub const COLLISION_MAT_NR: i32 = 32767;

/// A triangle's render/collision classification, and the batch it belongs
/// to (spec.md §4.3.1).
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum BatchType {
    Trans = 0,
    Int = 1,
    Ext = 2,
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct BatchFlags: u8 {
        const UNK = 0x1;
        const LARGE_MATERIAL_ID = 0x2;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TriangleMaterialFlags: u8 {
        const UNK01 = 0x01;
        const NO_CAM_COLLIDE = 0x02;
        const DETAIL = 0x04;
        const COLLISION = 0x08;
        const HINT = 0x10;
        const RENDER = 0x20;
        const UNK40 = 0x40;
        const COLLIDE_HIT = 0x80;
    }
}

/// `MOPYTriangleMaterial`, 2 bytes: `u8 flags`, `u8 material_id`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct TriangleMaterial {
    flags: u8,
    pub material_id: u8,
}

impl TriangleMaterial {
    pub fn new(flags: TriangleMaterialFlags, material_id: u8) -> Self {
        Self { flags: flags.bits(), material_id }
    }

    pub fn flags(&self) -> TriangleMaterialFlags {
        TriangleMaterialFlags::from_bits_truncate(self.flags)
    }

    pub fn set_flags(&mut self, flags: TriangleMaterialFlags) {
        self.flags = flags.bits();
    }

    pub fn insert_flag(&mut self, flag: TriangleMaterialFlags) {
        self.flags |= flag.bits();
    }
}

/// `MOBABatch`, 24 bytes. The first 12 bytes are a union: quantized i16
/// bounding box when `LARGE_MATERIAL_ID` is clear, or 10 bytes of padding
/// followed by the `u16` big material id (at byte offset 10) when it is set.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Batch {
    bb_or_material: [u8; 12],
    pub start_index: u32,
    pub indices_count: u16,
    pub min_index: u16,
    pub max_index: u16,
    flags: u8,
    pub material_id: u8,
}

impl Batch {
    pub fn new(start_index: u32, min_index: u16, max_index: u16, material_id: u8) -> Self {
        Self {
            bb_or_material: [0; 12],
            start_index,
            indices_count: 0,
            min_index,
            max_index,
            flags: 0,
            material_id,
        }
    }

    pub fn quantized_bounds(&self) -> ([i16; 3], [i16; 3]) {
        let mut min = [0i16; 3];
        let mut max = [0i16; 3];
        for i in 0..3 {
            min[i] = i16::from_le_bytes([self.bb_or_material[i * 2], self.bb_or_material[i * 2 + 1]]);
            max[i] = i16::from_le_bytes([self.bb_or_material[6 + i * 2], self.bb_or_material[6 + i * 2 + 1]]);
        }
        (min, max)
    }

    pub fn set_quantized_bounds(&mut self, min: [i16; 3], max: [i16; 3]) {
        for i in 0..3 {
            let lo = min[i].to_le_bytes();
            self.bb_or_material[i * 2] = lo[0];
            self.bb_or_material[i * 2 + 1] = lo[1];
            let hi = max[i].to_le_bytes();
            self.bb_or_material[6 + i * 2] = hi[0];
            self.bb_or_material[6 + i * 2 + 1] = hi[1];
        }
    }

    pub fn large_material_id(&self) -> u16 {
        u16::from_le_bytes([self.bb_or_material[10], self.bb_or_material[11]])
    }

    pub fn set_large_material_id(&mut self, id: u16) {
        self.bb_or_material = [0; 12];
        let bytes = id.to_le_bytes();
        self.bb_or_material[10] = bytes[0];
        self.bb_or_material[11] = bytes[1];
    }

    pub fn flags(&self) -> BatchFlags {
        BatchFlags::from_bits_truncate(self.flags)
    }

    pub fn set_flags(&mut self, flags: BatchFlags) {
        self.flags = flags.bits();
    }

    pub fn insert_flags(&mut self, flags: BatchFlags) {
        self.flags |= flags.bits();
    }
}

/// `MLIQHeader`, 22 bytes: two `i16` pairs, a `f32` corner, and a `u16`
/// material id. Natural alignment would pad this to 24 bytes, so it is
/// `packed`; `Debug` is implemented by hand to avoid taking references into
/// unaligned fields.
#[repr(C, packed)]
#[derive(Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LiquidHeader {
    pub liquid_verts: [i16; 2],
    pub liquid_tiles: [i16; 2],
    pub liquid_corner: [f32; 3],
    pub liquid_mat_id: u16,
}

impl std::fmt::Debug for LiquidHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self { liquid_verts, liquid_tiles, liquid_corner, liquid_mat_id } = *self;
        f.debug_struct("LiquidHeader")
            .field("liquid_verts", &liquid_verts)
            .field("liquid_tiles", &liquid_tiles)
            .field("liquid_corner", &liquid_corner)
            .field("liquid_mat_id", &liquid_mat_id)
            .finish()
    }
}

/// `SMOWVert`/`SMOMVert` union, 8 bytes. Water stores three flow bytes, a
/// padding byte, and a height; magma stores a signed UV pair and a height.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct LiquidVertex {
    bytes: [u8; 8],
}

impl LiquidVertex {
    pub fn water(flow1: u8, flow2: u8, flow1_pct: u8, height: f32) -> Self {
        let h = height.to_le_bytes();
        Self { bytes: [flow1, flow2, flow1_pct, 0, h[0], h[1], h[2], h[3]] }
    }

    pub fn magma(s: i16, t: i16, height: f32) -> Self {
        let sb = s.to_le_bytes();
        let tb = t.to_le_bytes();
        let h = height.to_le_bytes();
        Self { bytes: [sb[0], sb[1], tb[0], tb[1], h[0], h[1], h[2], h[3]] }
    }

    pub fn height(&self) -> f32 {
        f32::from_le_bytes([self.bytes[4], self.bytes[5], self.bytes[6], self.bytes[7]])
    }

    pub fn water_flow(&self) -> (u8, u8, u8) {
        (self.bytes[0], self.bytes[1], self.bytes[2])
    }

    pub fn magma_uv(&self) -> (i16, i16) {
        (
            i16::from_le_bytes([self.bytes[0], self.bytes[1]]),
            i16::from_le_bytes([self.bytes[2], self.bytes[3]]),
        )
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct LiquidTileFlags: u8 {
        const UNKNOWN_1 = 0x10;
        const UNKNOWN_2 = 0x20;
        const FISHABLE = 0x40;
        const SHARED = 0x80;
    }
}

/// `SMOLTile`, 1 byte: low nibble is the legacy liquid type, high nibble is
/// [`LiquidTileFlags`].
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct LiquidTile(pub u8);

impl LiquidTile {
    pub fn new(legacy_liquid_type: u8, flags: LiquidTileFlags) -> Self {
        Self((legacy_liquid_type & 0x0F) | flags.bits())
    }

    pub fn legacy_liquid_type(&self) -> u8 {
        self.0 & 0x0F
    }

    pub fn flags(&self) -> LiquidTileFlags {
        LiquidTileFlags::from_bits_truncate(self.0 & 0xF0)
    }
}
