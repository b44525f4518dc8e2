//! Geometry batcher, BSP spatial index and liquid tile encoder for a single
//! WMO group's render payloads (spec.md §1): takes a pre-triangulated mesh
//! plus named attribute layers and produces deduplicated vertex streams,
//! render batches, a triangle-material table, a BSP spatial index and,
//! optionally, a liquid tile grid — all as read-only byte-range views ready
//! for the outer chunk-file writer to frame.
//!
//! Out of scope (spec.md §1): triangulation, UV unwrapping, normal
//! recomputation, file I/O, and concurrency across meshes. This crate
//! consumes its input mesh by reference and runs synchronously to
//! completion inside [`GeometryBatcher::new`].

pub mod attrs;
pub mod batcher;
pub mod color;
pub mod input;
pub mod liquid;
pub mod math;
pub mod types;

pub use batcher::{BatcherConfig, BatcherNotice, GeometryBatcher};
pub use liquid::LiquidConfig;
