//! Read-only view over named per-loop / per-vertex attribute layers
//! (spec.md §4.1): a typed color accessor that hides whether the source
//! layer is 8-bit byte storage or linear-float storage, and per-vertex
//! deform-group membership (§9 supplement 2, used by the collision-deform
//! corner count in §4.3.6).

use crate::color::{linear_to_srgb, Rgba};

/// Two physical storage shapes behind one `RGBA` read (§9 supplement 3): an
/// 8-bit byte-color layer (`MLoopCol`/`MPropCol` in the source tool) or a
/// linear-float color layer, sRGB-encoded on read.
#[derive(Clone, Copy)]
enum ColorLayerData<'a> {
    Byte(&'a [Rgba]),
    Linear(&'a [[f32; 4]]),
}

/// A single named color layer (`BatchmapTrans`, `Lightmap`, `Col`, ...).
/// `get` resolves loop->vertex itself when the layer is stored per-vertex
/// rather than per-loop, so callers never need to branch on `is_per_loop`
/// themselves.
#[derive(Clone, Copy)]
pub struct ColorLayer<'a> {
    data: ColorLayerData<'a>,
    per_loop: bool,
}

impl<'a> ColorLayer<'a> {
    pub fn per_loop_bytes(data: &'a [Rgba]) -> Self {
        Self { data: ColorLayerData::Byte(data), per_loop: true }
    }

    pub fn per_vertex_bytes(data: &'a [Rgba]) -> Self {
        Self { data: ColorLayerData::Byte(data), per_loop: false }
    }

    pub fn per_loop_linear(data: &'a [[f32; 4]]) -> Self {
        Self { data: ColorLayerData::Linear(data), per_loop: true }
    }

    pub fn per_vertex_linear(data: &'a [[f32; 4]]) -> Self {
        Self { data: ColorLayerData::Linear(data), per_loop: false }
    }

    pub fn is_per_loop(&self) -> bool {
        self.per_loop
    }

    /// Reads the color touched by `loop_index`, resolving loop->vertex via
    /// `loop_vertex` first when this layer is stored per-vertex. The 8-bit
    /// path synthesises alpha as 0xFF (the source alpha channel is never
    /// stored); the linear path does the same after sRGB encoding.
    pub fn get(&self, loop_index: usize, loop_vertex: &[u32]) -> Rgba {
        let index = if self.per_loop { loop_index } else { loop_vertex[loop_index] as usize };
        match self.data {
            ColorLayerData::Byte(arr) => {
                let c = arr[index];
                Rgba::new(c.r, c.g, c.b, 0xFF)
            }
            ColorLayerData::Linear(arr) => {
                let c = arr[index];
                linear_to_srgb(Rgba::new((c[0] * 255.0) as u8, (c[1] * 255.0) as u8, (c[2] * 255.0) as u8, 0xFF))
            }
        }
    }
}

/// Named (name, layer) lookup over a table supplied by the host tool (§2:
/// "named-layer lookup over two namespaces"). `crate::input::MeshAttributeLayers`
/// resolves the fixed set of names this crate cares about into typed fields;
/// this is the lookup that resolution is built from when a host hands over a
/// generic named-layer table instead of already-typed fields.
pub fn find_layer<'a>(layers: &[(&str, ColorLayer<'a>)], name: &str) -> Option<ColorLayer<'a>> {
    layers.iter().find(|(n, _)| *n == name).map(|(_, l)| *l)
}

/// Per-vertex deform-group membership. Only membership in the configured
/// collision group matters to the batcher (§4.3.6); weight values are never
/// read.
#[derive(Clone, Copy)]
pub struct DeformWeights<'a> {
    per_vertex_groups: &'a [&'a [u32]],
}

impl<'a> DeformWeights<'a> {
    pub fn new(per_vertex_groups: &'a [&'a [u32]]) -> Self {
        Self { per_vertex_groups }
    }

    pub fn is_member(&self, vertex: usize, group_id: u32) -> bool {
        self.per_vertex_groups.get(vertex).is_some_and(|groups| groups.contains(&group_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_vertex_layer_resolves_through_loop_vertex() {
        let vertex_colors = [Rgba::new(1, 2, 3, 4), Rgba::new(5, 6, 7, 8)];
        let layer = ColorLayer::per_vertex_bytes(&vertex_colors);
        let loop_vertex = [1u32, 0u32];
        // alpha is synthesised as 0xFF on the byte path, never read from storage.
        assert_eq!(layer.get(0, &loop_vertex), Rgba::new(5, 6, 7, 0xFF));
        assert_eq!(layer.get(1, &loop_vertex), Rgba::new(1, 2, 3, 0xFF));
    }

    #[test]
    fn linear_layer_is_srgb_encoded_on_read() {
        let linear = [[1.0f32, 1.0, 1.0, 1.0]];
        let layer = ColorLayer::per_loop_linear(&linear);
        let loop_vertex = [0u32];
        assert_eq!(layer.get(0, &loop_vertex), Rgba::new(255, 255, 255, 255));
    }

    #[test]
    fn find_layer_matches_by_exact_name() {
        let bytes = [Rgba::new(9, 9, 9, 9)];
        let layers = [("Col", ColorLayer::per_loop_bytes(&bytes))];
        assert!(find_layer(&layers, "Col").is_some());
        assert!(find_layer(&layers, "col").is_none());
    }

    #[test]
    fn deform_weights_membership() {
        let v0_groups = [3u32, 4];
        let v1_groups: [u32; 0] = [];
        let groups: [&[u32]; 2] = [&v0_groups, &v1_groups];
        let weights = DeformWeights::new(&groups);
        assert!(weights.is_member(0, 3));
        assert!(!weights.is_member(0, 5));
        assert!(!weights.is_member(1, 3));
        assert!(!weights.is_member(2, 3));
    }
}
