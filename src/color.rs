//! 8-bit RGBA and the sRGB<->linear conversions a few named color layers
//! need (spec.md §4.1). `Rgba` is the wire representation for both
//! `vertex_colors`/`vertex_colors2` output streams and the in-memory values
//! `ColorLayer::get` (see `crate::attrs`) produces.

use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// "Keyed" predicate for batch-type classification (§4.3.1): a corner counts
/// toward a batch-map layer when any channel is non-zero.
pub fn comp_color_key(c: Rgba) -> bool {
    c.r != 0 || c.g != 0 || c.b != 0 || c.a != 0
}

/// `_get_grayscale_factor`: average of r/g/b, used for `Lightmap`'s
/// attenuation (§4.3.4) and `Blendmap`'s blend factor.
pub fn grayscale_factor(c: Rgba) -> u8 {
    ((c.r as u16 + c.g as u16 + c.b as u16) / 3) as u8
}

fn srgb_to_linear_channel(c: u8) -> u8 {
    let cf = c as f32 / 255.0;
    let out = if cf < 0.04045 {
        if cf < 0.0 { 0.0 } else { cf * (1.0 / 12.92) }
    } else {
        ((cf + 0.055) * (1.0 / 1.055)).powf(2.4)
    };
    (out * 255.0) as u8
}

fn linear_to_srgb_channel(c: u8) -> u8 {
    let cf = c as f32 / 255.0;
    let out = if cf <= 0.0031308 {
        12.92 * cf
    } else {
        (1.055 * cf.powf(1.0 / 2.4)) - 0.055
    };
    (out * 255.0) as u8
}

/// Decode: sRGB-encoded bytes -> linear bytes. All four channels, alpha
/// included, go through the same piecewise transform (spec.md §4.1).
pub fn srgb_to_linear(c: Rgba) -> Rgba {
    Rgba::new(
        srgb_to_linear_channel(c.r),
        srgb_to_linear_channel(c.g),
        srgb_to_linear_channel(c.b),
        srgb_to_linear_channel(c.a),
    )
}

/// Encode: linear bytes -> sRGB-encoded bytes. Used by `ColorLayer::get` to
/// bring a linear-float-storage color layer into the same byte domain as an
/// 8-bit-storage one.
pub fn linear_to_srgb(c: Rgba) -> Rgba {
    Rgba::new(
        linear_to_srgb_channel(c.r),
        linear_to_srgb_channel(c.g),
        linear_to_srgb_channel(c.b),
        linear_to_srgb_channel(c.a),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comp_color_key_is_false_only_for_zero() {
        assert!(!comp_color_key(Rgba::new(0, 0, 0, 0)));
        assert!(comp_color_key(Rgba::new(0, 0, 0, 1)));
        assert!(comp_color_key(Rgba::new(1, 0, 0, 0)));
    }

    #[test]
    fn grayscale_factor_averages_rgb_ignoring_alpha() {
        assert_eq!(grayscale_factor(Rgba::new(0, 0, 0, 255)), 0);
        assert_eq!(grayscale_factor(Rgba::new(255, 255, 255, 0)), 255);
        assert_eq!(grayscale_factor(Rgba::new(9, 0, 0, 0)), 3);
    }

    #[test]
    fn round_trip_through_linear_stays_within_one_ulp() {
        for v in 0..=255u8 {
            let c = Rgba::new(v, v, v, v);
            let round_tripped = srgb_to_linear(linear_to_srgb(c));
            assert!((round_tripped.r as i16 - c.r as i16).abs() <= 1);
            assert!((round_tripped.g as i16 - c.g as i16).abs() <= 1);
            assert!((round_tripped.b as i16 - c.b as i16).abs() <= 1);
            assert!((round_tripped.a as i16 - c.a as i16).abs() <= 1);
        }
    }

    #[test]
    fn pure_black_and_white_are_fixed_points() {
        assert_eq!(linear_to_srgb(Rgba::new(0, 0, 0, 0)), Rgba::new(0, 0, 0, 0));
        assert_eq!(linear_to_srgb(Rgba::new(255, 255, 255, 255)), Rgba::new(255, 255, 255, 255));
    }
}
