//! Linear quantization of base vertices and edge vectors.

use glam::Vec3;

const UNORM16_MAX: f32 = 65535.0;
const SNORM16_MAX: f32 = 32767.0;

/// Map a raw unsigned 16-bit component into `[min, max]`.
#[inline]
#[must_use]
pub fn dequantize_unorm16(raw: u16, min: f32, max: f32) -> f32 {
    min + (f32::from(raw) / UNORM16_MAX) * (max - min)
}

/// Map a raw signed 16-bit component into `[-range, range]`.
#[inline]
#[must_use]
pub fn dequantize_snorm16(raw: i16, range: f32) -> f32 {
    (f32::from(raw) / SNORM16_MAX) * range
}

/// Quantize a normalized value in `[0, 1]` (clamped) to the nearest u16 step.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn quantize_unorm16(value: f32) -> u16 {
    (value.clamp(0.0, 1.0) * UNORM16_MAX).round() as u16
}

/// Quantize a normalized value in `[-1, 1]` (clamped), rounding half away from zero.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn quantize_snorm16(value: f32) -> i16 {
    (value.clamp(-1.0, 1.0) * SNORM16_MAX).round() as i16
}

pub(crate) fn dequantize_base(raw: [u16; 3], bmin: Vec3, bmax: Vec3) -> Vec3 {
    Vec3::new(
        dequantize_unorm16(raw[0], bmin.x, bmax.x),
        dequantize_unorm16(raw[1], bmin.y, bmax.y),
        dequantize_unorm16(raw[2], bmin.z, bmax.z),
    )
}

pub(crate) fn dequantize_edge(raw: [i16; 3], range: f32) -> Vec3 {
    Vec3::new(
        dequantize_snorm16(raw[0], range),
        dequantize_snorm16(raw[1], range),
        dequantize_snorm16(raw[2], range),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unorm_endpoints() {
        assert_eq!(dequantize_unorm16(0, -3.0, 5.0), -3.0);
        assert_eq!(dequantize_unorm16(u16::MAX, -3.0, 5.0), 5.0);
        assert_eq!(quantize_unorm16(0.0), 0);
        assert_eq!(quantize_unorm16(1.0), u16::MAX);
        assert_eq!(quantize_unorm16(-4.0), 0);
        assert_eq!(quantize_unorm16(7.0), u16::MAX);
    }

    #[test]
    fn test_snorm_endpoints() {
        assert_eq!(dequantize_snorm16(0, 10.0), 0.0);
        assert_eq!(dequantize_snorm16(32767, 10.0), 10.0);
        assert_eq!(dequantize_snorm16(-32767, 10.0), -10.0);
        assert_eq!(quantize_snorm16(1.0), 32767);
        assert_eq!(quantize_snorm16(-1.0), -32767);
        assert_eq!(quantize_snorm16(-2.0), -32767);
    }

    #[test]
    fn test_snorm_rounds_half_away_from_zero() {
        assert_eq!(quantize_snorm16(0.5 / SNORM16_MAX), 1);
        assert_eq!(quantize_snorm16(-0.5 / SNORM16_MAX), -1);
    }

    #[test]
    fn test_zero_extent_axis() {
        assert_eq!(dequantize_unorm16(0, 2.0, 2.0), 2.0);
        assert_eq!(dequantize_unorm16(40000, 2.0, 2.0), 2.0);
    }

    proptest! {
        #[test]
        fn unorm_is_monotonic(
            raw in 0u16..u16::MAX,
            min in -1000.0f32..1000.0,
            extent in 0.001f32..1000.0,
        ) {
            let max = min + extent;
            let lo = dequantize_unorm16(raw, min, max);
            let hi = dequantize_unorm16(raw + 1, min, max);
            prop_assert!(hi >= lo);
            prop_assert!(lo >= min);
        }

        #[test]
        fn snorm_is_monotonic(raw in -32768i16..32767, range in 0.001f32..1000.0) {
            prop_assert!(dequantize_snorm16(raw + 1, range) >= dequantize_snorm16(raw, range));
        }

        #[test]
        fn unorm_requantizes_to_same_step(raw: u16) {
            let value = f32::from(raw) / UNORM16_MAX;
            prop_assert_eq!(quantize_unorm16(value), raw);
        }
    }
}
