//! # Narrow Floating Point
//!
//! Two custom low-precision float formats used by the trajectory codec.
//!
//! ## Formats
//!
//! | Type      | Width | Sign | Exponent | Mantissa | Bias | Largest finite |
//! |-----------|-------|------|----------|----------|------|----------------|
//! | `Quarter` | 8     | 1    | 2        | 5        | 1    | 3.9375         |
//! | `Half`    | 16    | 1    | 4        | 11       | 7    | 255.9375       |
//!
//! `Half` is NOT IEEE binary16: it trades exponent range for mantissa
//! precision, which suits per-sample movement deltas.
//!
//! ## Conversion Rules
//!
//! - Rounding is half-up on the magnitude at the mantissa cut.
//! - A mantissa carry bumps the exponent.
//! - Magnitudes past the largest finite value saturate to infinity.
//! - Magnitudes below the smallest denormal flush to signed zero.
//!
//! ## NaN Side Channel
//!
//! Every value with an all-ones exponent and a non-zero mantissa is a NaN.
//! The codec never does arithmetic on NaN; it uses those bit patterns to carry
//! small escape codes in-band. `encode_nan(code)` packs `code + 1` into the
//! sign bit and the mantissa, so the patterns are built bit by bit and never
//! depend on how the host platform represents a native NaN.

use std::fmt;

use crate::error::{CodecError, CodecResult};

const F32_EXPONENT_MASK: u32 = 0xFF;
const F32_MANTISSA_BITS: u32 = 23;
const F32_MANTISSA_MASK: u32 = (1 << F32_MANTISSA_BITS) - 1;
const F32_IMPLICIT_BIT: u32 = 1 << F32_MANTISSA_BITS;
const F32_BIAS: i32 = 127;

// =============================================================================
// Layout
// =============================================================================

/// Field widths of a narrow float. The sign is always one bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    /// Number of exponent bits.
    pub exponent_bits: u32,
    /// Number of stored mantissa bits (implicit leading bit excluded).
    pub mantissa_bits: u32,
}

impl Layout {
    /// Total width in bits.
    #[must_use]
    pub const fn total_bits(self) -> u32 {
        1 + self.exponent_bits + self.mantissa_bits
    }

    /// Exponent bias, `2^(E-1) - 1`.
    #[must_use]
    pub const fn bias(self) -> i32 {
        (1 << (self.exponent_bits - 1)) - 1
    }

    /// All-ones exponent field value (infinity / NaN).
    #[must_use]
    pub const fn exponent_max(self) -> u32 {
        (1 << self.exponent_bits) - 1
    }

    /// Mask over the mantissa field.
    #[must_use]
    pub const fn mantissa_mask(self) -> u32 {
        (1 << self.mantissa_bits) - 1
    }

    /// Position of the sign bit.
    #[must_use]
    pub const fn sign_shift(self) -> u32 {
        self.exponent_bits + self.mantissa_bits
    }

    /// Largest code `encode_nan` accepts.
    #[must_use]
    pub const fn max_nan_code(self) -> u32 {
        (1 << (self.mantissa_bits + 1)) - 2
    }

    const fn sign(self, raw: u32) -> u32 {
        (raw >> self.sign_shift()) & 1
    }

    const fn exponent(self, raw: u32) -> u32 {
        (raw >> self.mantissa_bits) & self.exponent_max()
    }

    const fn mantissa(self, raw: u32) -> u32 {
        raw & self.mantissa_mask()
    }

    const fn infinity(self) -> u32 {
        self.exponent_max() << self.mantissa_bits
    }

    /// Quiet NaN: all-ones exponent, top mantissa bit set.
    const fn canonical_nan(self) -> u32 {
        self.infinity() | (1 << (self.mantissa_bits - 1))
    }
}

/// Narrows an `f32` to the raw bits of `layout`.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
fn narrow_from_f32(layout: Layout, value: f32) -> u32 {
    let bits = value.to_bits();
    let sign = (bits >> 31) << layout.sign_shift();
    let f32_exponent = ((bits >> F32_MANTISSA_BITS) & F32_EXPONENT_MASK) as i32;
    let mantissa = bits & F32_MANTISSA_MASK;
    let cut = F32_MANTISSA_BITS - layout.mantissa_bits;

    if f32_exponent == F32_EXPONENT_MASK as i32 {
        if mantissa != 0 {
            return sign | layout.canonical_nan();
        }
        return sign | layout.infinity();
    }

    // f32 zeros and denormals sit far below the smallest narrow denormal.
    if f32_exponent == 0 {
        return sign;
    }

    let mut exponent = f32_exponent - F32_BIAS + layout.bias();

    if exponent <= 0 {
        let shift = cut + (1 - exponent) as u32;
        if shift > F32_MANTISSA_BITS + 1 {
            return sign;
        }
        let full = mantissa | F32_IMPLICIT_BIT;
        // A rounding carry out of the mantissa lands in the exponent field,
        // which is exactly the smallest normal.
        let denormal = (full + (1 << (shift - 1))) >> shift;
        return sign | denormal;
    }

    let mut rounded = mantissa + (1 << (cut - 1));
    if rounded & F32_IMPLICIT_BIT != 0 {
        rounded = 0;
        exponent += 1;
    }

    if exponent as u32 >= layout.exponent_max() {
        return sign | layout.infinity();
    }

    sign | ((exponent as u32) << layout.mantissa_bits) | (rounded >> cut)
}

/// Widens raw bits of `layout` to an `f32`. Exact for every input.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
fn widen_to_f32(layout: Layout, raw: u32) -> f32 {
    let sign = layout.sign(raw) << 31;
    let exponent = layout.exponent(raw);
    let mut mantissa = layout.mantissa(raw);
    let cut = F32_MANTISSA_BITS - layout.mantissa_bits;

    if exponent == 0 {
        if mantissa == 0 {
            return f32::from_bits(sign);
        }
        let mut working = 1 - layout.bias();
        while mantissa & (1 << layout.mantissa_bits) == 0 {
            mantissa <<= 1;
            working -= 1;
        }
        mantissa &= layout.mantissa_mask();
        let f32_exponent = (working + F32_BIAS) as u32;
        return f32::from_bits(sign | (f32_exponent << F32_MANTISSA_BITS) | (mantissa << cut));
    }

    if exponent == layout.exponent_max() {
        // Infinity keeps a zero mantissa, NaN keeps a non-zero one.
        return f32::from_bits(sign | (F32_EXPONENT_MASK << F32_MANTISSA_BITS) | (mantissa << cut));
    }

    let f32_exponent = (exponent as i32 - layout.bias() + F32_BIAS) as u32;
    f32::from_bits(sign | (f32_exponent << F32_MANTISSA_BITS) | (mantissa << cut))
}

// =============================================================================
// NarrowFloat trait
// =============================================================================

/// Common behaviour of the narrow float formats.
///
/// Implementors only provide their layout and raw bit access; conversion,
/// classification and the NaN channel are shared.
pub trait NarrowFloat: Copy + fmt::Debug {
    /// Field widths of this format.
    const LAYOUT: Layout;

    /// Size on the wire in bytes.
    const BYTES: usize;

    /// Builds a value from raw bits. Bits above the format width are ignored.
    fn from_raw(raw: u16) -> Self;

    /// Raw bits, zero-extended to 16.
    fn raw(self) -> u16;

    /// Lossy conversion from `f32`. Never fails.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    fn from_f32(value: f32) -> Self {
        Self::from_raw(narrow_from_f32(Self::LAYOUT, value) as u16)
    }

    /// Exact conversion to `f32`.
    #[must_use]
    fn to_f32(self) -> f32 {
        widen_to_f32(Self::LAYOUT, u32::from(self.raw()))
    }

    /// Positive or negative zero.
    #[must_use]
    fn is_zero(self) -> bool {
        let raw = u32::from(self.raw());
        Self::LAYOUT.exponent(raw) == 0 && Self::LAYOUT.mantissa(raw) == 0
    }

    /// `+0`.
    #[must_use]
    fn is_positive_zero(self) -> bool {
        self.raw() == 0
    }

    /// `-0`.
    #[must_use]
    fn is_negative_zero(self) -> bool {
        u32::from(self.raw()) == 1 << Self::LAYOUT.sign_shift()
    }

    /// Positive or negative infinity.
    #[must_use]
    fn is_infinity(self) -> bool {
        let raw = u32::from(self.raw());
        Self::LAYOUT.exponent(raw) == Self::LAYOUT.exponent_max() && Self::LAYOUT.mantissa(raw) == 0
    }

    /// `+inf`.
    #[must_use]
    fn is_positive_infinity(self) -> bool {
        self.is_infinity() && Self::LAYOUT.sign(u32::from(self.raw())) == 0
    }

    /// `-inf`.
    #[must_use]
    fn is_negative_infinity(self) -> bool {
        self.is_infinity() && Self::LAYOUT.sign(u32::from(self.raw())) == 1
    }

    /// Any NaN pattern, escape codes included.
    #[must_use]
    fn is_nan(self) -> bool {
        let raw = u32::from(self.raw());
        Self::LAYOUT.exponent(raw) == Self::LAYOUT.exponent_max() && Self::LAYOUT.mantissa(raw) != 0
    }

    /// Zero exponent with a non-zero mantissa.
    #[must_use]
    fn is_denormalized(self) -> bool {
        let raw = u32::from(self.raw());
        Self::LAYOUT.exponent(raw) == 0 && Self::LAYOUT.mantissa(raw) != 0
    }

    /// Neither infinity nor NaN.
    #[must_use]
    fn is_finite(self) -> bool {
        Self::LAYOUT.exponent(u32::from(self.raw())) != Self::LAYOUT.exponent_max()
    }

    /// Packs `code` into a NaN bit pattern.
    ///
    /// # Errors
    ///
    /// `NanCodeOutOfRange` if `code + 1` needs more than `mantissa_bits + 1`
    /// bits, or if it would leave the mantissa empty (that pattern is
    /// negative infinity, not a NaN).
    #[allow(clippy::cast_possible_truncation)]
    fn encode_nan(code: u32) -> CodecResult<Self> {
        let layout = Self::LAYOUT;
        let out_of_range = CodecError::NanCodeOutOfRange {
            code,
            max: layout.max_nan_code(),
        };

        let value = code.checked_add(1).ok_or_else(|| out_of_range.clone())?;
        let sign_part = value >> layout.mantissa_bits;
        let mantissa = value & layout.mantissa_mask();
        if sign_part > 1 || mantissa == 0 {
            return Err(out_of_range);
        }

        let raw = (sign_part << layout.sign_shift()) | layout.infinity() | mantissa;
        Ok(Self::from_raw(raw as u16))
    }

    /// Recovers the code packed by `encode_nan`.
    ///
    /// # Errors
    ///
    /// `NotNan` if this value is not a NaN pattern.
    fn decode_nan(self) -> CodecResult<u32> {
        if !self.is_nan() {
            return Err(CodecError::NotNan { bits: self.raw() });
        }
        let layout = Self::LAYOUT;
        let raw = u32::from(self.raw());
        let value = (layout.sign(raw) << layout.mantissa_bits) | layout.mantissa(raw);
        Ok(value - 1)
    }
}

// =============================================================================
// Quarter - 8 bit
// =============================================================================

/// 8-bit float: 1 sign, 2 exponent, 5 mantissa.
///
/// Resolution is 1/32 below 1.0 and the range ends just short of 4.0,
/// which covers one frame of climbing movement.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Quarter(u8);

impl Quarter {
    /// Positive zero.
    pub const ZERO: Self = Self(0);

    /// Positive infinity.
    pub const INFINITY: Self = Self(0b0_11_00000);

    /// Negative infinity.
    pub const NEG_INFINITY: Self = Self(0b1_11_00000);

    /// Largest finite value, 3.9375.
    pub const MAX: Self = Self(0b0_10_11111);

    /// Creates from raw bits.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Returns raw bits.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u8 {
        self.0
    }
}

impl NarrowFloat for Quarter {
    const LAYOUT: Layout = Layout {
        exponent_bits: 2,
        mantissa_bits: 5,
    };

    const BYTES: usize = 1;

    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn from_raw(raw: u16) -> Self {
        Self(raw as u8)
    }

    #[inline]
    fn raw(self) -> u16 {
        u16::from(self.0)
    }
}

impl fmt::Debug for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Quarter(0x{:02x} = {})", self.0, self.to_f32())
    }
}

// =============================================================================
// Half - 16 bit
// =============================================================================

/// 16-bit float: 1 sign, 4 exponent, 11 mantissa.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Half(u16);

impl Half {
    /// Positive zero.
    pub const ZERO: Self = Self(0);

    /// Positive infinity.
    pub const INFINITY: Self = Self(0x7800);

    /// Negative infinity.
    pub const NEG_INFINITY: Self = Self(0xF800);

    /// Largest finite value, 255.9375.
    pub const MAX: Self = Self(0x77FF);

    /// Creates from raw bits.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Returns raw bits.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u16 {
        self.0
    }

    /// Little-endian wire bytes.
    #[inline]
    #[must_use]
    pub const fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    /// Reads from little-endian wire bytes.
    #[inline]
    #[must_use]
    pub const fn from_le_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_le_bytes(bytes))
    }
}

impl NarrowFloat for Half {
    const LAYOUT: Layout = Layout {
        exponent_bits: 4,
        mantissa_bits: 11,
    };

    const BYTES: usize = 2;

    #[inline]
    fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    #[inline]
    fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for Half {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Half(0x{:04x} = {})", self.0, self.to_f32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_constants() {
        assert_eq!(Quarter::LAYOUT.total_bits(), 8);
        assert_eq!(Quarter::LAYOUT.bias(), 1);
        assert_eq!(Quarter::LAYOUT.exponent_max(), 3);
        assert_eq!(Quarter::LAYOUT.max_nan_code(), 62);

        assert_eq!(Half::LAYOUT.total_bits(), 16);
        assert_eq!(Half::LAYOUT.bias(), 7);
        assert_eq!(Half::LAYOUT.exponent_max(), 15);
        assert_eq!(Half::LAYOUT.max_nan_code(), 4094);
    }

    #[test]
    fn test_quarter_exact_values() {
        assert_eq!(Quarter::from_f32(1.0).to_bits(), 0b0_01_00000);
        assert_eq!(Quarter::from_f32(-1.0).to_bits(), 0b1_01_00000);
        assert_eq!(Quarter::from_f32(2.0).to_bits(), 0b0_10_00000);
        assert_eq!(Quarter::from_f32(0.5).to_bits(), 0b0_00_10000);
        assert_eq!(Quarter::from_f32(3.9375), Quarter::MAX);

        assert_eq!(Quarter::from_f32(1.5).to_f32(), 1.5);
        assert_eq!(Quarter::from_f32(-0.25).to_f32(), -0.25);
        assert_eq!(Quarter::MAX.to_f32(), 3.9375);
    }

    #[test]
    fn test_half_exact_values() {
        assert_eq!(Half::from_f32(1.0).to_bits(), 0x3800);
        assert_eq!(Half::from_f32(255.9375), Half::MAX);
        assert_eq!(Half::from_f32(100.0).to_f32(), 100.0);
        assert_eq!(Half::from_f32(-12.125).to_f32(), -12.125);
        assert_eq!(Half::MAX.to_f32(), 255.9375);
    }

    #[test]
    fn test_rounding_half_up() {
        // Quarter step in [1, 2) is 1/32.
        let step = 1.0 / 32.0;
        assert_eq!(Quarter::from_f32(1.0 + step * 0.49).to_f32(), 1.0);
        assert_eq!(Quarter::from_f32(1.0 + step * 0.5).to_f32(), 1.0 + step);
        assert_eq!(Quarter::from_f32(-(1.0 + step * 0.5)).to_f32(), -(1.0 + step));
    }

    #[test]
    fn test_rounding_carries_into_exponent() {
        // Top of the [1, 2) binade is 1.96875; 1.99 rounds into the next one.
        let q = Quarter::from_f32(1.99);
        assert_eq!(q.to_bits(), 0b0_10_00000);
        assert_eq!(q.to_f32(), 2.0);
    }

    #[test]
    fn test_saturates_to_infinity() {
        assert!(Quarter::from_f32(4.0).is_positive_infinity());
        assert!(Quarter::from_f32(3.97).is_positive_infinity());
        assert!(Quarter::from_f32(-1000.0).is_negative_infinity());
        assert!(Half::from_f32(256.0).is_positive_infinity());
        assert!(Half::from_f32(-1.0e6).is_negative_infinity());
        assert!(Half::from_f32(f32::INFINITY).is_positive_infinity());
        assert_eq!(Quarter::INFINITY.to_f32(), f32::INFINITY);
        assert_eq!(Half::NEG_INFINITY.to_f32(), f32::NEG_INFINITY);
    }

    #[test]
    fn test_denormals() {
        let smallest = Quarter::from_f32(1.0 / 32.0);
        assert!(smallest.is_denormalized());
        assert_eq!(smallest.to_bits(), 0b0_00_00001);
        assert_eq!(smallest.to_f32(), 1.0 / 32.0);

        let q = Quarter::from_f32(-0.75);
        assert!(q.is_denormalized());
        assert_eq!(q.to_f32(), -0.75);

        let h = Half::from_f32(2.0f32.powi(-17));
        assert!(h.is_denormalized());
        assert_eq!(h.to_bits(), 1);
        assert_eq!(h.to_f32(), 2.0f32.powi(-17));
    }

    #[test]
    fn test_denormal_rounds_up_to_smallest_normal() {
        // 0.99 needs 32 * 0.99 = 31.68 denormal steps, rounding to 32 = 1.0.
        let q = Quarter::from_f32(0.99);
        assert!(!q.is_denormalized());
        assert_eq!(q.to_f32(), 1.0);
    }

    #[test]
    fn test_flush_to_signed_zero() {
        assert!(Quarter::from_f32(0.01).is_positive_zero());
        assert!(Quarter::from_f32(-0.01).is_negative_zero());
        assert!(Quarter::from_f32(1.0e-30).is_positive_zero());
        assert!(Half::from_f32(-1.0e-9).is_negative_zero());
        assert!(Half::from_f32(f32::MIN_POSITIVE / 2.0).is_positive_zero());
        assert_eq!(Quarter::from_f32(-0.0).to_f32().to_bits(), (-0.0f32).to_bits());
    }

    #[test]
    fn test_nan_input_collapses() {
        let q = Quarter::from_f32(f32::NAN);
        assert!(q.is_nan());
        assert_eq!(q.to_bits(), 0b0_11_10000);
        assert!(q.to_f32().is_nan());

        let payload = f32::from_bits(0x7F80_0001);
        assert!(Half::from_f32(payload).is_nan());
        assert_eq!(Half::from_f32(payload).to_bits(), 0x7C00);
    }

    #[test]
    fn test_predicates_are_exclusive() {
        for bits in 0..=u8::MAX {
            let q = Quarter::from_bits(bits);
            let classes = [q.is_zero(), q.is_infinity(), q.is_nan(), q.is_denormalized()];
            assert!(classes.iter().filter(|c| **c).count() <= 1, "{q:?}");
            assert_eq!(q.is_zero(), q.is_positive_zero() || q.is_negative_zero());
            assert_eq!(q.is_infinity(), q.is_positive_infinity() || q.is_negative_infinity());
            assert_eq!(q.is_finite(), !q.is_infinity() && !q.is_nan());
        }
    }

    #[test]
    fn test_every_quarter_survives_widening() {
        for bits in 0..=u8::MAX {
            let q = Quarter::from_bits(bits);
            if q.is_nan() {
                continue;
            }
            assert_eq!(Quarter::from_f32(q.to_f32()), q, "{q:?}");
        }
    }

    #[test]
    fn test_every_half_survives_widening() {
        for bits in 0..=u16::MAX {
            let h = Half::from_bits(bits);
            if h.is_nan() {
                continue;
            }
            assert_eq!(Half::from_f32(h.to_f32()), h, "{h:?}");
        }
    }

    #[test]
    fn test_escape_patterns() {
        assert_eq!(Quarter::encode_nan(1).unwrap().to_bits(), 0x62);
        assert_eq!(Quarter::encode_nan(2).unwrap().to_bits(), 0x63);
        assert_eq!(Quarter::encode_nan(0).unwrap().to_bits(), 0x61);
    }

    #[test]
    fn test_nan_channel_round_trip() {
        for code in 0..=Quarter::LAYOUT.max_nan_code() {
            match Quarter::encode_nan(code) {
                Ok(q) => {
                    assert!(q.is_nan());
                    assert_eq!(q.decode_nan(), Ok(code));
                }
                // code + 1 == 32 would be negative infinity.
                Err(err) => {
                    assert_eq!(code, 31);
                    assert!(matches!(err, CodecError::NanCodeOutOfRange { .. }));
                }
            }
        }

        for code in [0, 1, 2, 100, 2046, 2048, 4094] {
            let h = Half::encode_nan(code).unwrap();
            assert!(h.is_nan());
            assert_eq!(h.decode_nan(), Ok(code));
        }
    }

    #[test]
    fn test_nan_code_out_of_range() {
        assert_eq!(
            Quarter::encode_nan(63),
            Err(CodecError::NanCodeOutOfRange { code: 63, max: 62 })
        );
        assert!(Quarter::encode_nan(u32::MAX).is_err());
        assert!(Half::encode_nan(4095).is_err());
        assert!(Half::encode_nan(2047).is_err());
    }

    #[test]
    fn test_decode_nan_rejects_numbers() {
        assert_eq!(
            Quarter::from_f32(1.0).decode_nan(),
            Err(CodecError::NotNan { bits: 0x20 })
        );
        assert!(Quarter::INFINITY.decode_nan().is_err());
        assert!(Half::ZERO.decode_nan().is_err());
    }
}
