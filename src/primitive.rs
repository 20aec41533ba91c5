use std::fmt::Debug;

/// A primitive value kind that can be stored unboxed in a [`PrimitiveSet`] or
/// [`PrimitiveBag`].
///
/// Values are compared and hashed by their canonical bit pattern. For the
/// integer kinds and `char` this is ordinary equality. For floats every NaN
/// collapses to a single canonical NaN, while `0.0` and `-0.0` remain
/// distinct values, which keeps equality reflexive.
///
/// [`PrimitiveSet`]: crate::PrimitiveSet
/// [`PrimitiveBag`]: crate::PrimitiveBag
pub trait Primitive: Copy + Default + Debug + Send + Sync + 'static {
    /// Tag identifying the kind in the binary encoding.
    const TAG: u8;

    /// Width of one encoded value, in bytes.
    const WIDTH: usize;

    /// The maximum ratio of used (occupied or tombstoned) slots to capacity,
    /// as a `(numerator, denominator)` pair.
    const MAX_LOAD: (usize, usize) = (1, 2);

    /// Returns the canonical bit pattern of this value, zero-extended.
    fn to_bits(self) -> u64;

    /// Reconstructs a value from its canonical bit pattern.
    ///
    /// Returns `None` if the pattern is not a valid value of this kind.
    fn from_bits(bits: u64) -> Option<Self>;

    /// Returns `true` if both values have the same canonical bit pattern.
    #[inline]
    fn key_eq(self, other: Self) -> bool {
        self.to_bits() == other.to_bits()
    }

    /// A well-mixed 64-bit hash of this value.
    #[inline]
    fn hash(self) -> u64 {
        mix(self.to_bits())
    }
}

// The murmur3 finalizer.
//
// Table indices are taken from the low bits, so the mixer must push
// entropy from the high bits of wide keys downward.
#[inline]
pub(crate) fn mix(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^ (k >> 33)
}

macro_rules! impl_integer {
    ($($ty:ty => $bits:ty, tag = $tag:expr, load = $load:expr;)*) => {$(
        impl Primitive for $ty {
            const TAG: u8 = $tag;
            const WIDTH: usize = std::mem::size_of::<$ty>();
            const MAX_LOAD: (usize, usize) = $load;

            #[inline]
            fn to_bits(self) -> u64 {
                self as $bits as u64
            }

            #[inline]
            fn from_bits(bits: u64) -> Option<Self> {
                Some(bits as $bits as $ty)
            }
        }
    )*};
}

impl_integer! {
    i8 => u8, tag = 1, load = (3, 4);
    u8 => u8, tag = 2, load = (3, 4);
    i16 => u16, tag = 3, load = (1, 2);
    u16 => u16, tag = 4, load = (1, 2);
    i32 => u32, tag = 5, load = (1, 2);
    u32 => u32, tag = 6, load = (1, 2);
    i64 => u64, tag = 7, load = (1, 2);
    u64 => u64, tag = 8, load = (1, 2);
}

macro_rules! impl_float {
    ($($ty:ty => $bits:ty, tag = $tag:expr;)*) => {$(
        impl Primitive for $ty {
            const TAG: u8 = $tag;
            const WIDTH: usize = std::mem::size_of::<$ty>();

            #[inline]
            fn to_bits(self) -> u64 {
                if self.is_nan() {
                    <$ty>::NAN.to_bits() as u64
                } else {
                    <$ty>::to_bits(self) as u64
                }
            }

            #[inline]
            fn from_bits(bits: u64) -> Option<Self> {
                Some(<$ty>::from_bits(bits as $bits))
            }
        }
    )*};
}

impl_float! {
    f32 => u32, tag = 9;
    f64 => u64, tag = 10;
}

impl Primitive for char {
    const TAG: u8 = 11;
    const WIDTH: usize = 4;

    #[inline]
    fn to_bits(self) -> u64 {
        self as u32 as u64
    }

    #[inline]
    fn from_bits(bits: u64) -> Option<Self> {
        u32::try_from(bits).ok().and_then(char::from_u32)
    }
}

#[cfg(test)]
mod tests {
    use super::Primitive;

    #[test]
    fn signed_bits_roundtrip() {
        for v in [i8::MIN, -1, 0, 1, i8::MAX] {
            assert_eq!(i8::from_bits(v.to_bits()), Some(v));
        }
        assert_eq!((-1i16).to_bits(), 0xffff);
        assert_eq!(i64::from_bits((-5i64).to_bits()), Some(-5));
    }

    #[test]
    fn float_canonical_nan() {
        let quiet = f64::NAN;
        let other = f64::from_bits(0x7ff8_0000_0000_0001);
        assert!(other.is_nan());
        assert!(quiet.key_eq(other));
        assert_eq!(quiet.hash(), other.hash());
        assert!(!0.0f32.key_eq(-0.0));
    }

    #[test]
    fn invalid_char() {
        assert_eq!(char::from_bits(0xD800), None);
        assert_eq!(char::from_bits('x'.to_bits()), Some('x'));
    }
}
