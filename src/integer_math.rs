//! Overflow-aware integer helpers shared by the circular buffer.

use std::fmt::Debug;
use std::ops::{Add, Rem, Sub};

/// Unsigned integer usable as a buffer capacity and cursor.
pub trait RingIndex:
    Copy + Ord + Debug + Add<Output = Self> + Sub<Output = Self> + Rem<Output = Self>
{
    const ZERO: Self;
    const MAX: Self;
    /// Name used in diagnostics, e.g. `"u16"`.
    const NAME: &'static str;

    /// Widens into `u64`, which holds every supported width.
    fn to_u64(self) -> u64;

    /// Narrows from `u64`, `None` if the value does not fit.
    fn from_u64(value: u64) -> Option<Self>;

    /// Converts a value already known to be `<=` some buffer capacity.
    fn as_usize(self) -> usize;

    /// Counterpart of `as_usize` for lengths bounded by a capacity.
    fn from_usize(value: usize) -> Self;
}

macro_rules! impl_ring_index {
    ($($t:ty),*) => {$(
        impl RingIndex for $t {
            const ZERO: Self = 0;
            const MAX: Self = <$t>::MAX;
            const NAME: &'static str = stringify!($t);

            #[inline]
            fn to_u64(self) -> u64 {
                self as u64
            }

            #[inline]
            fn from_u64(value: u64) -> Option<Self> {
                <$t>::try_from(value).ok()
            }

            #[inline]
            fn as_usize(self) -> usize {
                self as usize
            }

            #[inline]
            fn from_usize(value: usize) -> Self {
                value as $t
            }
        }
    )*};
}

impl_ring_index!(u8, u16, u32, u64);

/// Fixed-width integer with overflow-reporting addition and multiplication.
pub trait OverflowArith: Copy {
    fn add_overflowing(self, rhs: Self) -> (Self, bool);
    fn mul_overflowing(self, rhs: Self) -> (Self, bool);
}

macro_rules! impl_overflow_arith {
    ($($t:ty),*) => {$(
        impl OverflowArith for $t {
            #[inline]
            fn add_overflowing(self, rhs: Self) -> (Self, bool) {
                self.overflowing_add(rhs)
            }

            #[inline]
            fn mul_overflowing(self, rhs: Self) -> (Self, bool) {
                self.overflowing_mul(rhs)
            }
        }
    )*};
}

impl_overflow_arith!(i8, u8, i16, u16, i32, u32, i64, u64);

/// Adds `a` and `b`, returning the truncated sum and whether it overflowed.
///
/// The flag is set exactly when the mathematical sum is not representable
/// in `T`; the returned value is then the two's complement wrap.
pub fn add_with_overflow_check<T: OverflowArith>(a: T, b: T) -> (T, bool) {
    a.add_overflowing(b)
}

/// Multiplies `a` and `b`, returning the truncated product and whether it overflowed.
pub fn multiply_with_overflow_check<T: OverflowArith>(a: T, b: T) -> (T, bool) {
    a.mul_overflowing(b)
}

/// Advances `value` by `step` inside the ring `[0, size)`.
///
/// No intermediate result ever exceeds `size`, so this is safe for steps
/// close to `T::MAX` even with 8 bit cursors.
///
/// # Panics
///
/// Panics if `size` is zero.
pub fn ring_increment<T: RingIndex>(value: &mut T, step: T, size: T) {
    assert!(size > T::ZERO, "ring_increment called with size 0");
    let current = *value % size;
    let step = step % size;
    let room = size - current;
    *value = if step >= room {
        step - room
    } else {
        current + step
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ring_increment_sequence<T: RingIndex>(size: T, one: T) {
        let last = size - one;
        let overflow = size + one;
        let mut value = T::ZERO;
        ring_increment(&mut value, T::ZERO, size);
        assert_eq!(value, T::ZERO);
        ring_increment(&mut value, last, size);
        assert_eq!(value, last);
        ring_increment(&mut value, one, size);
        assert_eq!(value, T::ZERO);
        ring_increment(&mut value, overflow, size);
        assert_eq!(value, one);
    }

    #[test]
    fn test_ring_increment_boundaries() {
        ring_increment_sequence::<u8>(10, 1);
        ring_increment_sequence::<u8>(0x7f, 1);
        ring_increment_sequence::<u8>(0xfe, 1);
        ring_increment_sequence::<u16>(10, 1);
        ring_increment_sequence::<u16>(0x7ffe, 1);
        ring_increment_sequence::<u16>(0xfffe, 1);
        ring_increment_sequence::<u32>(10, 1);
        ring_increment_sequence::<u32>(0x7fff_fffe, 1);
        ring_increment_sequence::<u32>(0xffff_fffe, 1);
        ring_increment_sequence::<u64>(10, 1);
        ring_increment_sequence::<u64>(u64::MAX - 1, 1);
    }

    #[test]
    fn test_ring_increment_step_size_plus_one_lands_on_one() {
        let mut value = 0u8;
        ring_increment(&mut value, 0xff, 0xfe);
        assert_eq!(value, 1);
        let mut value = 0u16;
        ring_increment(&mut value, 0xffff, 0xfffe);
        assert_eq!(value, 1);
    }

    #[test]
    fn test_ring_increment_max_step() {
        let mut value = 0xf0u8;
        ring_increment(&mut value, u8::MAX, 0xfb);
        assert_eq!(value as u32, (0xf0u32 + 0xff) % 0xfb);
        let mut value = u64::MAX - 2;
        ring_increment(&mut value, u64::MAX, u64::MAX - 1);
        let expected = ((u64::MAX - 2) as u128 + u64::MAX as u128) % (u64::MAX - 1) as u128;
        assert_eq!(value as u128, expected);
    }

    #[test]
    #[should_panic(expected = "size 0")]
    fn test_ring_increment_zero_size_panics() {
        let mut value = 0u8;
        ring_increment(&mut value, 1, 0);
    }

    fn expect_add<T>(a: T, b: T, expected: Option<T>)
    where
        T: OverflowArith + PartialEq + Debug,
    {
        let (result, overflow) = add_with_overflow_check(a, b);
        match expected {
            Some(value) => {
                assert!(!overflow, "{:?} + {:?} flagged overflow", a, b);
                assert_eq!(result, value);
            }
            None => assert!(overflow, "{:?} + {:?} not flagged", a, b),
        }
    }

    macro_rules! add_boundary_test {
        ($name:ident, $t:ty) => {
            #[test]
            fn $name() {
                let (min, max) = (<$t>::MIN, <$t>::MAX);
                expect_add::<$t>(0, 0, Some(0));
                expect_add::<$t>(0, 1, Some(1));
                expect_add::<$t>(1, 0, Some(1));
                expect_add::<$t>(0, max, Some(max));
                expect_add::<$t>(0, min, Some(min));
                expect_add::<$t>(max, 0, Some(max));
                expect_add::<$t>(1, max, None);
                expect_add::<$t>(max, max, None);
                expect_add::<$t>(min, max, Some((min as i128 + max as i128) as $t));
                if min != 0 {
                    expect_add::<$t>(min, min, None);
                }
            }
        };
    }

    add_boundary_test!(test_add_boundaries_u8, u8);
    add_boundary_test!(test_add_boundaries_u16, u16);
    add_boundary_test!(test_add_boundaries_u32, u32);
    add_boundary_test!(test_add_boundaries_u64, u64);
    add_boundary_test!(test_add_boundaries_i8, i8);
    add_boundary_test!(test_add_boundaries_i16, i16);
    add_boundary_test!(test_add_boundaries_i32, i32);
    add_boundary_test!(test_add_boundaries_i64, i64);

    #[test]
    fn test_add_negative_operands() {
        assert_eq!(add_with_overflow_check(0i8, -1), (-1, false));
        assert_eq!(add_with_overflow_check(-1i8, 0), (-1, false));
        assert!(add_with_overflow_check(i16::MIN, -1).1);
        assert_eq!(add_with_overflow_check(-1i64, 1), (0, false));
    }

    #[test]
    fn test_multiply_sign_combinations() {
        assert_eq!(multiply_with_overflow_check(-4i8, 10), (-40, false));
        assert!(multiply_with_overflow_check(-80i8, 10).1);
        assert_eq!(multiply_with_overflow_check(10i8, -4), (-40, false));
        assert!(multiply_with_overflow_check(10i8, -80).1);
        assert!(multiply_with_overflow_check(i8::MIN, -1).1);
        assert_eq!(multiply_with_overflow_check(i8::MIN, 1), (i8::MIN, false));
        assert!(multiply_with_overflow_check(u8::MAX, 2).1);
        assert_eq!(multiply_with_overflow_check(u64::MAX, 1), (u64::MAX, false));
        assert!(multiply_with_overflow_check(u64::MAX, u64::MAX).1);
    }

    /// Reference overflow flag computed in `i128`.
    fn reference_flag(exact: Option<i128>, truncated: i128) -> bool {
        match exact {
            Some(value) => value != truncated,
            None => true,
        }
    }

    macro_rules! random_overflow_props {
        ($add:ident, $mul:ident, $t:ty) => {
            proptest! {
                #![proptest_config(ProptestConfig::with_cases(1000))]

                #[test]
                fn $add(a in any::<$t>(), b in any::<$t>()) {
                    let (result, overflow) = add_with_overflow_check(a, b);
                    let exact = (a as i128).checked_add(b as i128);
                    prop_assert_eq!(overflow, reference_flag(exact, result as i128));
                    prop_assert_eq!(result, a.wrapping_add(b));
                }

                #[test]
                fn $mul(a in any::<$t>(), b in any::<$t>()) {
                    let (result, overflow) = multiply_with_overflow_check(a, b);
                    let exact = (a as i128).checked_mul(b as i128);
                    prop_assert_eq!(overflow, reference_flag(exact, result as i128));
                    prop_assert_eq!(result, a.wrapping_mul(b));
                }
            }
        };
    }

    random_overflow_props!(prop_add_i8, prop_mul_i8, i8);
    random_overflow_props!(prop_add_u8, prop_mul_u8, u8);
    random_overflow_props!(prop_add_i16, prop_mul_i16, i16);
    random_overflow_props!(prop_add_u16, prop_mul_u16, u16);
    random_overflow_props!(prop_add_i32, prop_mul_i32, i32);
    random_overflow_props!(prop_add_u32, prop_mul_u32, u32);
    random_overflow_props!(prop_add_i64, prop_mul_i64, i64);
    random_overflow_props!(prop_add_u64, prop_mul_u64, u64);

    macro_rules! ring_increment_props {
        ($name:ident, $t:ty) => {
            proptest! {
                #[test]
                fn $name(size in 1..=<$t>::MAX, value in any::<$t>(), step in any::<$t>()) {
                    let mut cursor = value % size;
                    let start = cursor;
                    ring_increment(&mut cursor, step, size);
                    prop_assert!(cursor < size);
                    let expected = (start as u128 + step as u128) % size as u128;
                    prop_assert_eq!(cursor as u128, expected);
                }
            }
        };
    }

    ring_increment_props!(prop_ring_increment_u8, u8);
    ring_increment_props!(prop_ring_increment_u16, u16);
    ring_increment_props!(prop_ring_increment_u32, u32);
    ring_increment_props!(prop_ring_increment_u64, u64);
}
