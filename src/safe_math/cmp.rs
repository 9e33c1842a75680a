//! Value-preserving comparison over any mix of the ten supported scalar
//! types, with ULP-tolerant float equality.
//!
//! The original core dispatches through a dozen SFINAE overloads of
//! `CmpLess`/`CmpEqual` keyed on operand category (signed/unsigned
//! integer, floating). Rust has no overload sets, so the same dispatch
//! becomes the [`SafeCompare`] trait, implemented once per concrete
//! `(Lhs, Rhs)` pair by the macros below, the "explicit kernel per
//! category pair" translation called for in the design notes.

use core::cmp::Ordering;

/// Either operand lies outside the representable range of the other
/// operand's integer type, or inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeCheckResult {
  Below,
  InRange,
  Above,
}

fn classify(value: f64, below_bound: f64, above_bound: f64) -> RangeCheckResult {
  if value < below_bound {
    RangeCheckResult::Below
  } else if value > above_bound {
    RangeCheckResult::Above
  } else {
    RangeCheckResult::InRange
  }
}

/// An integer type in `{i8,i16,i32,i64,u8,u16,u32,u64}` widenable to
/// `i128` without loss, with the f64 thresholds used to classify a
/// float value as below, inside, or above this type's range.
///
/// `i128` can represent the full range of every supported integer type,
/// so "widen both operands to a common type and compare" collapses to
/// "widen to i128 and compare" for every signed/unsigned combination,
/// a deliberate simplification of the original's "widen to the smaller
/// of the two sufficient common types" rule, see DESIGN.md.
pub trait WidenInt: Copy + 'static {
  /// Widen `self` to `i128`, preserving its exact mathematical value.
  fn widen(self) -> i128;
  /// Narrow an `i128` known to be within `[MIN_I128, MAX_I128]` back to `Self`.
  fn from_i128(value: i128) -> Self;
  /// First `f64` value definitely below this type's minimum.
  const BELOW_BOUND_F64: f64;
  /// First `f64` value definitely above this type's maximum.
  const ABOVE_BOUND_F64: f64;
  /// This type's minimum, exactly, as `i128`.
  const MIN_I128: i128;
  /// This type's maximum, exactly, as `i128`.
  const MAX_I128: i128;
}

macro_rules! impl_widen_int {
  ($ty:ty, $below:expr, $above:expr) => {
    impl WidenInt for $ty {
      #[inline]
      fn widen(self) -> i128 {
        self as i128
      }
      #[inline]
      fn from_i128(value: i128) -> Self {
        value as $ty
      }
      const BELOW_BOUND_F64: f64 = $below;
      const ABOVE_BOUND_F64: f64 = $above;
      const MIN_I128: i128 = <$ty>::MIN as i128;
      const MAX_I128: i128 = <$ty>::MAX as i128;
    }
  };
}

impl_widen_int!(i8, -128.0, 127.0);
impl_widen_int!(i16, -32768.0, 32767.0);
impl_widen_int!(i32, -2147483648.0, 2147483647.0);
// The true bounds of i64 are not all exactly representable in f64; these
// are the magic constants from the original implementation: the lowest
// f64 that is unambiguously above i64::MAX, and i64::MIN itself (which,
// being a power of two in magnitude, *is* exactly representable).
impl_widen_int!(i64, -9223372036854775808.0, 9223372036854774784.0);
impl_widen_int!(u8, 0.0, 255.0);
impl_widen_int!(u16, 0.0, 65535.0);
impl_widen_int!(u32, 0.0, 4294967295.0);
impl_widen_int!(u64, 0.0, 18446744073709549568.0);

/// Per-float-type primitives needed by the mixed float/integer kernels:
/// NaN/infinity classification, exact floor/ceil-to-`i128`, one ULP step
/// toward either infinity, and a lossless widening to `f64` for range
/// classification against the [`WidenInt`] thresholds (which are all
/// `f64`; widening `f32` into `f64` never loses precision).
pub trait FloatOps: Copy {
  /// True if `self` is NaN.
  fn is_nan(self) -> bool;
  /// True if `self` is `+inf` or `-inf`.
  fn is_infinite(self) -> bool;
  /// True if the sign bit is set (including for `-0.0` and `-inf`).
  fn is_sign_negative(self) -> bool;
  /// `self.floor() as i128`, valid only once range-classified as in-bounds.
  fn floor_to_i128(self) -> i128;
  /// `self.ceil() as i128`, valid only once range-classified as in-bounds.
  fn ceil_to_i128(self) -> i128;
  /// One ULP step toward positive infinity.
  fn step_toward_pos_inf(self) -> Self;
  /// One ULP step toward negative infinity.
  fn step_toward_neg_inf(self) -> Self;
  /// Widen to `f64` without loss (identity for `f64`, exact for `f32`).
  fn to_f64_lossless(self) -> f64;
}

fn nextafter_f64(from: f64, to: f64) -> f64 {
  if from.is_nan() || to.is_nan() {
    return f64::NAN;
  }
  if from == to {
    return to;
  }
  if from == 0.0 {
    return if to > 0.0 {
      f64::from_bits(1)
    } else {
      -f64::from_bits(1)
    };
  }
  let bits = from.to_bits();
  let towards_positive = to > from;
  let going_up = if from > 0.0 { towards_positive } else { !towards_positive };
  let new_bits = if going_up { bits.wrapping_add(1) } else { bits.wrapping_sub(1) };
  f64::from_bits(new_bits)
}

fn nextafter_f32(from: f32, to: f32) -> f32 {
  if from.is_nan() || to.is_nan() {
    return f32::NAN;
  }
  if from == to {
    return to;
  }
  if from == 0.0 {
    return if to > 0.0 {
      f32::from_bits(1)
    } else {
      -f32::from_bits(1)
    };
  }
  let bits = from.to_bits();
  let towards_positive = to > from;
  let going_up = if from > 0.0 { towards_positive } else { !towards_positive };
  let new_bits = if going_up { bits.wrapping_add(1) } else { bits.wrapping_sub(1) };
  f32::from_bits(new_bits)
}

impl FloatOps for f32 {
  #[inline]
  fn is_nan(self) -> bool {
    f32::is_nan(self)
  }
  #[inline]
  fn is_infinite(self) -> bool {
    f32::is_infinite(self)
  }
  #[inline]
  fn is_sign_negative(self) -> bool {
    f32::is_sign_negative(self)
  }
  #[inline]
  fn floor_to_i128(self) -> i128 {
    self.floor() as i128
  }
  #[inline]
  fn ceil_to_i128(self) -> i128 {
    self.ceil() as i128
  }
  #[inline]
  fn step_toward_pos_inf(self) -> Self {
    nextafter_f32(self, f32::INFINITY)
  }
  #[inline]
  fn step_toward_neg_inf(self) -> Self {
    nextafter_f32(self, f32::NEG_INFINITY)
  }
  #[inline]
  fn to_f64_lossless(self) -> f64 {
    self as f64
  }
}

impl FloatOps for f64 {
  #[inline]
  fn is_nan(self) -> bool {
    f64::is_nan(self)
  }
  #[inline]
  fn is_infinite(self) -> bool {
    f64::is_infinite(self)
  }
  #[inline]
  fn is_sign_negative(self) -> bool {
    f64::is_sign_negative(self)
  }
  #[inline]
  fn floor_to_i128(self) -> i128 {
    self.floor() as i128
  }
  #[inline]
  fn ceil_to_i128(self) -> i128 {
    self.ceil() as i128
  }
  #[inline]
  fn step_toward_pos_inf(self) -> Self {
    nextafter_f64(self, f64::INFINITY)
  }
  #[inline]
  fn step_toward_neg_inf(self) -> Self {
    nextafter_f64(self, f64::NEG_INFINITY)
  }
  #[inline]
  fn to_f64_lossless(self) -> f64 {
    self
  }
}

fn float_cmp_lt_int<F: FloatOps, I: WidenInt>(lhs: F, rhs: I) -> bool {
  if lhs.is_nan() {
    return false;
  }
  if lhs.is_infinite() {
    return lhs.is_sign_negative();
  }
  match classify(lhs.to_f64_lossless(), I::BELOW_BOUND_F64, I::ABOVE_BOUND_F64) {
    RangeCheckResult::Below => true,
    RangeCheckResult::Above => false,
    RangeCheckResult::InRange => lhs.floor_to_i128() < rhs.widen(),
  }
}

fn int_cmp_lt_float<I: WidenInt, F: FloatOps>(lhs: I, rhs: F) -> bool {
  if rhs.is_nan() {
    return false;
  }
  if rhs.is_infinite() {
    return !rhs.is_sign_negative();
  }
  match classify(rhs.to_f64_lossless(), I::BELOW_BOUND_F64, I::ABOVE_BOUND_F64) {
    RangeCheckResult::Below => false,
    RangeCheckResult::Above => true,
    RangeCheckResult::InRange => lhs.widen() < rhs.ceil_to_i128(),
  }
}

fn float_cmp_eq_int<F: FloatOps, I: WidenInt>(lhs: F, rhs: I, tolerance: i32) -> bool {
  if lhs.is_nan() {
    return false;
  }
  let mut upper = lhs;
  let mut lower = lhs;
  for _ in 0..tolerance.max(0) {
    upper = upper.step_toward_pos_inf();
    lower = lower.step_toward_neg_inf();
  }
  !(int_cmp_lt_float(rhs, lower) || float_cmp_lt_int(upper, rhs))
}

fn float_cmp_lt_float<F: FloatOps + PartialOrd>(lhs: F, rhs: F) -> bool {
  // NaN-aware: Rust's native `<` already returns false whenever either
  // operand is NaN, matching the "no tolerance, native ordering" rule.
  lhs.partial_cmp(&rhs) == Some(Ordering::Less)
}

fn float_cmp_eq_float<F: FloatOps + PartialOrd>(lhs: F, rhs: F, tolerance: i32) -> bool {
  if lhs.is_nan() || rhs.is_nan() {
    return false;
  }
  let mut ulp_bound = lhs;
  for _ in 0..tolerance.max(0) {
    ulp_bound = if rhs > lhs {
      ulp_bound.step_toward_pos_inf()
    } else {
      ulp_bound.step_toward_neg_inf()
    };
  }
  (lhs >= rhs && rhs >= ulp_bound) || (lhs <= rhs && rhs <= ulp_bound)
}

/// The per-pair comparison kernel. Implemented concretely for every
/// `(Self, Rhs)` pair among the ten supported scalar types, never as a
/// blanket impl, so that integer/float/signed/unsigned categories each
/// get exactly the algorithm spec.md §4.2 describes for that pairing.
pub trait SafeCompare<Rhs: Copy>: Copy {
  /// Strict less-than. `false` whenever either operand is NaN.
  fn safe_lt(self, rhs: Rhs) -> bool;
  /// ULP-tolerant equality. `tolerance` is ignored for integer-integer
  /// pairs (there is nothing to be tolerant about) and is the ULP
  /// window half-width otherwise. `false` whenever either operand is NaN.
  fn safe_eq(self, rhs: Rhs, tolerance: i32) -> bool;
}

macro_rules! cross {
  ($inner:ident; [$($a:ty),+ $(,)?]; [$($b:ty),+ $(,)?]) => {
    $( $( $inner!($a, $b); )+ )+
  };
}

macro_rules! impl_int_int {
  ($a:ty, $b:ty) => {
    impl SafeCompare<$b> for $a {
      #[inline]
      fn safe_lt(self, rhs: $b) -> bool {
        WidenInt::widen(self) < WidenInt::widen(rhs)
      }
      #[inline]
      fn safe_eq(self, rhs: $b, _tolerance: i32) -> bool {
        WidenInt::widen(self) == WidenInt::widen(rhs)
      }
    }
  };
}

cross!(
  impl_int_int;
  [i8, i16, i32, i64, u8, u16, u32, u64];
  [i8, i16, i32, i64, u8, u16, u32, u64]
);

macro_rules! impl_float_float {
  ($a:ty, $b:ty, $big:ty) => {
    impl SafeCompare<$b> for $a {
      #[inline]
      fn safe_lt(self, rhs: $b) -> bool {
        float_cmp_lt_float(self as $big, rhs as $big)
      }
      #[inline]
      fn safe_eq(self, rhs: $b, tolerance: i32) -> bool {
        float_cmp_eq_float(self as $big, rhs as $big, tolerance)
      }
    }
  };
}

impl_float_float!(f32, f32, f32);
impl_float_float!(f32, f64, f64);
impl_float_float!(f64, f32, f64);
impl_float_float!(f64, f64, f64);

macro_rules! impl_float_int {
  ($f:ty, $i:ty) => {
    impl SafeCompare<$i> for $f {
      #[inline]
      fn safe_lt(self, rhs: $i) -> bool {
        float_cmp_lt_int(self, rhs)
      }
      #[inline]
      fn safe_eq(self, rhs: $i, tolerance: i32) -> bool {
        float_cmp_eq_int(self, rhs, tolerance)
      }
    }
  };
}

macro_rules! impl_int_float {
  ($i:ty, $f:ty) => {
    impl SafeCompare<$f> for $i {
      #[inline]
      fn safe_lt(self, rhs: $f) -> bool {
        int_cmp_lt_float(self, rhs)
      }
      #[inline]
      fn safe_eq(self, rhs: $f, tolerance: i32) -> bool {
        float_cmp_eq_int(rhs, self, tolerance)
      }
    }
  };
}

cross!(impl_float_int; [f32, f64]; [i8, i16, i32, i64, u8, u16, u32, u64]);
cross!(impl_int_float; [i8, i16, i32, i64, u8, u16, u32, u64]; [f32, f64]);

/// `lhs == rhs`, `tolerance` ULPs apart at most for any pairing
/// involving a float operand (ignored for integer-integer pairs).
#[inline]
pub fn cmp_eq<T: SafeCompare<Rhs>, Rhs: Copy>(lhs: T, rhs: Rhs, tolerance: i32) -> bool {
  lhs.safe_eq(rhs, tolerance)
}

/// `lhs != rhs`.
#[inline]
pub fn cmp_ne<T: SafeCompare<Rhs>, Rhs: Copy>(lhs: T, rhs: Rhs, tolerance: i32) -> bool {
  !lhs.safe_eq(rhs, tolerance)
}

/// `lhs < rhs`, native ordering, no tolerance. `false` if either operand is NaN.
#[inline]
pub fn cmp_lt<T: SafeCompare<Rhs>, Rhs: Copy>(lhs: T, rhs: Rhs) -> bool {
  lhs.safe_lt(rhs)
}

/// `lhs > rhs`.
#[inline]
pub fn cmp_gt<T: Copy, Rhs: SafeCompare<T> + Copy>(lhs: T, rhs: Rhs) -> bool {
  rhs.safe_lt(lhs)
}

/// `lhs <= rhs`.
#[inline]
pub fn cmp_le<T: SafeCompare<Rhs>, Rhs: Copy>(lhs: T, rhs: Rhs, tolerance: i32) -> bool {
  lhs.safe_lt(rhs) || lhs.safe_eq(rhs, tolerance)
}

/// `lhs >= rhs`.
#[inline]
pub fn cmp_ge<T: Copy, Rhs: SafeCompare<T> + Copy>(lhs: T, rhs: Rhs, tolerance: i32) -> bool
where
  T: SafeCompare<Rhs>,
{
  cmp_gt(lhs, rhs) || lhs.safe_eq(rhs, tolerance)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn signed_unsigned_negative_is_always_less() {
    assert!(cmp_lt(-1i32, 1u32));
    assert!(!cmp_lt(1u32, -1i32));
  }

  #[test]
  fn unsigned_overflow_does_not_wrap_in_comparison() {
    assert!(cmp_lt(u8::MAX, 1000i32));
    assert!(!cmp_eq(u8::MAX, 255i64, 0));
    assert!(cmp_eq(u8::MAX, 255i64, 0) == true);
  }

  #[test]
  fn float_float_equality_respects_ulp_tolerance() {
    let one: f64 = 1.0;
    let next = one.step_toward_pos_inf();
    assert!(!cmp_eq(one, next, 0));
    assert!(cmp_eq(one, next, 1));
  }

  #[test]
  fn float_int_bounds_examples_from_spec() {
    assert!(cmp_lt(-1.1f64, -1i32));
    assert!(!cmp_lt(-0.9f64, -1i32));
    assert!(cmp_eq(1.0f64, 1i64, 0));
    let next = 1.0f64.step_toward_neg_inf();
    assert!(cmp_eq(next, 1i64, 1));
  }

  #[test]
  fn nan_makes_every_relation_false_except_ne() {
    let nan = f64::NAN;
    assert!(!cmp_lt(nan, 1i32));
    assert!(!cmp_lt(1i32, nan));
    assert!(!cmp_eq(nan, 1i32, 10));
    assert!(!cmp_gt(nan, 1i32));
    assert!(cmp_ne(nan, 1i32, 10));
  }

  #[test]
  fn infinities_classify_correctly_against_integers() {
    assert!(!cmp_lt(f64::INFINITY, i64::MAX));
    assert!(cmp_lt(f64::NEG_INFINITY, i64::MIN));
    assert!(cmp_lt(i64::MIN, f64::NEG_INFINITY) == false);
    assert!(cmp_lt(i64::MAX, f64::INFINITY));
  }

  #[test]
  fn consistency_trichotomy_holds_for_non_nan() {
    let pairs: &[(f64, i32)] = &[(3.5, 3), (3.0, 3), (-2.0, -2), (100.0, 99)];
    for &(a, b) in pairs {
      let lt = cmp_lt(a, b);
      let eq = cmp_eq(a, b, 0);
      let gt = cmp_lt(b, a);
      assert_eq!([lt, eq, gt].iter().filter(|x| **x).count(), 1);
    }
  }

  macro_rules! reflexive_eq_tests {
    ($($t:ty),+ $(,)?) => {
      $(
        paste::paste! {
          #[test]
          fn [<cmp_eq_is_reflexive_for_ $t>]() {
            let value: $t = 3 as $t;
            assert!(cmp_eq(value, value, 0));
            assert!(!cmp_lt(value, value));
          }
        }
      )+
    };
  }
  reflexive_eq_tests!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

  macro_rules! lt_is_antisymmetric_tests {
    ($($t:ty),+ $(,)?) => {
      $(
        paste::paste! {
          #[test]
          fn [<cmp_lt_is_antisymmetric_for_ $t>]() {
            let a: $t = 1 as $t;
            let b: $t = 2 as $t;
            assert!(cmp_lt(a, b));
            assert!(!cmp_lt(b, a));
          }
        }
      )+
    };
  }
  lt_is_antisymmetric_tests!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
}
