//! Overflow-, rounding- and domain-checked Add/Sub/Mul/Div/Negate/Abs over
//! any pairing of the ten supported scalar types.
//!
//! Every built-in arithmetic operator in the host language wraps,
//! truncates, or silently rounds on overflow; every function here
//! instead returns a `Result<R, ArithError>` so the caller decides what
//! "doesn't fit" means for their result type.
//!
//! Integer kernels widen both operands to `i128`, wide enough to hold
//! the exact sum, difference, product, or quotient of any two `i64`- or
//! `u64`-sized operands without itself overflowing, and only narrow
//! back down to the caller's chosen result type once the exact value is
//! known to fit. This collapses the original's sign-splitting reduction
//! (mixed-sign addition rewritten in terms of [`negate`]/[`abs`] over
//! unsigned kernels) into a single widen-compute-narrow pass; see
//! DESIGN.md.
//!
//! Float kernels follow spec.md §4.4 literally instead: every float ⊕
//! float runs inside an [`FpEnv`](super::fpenv::FpEnv) scope, and every
//! float ⊕ integer or integer ⊕ float first casts the integer operand
//! through [`cast`](super::cast::cast) into the float's type (picking up
//! the same `ImplicitRounding` check a standalone cast would) before
//! reducing to float ⊕ float. The per-pair dispatch is a trait
//! (`SafeArith`/`SafeNegate`/`SafeAbs`), implemented once per concrete
//! operand-kind pairing, the same "explicit kernel per category pair"
//! translation [`SafeCompare`](super::cmp::SafeCompare) uses for `Cmp`.

use super::cast::{cast, CastTo};
use super::cmp::WidenInt;
use super::error::ArithError;
use super::type_traits::{DefaultAddResult, DefaultResult};

#[cfg(feature = "std")]
use super::fpenv::calculate_and_verify;

fn narrow<R: WidenInt>(value: i128) -> Result<R, ArithError> {
  if value < R::MIN_I128 || value > R::MAX_I128 {
    Err(ArithError::ExceedsNumericLimits)
  } else {
    Ok(R::from_i128(value))
  }
}

fn int_add<R: WidenInt, A: WidenInt, B: WidenInt>(a: A, b: B) -> Result<R, ArithError> {
  let sum = a
    .widen()
    .checked_add(b.widen())
    .ok_or(ArithError::ExceedsNumericLimits)?;
  narrow(sum)
}

fn int_sub<R: WidenInt, A: WidenInt, B: WidenInt>(a: A, b: B) -> Result<R, ArithError> {
  let diff = a
    .widen()
    .checked_sub(b.widen())
    .ok_or(ArithError::ExceedsNumericLimits)?;
  narrow(diff)
}

fn int_mul<R: WidenInt, A: WidenInt, B: WidenInt>(a: A, b: B) -> Result<R, ArithError> {
  let product = a
    .widen()
    .checked_mul(b.widen())
    .ok_or(ArithError::ExceedsNumericLimits)?;
  narrow(product)
}

/// `a / b`, range-checked against `R`. Unlike the built-in integer
/// division operator, a non-exact division is rejected with
/// `ImplicitRounding` rather than silently truncated toward zero, the
/// same "a cast/op that compiles cleanly but loses precision is an
/// error" policy `Cast` applies to narrowing conversions.
fn int_div<R: WidenInt, A: WidenInt, B: WidenInt>(a: A, b: B) -> Result<R, ArithError> {
  let divisor = b.widen();
  if divisor == 0 {
    return Err(ArithError::DivideByZero);
  }
  let dividend = a.widen();
  let remainder = dividend.checked_rem(divisor).ok_or(ArithError::ExceedsNumericLimits)?;
  if remainder != 0 {
    return Err(ArithError::ImplicitRounding);
  }
  let quotient = dividend
    .checked_div(divisor)
    .ok_or(ArithError::ExceedsNumericLimits)?;
  narrow(quotient)
}

fn int_negate<R: WidenInt, A: WidenInt>(a: A) -> Result<R, ArithError> {
  let negated = a
    .widen()
    .checked_neg()
    .ok_or(ArithError::ExceedsNumericLimits)?;
  narrow(negated)
}

fn int_abs<R: WidenInt, A: WidenInt>(a: A) -> Result<R, ArithError> {
  let magnitude = a
    .widen()
    .checked_abs()
    .ok_or(ArithError::ExceedsNumericLimits)?;
  narrow(magnitude)
}

/// Run a binary float op inside an `FpEnv` scope when `std` is
/// available, then verify the raw result fits `R` (which may itself be
/// a narrower float or an integer (`Cast` handles both).
#[cfg(feature = "std")]
fn float_binop<F, R>(a: F, b: F, op: impl FnOnce(F, F) -> F) -> Result<R, ArithError>
where
  F: CastTo<R> + Copy,
{
  let (result, _inexact) = calculate_and_verify(move || op(a, b))?;
  cast(result)
}

#[cfg(not(feature = "std"))]
fn float_binop<F, R>(a: F, b: F, op: impl FnOnce(F, F) -> F) -> Result<R, ArithError>
where
  F: CastTo<R> + Copy,
{
  cast(op(a, b))
}

/// The per-operand-pair arithmetic kernel. Implemented concretely for
/// every `(Self, Rhs)` pair among the ten supported scalar types, for
/// any result type `R` the computed value can be [`cast`](super::cast)
/// into, never as a blanket impl, so integer/float/signed/unsigned
/// categories each get exactly the algorithm spec.md §4.4 describes.
pub trait SafeArith<Rhs, R> {
  /// `self + rhs`.
  fn safe_add(self, rhs: Rhs) -> Result<R, ArithError>;
  /// `self - rhs`.
  fn safe_sub(self, rhs: Rhs) -> Result<R, ArithError>;
  /// `self * rhs`.
  fn safe_mul(self, rhs: Rhs) -> Result<R, ArithError>;
  /// `self / rhs`.
  fn safe_div(self, rhs: Rhs) -> Result<R, ArithError>;
}

/// Unary negation, dispatched the same way as [`SafeArith`].
pub trait SafeNegate<R> {
  /// `-self`.
  fn safe_negate(self) -> Result<R, ArithError>;
}

/// Absolute value, dispatched the same way as [`SafeArith`].
pub trait SafeAbs<R> {
  /// `|self|`.
  fn safe_abs(self) -> Result<R, ArithError>;
}

macro_rules! cross {
  ($inner:ident; [$($a:ty),+ $(,)?]; [$($b:ty),+ $(,)?]) => {
    $( $( $inner!($a, $b); )+ )+
  };
}

macro_rules! impl_int_int_arith {
  ($a:ty, $b:ty) => {
    impl<R: WidenInt> SafeArith<$b, R> for $a {
      #[inline]
      fn safe_add(self, rhs: $b) -> Result<R, ArithError> {
        int_add(self, rhs)
      }
      #[inline]
      fn safe_sub(self, rhs: $b) -> Result<R, ArithError> {
        int_sub(self, rhs)
      }
      #[inline]
      fn safe_mul(self, rhs: $b) -> Result<R, ArithError> {
        int_mul(self, rhs)
      }
      #[inline]
      fn safe_div(self, rhs: $b) -> Result<R, ArithError> {
        int_div(self, rhs)
      }
    }
  };
}

cross!(
  impl_int_int_arith;
  [i8, i16, i32, i64, u8, u16, u32, u64];
  [i8, i16, i32, i64, u8, u16, u32, u64]
);

macro_rules! impl_int_negate_abs {
  ($t:ty) => {
    impl<R: WidenInt> SafeNegate<R> for $t {
      #[inline]
      fn safe_negate(self) -> Result<R, ArithError> {
        int_negate(self)
      }
    }
    impl<R: WidenInt> SafeAbs<R> for $t {
      #[inline]
      fn safe_abs(self) -> Result<R, ArithError> {
        int_abs(self)
      }
    }
  };
}
impl_int_negate_abs!(i8);
impl_int_negate_abs!(i16);
impl_int_negate_abs!(i32);
impl_int_negate_abs!(i64);
impl_int_negate_abs!(u8);
impl_int_negate_abs!(u16);
impl_int_negate_abs!(u32);
impl_int_negate_abs!(u64);

macro_rules! impl_float_float_arith {
  ($a:ty, $b:ty, $big:ty) => {
    impl<R> SafeArith<$b, R> for $a
    where
      $big: CastTo<R>,
    {
      #[inline]
      fn safe_add(self, rhs: $b) -> Result<R, ArithError> {
        float_binop(self as $big, rhs as $big, |x, y| x + y)
      }
      #[inline]
      fn safe_sub(self, rhs: $b) -> Result<R, ArithError> {
        float_binop(self as $big, rhs as $big, |x, y| x - y)
      }
      #[inline]
      fn safe_mul(self, rhs: $b) -> Result<R, ArithError> {
        float_binop(self as $big, rhs as $big, |x, y| x * y)
      }
      #[inline]
      fn safe_div(self, rhs: $b) -> Result<R, ArithError> {
        if rhs == 0.0 {
          return Err(ArithError::DivideByZero);
        }
        float_binop(self as $big, rhs as $big, |x, y| x / y)
      }
    }
  };
}

impl_float_float_arith!(f32, f32, f32);
impl_float_float_arith!(f32, f64, f64);
impl_float_float_arith!(f64, f32, f64);
impl_float_float_arith!(f64, f64, f64);

macro_rules! impl_float_negate_abs {
  ($t:ty) => {
    impl<R> SafeNegate<R> for $t
    where
      $t: CastTo<R>,
    {
      #[inline]
      fn safe_negate(self) -> Result<R, ArithError> {
        cast(-self)
      }
    }
    impl<R> SafeAbs<R> for $t
    where
      $t: CastTo<R>,
    {
      #[inline]
      fn safe_abs(self) -> Result<R, ArithError> {
        // `f32::abs`/`f64::abs` already clear the sign of ±0.0, preserve
        // ±∞ magnitude, and preserve NaN (payload not guaranteed),
        // exactly spec.md §4.4's float `Abs` rule.
        cast(<$t>::abs(self))
      }
    }
  };
}
impl_float_negate_abs!(f32);
impl_float_negate_abs!(f64);

macro_rules! impl_float_int_arith {
  ($f:ty, $i:ty) => {
    impl<R> SafeArith<$i, R> for $f
    where
      $f: CastTo<R>,
    {
      #[inline]
      fn safe_add(self, rhs: $i) -> Result<R, ArithError> {
        let rhs_f: $f = cast(rhs)?;
        SafeArith::<$f, R>::safe_add(self, rhs_f)
      }
      #[inline]
      fn safe_sub(self, rhs: $i) -> Result<R, ArithError> {
        let rhs_f: $f = cast(rhs)?;
        SafeArith::<$f, R>::safe_sub(self, rhs_f)
      }
      #[inline]
      fn safe_mul(self, rhs: $i) -> Result<R, ArithError> {
        let rhs_f: $f = cast(rhs)?;
        SafeArith::<$f, R>::safe_mul(self, rhs_f)
      }
      #[inline]
      fn safe_div(self, rhs: $i) -> Result<R, ArithError> {
        let rhs_f: $f = cast(rhs)?;
        SafeArith::<$f, R>::safe_div(self, rhs_f)
      }
    }
  };
}

macro_rules! impl_int_float_arith {
  ($i:ty, $f:ty) => {
    impl<R> SafeArith<$f, R> for $i
    where
      $f: CastTo<R>,
    {
      #[inline]
      fn safe_add(self, rhs: $f) -> Result<R, ArithError> {
        let lhs_f: $f = cast(self)?;
        SafeArith::<$f, R>::safe_add(lhs_f, rhs)
      }
      #[inline]
      fn safe_sub(self, rhs: $f) -> Result<R, ArithError> {
        let lhs_f: $f = cast(self)?;
        SafeArith::<$f, R>::safe_sub(lhs_f, rhs)
      }
      #[inline]
      fn safe_mul(self, rhs: $f) -> Result<R, ArithError> {
        let lhs_f: $f = cast(self)?;
        SafeArith::<$f, R>::safe_mul(lhs_f, rhs)
      }
      #[inline]
      fn safe_div(self, rhs: $f) -> Result<R, ArithError> {
        let lhs_f: $f = cast(self)?;
        SafeArith::<$f, R>::safe_div(lhs_f, rhs)
      }
    }
  };
}

cross!(impl_float_int_arith; [f32, f64]; [i8, i16, i32, i64, u8, u16, u32, u64]);
cross!(impl_int_float_arith; [i8, i16, i32, i64, u8, u16, u32, u64]; [f32, f64]);

/// `a + b`. The default result type (when `R` is inferred rather than
/// pinned by the caller) follows spec.md §3: the first operand's type
/// for same-signed integers, the wider unsigned type for
/// `Add(unsigned, unsigned)`, the wider float for float ⊕ float, and
/// the float operand's type for a mixed integer/float pairing.
#[inline]
pub fn add<R, A, B>(a: A, b: B) -> Result<R, ArithError>
where
  A: SafeArith<B, R>,
{
  a.safe_add(b)
}

/// `a - b`.
#[inline]
pub fn subtract<R, A, B>(a: A, b: B) -> Result<R, ArithError>
where
  A: SafeArith<B, R>,
{
  a.safe_sub(b)
}

/// `a * b`.
#[inline]
pub fn multiply<R, A, B>(a: A, b: B) -> Result<R, ArithError>
where
  A: SafeArith<B, R>,
{
  a.safe_mul(b)
}

/// `a / b`. Fails with `DivideByZero` on a zero divisor, `ImplicitRounding`
/// on a non-exact integer division, and `ExceedsNumericLimits` when the
/// exact quotient does not fit `R`.
#[inline]
pub fn divide<R, A, B>(a: A, b: B) -> Result<R, ArithError>
where
  A: SafeArith<B, R>,
{
  a.safe_div(b)
}

/// `-a`, range-checked against `R`. Negating an unsigned value into an
/// unsigned `R` always fails unless `a` is zero.
#[inline]
pub fn negate<R, A>(a: A) -> Result<R, ArithError>
where
  A: SafeNegate<R>,
{
  a.safe_negate()
}

/// `|a|`, range-checked against `R`.
#[inline]
pub fn abs<R, A>(a: A) -> Result<R, ArithError>
where
  A: SafeAbs<R>,
{
  a.safe_abs()
}

/// `a + b`, with `R` resolved by [`DefaultAddResult`] instead of pinned
/// by the caller: the wider unsigned type for `Add(unsigned, unsigned)`,
/// otherwise the same rule [`DefaultResult`] uses for `Sub`/`Mul`/`Div`.
#[inline]
pub fn add_default<A, B>(a: A, b: B) -> Result<<A as DefaultAddResult<B>>::Output, ArithError>
where
  A: DefaultAddResult<B>,
  A: SafeArith<B, <A as DefaultAddResult<B>>::Output>,
{
  a.safe_add(b)
}

/// `a - b`, with `R` resolved by [`DefaultResult`] instead of pinned by
/// the caller.
#[inline]
pub fn subtract_default<A, B>(a: A, b: B) -> Result<<A as DefaultResult<B>>::Output, ArithError>
where
  A: DefaultResult<B>,
  A: SafeArith<B, <A as DefaultResult<B>>::Output>,
{
  a.safe_sub(b)
}

/// `a * b`, with `R` resolved by [`DefaultResult`] instead of pinned by
/// the caller.
#[inline]
pub fn multiply_default<A, B>(a: A, b: B) -> Result<<A as DefaultResult<B>>::Output, ArithError>
where
  A: DefaultResult<B>,
  A: SafeArith<B, <A as DefaultResult<B>>::Output>,
{
  a.safe_mul(b)
}

/// `a / b`, with `R` resolved by [`DefaultResult`] instead of pinned by
/// the caller.
#[inline]
pub fn divide_default<A, B>(a: A, b: B) -> Result<<A as DefaultResult<B>>::Output, ArithError>
where
  A: DefaultResult<B>,
  A: SafeArith<B, <A as DefaultResult<B>>::Output>,
{
  a.safe_div(b)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unsigned_subtraction_underflow_is_rejected() {
    let result: Result<u8, _> = subtract(1u8, 2u8);
    assert_eq!(result, Err(ArithError::ExceedsNumericLimits));
  }

  #[test]
  fn signed_min_negation_overflow_is_rejected() {
    let result: Result<i32, _> = negate(i32::MIN);
    assert_eq!(result, Err(ArithError::ExceedsNumericLimits));
  }

  #[test]
  fn mixed_sign_addition_resolves_through_widening() {
    let result: Result<i64, _> = add(5i8, 10u8);
    assert_eq!(result, Ok(15));
    let result: Result<u32, _> = add(-5i32, 3i32);
    assert_eq!(result, Err(ArithError::ExceedsNumericLimits));
  }

  #[test]
  fn multiplication_overflow_is_rejected() {
    let result: Result<i64, _> = multiply(u64::MAX, u64::MAX);
    assert_eq!(result, Err(ArithError::ExceedsNumericLimits));
    let result: Result<i64, _> = multiply(1000i64, 1000i64);
    assert_eq!(result, Ok(1_000_000));
  }

  #[test]
  fn division_by_zero_is_rejected() {
    let result: Result<i32, _> = divide(10i32, 0i32);
    assert_eq!(result, Err(ArithError::DivideByZero));
  }

  #[test]
  fn division_non_exact_is_implicit_rounding() {
    let result: Result<u32, _> = divide(3u32, 2u32);
    assert_eq!(result, Err(ArithError::ImplicitRounding));
    let result: Result<u32, _> = divide(6u32, 2u32);
    assert_eq!(result, Ok(3));
  }

  #[test]
  fn division_exact_negative_result() {
    let result: Result<i32, _> = divide(-8i32, 2i32);
    assert_eq!(result, Ok(-4));
  }

  #[test]
  fn division_min_by_minus_one_overflows() {
    let result: Result<i64, _> = divide(i64::MIN, -1i64);
    assert_eq!(result, Err(ArithError::ExceedsNumericLimits));
  }

  #[test]
  fn abs_of_min_overflows_every_signed_result() {
    let result: Result<i64, _> = abs(i64::MIN);
    assert_eq!(result, Err(ArithError::ExceedsNumericLimits));
  }

  #[test]
  fn abs_widens_into_unsigned_result() {
    let result: Result<u8, _> = abs(-5i16);
    assert_eq!(result, Ok(5));
  }

  #[test]
  fn float_float_arithmetic_stays_in_domain() {
    let result: Result<f64, _> = add(1.5f32, 2.25f64);
    assert_eq!(result, Ok(3.75));
    let result: Result<f32, _> = multiply(2.0f32, 3.0f32);
    assert_eq!(result, Ok(6.0));
  }

  #[test]
  fn float_divide_by_zero_is_rejected_before_it_becomes_infinity() {
    let result: Result<f64, _> = divide(1.0f64, 0.0f64);
    assert_eq!(result, Err(ArithError::DivideByZero));
  }

  #[test]
  fn mixed_float_int_addition_casts_the_integer_operand_first() {
    let result: Result<f64, _> = add(1i32, 2.5f64);
    assert_eq!(result, Ok(3.5));
    let result: Result<f64, _> = add(2.5f64, 1i32);
    assert_eq!(result, Ok(3.5));
  }

  #[test]
  fn mixed_int_float_rejects_when_integer_does_not_fit_exactly() {
    // u64::MAX is not exactly representable in f32, so casting it into
    // the float operand's type fails before any arithmetic happens.
    let result: Result<f32, _> = add(u64::MAX, 1.0f32);
    assert_eq!(result, Err(ArithError::ImplicitRounding));
  }

  #[test]
  fn float_negate_flips_sign_and_abs_clears_it() {
    let result: Result<f64, _> = negate(2.5f64);
    assert_eq!(result, Ok(-2.5));
    let result: Result<f64, _> = abs(-0.0f64);
    assert_eq!(result, Ok(0.0));
    assert!(!result.unwrap().is_sign_negative());
  }

  #[test]
  fn float_arithmetic_result_can_be_narrowed_through_cast() {
    let result: Result<i32, _> = add(1.0f64, 2.0f64);
    assert_eq!(result, Ok(3));
    let result: Result<i32, _> = add(1.5f64, 2.0f64);
    assert_eq!(result, Err(ArithError::ImplicitRounding));
  }

  #[test]
  fn add_default_widens_to_the_bigger_of_two_unsigned_types() {
    let result = add_default(200u8, 200u16);
    assert_eq!(result, Ok(400u16));
  }

  #[test]
  fn subtract_default_keeps_first_operand_type() {
    let result = subtract_default(10u32, 3u8);
    assert_eq!(result, Ok(7u32));
  }

  #[test]
  fn multiply_default_picks_the_float_operand_type_for_a_mixed_pairing() {
    let result = multiply_default(2i32, 1.5f64);
    assert_eq!(result, Ok(3.0f64));
  }

  #[test]
  fn divide_default_picks_the_wider_float_for_float_float() {
    let result = divide_default(1.5f32, 3.0f64);
    assert_eq!(result, Ok(0.5f64));
  }

  macro_rules! signed_negate_abs_involution_tests {
    ($($t:ty),+ $(,)?) => {
      $(
        paste::paste! {
          #[test]
          fn [<negate_is_involutive_for_ $t>]() {
            for x in [<$t>::MIN + 1, -1 as $t, 0 as $t, 1 as $t, <$t>::MAX] {
              let once: Result<$t, _> = negate(x);
              let twice: Result<$t, _> = negate(once.unwrap());
              assert_eq!(twice, Ok(x));
            }
          }

          #[test]
          fn [<abs_of_negate_equals_abs_for_ $t>]() {
            for x in [<$t>::MIN + 1, -1 as $t, 0 as $t, 1 as $t, <$t>::MAX] {
              let negated: $t = negate(x).unwrap();
              let abs_of_negated: Result<$t, _> = abs(negated);
              let abs_of_x: Result<$t, _> = abs(x);
              assert_eq!(abs_of_negated, abs_of_x);
            }
          }

          #[test]
          fn [<negate_of_min_overflows_for_ $t>]() {
            let result: Result<$t, _> = negate(<$t>::MIN);
            assert_eq!(result, Err(ArithError::ExceedsNumericLimits));
          }
        }
      )+
    };
  }
  signed_negate_abs_involution_tests!(i8, i16, i32, i64);

  macro_rules! unsigned_negate_abs_tests {
    ($($t:ty),+ $(,)?) => {
      $(
        paste::paste! {
          #[test]
          fn [<negate_only_accepts_zero_for_ $t>]() {
            let zero: Result<$t, _> = negate(0 as $t);
            assert_eq!(zero, Ok(0));
            let one: Result<$t, _> = negate(1 as $t);
            assert_eq!(one, Err(ArithError::ExceedsNumericLimits));
          }

          #[test]
          fn [<abs_is_identity_for_ $t>]() {
            let result: Result<$t, _> = abs(<$t>::MAX);
            assert_eq!(result, Ok(<$t>::MAX));
          }
        }
      )+
    };
  }
  unsigned_negate_abs_tests!(u8, u16, u32, u64);

  macro_rules! float_negate_abs_involution_tests {
    ($($t:ty),+ $(,)?) => {
      $(
        paste::paste! {
          #[test]
          fn [<negate_is_involutive_for_ $t>]() {
            for x in [1.5 as $t, -2.25 as $t, 0.0 as $t] {
              let once: Result<$t, _> = negate(x);
              let twice: Result<$t, _> = negate(once.unwrap());
              assert_eq!(twice, Ok(x));
            }
          }

          #[test]
          fn [<abs_of_negate_equals_abs_for_ $t>]() {
            for x in [1.5 as $t, -2.25 as $t, 0.0 as $t] {
              let negated: $t = negate(x).unwrap();
              let abs_of_negated: Result<$t, _> = abs(negated);
              let abs_of_x: Result<$t, _> = abs(x);
              assert_eq!(abs_of_negated, abs_of_x);
            }
          }
        }
      )+
    };
  }
  float_negate_abs_involution_tests!(f32, f64);

  macro_rules! add_sub_inverse_tests {
    ($($t:ty),+ $(,)?) => {
      $(
        paste::paste! {
          #[test]
          fn [<add_then_subtract_recovers_the_first_operand_for_ $t>]() {
            let a: $t = 3 as $t;
            let b: $t = 4 as $t;
            let sum: Result<$t, _> = add(a, b);
            let recovered: Result<$t, _> = subtract(sum.unwrap(), b);
            assert_eq!(recovered, Ok(a));
          }
        }
      )+
    };
  }
  add_sub_inverse_tests!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
}
