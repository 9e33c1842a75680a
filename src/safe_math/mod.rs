//! Overflow-, rounding-, and domain-safe arithmetic, casting, and
//! comparison across the ten built-in scalar types this crate treats as
//! safety-relevant: `i8`/`i16`/`i32`/`i64`, `u8`/`u16`/`u32`/`u64`, and
//! `f32`/`f64`.
//!
//! Every function here returns [`ArithError`] instead of doing what the
//! host language does by default: wrapping, truncating, or silently
//! rounding. This module alone has no filesystem, `std`, or OS
//! dependency and is usable in `no_std` builds.

mod arith;
mod cast;
mod cmp;
mod error;
#[cfg(feature = "std")]
mod fpenv;
mod type_traits;

pub use arith::{
  abs, add, add_default, divide, divide_default, multiply, multiply_default, negate, subtract,
  subtract_default, SafeAbs, SafeArith, SafeNegate,
};
pub use cast::{cast, CastTo};
pub use cmp::{cmp_eq, cmp_ge, cmp_gt, cmp_le, cmp_lt, cmp_ne, SafeCompare, WidenInt};
pub use error::ArithError;
#[cfg(feature = "std")]
pub use fpenv::{calculate_and_verify, FpEnv};
pub use type_traits::{
  Bigger, BiggerType, DefaultAddResult, DefaultResult, PreferFirst, SafeFloat, SafeInt, SafeUInt,
  Scalar,
};
