//! Compile-time operand-kind queries used to pick default result types.
//!
//! The original C++ core dispatches `Add`/`Subtract`/`Cmp*`/… through
//! SFINAE overload sets keyed on "is this a signed integer", "is this an
//! unsigned integer", "which of these two types is wider". Rust has no
//! overload sets, so the same dispatch is expressed as a small trait
//! hierarchy plus an associated-type projection for "default result type".

/// Marker for the ten scalar types `safe_math` operates over.
pub trait Scalar: Copy + PartialOrd + 'static {}

macro_rules! impl_scalar {
  ($($ty:ty),+ $(,)?) => {
    $(impl Scalar for $ty {})+
  };
}
impl_scalar!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

/// A signed integral type in `{i8, i16, i32, i64}`.
pub trait SafeInt: Scalar + Eq + Ord {
  /// The unsigned counterpart of the same width.
  type Unsigned: SafeUInt;
}

/// An unsigned integral type in `{u8, u16, u32, u64}`.
pub trait SafeUInt: Scalar + Eq + Ord {
  /// The signed counterpart of the same width.
  type Signed: SafeInt;
}

/// An IEEE-754 floating type in `{f32, f64}`.
pub trait SafeFloat: Scalar {}

macro_rules! impl_int_pair {
  ($signed:ty, $unsigned:ty) => {
    impl SafeInt for $signed {
      type Unsigned = $unsigned;
    }
    impl SafeUInt for $unsigned {
      type Signed = $signed;
    }
  };
}
impl_int_pair!(i8, u8);
impl_int_pair!(i16, u16);
impl_int_pair!(i32, u32);
impl_int_pair!(i64, u64);

impl SafeFloat for f32 {}
impl SafeFloat for f64 {}

/// `bigger_type_t<T1, T2>`: the operand with the greater digit width.
///
/// Defined only for two signed integers, two unsigned integers, or two
/// floats; mixed-category pairs have no "bigger" relationship and must be
/// handled by the category-specific kernels instead.
pub trait Bigger<Other> {
  /// The wider of `Self` and `Other`.
  type Output;
}

// Reflexive case: the wider of a type and itself is itself.
macro_rules! bigger_refl {
  ($t:ty) => {
    impl Bigger<$t> for $t {
      type Output = $t;
    }
  };
}
bigger_refl!(i8);
bigger_refl!(i16);
bigger_refl!(i32);
bigger_refl!(i64);
bigger_refl!(u8);
bigger_refl!(u16);
bigger_refl!(u32);
bigger_refl!(u64);
bigger_refl!(f32);
bigger_refl!(f64);

macro_rules! bigger_pair {
  ($narrow:ty, $wide:ty) => {
    impl Bigger<$wide> for $narrow {
      type Output = $wide;
    }
    impl Bigger<$narrow> for $wide {
      type Output = $wide;
    }
  };
}
bigger_pair!(i8, i16);
bigger_pair!(i8, i32);
bigger_pair!(i8, i64);
bigger_pair!(i16, i32);
bigger_pair!(i16, i64);
bigger_pair!(i32, i64);

bigger_pair!(u8, u16);
bigger_pair!(u8, u32);
bigger_pair!(u8, u64);
bigger_pair!(u16, u32);
bigger_pair!(u16, u64);
bigger_pair!(u32, u64);

bigger_pair!(f32, f64);

/// `bigger_type_t<T1, T2>` as a free type alias, matching the C++ spelling.
pub type BiggerType<T1, T2> = <T1 as Bigger<T2>>::Output;

/// `prefer_first_type_t<T1, T2>`: `T1` unless it is `()` (the "void"
/// stand-in), in which case `T2`. Used so callers can pin the result type
/// of a binary op (`add::<R>(a, b)`) while still letting type inference
/// supply a sensible default when they don't.
pub trait PreferFirst<Fallback> {
  /// The resolved type: `Self` normally, `Fallback` if `Self` is `()`.
  type Output;
}

impl<Fallback> PreferFirst<Fallback> for () {
  type Output = Fallback;
}

macro_rules! prefer_first_concrete {
  ($t:ty) => {
    impl<Fallback> PreferFirst<Fallback> for $t {
      type Output = $t;
    }
  };
}
prefer_first_concrete!(i8);
prefer_first_concrete!(i16);
prefer_first_concrete!(i32);
prefer_first_concrete!(i64);
prefer_first_concrete!(u8);
prefer_first_concrete!(u16);
prefer_first_concrete!(u32);
prefer_first_concrete!(u64);
prefer_first_concrete!(f32);
prefer_first_concrete!(f64);

/// The result type `Sub`/`Mul`/`Div` (and `Add` outside its own
/// unsigned-widening exception below) resolve to when the caller does
/// not pin an explicit `R`, per spec.md §3: the first operand's type for
/// integer ⊕ integer, the wider of the two for float ⊕ float, and the
/// float operand's type for a mixed integer/float pairing.
pub trait DefaultResult<Rhs> {
  /// The resolved default result type.
  type Output;
}

/// `Add`'s own default-result rule. Identical to [`DefaultResult`]
/// except that `Add(unsigned, unsigned)` widens to the wider of the two
/// unsigned types instead of keeping the first operand's type, the one
/// asymmetry spec.md §3 calls out by name.
pub trait DefaultAddResult<Rhs> {
  /// The resolved default result type for `Add` specifically.
  type Output;
}

macro_rules! cross {
  ($inner:ident; [$($a:ty),+ $(,)?]; [$($b:ty),+ $(,)?]) => {
    $( $( $inner!($a, $b); )+ )+
  };
}

macro_rules! default_result_first_operand {
  ($a:ty, $b:ty) => {
    impl DefaultResult<$b> for $a {
      type Output = $a;
    }
    impl DefaultAddResult<$b> for $a {
      type Output = $a;
    }
  };
}
// integer ⊕ integer, every pairing except unsigned ⊕ unsigned (handled
// separately below since only `Add` of that pairing widens).
cross!(default_result_first_operand; [i8, i16, i32, i64]; [i8, i16, i32, i64]);
cross!(default_result_first_operand; [i8, i16, i32, i64]; [u8, u16, u32, u64]);
cross!(default_result_first_operand; [u8, u16, u32, u64]; [i8, i16, i32, i64]);

macro_rules! default_result_uu {
  ($a:ty, $b:ty) => {
    impl DefaultResult<$b> for $a {
      type Output = $a;
    }
    impl DefaultAddResult<$b> for $a {
      type Output = BiggerType<$a, $b>;
    }
  };
}
cross!(default_result_uu; [u8, u16, u32, u64]; [u8, u16, u32, u64]);

macro_rules! default_result_float_float {
  ($a:ty, $b:ty, $big:ty) => {
    impl DefaultResult<$b> for $a {
      type Output = $big;
    }
    impl DefaultAddResult<$b> for $a {
      type Output = $big;
    }
  };
}
default_result_float_float!(f32, f32, f32);
default_result_float_float!(f32, f64, f64);
default_result_float_float!(f64, f32, f64);
default_result_float_float!(f64, f64, f64);

macro_rules! default_result_float_int {
  ($f:ty, $i:ty) => {
    impl DefaultResult<$i> for $f {
      type Output = $f;
    }
    impl DefaultAddResult<$i> for $f {
      type Output = $f;
    }
  };
}

macro_rules! default_result_int_float {
  ($i:ty, $f:ty) => {
    impl DefaultResult<$f> for $i {
      type Output = $f;
    }
    impl DefaultAddResult<$f> for $i {
      type Output = $f;
    }
  };
}

cross!(default_result_float_int; [f32, f64]; [i8, i16, i32, i64, u8, u16, u32, u64]);
cross!(default_result_int_float; [i8, i16, i32, i64, u8, u16, u32, u64]; [f32, f64]);

#[cfg(test)]
mod tests {
  use super::*;

  fn assert_int<T: SafeInt>() {}
  fn assert_uint<T: SafeUInt>() {}
  fn assert_float<T: SafeFloat>() {}

  #[test]
  fn categorizes_every_scalar() {
    assert_int::<i8>();
    assert_int::<i64>();
    assert_uint::<u8>();
    assert_uint::<u64>();
    assert_float::<f32>();
    assert_float::<f64>();
  }

  #[test]
  fn bigger_picks_wider_of_two() {
    fn bigger<A: Bigger<B>, B>() -> &'static str {
      core::any::type_name::<<A as Bigger<B>>::Output>()
    }
    assert_eq!(bigger::<i8, i32>(), core::any::type_name::<i32>());
    assert_eq!(bigger::<u64, u8>(), core::any::type_name::<u64>());
    assert_eq!(bigger::<f32, f64>(), core::any::type_name::<f64>());
  }

  #[test]
  fn prefer_first_falls_back_on_unit() {
    fn resolved<T: PreferFirst<Fallback>, Fallback>() -> &'static str {
      core::any::type_name::<<T as PreferFirst<Fallback>>::Output>()
    }
    assert_eq!(resolved::<(), i32>(), core::any::type_name::<i32>());
    assert_eq!(resolved::<i64, i32>(), core::any::type_name::<i64>());
  }
}
