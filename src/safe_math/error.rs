//! Error type shared by every `safe_math` operation.

use core::fmt;

/// Why a checked arithmetic, cast, or comparison helper could not
/// produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithError {
  /// The floating-point environment could not be queried or cleared,
  /// or reported an exception this crate does not know how to
  /// interpret as one of the below.
  Unknown,
  /// The mathematically correct result cannot be represented in the
  /// requested result type (signed/unsigned overflow, division
  /// overflow such as `MIN / -1`, or a float magnitude outside the
  /// target's finite range).
  ExceedsNumericLimits,
  /// The operation produced a value that differs from the
  /// mathematically exact result because the target type cannot
  /// represent it exactly (a float-to-integer or integer-to-float
  /// cast that would silently round).
  ImplicitRounding,
  /// Division or remainder with a zero divisor.
  DivideByZero,
}

impl fmt::Display for ArithError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let message = match self {
      ArithError::Unknown => "unknown arithmetic error",
      ArithError::ExceedsNumericLimits => "value exceeds the numeric limits of the result type",
      ArithError::ImplicitRounding => "operation would silently round the result",
      ArithError::DivideByZero => "division by zero",
    };
    f.write_str(message)
  }
}

#[cfg(feature = "std")]
impl std::error::Error for ArithError {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_messages_are_stable() {
    assert_eq!(
      ArithError::ExceedsNumericLimits.to_string(),
      "value exceeds the numeric limits of the result type"
    );
    assert_eq!(ArithError::DivideByZero.to_string(), "division by zero");
  }
}
