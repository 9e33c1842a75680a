//! Tunable policy for the lock-file wait loop.
//!
//! spec.md §4.8 hard-codes "500 ms total, polled every 10 ms"; the
//! expanded spec resolves the corresponding Open Question by making
//! that a configurable policy (defaulting to the same numbers) instead
//! of a compiled-in constant, since a caller embedding this crate on
//! slower storage may need a longer budget.

use std::time::Duration;

/// How long, and how often, a resource opener waits for a creator's
/// lock file to disappear before giving up.
#[derive(Debug, Clone, Copy)]
pub struct LockFileWaitPolicy {
  /// Total time budget before an opener gives up waiting for a
  /// creator's lock file to disappear and aborts the process.
  pub timeout: Duration,
  /// Sleep between successive existence checks.
  pub poll_interval: Duration,
}

impl Default for LockFileWaitPolicy {
  fn default() -> Self {
    LockFileWaitPolicy {
      timeout: Duration::from_millis(500),
      poll_interval: Duration::from_millis(10),
    }
  }
}

impl LockFileWaitPolicy {
  /// Number of polls this policy performs before timing out.
  pub fn retries(&self) -> u32 {
    (self.timeout.as_millis() / self.poll_interval.as_millis().max(1)) as u32
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_policy_matches_the_spec_numbers() {
    let policy = LockFileWaitPolicy::default();
    assert_eq!(policy.timeout, Duration::from_millis(500));
    assert_eq!(policy.poll_interval, Duration::from_millis(10));
    assert_eq!(policy.retries(), 50);
  }
}
