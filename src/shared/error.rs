//! Recoverable error surface for `shared`.
//!
//! Only *expected contention* is represented here: a path already
//! mapped, a resource not (yet) present, a lock held by someone else.
//! Everything the spec classifies as programmer misuse or an
//! unexpected OS failure during a critical step calls
//! `std::process::abort()` at the call site instead of returning
//! through this type, matching the original's `std::terminate()`
//! policy: there is no recovery path the core can safely take from a
//! broken invariant.

use core::fmt;

/// Recoverable failure from a `shared` operation.
#[derive(Debug)]
pub enum Error {
  /// `create` was asked to create a resource that already exists.
  AlreadyExists,
  /// `open` was asked to open a resource that does not exist.
  NotFound,
  /// A non-blocking lock attempt found the lock already held.
  WouldBlock,
  /// `UnlinkFilesystemEntry` was called a second time on the same resource.
  AlreadyUnlinked,
  /// A lower-level `std::io::Error` that does not map to one of the above.
  Io(std::io::Error),
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Error::AlreadyExists => f.write_str("shared memory resource already exists"),
      Error::NotFound => f.write_str("shared memory resource not found"),
      Error::WouldBlock => f.write_str("lock is held by another owner"),
      Error::AlreadyUnlinked => f.write_str("filesystem entry was already unlinked"),
      Error::Io(source) => write!(f, "io error: {source}"),
    }
  }
}

impl std::error::Error for Error {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Error::Io(source) => Some(source),
      _ => None,
    }
  }
}

impl From<std::io::Error> for Error {
  fn from(source: std::io::Error) -> Self {
    match source.kind() {
      std::io::ErrorKind::AlreadyExists => Error::AlreadyExists,
      std::io::ErrorKind::NotFound => Error::NotFound,
      std::io::ErrorKind::WouldBlock => Error::WouldBlock,
      _ => Error::Io(source),
    }
  }
}
