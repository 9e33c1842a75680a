//! Pluggable typed-memory backend.
//!
//! On QNX, "typed memory" is a named physical-memory pool with its own
//! allocate/open/unlink calls that a resource prefers over ordinary
//! `shm_open`-backed memory when available. There is no open client
//! library for it on a non-QNX host, so this crate ships only the
//! always-absent implementation; the trait is the seam a platform crate
//! would use to substitute a real one.

use std::os::unix::io::RawFd;
use std::path::Path;

use super::permission::Permissions;

/// Allocator for named or anonymous typed memory.
pub trait TypedMemoryProvider: Send + Sync {
  /// Allocate `size` bytes of named typed memory at `path` with `perms`.
  /// `Ok(None)` means typed memory is unavailable and the caller should
  /// fall back to ordinary shared memory; `Err` is an unexpected failure.
  fn allocate_named_typed_memory(
    &self,
    size: usize,
    path: &Path,
    perms: &Permissions,
  ) -> std::io::Result<Option<RawFd>>;

  /// Allocate and open `size` bytes of anonymous typed memory.
  fn allocate_and_open_anonymous_typed_memory(&self, size: usize) -> std::io::Result<Option<RawFd>>;

  /// Release a typed-memory allocation previously returned by this provider.
  fn unlink(&self, path: &Path) -> std::io::Result<()>;
}

/// The only implementation shipped by this crate: typed memory is
/// never available, so every resource falls back to ordinary shm.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTypedMemory;

impl TypedMemoryProvider for NoTypedMemory {
  fn allocate_named_typed_memory(
    &self,
    _size: usize,
    _path: &Path,
    _perms: &Permissions,
  ) -> std::io::Result<Option<RawFd>> {
    Ok(None)
  }

  fn allocate_and_open_anonymous_typed_memory(&self, _size: usize) -> std::io::Result<Option<RawFd>> {
    Ok(None)
  }

  fn unlink(&self, _path: &Path) -> std::io::Result<()> {
    Ok(())
  }
}
