//! File-mode and ACL permission requests for a mapped resource.

/// The three ways a resource's access can be granted at creation time.
#[derive(Debug, Clone)]
pub enum Permissions {
  /// Shm file mode `0644`; anyone on the host can map it read-only.
  WorldReadable,
  /// Shm file mode `0666`, with a post-creation `fchmod` to compensate
  /// for a restrictive process umask.
  WorldWritable,
  /// Shm file mode `0600`; the given `(uid, permission)` pairs are
  /// applied to the resource's ACL instead.
  UserPermissionsMap(Vec<(u32, Permission)>),
}

impl Permissions {
  pub(crate) fn file_mode(&self) -> libc::mode_t {
    match self {
      Permissions::WorldReadable => 0o644,
      Permissions::WorldWritable => 0o666,
      Permissions::UserPermissionsMap(_) => 0o600,
    }
  }
}

/// A single ACL permission bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
  /// Read access.
  Read,
  /// Write access.
  Write,
  /// Execute access, used by the typed-memory detection probe as the
  /// convention that marks the recorded creator of a resource.
  Execute,
}
