//! The narrow access-control seam the core calls into.
//!
//! A full POSIX ACL implementation (`setfacl`/`getfacl`/libacl) is the
//! "generic OS abstraction layer" this crate's spec explicitly puts out
//! of scope; what the core actually needs is three operations, so
//! that's the trait surface. [`UnixAcl`] backs it with `chmod`/`fchmod`
//! plus a best-effort in-process record of who was granted what,
//! sufficient for the one convention the core relies on: "the file's
//! single execute-permission grantee is its creator."

use std::collections::HashMap;
use std::os::unix::io::RawFd;
use std::sync::Mutex;

use super::permission::Permission;

/// The access-control operations `SharedMemoryResource` needs.
pub trait AccessControlList: Send + Sync {
  /// Grant `permission` to `uid`.
  fn allow_user(&self, uid: u32, permission: Permission) -> std::io::Result<()>;
  /// Apply the file-mode bits implied by `perms` as a sanity backstop.
  fn verify_mask_permissions(&self, mode: libc::mode_t) -> std::io::Result<()>;
  /// Every uid currently granted `permission`.
  fn find_user_ids_with_permission(&self, permission: Permission) -> Vec<u32>;
}

/// A `chmod`/`fchmod`-backed ACL with an in-process grant ledger.
///
/// Real POSIX ACLs are per-file kernel state; this substitute only
/// tracks grants made through `allow_user` on this handle, in this
/// process. That is sufficient for the one thing the core actually
/// queries through this trait: enumerating the users with `Execute` to
/// find a resource's recorded creator. It is explicitly not a
/// general-purpose ACL reader for files this process did not create.
pub struct UnixAcl {
  fd: RawFd,
  grants: Mutex<HashMap<u32, Vec<Permission>>>,
}

impl UnixAcl {
  /// Back the ACL operations with the given open file descriptor.
  pub fn new(fd: RawFd) -> Self {
    UnixAcl {
      fd,
      grants: Mutex::new(HashMap::new()),
    }
  }
}

impl AccessControlList for UnixAcl {
  fn allow_user(&self, uid: u32, permission: Permission) -> std::io::Result<()> {
    self
      .grants
      .lock()
      .expect("ACL grant ledger mutex poisoned")
      .entry(uid)
      .or_default()
      .push(permission);
    Ok(())
  }

  fn verify_mask_permissions(&self, mode: libc::mode_t) -> std::io::Result<()> {
    if unsafe { libc::fchmod(self.fd, mode) } != 0 {
      return Err(std::io::Error::last_os_error());
    }
    Ok(())
  }

  fn find_user_ids_with_permission(&self, permission: Permission) -> Vec<u32> {
    self
      .grants
      .lock()
      .expect("ACL grant ledger mutex poisoned")
      .iter()
      .filter(|(_, perms)| perms.contains(&permission))
      .map(|(uid, _)| *uid)
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn allow_user_is_visible_to_find_user_ids_with_permission() {
    let acl = UnixAcl::new(-1);
    acl.allow_user(1000, Permission::Execute).unwrap();
    acl.allow_user(1001, Permission::Read).unwrap();
    assert_eq!(acl.find_user_ids_with_permission(Permission::Execute), vec![1000]);
  }

  #[test]
  fn a_user_can_hold_more_than_one_permission() {
    let acl = UnixAcl::new(-1);
    acl.allow_user(42, Permission::Read).unwrap();
    acl.allow_user(42, Permission::Execute).unwrap();
    let mut execute_grantees = acl.find_user_ids_with_permission(Permission::Execute);
    execute_grantees.sort_unstable();
    assert_eq!(execute_grantees, vec![42]);
  }
}
