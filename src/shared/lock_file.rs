//! RAII anchor for the advisory lock file that coordinates a shared
//! memory resource's create/open protocol across processes.
//!
//! The original hand-rolls move semantics that null out a moved-from
//! handle's descriptor so its destructor becomes a no-op. Rust's
//! ownership model makes that unnecessary: a moved-from `LockFile`
//! simply no longer exists, so `Drop` only ever runs once, on whichever
//! binding ends up owning the value.

use std::ffi::CString;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

const LOCK_FILE_MODE: libc::mode_t = 0o444;

/// A lock file anchoring one shared memory resource's create/open
/// protocol. Dropping it always closes the descriptor; if this handle
/// owns the file, dropping it also unlinks the path.
pub struct LockFile {
  fd: RawFd,
  path: PathBuf,
  owning: bool,
}

fn path_to_cstring(path: &Path) -> CString {
  CString::new(path.as_os_str().as_encoded_bytes()).expect("lock file path must not contain NUL")
}

impl LockFile {
  /// Create the lock file exclusively. Returns `None` (after logging)
  /// if it already exists or creation otherwise fails. Always owning.
  pub fn create(path: impl AsRef<Path>) -> Option<Self> {
    Self::open_with_flags(path.as_ref(), libc::O_CREAT | libc::O_EXCL | libc::O_RDONLY, true)
  }

  /// Create the lock file if missing, otherwise open the existing one.
  /// Ownership is controlled explicitly by `take_ownership`.
  pub fn create_or_open(path: impl AsRef<Path>, take_ownership: bool) -> Option<Self> {
    Self::open_with_flags(path.as_ref(), libc::O_CREAT | libc::O_RDONLY, take_ownership)
  }

  /// Open an existing lock file. Never owns it.
  pub fn open(path: impl AsRef<Path>) -> Option<Self> {
    Self::open_with_flags(path.as_ref(), libc::O_RDONLY, false)
  }

  fn open_with_flags(path: &Path, flags: libc::c_int, owning: bool) -> Option<Self> {
    let c_path = path_to_cstring(path);
    let fd = unsafe { libc::open(c_path.as_ptr(), flags, LOCK_FILE_MODE) };
    if fd < 0 {
      log::error!(
        "LockFile: open({}, flags={flags:#x}) failed: {}",
        path.display(),
        std::io::Error::last_os_error()
      );
      return None;
    }
    if flags & libc::O_CREAT != 0 {
      if unsafe { libc::chmod(c_path.as_ptr(), LOCK_FILE_MODE) } != 0 {
        log::error!(
          "LockFile: chmod({}) failed: {}",
          path.display(),
          std::io::Error::last_os_error()
        );
      }
    }
    Some(LockFile {
      fd,
      path: path.to_path_buf(),
      owning,
    })
  }

  /// Upgrade a non-owning handle so its `Drop` also unlinks the path.
  pub fn take_ownership(&mut self) {
    self.owning = true;
  }

  /// Whether this handle will unlink its path on drop.
  pub fn is_owning(&self) -> bool {
    self.owning
  }

  /// The path this lock file anchors.
  pub fn path(&self) -> &Path {
    &self.path
  }

  /// The raw file descriptor, for use by `flock`.
  pub fn fd(&self) -> RawFd {
    self.fd
  }
}

impl Drop for LockFile {
  fn drop(&mut self) {
    unsafe {
      libc::close(self.fd);
    }
    if self.owning {
      let c_path = path_to_cstring(&self.path);
      if unsafe { libc::unlink(c_path.as_ptr()) } != 0 {
        log::error!(
          "LockFile: unlink({}) failed: {}",
          self.path.display(),
          std::io::Error::last_os_error()
        );
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn create_then_create_again_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("create-twice");
    let _first = LockFile::create(&path).expect("first create succeeds");
    assert!(LockFile::create(&path).is_none());
  }

  #[test]
  fn drop_of_owning_handle_unlinks_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("owning-unlink");
    {
      let _lock = LockFile::create(&path).expect("create succeeds");
      assert!(path.exists());
    }
    assert!(!path.exists());
  }

  #[test]
  fn non_owning_open_does_not_unlink() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("non-owning");
    let creator = LockFile::create(&path).expect("create succeeds");
    {
      let _opener = LockFile::open(&path).expect("open succeeds");
    }
    assert!(path.exists());
    drop(creator);
    assert!(!path.exists());
  }

  #[test]
  fn take_ownership_upgrades_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("take-ownership");
    let creator = LockFile::create(&path).expect("create succeeds");
    creator.path();
    drop(creator);
    let mut opener = LockFile::open(&path).expect("open succeeds");
    opener.take_ownership();
    drop(opener);
    assert!(!path.exists());
  }
}
