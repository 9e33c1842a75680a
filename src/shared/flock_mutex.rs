//! Advisory `flock(2)`-based mutex over a [`LockFile`](super::lock_file::LockFile).
//!
//! A locking failure other than `EWOULDBLOCK` means the fd is invalid
//! or the op code is wrong, a programming error that would silently
//! corrupt the create/open protocol if swallowed, so every such failure
//! aborts the process, mirroring the original's `std::terminate()`
//! calls in `flock_mutex.cpp`.

use std::os::unix::io::RawFd;

fn flock_or_abort(fd: RawFd, op: libc::c_int, what: &str) {
  if unsafe { libc::flock(fd, op) } != 0 {
    log::error!(
      "FlockMutex: flock(fd={fd}, op={op:#x}) failed during {what}: {}",
      std::io::Error::last_os_error()
    );
    std::process::abort();
  }
}

fn try_flock(fd: RawFd, op: libc::c_int) -> bool {
  if unsafe { libc::flock(fd, op | libc::LOCK_NB) } == 0 {
    return true;
  }
  let err = std::io::Error::last_os_error();
  if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
    return false;
  }
  log::error!("FlockMutex: try_flock(fd={fd}, op={op:#x}) failed: {err}");
  std::process::abort();
}

/// A `flock`-backed mutex taken in exclusive mode (`LOCK_EX`).
pub struct ExclusiveFlockMutex {
  fd: RawFd,
}

impl ExclusiveFlockMutex {
  /// Wrap the given descriptor. Does not take ownership of it.
  pub fn new(fd: RawFd) -> Self {
    ExclusiveFlockMutex { fd }
  }

  /// Block until the exclusive lock is acquired. Aborts the process on
  /// any failure other than would-block, which cannot happen here since
  /// this call blocks.
  pub fn lock(&self) {
    flock_or_abort(self.fd, libc::LOCK_EX, "lock");
  }

  /// Attempt to acquire the exclusive lock without blocking.
  pub fn try_lock(&self) -> bool {
    try_flock(self.fd, libc::LOCK_EX)
  }

  /// Release the lock.
  pub fn unlock(&self) {
    flock_or_abort(self.fd, libc::LOCK_UN, "unlock");
  }
}

/// A `flock`-backed mutex taken in shared mode (`LOCK_SH`).
pub struct SharedFlockMutex {
  fd: RawFd,
}

impl SharedFlockMutex {
  /// Wrap the given descriptor. Does not take ownership of it.
  pub fn new(fd: RawFd) -> Self {
    SharedFlockMutex { fd }
  }

  /// Block until the shared lock is acquired.
  pub fn lock(&self) {
    flock_or_abort(self.fd, libc::LOCK_SH, "lock");
  }

  /// Attempt to acquire the shared lock without blocking.
  pub fn try_lock(&self) -> bool {
    try_flock(self.fd, libc::LOCK_SH)
  }

  /// Release the lock.
  pub fn unlock(&self) {
    flock_or_abort(self.fd, libc::LOCK_UN, "unlock");
  }
}

/// A mutex bundled with a deferred, explicitly-acquired guard over it,
/// so the pair travels together. Neither `Clone` nor `Copy`: the guard
/// state (locked or not) is meaningful and must not be duplicated.
pub struct FlockMutexAndLock<M> {
  mutex: M,
  locked: bool,
}

impl<M> FlockMutexAndLock<M> {
  /// Wrap a mutex without acquiring it yet.
  pub fn new(mutex: M) -> Self {
    FlockMutexAndLock { mutex, locked: false }
  }

  /// The wrapped mutex.
  pub fn mutex(&self) -> &M {
    &self.mutex
  }

  /// Whether `try_lock` has succeeded and not yet been undone by `unlock`.
  pub fn is_locked(&self) -> bool {
    self.locked
  }
}

macro_rules! impl_try_lock {
  ($mutex:ty) => {
    impl FlockMutexAndLock<$mutex> {
      /// Attempt to acquire the wrapped mutex, recording the outcome.
      pub fn try_lock(&mut self) -> bool {
        self.locked = self.mutex.try_lock();
        self.locked
      }

      /// Release the wrapped mutex if currently locked.
      pub fn unlock(&mut self) {
        if self.locked {
          self.mutex.unlock();
          self.locked = false;
        }
      }
    }
  };
}

impl_try_lock!(ExclusiveFlockMutex);
impl_try_lock!(SharedFlockMutex);

impl<M> Drop for FlockMutexAndLock<M> {
  fn drop(&mut self) {
    // Deliberately does not call `unlock()`: the wrapped fd is owned by
    // the resource's `LockFile`, whose own `Drop` closes it, which
    // releases every `flock` held on it. Double-unlocking here would
    // race a concurrent opener who has since reused the lock.
  }
}
