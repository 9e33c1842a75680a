//! The fixed-size header placed at the start of every mapped region: an
//! interprocess mutex plus the monotonic bump-allocation counter it
//! guards.
//!
//! A `std::sync::Mutex` cannot live in this header: its internal
//! representation assumes a single process's address space (futex
//! words keyed by this process's view of the lock, thread ids, etc).
//! `pthread_mutex_t` initialized with the `PTHREAD_PROCESS_SHARED`
//! attribute is the POSIX primitive actually designed to be shared
//! across `mmap`'d address spaces in different processes, so this
//! module talks to it directly through `libc`, operating on raw
//! pointers into the mapping rather than an owned Rust value.

use std::sync::atomic::{AtomicUsize, Ordering};

/// The header every `SharedMemoryResource` mapping begins with.
#[repr(C)]
pub struct ControlBlock {
  mutex: libc::pthread_mutex_t,
  already_allocated_bytes: AtomicUsize,
}

impl ControlBlock {
  /// Size in bytes of the header, reserved from every mapping before
  /// user allocations begin.
  pub const SIZE: usize = std::mem::size_of::<ControlBlock>();

  /// Initialize a freshly-mapped, otherwise-uninitialized control block.
  /// Must be called exactly once, by the resource's creator, before any
  /// opener locks the mutex.
  ///
  /// # Safety
  /// `ptr` must point to at least `ControlBlock::SIZE` writable bytes
  /// that no other thread or process is concurrently accessing.
  pub unsafe fn init(ptr: *mut ControlBlock) {
    let mut attr: libc::pthread_mutexattr_t = std::mem::zeroed();
    if libc::pthread_mutexattr_init(&mut attr) != 0 {
      log::error!("ControlBlock::init: pthread_mutexattr_init failed");
      std::process::abort();
    }
    if libc::pthread_mutexattr_setpshared(&mut attr, libc::PTHREAD_PROCESS_SHARED) != 0 {
      log::error!("ControlBlock::init: pthread_mutexattr_setpshared failed");
      std::process::abort();
    }
    let mutex_ptr = std::ptr::addr_of_mut!((*ptr).mutex);
    if libc::pthread_mutex_init(mutex_ptr, &attr) != 0 {
      log::error!("ControlBlock::init: pthread_mutex_init failed");
      std::process::abort();
    }
    libc::pthread_mutexattr_destroy(&mut attr);
    std::ptr::write(
      std::ptr::addr_of_mut!((*ptr).already_allocated_bytes),
      AtomicUsize::new(0),
    );
  }

  /// Acquire the interprocess mutex, blocking. Aborts the process on
  /// any `pthread_mutex_lock` failure: an invalid or corrupted mutex
  /// means the mapping itself cannot be trusted.
  ///
  /// # Safety
  /// `ptr` must point to an initialized `ControlBlock` within a mapping
  /// still valid for the duration of the call.
  pub unsafe fn lock(ptr: *mut ControlBlock) {
    let mutex_ptr = std::ptr::addr_of_mut!((*ptr).mutex);
    if libc::pthread_mutex_lock(mutex_ptr) != 0 {
      log::error!("ControlBlock::lock: pthread_mutex_lock failed");
      std::process::abort();
    }
  }

  /// Release the interprocess mutex.
  ///
  /// # Safety
  /// Same as [`ControlBlock::lock`]; must be called by the holder of the lock.
  pub unsafe fn unlock(ptr: *mut ControlBlock) {
    let mutex_ptr = std::ptr::addr_of_mut!((*ptr).mutex);
    if libc::pthread_mutex_unlock(mutex_ptr) != 0 {
      log::error!("ControlBlock::unlock: pthread_mutex_unlock failed");
      std::process::abort();
    }
  }

  /// Borrow the allocation counter. Reads and writes to it are only
  /// meaningful while the mutex from [`ControlBlock::lock`] is held.
  ///
  /// # Safety
  /// Same aliasing requirements as [`ControlBlock::lock`].
  pub unsafe fn already_allocated_bytes<'a>(ptr: *mut ControlBlock) -> &'a AtomicUsize {
    &*std::ptr::addr_of!((*ptr).already_allocated_bytes)
  }
}

/// Atomically read the current allocation count with `Acquire` ordering.
pub fn load_allocated(counter: &AtomicUsize) -> usize {
  counter.load(Ordering::Acquire)
}

/// Atomically store a new allocation count with `Release` ordering.
pub fn store_allocated(counter: &AtomicUsize, value: usize) {
  counter.store(value, Ordering::Release);
}
