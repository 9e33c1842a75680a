//! The mapped region itself: creation, opening, monotonic allocation,
//! and teardown.

use std::ffi::CString;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::acl::{AccessControlList, UnixAcl};
use super::config::LockFileWaitPolicy;
use super::control_block::ControlBlock;
use super::error::Error;
use super::lock_file::LockFile;
use super::permission::{Permission, Permissions};
use super::registry::{MemoryResourceRegistry, ResourceId};
use super::typed_memory::{NoTypedMemory, TypedMemoryProvider};

/// uid the typed-memory daemon would run as, were typed memory actually
/// available on this platform. Never matched in practice since this
/// crate ships no functioning typed-memory provider; retained so the
/// detection probe in `open` has the same shape the original does, for
/// a platform crate that substitutes a real `TypedMemoryProvider` and a
/// real daemon uid to slot into.
const TYPED_MEMORY_DAEMON_UID: u32 = u32::MAX;

fn path_to_cstring(path: &Path) -> CString {
  CString::new(path.as_os_str().as_encoded_bytes()).expect("shm path must not contain NUL")
}

fn lock_file_path(name: &str) -> PathBuf {
  let trimmed = name.trim_start_matches('/');
  std::env::temp_dir().join(format!("{trimmed}_lock"))
}

/// Poll for the creator's lock file to disappear, per spec.md §4.8 /
/// §9: a lock file still present once the wait budget elapses means a
/// crashed creator left the protocol in an unrecoverable state for this
/// opener, so this is not a `Result`: the process aborts, matching the
/// original's "opening fails fatally" policy. The budget itself is
/// configurable (`LockFileWaitPolicy`) per the resolved Open Question in
/// SPEC_FULL.md §15; only its presence, not its fatality, changed.
fn wait_for_lock_file_absence(name: &str, policy: &LockFileWaitPolicy) {
  let path = lock_file_path(name);
  let deadline = Instant::now() + policy.timeout;
  loop {
    if !path.exists() {
      return;
    }
    if Instant::now() >= deadline {
      log::error!(
        "SharedMemoryResource: lock file for {name} still present after {:?}; assuming a crashed creator",
        policy.timeout
      );
      std::process::abort();
    }
    std::thread::sleep(policy.poll_interval);
  }
}

/// A region of memory shared between processes via a named or
/// anonymous backing object, with a monotonic bump allocator guarded by
/// an interprocess mutex embedded at the start of the mapping.
pub struct SharedMemoryResource {
  fd: RawFd,
  base: *mut u8,
  total_size: usize,
  path: Option<PathBuf>,
  identifier: ResourceId,
  read_only: bool,
  is_typed_memory: bool,
  unlinked: AtomicBool,
}

// SAFETY: `base` points at memory mapped `MAP_SHARED`; concurrent
// access to the control block is serialized by its embedded
// interprocess mutex, and user-region access is the caller's
// responsibility exactly as it is within a single process's threads.
unsafe impl Send for SharedMemoryResource {}
unsafe impl Sync for SharedMemoryResource {}

impl SharedMemoryResource {
  fn control_block_ptr(&self) -> *mut ControlBlock {
    self.base.cast()
  }

  /// Base address of the whole mapping, control block included.
  pub fn get_base_address(&self) -> *const u8 {
    self.base
  }

  /// Base address of the user-usable region, past the control block.
  pub fn get_usable_base_address(&self) -> *const u8 {
    unsafe { self.base.add(ControlBlock::SIZE) }
  }

  /// Size in bytes of the user-usable region.
  pub fn usable_size(&self) -> usize {
    self.total_size - ControlBlock::SIZE
  }

  /// The filesystem path this resource was mapped from, if named.
  pub fn get_path(&self) -> Option<&Path> {
    self.path.as_deref()
  }

  /// The identifier this resource is registered under.
  pub fn get_identifier(&self) -> &ResourceId {
    &self.identifier
  }

  /// The underlying file descriptor.
  pub fn get_file_descriptor(&self) -> RawFd {
    self.fd
  }

  /// Whether this resource's backing memory came from a typed-memory
  /// provider rather than ordinary `shm_open`-backed memory.
  pub fn is_shm_in_typed_memory(&self) -> bool {
    self.is_typed_memory
  }

  /// Number of bytes already handed out by `do_allocate`.
  pub fn allocated_bytes(&self) -> usize {
    unsafe {
      ControlBlock::lock(self.control_block_ptr());
      let value = ControlBlock::already_allocated_bytes(self.control_block_ptr()).load(Ordering::Acquire);
      ControlBlock::unlock(self.control_block_ptr());
      value
    }
  }

  /// Bump-allocate `bytes` aligned to `alignment` from the user region.
  /// Monotonic: there is no corresponding free. Returns a pointer valid
  /// for the lifetime of this resource. Allocating past the end of the
  /// reserved region is a precondition failure, not a recoverable
  /// condition (spec.md §4.8 step 3 and §7's "allocate-beyond-region"
  /// case), so it aborts the process exactly like this file's other
  /// critical-step failures (`mmap`, `ftruncate`, registry insertion).
  pub fn do_allocate(&self, bytes: usize, alignment: usize) -> *mut u8 {
    let cb = self.control_block_ptr();
    unsafe {
      ControlBlock::lock(cb);
      let counter = ControlBlock::already_allocated_bytes(cb);
      let already = counter.load(Ordering::Acquire);
      let usable_base = self.base.add(ControlBlock::SIZE) as usize;
      let cur = usable_base + already;
      let end = usable_base + self.usable_size();
      let aligned = (cur + alignment - 1) & !(alignment - 1);
      if aligned < cur || aligned > end || bytes > end - aligned {
        ControlBlock::unlock(cb);
        log::error!(
          "SharedMemoryResource::do_allocate: {bytes} bytes aligned to {alignment} does not fit in the remaining {} bytes",
          end.saturating_sub(cur)
        );
        std::process::abort();
      }
      let new_already = (aligned - usable_base) + bytes;
      counter.store(new_already, Ordering::Release);
      ControlBlock::unlock(cb);
      aligned as *mut u8
    }
  }

  /// `do_deallocate` is a no-op: this allocator is monotonic.
  pub fn do_deallocate(&self, _ptr: *mut u8, _bytes: usize, _alignment: usize) {}

  /// Remove this resource's filesystem (or typed-memory) entry without
  /// unmapping it from this process. Idempotent to call once; a second
  /// call returns [`Error::AlreadyUnlinked`] rather than silently
  /// succeeding, so misuse is visible instead of swallowed.
  pub fn unlink_filesystem_entry(&self) -> Result<(), Error> {
    if self.unlinked.swap(true, Ordering::AcqRel) {
      return Err(Error::AlreadyUnlinked);
    }
    if let Some(path) = &self.path {
      let c_path = path_to_cstring(path);
      if unsafe { libc::shm_unlink(c_path.as_ptr()) } != 0 {
        let err = std::io::Error::last_os_error();
        if err.kind() != std::io::ErrorKind::NotFound {
          log::error!("SharedMemoryResource: shm_unlink({}) failed: {err}", path.display());
        }
      }
    }
    Ok(())
  }

  fn finish_mapping(
    fd: RawFd,
    total_size: usize,
    path: Option<PathBuf>,
    identifier: ResourceId,
    read_only: bool,
    is_typed_memory: bool,
    initialize: Option<impl FnOnce(*mut u8, usize)>,
  ) -> Arc<SharedMemoryResource> {
    let prot = if read_only {
      libc::PROT_READ
    } else {
      libc::PROT_READ | libc::PROT_WRITE
    };
    let base = unsafe { libc::mmap(std::ptr::null_mut(), total_size, prot, libc::MAP_SHARED, fd, 0) };
    if base == libc::MAP_FAILED {
      log::error!("SharedMemoryResource: mmap failed: {}", std::io::Error::last_os_error());
      std::process::abort();
    }
    let base = base.cast::<u8>();

    if let Some(initialize) = initialize {
      unsafe { ControlBlock::init(base.cast()) };
      let user_ptr = unsafe { base.add(ControlBlock::SIZE) };
      initialize(user_ptr, total_size - ControlBlock::SIZE);
    }

    let resource = Arc::new(SharedMemoryResource {
      fd,
      base,
      total_size,
      path,
      identifier: identifier.clone(),
      read_only,
      is_typed_memory,
      unlinked: AtomicBool::new(false),
    });

    let end = base as usize + total_size;
    if !MemoryResourceRegistry::global().insert(identifier, Arc::downgrade(&resource), base as usize, end) {
      log::error!("SharedMemoryResource: duplicate registry identifier");
      std::process::abort();
    }

    resource
  }

  /// Create a new named resource at `path`. Fails with
  /// [`Error::AlreadyExists`] if another process already holds the lock
  /// file or the shm object.
  pub fn create(
    path: impl AsRef<Path>,
    size: usize,
    perms: Permissions,
    initialize: impl FnOnce(*mut u8, usize),
  ) -> Result<Arc<SharedMemoryResource>, Error> {
    Self::create_with_typed_memory(path, size, perms, initialize, &NoTypedMemory)
  }

  /// [`Self::create`], but given an explicit typed-memory provider
  /// instead of the no-op default.
  pub fn create_with_typed_memory(
    path: impl AsRef<Path>,
    size: usize,
    perms: Permissions,
    initialize: impl FnOnce(*mut u8, usize),
    typed_memory: &dyn TypedMemoryProvider,
  ) -> Result<Arc<SharedMemoryResource>, Error> {
    let path = path.as_ref();
    let name = path.to_string_lossy().into_owned();
    let lock_path = lock_file_path(&name);
    let lock_file = LockFile::create(&lock_path).ok_or(Error::AlreadyExists)?;

    let total_size = ControlBlock::SIZE + size;

    let typed_fd = typed_memory
      .allocate_named_typed_memory(total_size, path, &perms)
      .unwrap_or(None);

    let (fd, is_typed_memory) = match typed_fd {
      Some(fd) => (fd, true),
      None => {
        let c_path = path_to_cstring(path);
        let fd = unsafe {
          libc::shm_open(
            c_path.as_ptr(),
            libc::O_CREAT | libc::O_EXCL | libc::O_RDWR,
            perms.file_mode(),
          )
        };
        if fd < 0 {
          let err = std::io::Error::last_os_error();
          if err.kind() == std::io::ErrorKind::AlreadyExists {
            return Err(Error::AlreadyExists);
          }
          log::error!("SharedMemoryResource: shm_open({name}) failed: {err}");
          std::process::abort();
        }
        (fd, false)
      }
    };

    if !is_typed_memory {
      if matches!(perms, Permissions::WorldWritable) {
        unsafe {
          libc::fchmod(fd, perms.file_mode());
        }
      }
      if let Permissions::UserPermissionsMap(grants) = &perms {
        let acl = UnixAcl::new(fd);
        for (uid, permission) in grants {
          if acl.allow_user(*uid, *permission).is_err() {
            log::error!("SharedMemoryResource: allow_user({uid}) failed");
          }
        }
      }
      if unsafe { libc::ftruncate(fd, total_size as libc::off_t) } != 0 {
        log::error!(
          "SharedMemoryResource: ftruncate failed: {}",
          std::io::Error::last_os_error()
        );
        std::process::abort();
      }
    }

    let resource = Self::finish_mapping(
      fd,
      total_size,
      Some(path.to_path_buf()),
      ResourceId::Named(name),
      false,
      is_typed_memory,
      Some(initialize),
    );

    drop(lock_file);
    Ok(resource)
  }

  /// Create a new anonymous resource identified by `id` within this
  /// process (and any process the fd is subsequently passed to).
  pub fn create_anonymous(
    id: u64,
    size: usize,
    initialize: impl FnOnce(*mut u8, usize),
  ) -> Result<Arc<SharedMemoryResource>, Error> {
    Self::create_anonymous_with_typed_memory(id, size, initialize, &NoTypedMemory)
  }

  /// [`Self::create_anonymous`], but given an explicit typed-memory
  /// provider instead of the no-op default. Tries the provider's
  /// anonymous allocation first, falling back to an ordinary sealed
  /// `memfd` when it reports unavailable, per spec.md §4.8.
  pub fn create_anonymous_with_typed_memory(
    id: u64,
    size: usize,
    initialize: impl FnOnce(*mut u8, usize),
    typed_memory: &dyn TypedMemoryProvider,
  ) -> Result<Arc<SharedMemoryResource>, Error> {
    assert_ne!(id, 0, "anonymous resource id must be non-zero");
    let total_size = ControlBlock::SIZE + size;

    let typed_fd = typed_memory
      .allocate_and_open_anonymous_typed_memory(total_size)
      .unwrap_or(None);

    let (fd, is_typed_memory) = match typed_fd {
      Some(fd) => (fd, true),
      None => {
        let name = CString::new(format!("ecu-safe-core-anon-{id}")).expect("generated name has no NUL");
        let fd = unsafe { libc::memfd_create(name.as_ptr(), libc::MFD_CLOEXEC) };
        if fd < 0 {
          log::error!(
            "SharedMemoryResource: memfd_create failed: {}",
            std::io::Error::last_os_error()
          );
          std::process::abort();
        }
        if unsafe { libc::ftruncate(fd, total_size as libc::off_t) } != 0 {
          log::error!(
            "SharedMemoryResource: ftruncate (anonymous) failed: {}",
            std::io::Error::last_os_error()
          );
          std::process::abort();
        }
        // Seal against further resizing now that the size is fixed;
        // best-effort per spec.md §4.8, since it's unsupported on some
        // kernels/filesystems, in which case the preceding `ftruncate`
        // is already the effective size fix (the spec'd fallback).
        unsafe {
          libc::fcntl(fd, libc::F_ADD_SEALS, libc::F_SEAL_GROW | libc::F_SEAL_SHRINK);
        }
        (fd, false)
      }
    };

    Ok(Self::finish_mapping(
      fd,
      total_size,
      None,
      ResourceId::Anonymous(id),
      false,
      is_typed_memory,
      Some(initialize),
    ))
  }

  /// Open `path` first, creating it if absent.
  pub fn create_or_open(
    path: impl AsRef<Path>,
    size: usize,
    perms: Permissions,
    initialize: impl FnOnce(*mut u8, usize),
    policy: LockFileWaitPolicy,
  ) -> Result<Arc<SharedMemoryResource>, Error> {
    let path = path.as_ref();
    match Self::open(path, false, policy) {
      Ok(resource) => Ok(resource),
      Err(Error::NotFound) => match Self::create(path, size, perms, initialize) {
        Ok(resource) => Ok(resource),
        Err(Error::AlreadyExists) => Self::open(path, false, policy),
        other => other,
      },
      Err(Error::AlreadyExists) | Err(Error::WouldBlock) => Self::open(path, false, policy),
      other => other,
    }
  }

  /// Open an existing named resource, waiting out any in-progress
  /// creator's lock file first.
  pub fn open(
    path: impl AsRef<Path>,
    read_only: bool,
    policy: LockFileWaitPolicy,
  ) -> Result<Arc<SharedMemoryResource>, Error> {
    let path = path.as_ref();
    let name = path.to_string_lossy().into_owned();

    wait_for_lock_file_absence(&name, &policy);

    let c_path = path_to_cstring(path);
    let flags = if read_only { libc::O_RDONLY } else { libc::O_RDWR };
    let fd = unsafe { libc::shm_open(c_path.as_ptr(), flags, 0) };
    if fd < 0 {
      let err = std::io::Error::last_os_error();
      if err.kind() == std::io::ErrorKind::NotFound {
        return Err(Error::NotFound);
      }
      log::error!("SharedMemoryResource: shm_open({name}) failed: {err}");
      std::process::abort();
    }

    let mut stat: libc::stat = unsafe { std::mem::zeroed() };
    if unsafe { libc::fstat(fd, &mut stat) } != 0 {
      log::error!(
        "SharedMemoryResource: fstat failed: {}",
        std::io::Error::last_os_error()
      );
      std::process::abort();
    }
    let total_size = stat.st_size as usize;

    let is_typed_memory = stat.st_uid == TYPED_MEMORY_DAEMON_UID;
    if is_typed_memory {
      let acl = UnixAcl::new(fd);
      let executors = acl.find_user_ids_with_permission(Permission::Execute);
      if executors.len() != 1 {
        log::error!(
          "SharedMemoryResource: typed-memory resource {name} has {} execute-permission users, expected exactly 1",
          executors.len()
        );
        std::process::abort();
      }
    }

    Ok(Self::finish_mapping(
      fd,
      total_size,
      Some(path.to_path_buf()),
      ResourceId::Named(name),
      read_only,
      is_typed_memory,
      None::<fn(*mut u8, usize)>,
    ))
  }
}

impl PartialEq for SharedMemoryResource {
  fn eq(&self, other: &Self) -> bool {
    self.fd == other.fd
  }
}

impl Eq for SharedMemoryResource {}

impl Drop for SharedMemoryResource {
  fn drop(&mut self) {
    MemoryResourceRegistry::global().remove(&self.identifier);
    unsafe {
      libc::munmap(self.base.cast(), self.total_size);
      libc::close(self.fd);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn unique_name(tag: &str) -> String {
    format!("/ecu-safe-core-test-{tag}-{}", std::process::id())
  }

  #[test]
  fn create_maps_and_initializes_then_unmaps_on_drop() {
    let name = unique_name("create-basic");
    let resource = SharedMemoryResource::create(&name, 4096, Permissions::WorldReadable, |ptr, len| unsafe {
      std::ptr::write_bytes(ptr, 0xAB, len);
    })
    .expect("create succeeds");
    assert_eq!(resource.usable_size(), 4096);
    assert!(!resource.get_base_address().is_null());
    unsafe {
      assert_eq!(*resource.get_usable_base_address(), 0xAB);
    }
    resource.unlink_filesystem_entry().expect("first unlink succeeds");
    assert!(matches!(
      resource.unlink_filesystem_entry(),
      Err(Error::AlreadyUnlinked)
    ));
  }

  #[test]
  fn create_twice_on_the_same_path_is_rejected() {
    let name = unique_name("create-twice");
    let first = SharedMemoryResource::create(&name, 4096, Permissions::WorldReadable, |_, _| {}).unwrap();
    let second = SharedMemoryResource::create(&name, 4096, Permissions::WorldReadable, |_, _| {});
    assert!(matches!(second, Err(Error::AlreadyExists)));
    first.unlink_filesystem_entry().ok();
  }

  #[test]
  fn do_allocate_bumps_monotonically_and_respects_alignment() {
    let name = unique_name("allocate");
    let resource = SharedMemoryResource::create(&name, 4096, Permissions::WorldReadable, |_, _| {}).unwrap();
    let first = resource.do_allocate(10, 8);
    let second = resource.do_allocate(10, 8);
    assert_eq!((first as usize) % 8, 0);
    assert_eq!((second as usize) % 8, 0);
    assert!((second as usize) >= (first as usize) + 10);
    resource.unlink_filesystem_entry().ok();
  }

  #[test]
  fn anonymous_resource_round_trips() {
    let id = 0x1234_5678_u64.wrapping_add(std::process::id() as u64);
    let resource = SharedMemoryResource::create_anonymous(id, 1024, |ptr, len| unsafe {
      std::ptr::write_bytes(ptr, 0x42, len);
    })
    .expect("create_anonymous succeeds");
    unsafe {
      assert_eq!(*resource.get_usable_base_address(), 0x42);
    }
    assert!(resource.get_path().is_none());
  }

  #[test]
  fn anonymous_create_falls_back_when_typed_memory_is_unavailable() {
    use super::super::typed_memory::NoTypedMemory;

    let id = 0x2468_ACE0_u64.wrapping_add(std::process::id() as u64);
    let resource =
      SharedMemoryResource::create_anonymous_with_typed_memory(id, 256, |_, _| {}, &NoTypedMemory)
        .expect("falls back to ordinary memfd");
    assert!(!resource.is_shm_in_typed_memory());
  }

  #[test]
  fn open_of_missing_path_reports_not_found() {
    let name = unique_name("never-created");
    let result = SharedMemoryResource::open(&name, true, LockFileWaitPolicy::default());
    assert!(matches!(result, Err(Error::NotFound)));
  }

  #[test]
  fn create_or_open_falls_back_to_open_when_already_present() {
    let name = unique_name("create-or-open");
    let creator = SharedMemoryResource::create(&name, 4096, Permissions::WorldReadable, |_, _| {}).unwrap();
    let opener = SharedMemoryResource::create_or_open(
      &name,
      4096,
      Permissions::WorldReadable,
      |_, _| {},
      LockFileWaitPolicy::default(),
    )
    .expect("falls back to open");
    assert_eq!(opener.get_file_descriptor() == creator.get_file_descriptor(), false);
    creator.unlink_filesystem_entry().ok();
  }

  #[test]
  fn do_allocate_is_race_free_under_concurrent_threads() {
    use wg::WaitGroup;

    #[cfg(not(miri))]
    const N: u32 = 256;
    #[cfg(miri)]
    const N: u32 = 16;

    let name = unique_name("concurrent-allocate");
    let resource = Arc::new(
      SharedMemoryResource::create(&name, 64 * 1024, Permissions::WorldReadable, |_, _| {}).unwrap(),
    );
    let (tx, rx) = crossbeam_channel::bounded(N as usize);
    let wg = WaitGroup::new();

    for _ in 0..N {
      let resource = Arc::clone(&resource);
      let tx = tx.clone();
      let wg = wg.add(1);
      std::thread::spawn(move || {
        let ptr = resource.do_allocate(32, 8);
        tx.send(ptr as usize).unwrap();
        wg.done();
      });
    }
    drop(tx);
    wg.wait();

    let mut addresses: Vec<usize> = rx.iter().collect();
    assert_eq!(addresses.len(), N as usize);
    addresses.sort_unstable();
    for pair in addresses.windows(2) {
      assert!(
        pair[1] >= pair[0] + 32,
        "concurrent allocations must not overlap: {pair:?}"
      );
    }
    resource.unlink_filesystem_entry().ok();
  }
}
