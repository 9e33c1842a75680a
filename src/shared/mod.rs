//! Named and anonymous shared-memory resources with a cooperative,
//! lock-file mediated create/open protocol and a monotonic bump
//! allocator guarded by an interprocess mutex.
//!
//! This module is POSIX-specific (it talks to `shm_open`, `flock`,
//! `mmap`, and `pthread_mutex_t` directly through `libc`) and is only
//! compiled in when the `shared-memory` feature is enabled, which also
//! pulls in `std`.

mod acl;
mod config;
mod control_block;
mod error;
mod flock_mutex;
mod lock_file;
mod permission;
mod registry;
mod resource;
mod typed_memory;

pub use acl::{AccessControlList, UnixAcl};
pub use config::LockFileWaitPolicy;
pub use control_block::ControlBlock;
pub use error::Error;
pub use flock_mutex::{ExclusiveFlockMutex, FlockMutexAndLock, SharedFlockMutex};
pub use lock_file::LockFile;
pub use permission::{Permission, Permissions};
pub use registry::{MemoryResourceRegistry, ResourceId};
pub use resource::SharedMemoryResource;
pub use typed_memory::{NoTypedMemory, TypedMemoryProvider};
