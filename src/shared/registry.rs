//! Process-wide registry of currently-mapped resources, used to answer
//! "which resource, if any, owns the memory at this address" and to
//! detect a resource already mapped under the same identifier.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, OnceLock, Weak};

use super::resource::SharedMemoryResource;

/// The identifier a resource is registered under: a filesystem path for
/// named resources, or a caller-chosen 64-bit id for anonymous ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceId {
  /// A named resource, keyed by its shm path.
  Named(String),
  /// An anonymous resource, keyed by its caller-chosen id.
  Anonymous(u64),
}

struct Entry {
  resource: Weak<SharedMemoryResource>,
  base: usize,
  end: usize,
}

/// The process-wide singleton mapping resource ids to live resources
/// and memory ranges.
pub struct MemoryResourceRegistry {
  entries: Mutex<HashMap<ResourceId, Entry>>,
}

static REGISTRY: OnceLock<MemoryResourceRegistry> = OnceLock::new();

impl MemoryResourceRegistry {
  /// The single process-wide registry.
  pub fn global() -> &'static MemoryResourceRegistry {
    REGISTRY.get_or_init(|| MemoryResourceRegistry {
      entries: Mutex::new(HashMap::new()),
    })
  }

  /// Record a newly-mapped resource. Returns `false` (and records
  /// nothing) if `id` is already registered; the caller must treat
  /// this as a fatal collision, per spec.md §4.8.
  pub fn insert(&self, id: ResourceId, resource: Weak<SharedMemoryResource>, base: usize, end: usize) -> bool {
    let mut entries = self.entries.lock().expect("registry mutex poisoned");
    if entries.contains_key(&id) {
      return false;
    }
    entries.insert(id, Entry { resource, base, end });
    true
  }

  /// Remove a resource's registration, typically from its `Drop`.
  pub fn remove(&self, id: &ResourceId) {
    self.entries.lock().expect("registry mutex poisoned").remove(id);
  }

  /// The `(base, end)` range of the mapping that contains `address`, if any.
  pub fn bounds_from_address(&self, address: usize) -> Option<(usize, usize)> {
    self
      .entries
      .lock()
      .expect("registry mutex poisoned")
      .values()
      .find(|entry| address >= entry.base && address < entry.end)
      .map(|entry| (entry.base, entry.end))
  }

  /// The resource mapping `address`, if it is still alive.
  pub fn resource_from_address(&self, address: usize) -> Option<std::sync::Arc<SharedMemoryResource>> {
    self
      .entries
      .lock()
      .expect("registry mutex poisoned")
      .values()
      .find(|entry| address >= entry.base && address < entry.end)
      .and_then(|entry| entry.resource.upgrade())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn duplicate_id_insertion_is_rejected() {
    let registry = MemoryResourceRegistry::global();
    let id = ResourceId::Anonymous(0xDEAD_BEEF_u64.wrapping_add(std::process::id() as u64));
    assert!(registry.insert(id.clone(), Weak::new(), 0x1000, 0x2000));
    assert!(!registry.insert(id.clone(), Weak::new(), 0x3000, 0x4000));
    registry.remove(&id);
  }

  #[test]
  fn bounds_lookup_finds_the_containing_range() {
    let registry = MemoryResourceRegistry::global();
    let id = ResourceId::Anonymous(0xFACE_u64.wrapping_add(std::process::id() as u64));
    assert!(registry.insert(id.clone(), Weak::new(), 0x5000, 0x6000));
    assert_eq!(registry.bounds_from_address(0x5500), Some((0x5000, 0x6000)));
    assert_eq!(registry.bounds_from_address(0x6500), None);
    registry.remove(&id);
  }
}
