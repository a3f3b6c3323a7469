//! Model Registry module.
//!
//! Catalog of backend descriptors and the capabilities they declare. Each
//! backend is guarded by its own lock so mutations of unrelated backends
//! never serialize against each other.

mod backend;
mod error;

pub use backend::*;
pub use error::*;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Per-backend slot.
///
/// `referenced_by` holds the capability ids whose active backend or fallback
/// chain names this backend. `retired` marks a slot removed while another
/// thread still held its `Arc`.
#[derive(Debug)]
struct RegistryEntry {
    descriptor: BackendDescriptor,
    referenced_by: BTreeSet<String>,
    retired: bool,
}

type Slot = Arc<Mutex<RegistryEntry>>;

/// The Model Registry stores all known backends.
///
/// # Examples
///
/// ```
/// use switchyard::registry::{BackendDescriptor, Registry};
///
/// let registry = Registry::new();
/// registry
///     .register(BackendDescriptor::new("claude", "anthropic").with_capabilities(["summarization"]))
///     .unwrap();
///
/// assert_eq!(registry.backend_count(), 1);
/// assert_eq!(registry.list_by_capability("summarization").len(), 1);
/// ```
pub struct Registry {
    backends: DashMap<String, Slot>,
}

impl Registry {
    /// Create a new empty Registry.
    pub fn new() -> Self {
        Self {
            backends: DashMap::new(),
        }
    }

    fn slot(&self, id: &str) -> Result<Slot, RegistryError> {
        self.backends
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RegistryError::UnknownBackend(id.to_string()))
    }

    /// Snapshot of every slot. No map shard is held while entry locks are taken.
    fn slots(&self) -> Vec<Slot> {
        self.backends
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Register a new backend.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateBackend` if a backend with the same ID already exists.
    pub fn register(&self, descriptor: BackendDescriptor) -> Result<(), RegistryError> {
        descriptor.validate()?;

        match self.backends.entry(descriptor.id.clone()) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateBackend(descriptor.id)),
            Entry::Vacant(vacant) => {
                tracing::debug!(
                    backend_id = %descriptor.id,
                    provider = %descriptor.provider,
                    capabilities = descriptor.capabilities.len(),
                    "Backend registered"
                );
                vacant.insert(Arc::new(Mutex::new(RegistryEntry {
                    descriptor,
                    referenced_by: BTreeSet::new(),
                    retired: false,
                })));
                Ok(())
            }
        }
    }

    /// Replace a backend's descriptor with `patch` applied to it.
    ///
    /// # Errors
    ///
    /// - `UnknownBackend` if absent
    /// - `BackendInUse` if the patch drops a capability some capability entry
    ///   still routes to this backend
    pub fn update(&self, id: &str, patch: &BackendPatch) -> Result<BackendDescriptor, RegistryError> {
        let slot = self.slot(id)?;
        let mut entry = slot.lock();
        if entry.retired {
            return Err(RegistryError::UnknownBackend(id.to_string()));
        }

        let next = patch.apply(&entry.descriptor);
        next.validate()?;

        let dropped: Vec<String> = entry
            .referenced_by
            .iter()
            .filter(|capability| !next.supports(capability))
            .cloned()
            .collect();
        if !dropped.is_empty() {
            return Err(RegistryError::BackendInUse {
                backend: id.to_string(),
                capabilities: dropped,
            });
        }

        entry.descriptor = next.clone();
        Ok(next)
    }

    /// Remove a backend from the registry.
    ///
    /// # Errors
    ///
    /// - `UnknownBackend` if absent
    /// - `BackendInUse` if any capability entry references it
    pub fn deregister(&self, id: &str) -> Result<BackendDescriptor, RegistryError> {
        let slot = self.slot(id)?;
        let descriptor = {
            let mut entry = slot.lock();
            if entry.retired {
                return Err(RegistryError::UnknownBackend(id.to_string()));
            }
            if !entry.referenced_by.is_empty() {
                return Err(RegistryError::BackendInUse {
                    backend: id.to_string(),
                    capabilities: entry.referenced_by.iter().cloned().collect(),
                });
            }
            entry.retired = true;
            entry.descriptor.clone()
        };

        self.backends
            .remove_if(id, |_, current| Arc::ptr_eq(current, &slot));
        tracing::debug!(backend_id = %id, "Backend deregistered");
        Ok(descriptor)
    }

    /// Get a copy of a backend's descriptor.
    pub fn get(&self, id: &str) -> Option<BackendDescriptor> {
        let slot = self.slot(id).ok()?;
        let entry = slot.lock();
        (!entry.retired).then(|| entry.descriptor.clone())
    }

    /// Whether a backend with this ID is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// All backends in canonical ranking order.
    pub fn list(&self) -> Vec<BackendDescriptor> {
        let mut backends: Vec<BackendDescriptor> = self
            .slots()
            .iter()
            .filter_map(|slot| {
                let entry = slot.lock();
                (!entry.retired).then(|| entry.descriptor.clone())
            })
            .collect();
        backends.sort_by(rank_order);
        backends
    }

    /// Backends declaring `capability`, best first.
    ///
    /// Ordered by priority desc, reliability desc, latency asc, then id.
    pub fn list_by_capability(&self, capability: &str) -> Vec<BackendDescriptor> {
        let mut backends = self.list();
        backends.retain(|backend| backend.supports(capability));
        backends
    }

    /// Number of registered backends, matching `list().len()`.
    ///
    /// A slot mid-deregistration is retired before it leaves the map and is
    /// not counted.
    pub fn backend_count(&self) -> usize {
        self.slots()
            .iter()
            .filter(|slot| !slot.lock().retired)
            .count()
    }

    /// Number of distinct capabilities declared across all backends.
    pub fn capability_count(&self) -> usize {
        self.list()
            .into_iter()
            .flat_map(|backend| backend.capabilities)
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Update the operating status of a backend, returning the previous status.
    pub fn set_status(&self, id: &str, status: BackendStatus) -> Result<BackendStatus, RegistryError> {
        let slot = self.slot(id)?;
        let mut entry = slot.lock();
        if entry.retired {
            return Err(RegistryError::UnknownBackend(id.to_string()));
        }
        let previous = entry.descriptor.status;
        entry.descriptor.status = status;
        Ok(previous)
    }

    /// Record that `capability` routes to `backend`.
    ///
    /// Checked and recorded under the backend's lock, so a concurrent
    /// `deregister` either sees the reference or wins before it is taken.
    pub fn pin(&self, backend: &str, capability: &str) -> Result<(), RegistryError> {
        let slot = self.slot(backend)?;
        let mut entry = slot.lock();
        if entry.retired {
            return Err(RegistryError::UnknownBackend(backend.to_string()));
        }
        if !entry.descriptor.supports(capability) {
            return Err(RegistryError::CapabilityNotDeclared {
                backend: backend.to_string(),
                capability: capability.to_string(),
            });
        }
        entry.referenced_by.insert(capability.to_string());
        Ok(())
    }

    /// Drop the reference from `capability` to `backend`. Missing backends are ignored.
    pub fn unpin(&self, backend: &str, capability: &str) {
        if let Ok(slot) = self.slot(backend) {
            slot.lock().referenced_by.remove(capability);
        }
    }

    /// Capability ids currently routing to `backend`.
    pub fn references(&self, backend: &str) -> Vec<String> {
        self.slot(backend)
            .map(|slot| slot.lock().referenced_by.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
