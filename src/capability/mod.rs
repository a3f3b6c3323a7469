//! Capability Table module.
//!
//! Maps an abstract capability to the backend currently serving it plus an
//! ordered fallback chain. Every write goes through a single commit path that
//! checks the chain shape and records backend references in the registry, so
//! a backend can never be deregistered while a capability still routes to it.

mod error;

pub use error::*;

use crate::registry::Registry;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Snapshot of a capability's routing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Backend tried first, if any
    pub active_backend: Option<String>,
    /// Backends tried in order after the active one
    pub fallback_chain: Vec<String>,
}

impl CapabilityEntry {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            active_backend: None,
            fallback_chain: Vec::new(),
        }
    }

    /// Dispatch order: the active backend followed by the fallback chain.
    pub fn candidates(&self) -> Vec<String> {
        self.active_backend
            .iter()
            .chain(self.fallback_chain.iter())
            .cloned()
            .collect()
    }

    fn assigned(&self) -> BTreeSet<String> {
        self.candidates().into_iter().collect()
    }
}

#[derive(Debug)]
struct Slot {
    entry: CapabilityEntry,
    retired: bool,
}

type SlotRef = Arc<Mutex<Slot>>;

/// Capability routing table backed by the model registry.
///
/// Lock order is always capability slot first, then registry slot.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use switchyard::capability::CapabilityTable;
/// use switchyard::registry::{BackendDescriptor, Registry};
///
/// let registry = Arc::new(Registry::new());
/// registry
///     .register(BackendDescriptor::new("a", "openai").with_capabilities(["summarization"]).with_priority(5))
///     .unwrap();
/// registry
///     .register(BackendDescriptor::new("b", "local").with_capabilities(["summarization"]))
///     .unwrap();
///
/// let table = CapabilityTable::new(Arc::clone(&registry));
/// table.define("summarization", "Summarization", "Condense long text").unwrap();
/// let entry = table.auto_rank("summarization").unwrap();
///
/// assert_eq!(entry.active_backend.as_deref(), Some("a"));
/// assert_eq!(entry.fallback_chain, vec!["b".to_string()]);
/// ```
pub struct CapabilityTable {
    registry: Arc<Registry>,
    entries: DashMap<String, SlotRef>,
}

impl CapabilityTable {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            entries: DashMap::new(),
        }
    }

    fn slot(&self, id: &str) -> Result<SlotRef, CapabilityError> {
        self.entries
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| CapabilityError::CapabilityNotFound(id.to_string()))
    }

    /// Run `f` against a live (non-retired) slot while holding its lock.
    fn with_slot<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Slot) -> Result<T, CapabilityError>,
    ) -> Result<T, CapabilityError> {
        let slot = self.slot(id)?;
        let mut guard = slot.lock();
        if guard.retired {
            return Err(CapabilityError::CapabilityNotFound(id.to_string()));
        }
        f(&mut guard)
    }

    /// Define a new capability with no assigned backends.
    pub fn define(
        &self,
        id: &str,
        name: &str,
        description: &str,
    ) -> Result<CapabilityEntry, CapabilityError> {
        match self.entries.entry(id.to_string()) {
            Entry::Occupied(_) => Err(CapabilityError::DuplicateCapability(id.to_string())),
            Entry::Vacant(vacant) => {
                let entry = CapabilityEntry::new(id, name, description);
                vacant.insert(Arc::new(Mutex::new(Slot {
                    entry: entry.clone(),
                    retired: false,
                })));
                tracing::debug!(capability = %id, "Capability defined");
                Ok(entry)
            }
        }
    }

    /// Remove a capability. Fails while any backend is still assigned to it.
    pub fn undefine(&self, id: &str) -> Result<CapabilityEntry, CapabilityError> {
        let slot = self.slot(id)?;
        let entry = {
            let mut guard = slot.lock();
            if guard.retired {
                return Err(CapabilityError::CapabilityNotFound(id.to_string()));
            }
            let assigned = guard.entry.candidates();
            if !assigned.is_empty() {
                return Err(CapabilityError::CapabilityInUse {
                    capability: id.to_string(),
                    backends: assigned,
                });
            }
            guard.retired = true;
            guard.entry.clone()
        };
        self.entries
            .remove_if(id, |_, current| Arc::ptr_eq(current, &slot));
        Ok(entry)
    }

    /// Route `capability` to `backend` first.
    ///
    /// A backend already in the fallback chain is promoted out of it; the
    /// previous active backend becomes the new head of the chain.
    pub fn set_active(
        &self,
        capability: &str,
        backend: &str,
    ) -> Result<CapabilityEntry, CapabilityError> {
        self.with_slot(capability, |slot| {
            let mut chain: Vec<String> = slot
                .entry
                .fallback_chain
                .iter()
                .filter(|id| id.as_str() != backend)
                .cloned()
                .collect();
            if let Some(previous) = &slot.entry.active_backend {
                if previous != backend {
                    chain.insert(0, previous.clone());
                }
            }
            self.commit(slot, Some(backend.to_string()), chain)
        })
    }

    /// Remove the active backend, leaving the fallback chain untouched.
    pub fn clear_active(&self, capability: &str) -> Result<CapabilityEntry, CapabilityError> {
        self.with_slot(capability, |slot| {
            let chain = slot.entry.fallback_chain.clone();
            self.commit(slot, None, chain)
        })
    }

    /// Replace the fallback chain.
    pub fn set_fallback_chain(
        &self,
        capability: &str,
        chain: Vec<String>,
    ) -> Result<CapabilityEntry, CapabilityError> {
        self.with_slot(capability, |slot| {
            let active = slot.entry.active_backend.clone();
            self.commit(slot, active, chain)
        })
    }

    /// Assign the best ranked backend as active and the rest as fallbacks.
    ///
    /// Ranking and write happen under the capability's lock, so concurrent
    /// writers to the same capability observe either the old or the new entry.
    pub fn auto_rank(&self, capability: &str) -> Result<CapabilityEntry, CapabilityError> {
        self.with_slot(capability, |slot| {
            let mut ranked = self
                .registry
                .list_by_capability(capability)
                .into_iter()
                .map(|backend| backend.id);
            let active = ranked.next();
            let chain: Vec<String> = ranked.collect();
            let entry = self.commit(slot, active, chain)?;
            tracing::debug!(
                capability = %capability,
                active = ?entry.active_backend,
                fallbacks = entry.fallback_chain.len(),
                "Capability auto-ranked"
            );
            Ok(entry)
        })
    }

    /// Immutable copy of one entry.
    pub fn get(&self, capability: &str) -> Option<CapabilityEntry> {
        self.snapshot(capability).ok()
    }

    /// Like [`get`](Self::get) but with a typed error for missing entries.
    pub fn snapshot(&self, capability: &str) -> Result<CapabilityEntry, CapabilityError> {
        self.with_slot(capability, |slot| Ok(slot.entry.clone()))
    }

    /// All entries sorted by id.
    pub fn list(&self) -> Vec<CapabilityEntry> {
        let slots: Vec<SlotRef> = self
            .entries
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        let mut entries: Vec<CapabilityEntry> = slots
            .iter()
            .filter_map(|slot| {
                let guard = slot.lock();
                (!guard.retired).then(|| guard.entry.clone())
            })
            .collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate and write a new assignment. Nothing changes on error.
    fn commit(
        &self,
        slot: &mut Slot,
        active: Option<String>,
        chain: Vec<String>,
    ) -> Result<CapabilityEntry, CapabilityError> {
        let capability = slot.entry.id.clone();

        let mut seen = BTreeSet::new();
        for backend in &chain {
            if !seen.insert(backend.as_str()) {
                return Err(CapabilityError::DuplicateInChain {
                    capability,
                    backend: backend.clone(),
                });
            }
        }
        if let Some(active) = &active {
            if seen.contains(active.as_str()) {
                return Err(CapabilityError::ActiveBackendInFallbackChain {
                    capability,
                    backend: active.clone(),
                });
            }
        }

        let previous = slot.entry.assigned();
        let next: BTreeSet<String> = active.iter().chain(chain.iter()).cloned().collect();

        // Pin in dispatch order so the first offending id is the one reported
        let mut pinned: Vec<&str> = Vec::new();
        for backend in active.iter().chain(chain.iter()) {
            if previous.contains(backend) {
                continue;
            }
            if let Err(err) = self.registry.pin(backend, &capability) {
                for done in pinned {
                    self.registry.unpin(done, &capability);
                }
                return Err(CapabilityError::from_pin(&capability, err));
            }
            pinned.push(backend);
        }
        for backend in previous.difference(&next) {
            self.registry.unpin(backend, &capability);
        }

        slot.entry.active_backend = active;
        slot.entry.fallback_chain = chain;
        Ok(slot.entry.clone())
    }
}
