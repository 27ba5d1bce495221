/// GroupRegistry: catalog of groups and the per-group commit point.
///
/// Each group lives in a slot holding its published snapshot
/// (`Arc<Group>`) and a write gate. Readers clone the snapshot and never
/// wait on writers for longer than a pointer copy. Writers to the same
/// group queue on its gate; writers to different groups never contend.
use indexmap::IndexMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::config::EngineConfig;
use crate::error::GroupError;
use crate::group::transitions;
use crate::group::types::*;
use crate::store::{GroupStore, MemoryStore, StoreError};
use crate::types::{now_ms, Caller};

struct GroupSlot {
    /// Serializes mutations of this group.
    gate: Mutex<()>,
    /// Last committed snapshot.
    current: RwLock<Arc<Group>>,
}

impl GroupSlot {
    fn new(group: Group) -> Self {
        Self {
            gate: Mutex::new(()),
            current: RwLock::new(Arc::new(group)),
        }
    }

    fn snapshot(&self) -> Arc<Group> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Owns every group and the store they are persisted to.
pub struct GroupRegistry {
    slots: RwLock<IndexMap<GroupId, Arc<GroupSlot>>>,
    store: Arc<dyn GroupStore>,
    config: EngineConfig,
}

impl GroupRegistry {
    /// Empty registry backed by an in-memory store.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            slots: RwLock::new(IndexMap::new()),
            store: Arc::new(MemoryStore::new()),
            config,
        }
    }

    /// Registry over an existing store, loading what it already holds.
    pub fn open(store: Arc<dyn GroupStore>, config: EngineConfig) -> Result<Self, GroupError> {
        let mut slots = IndexMap::new();
        for group in store.load_all()? {
            if let Err(violation) = group.check_invariants() {
                tracing::error!(group = %group.id, %violation, "stored group is inconsistent");
                return Err(StoreError::Corrupt {
                    id: group.id,
                    violation,
                }
                .into());
            }
            slots.insert(group.id.clone(), Arc::new(GroupSlot::new(group)));
        }
        tracing::info!(groups = slots.len(), "group registry opened");
        Ok(Self {
            slots: RwLock::new(slots),
            store,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Creation ─────────────────────────────────────────────────────

    /// Create a group owned by `requester` and register it.
    pub fn create_group(
        &self,
        requester: &Caller,
        spec: &GroupSpec,
    ) -> Result<Arc<Group>, GroupError> {
        let group = transitions::create(requester, spec, &self.config, now_ms())?;
        debug_assert_eq!(group.check_invariants(), Ok(()));

        self.store.insert(&group)?;
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let slot = Arc::new(GroupSlot::new(group));
        let snapshot = slot.snapshot();
        slots.insert(snapshot.id.clone(), slot);

        tracing::info!(group = %snapshot.id, owner = %requester.id, "group created");
        Ok(snapshot)
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Current snapshot of a group.
    pub fn get_group(&self, id: &GroupId) -> Result<Arc<Group>, GroupError> {
        self.slot(id).map(|slot| slot.snapshot())
    }

    /// Groups whose name, region or tags contain `filter`
    /// (case-insensitive), in insertion order.
    pub fn list_groups(&self, filter: &str) -> GroupListing {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        GroupListing {
            groups: slots.values().map(|slot| slot.snapshot()).collect(),
            filter: filter.to_string(),
            virtual_label: self.config.virtual_region_label.clone(),
            page_size: self.config.listing_page_size.max(1),
        }
    }

    fn slot(&self, id: &GroupId) -> Result<Arc<GroupSlot>, GroupError> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| GroupError::not_found(format!("group {id}")))
    }

    // ── Commit ───────────────────────────────────────────────────────

    /// Run `change` inside the group's critical section.
    ///
    /// `change` sees the latest committed snapshot. On `Ok`, the new
    /// group is persisted and then published; on any error (including a
    /// store failure) the published snapshot is left as it was.
    pub(crate) fn update<T>(
        &self,
        id: &GroupId,
        change: impl FnOnce(&Group) -> Result<(Group, T), GroupError>,
    ) -> Result<(Arc<Group>, T), GroupError> {
        let slot = self.slot(id)?;
        let _gate = slot.gate.lock().unwrap_or_else(PoisonError::into_inner);

        let current = slot.snapshot();
        let (next, extra) = change(&current)?;
        debug_assert_eq!(next.id, current.id);
        debug_assert_eq!(next.check_invariants(), Ok(()));

        self.store.save(&next)?;
        let next = Arc::new(next);
        *slot.current.write().unwrap_or_else(PoisonError::into_inner) = next.clone();

        tracing::debug!(
            group = %id,
            members = next.member_count(),
            pending = next.pending_members.len(),
            "group committed"
        );
        Ok((next, extra))
    }
}

// ── GroupListing ─────────────────────────────────────────────────────────

/// Result of [`GroupRegistry::list_groups`].
///
/// Holds the snapshots taken at listing time and filters lazily; every
/// call to [`GroupListing::iter`] restarts from the first group.
#[derive(Debug, Clone)]
pub struct GroupListing {
    groups: Vec<Arc<Group>>,
    filter: String,
    virtual_label: String,
    page_size: usize,
}

impl GroupListing {
    /// Matching groups in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Group>> + '_ {
        self.groups
            .iter()
            .filter(move |g| g.matches_filter(&self.filter, &self.virtual_label))
    }

    /// Number of matching groups.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// The `index`-th page (0-based) of matches.
    pub fn page(&self, index: usize) -> Vec<Arc<Group>> {
        self.iter()
            .skip(index.saturating_mul(self.page_size))
            .take(self.page_size)
            .cloned()
            .collect()
    }

    /// Number of pages needed for all matches.
    pub fn page_count(&self) -> usize {
        self.len().div_ceil(self.page_size)
    }
}

impl<'a> IntoIterator for &'a GroupListing {
    type Item = &'a Arc<Group>;
    type IntoIter = Box<dyn Iterator<Item = &'a Arc<Group>> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
