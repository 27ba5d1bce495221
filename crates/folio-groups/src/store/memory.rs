use indexmap::IndexMap;
use std::sync::{Mutex, PoisonError};

use super::{GroupStore, StoreError};
use crate::group::{Group, GroupId};

/// In-process store; keeps insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    groups: Mutex<IndexMap<GroupId, Group>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.groups.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GroupStore for MemoryStore {
    fn load_all(&self) -> Result<Vec<Group>, StoreError> {
        let groups = self.groups.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(groups.values().cloned().collect())
    }

    fn insert(&self, group: &Group) -> Result<(), StoreError> {
        let mut groups = self.groups.lock().unwrap_or_else(PoisonError::into_inner);
        if groups.contains_key(&group.id) {
            return Err(StoreError::Conflict(group.id.clone()));
        }
        groups.insert(group.id.clone(), group.clone());
        Ok(())
    }

    fn save(&self, group: &Group) -> Result<(), StoreError> {
        let mut groups = self.groups.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(slot) = groups.get_mut(&group.id) else {
            return Err(StoreError::Missing(group.id.clone()));
        };
        *slot = group.clone();
        Ok(())
    }
}
