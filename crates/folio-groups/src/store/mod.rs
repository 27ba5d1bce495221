/// Persistence boundary for group records.
///
/// The registry keeps the published snapshots in memory and writes
/// through to a `GroupStore` before publishing, so a store failure
/// leaves both the store and the registry on the previous snapshot.
pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::group::{Group, GroupId};

/// Storage-level failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("codec: {0}")]
    Codec(String),

    #[error("group {0} already stored")]
    Conflict(GroupId),

    #[error("group {0} missing from store")]
    Missing(GroupId),

    #[error("stored group {id} is inconsistent: {violation}")]
    Corrupt { id: GroupId, violation: String },
}

impl From<rmp_serde::encode::Error> for StoreError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        StoreError::Codec(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for StoreError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        StoreError::Codec(e.to_string())
    }
}

/// Keyed durable store for groups (key = group id).
pub trait GroupStore: Send + Sync {
    /// Every stored group, in insertion order.
    fn load_all(&self) -> Result<Vec<Group>, StoreError>;

    /// Store a newly created group.
    fn insert(&self, group: &Group) -> Result<(), StoreError>;

    /// Replace an existing group atomically.
    fn save(&self, group: &Group) -> Result<(), StoreError>;
}
