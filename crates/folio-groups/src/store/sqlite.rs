/// SQLite-backed group store.
///
/// One row per group; the body is the MessagePack encoding of `Group`.
/// `seq` preserves insertion order for listings.
use rusqlite::{params, Connection, ErrorCode};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use super::{GroupStore, StoreError};
use crate::group::Group;
use crate::types::now_ms;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS groups (
    seq        INTEGER PRIMARY KEY AUTOINCREMENT,
    id         TEXT    NOT NULL UNIQUE,
    body       BLOB    NOT NULL,
    updated_at INTEGER NOT NULL
);
";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        tracing::debug!("sqlite group store ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn encode(group: &Group) -> Result<Vec<u8>, StoreError> {
        Ok(rmp_serde::to_vec_named(group)?)
    }
}

impl GroupStore for SqliteStore {
    fn load_all(&self) -> Result<Vec<Group>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn.prepare("SELECT body FROM groups ORDER BY seq")?;
        let bodies = stmt
            .query_map([], |row| row.get::<_, Vec<u8>>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        bodies
            .iter()
            .map(|body| rmp_serde::from_slice(body).map_err(StoreError::from))
            .collect()
    }

    fn insert(&self, group: &Group) -> Result<(), StoreError> {
        let body = Self::encode(group)?;
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        match conn.execute(
            "INSERT INTO groups (id, body, updated_at) VALUES (?1, ?2, ?3)",
            params![group.id.0, body, now_ms() as i64],
        ) {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Conflict(group.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, group: &Group) -> Result<(), StoreError> {
        let body = Self::encode(group)?;
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let changed = conn.execute(
            "UPDATE groups SET body = ?2, updated_at = ?3 WHERE id = ?1",
            params![group.id.0, body, now_ms() as i64],
        )?;
        if changed == 0 {
            return Err(StoreError::Missing(group.id.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::group::{transitions, GroupSpec, Region};
    use crate::types::{Caller, Identity};

    fn make_group(name: &str) -> Group {
        let owner = Caller::new(Identity::parse("owner").unwrap(), "Owner");
        let spec = GroupSpec {
            name: name.into(),
            description: "desc".into(),
            region: Region::Physical("Daegu".into()),
            schedule: "Weekly".into(),
            capacity: 5,
            tags: vec!["essay".into()],
            image: Some("cover.png".into()),
        };
        transitions::create(&owner, &spec, &EngineConfig::default(), 1).unwrap()
    }

    #[test]
    fn roundtrip_in_memory() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = make_group("first");
        let second = make_group("second");
        store.insert(&first).unwrap();
        store.insert(&second).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded, vec![first, second]);
    }

    #[test]
    fn duplicate_insert_conflicts() {
        let store = SqliteStore::open_in_memory().unwrap();
        let group = make_group("dup");
        store.insert(&group).unwrap();
        assert!(matches!(store.insert(&group), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn save_updates_body() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut group = make_group("edit");
        assert!(matches!(store.save(&group), Err(StoreError::Missing(_))));
        store.insert(&group).unwrap();
        group.capacity = 9;
        store.save(&group).unwrap();
        assert_eq!(store.load_all().unwrap()[0].capacity, 9);
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("groups.db");
        let group = make_group("durable");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert(&group).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.load_all().unwrap(), vec![group]);
    }
}
