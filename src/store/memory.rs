use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use tokio::sync::Mutex;

use crate::{
    config::TableName,
    error::PersistenceError,
    store::{TrailStore, TrailTransaction},
    types::model::trail::{StoredTrail, TrailRecord, TrailTrack},
};

#[derive(Clone, Debug, PartialEq)]
pub struct MemoryRow {
    pub name: String,
    pub track: TrailTrack,
}

#[derive(Clone, Debug, Default)]
struct MemoryTable {
    rows: BTreeMap<i32, MemoryRow>,
    next_id: i32,
}

impl MemoryTable {
    fn check_unique_name(&self, id: i32, name: &str) -> Result<(), PersistenceError> {
        match self.rows.iter().find(|(_, row)| row.name == name) {
            Some((&other, _)) if other != id => Err(PersistenceError::Rejected(format!(
                "duplicate key value violates unique constraint on name {name:?}"
            ))),
            _ => Ok(()),
        }
    }
}

type Tables = HashMap<String, MemoryTable>;

/// Transactional in-memory stand-in for the trail table. Writes are staged on
/// a copy and swapped in on commit.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    begun: Arc<AtomicUsize>,
    reject_writes: bool,
}

pub struct MemoryTransaction {
    tables: Arc<Mutex<Tables>>,
    staged: Tables,
    reject_writes: bool,
}

impl MemoryStore {
    /// Creates tables normally but refuses every row write.
    pub fn rejecting_writes() -> Self {
        Self {
            reject_writes: true,
            ..Default::default()
        }
    }

    pub fn transactions_begun(&self) -> usize {
        self.begun.load(Ordering::SeqCst)
    }

    pub async fn has_table(&self, table: &TableName) -> bool {
        self.tables.lock().await.contains_key(table.as_str())
    }

    pub async fn rows(&self, table: &TableName) -> Vec<(i32, MemoryRow)> {
        self.tables
            .lock()
            .await
            .get(table.as_str())
            .map(|t| t.rows.iter().map(|(id, row)| (*id, row.clone())).collect())
            .unwrap_or_default()
    }
}

impl TrailStore for MemoryStore {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction, PersistenceError> {
        self.begun.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryTransaction {
            tables: self.tables.clone(),
            staged: self.tables.lock().await.clone(),
            reject_writes: self.reject_writes,
        })
    }
}

impl MemoryTransaction {
    fn table(&mut self, table: &TableName) -> Result<&mut MemoryTable, PersistenceError> {
        if self.reject_writes {
            return Err(PersistenceError::Rejected("writes disabled".into()));
        }
        self.staged
            .get_mut(table.as_str())
            .ok_or_else(|| PersistenceError::Rejected(format!("relation {table} does not exist")))
    }
}

impl TrailTransaction for MemoryTransaction {
    async fn ensure_schema(&mut self, table: &TableName) -> Result<(), PersistenceError> {
        self.staged
            .entry(table.to_string())
            .or_insert_with(|| MemoryTable {
                next_id: 1,
                ..Default::default()
            });
        Ok(())
    }

    async fn upsert_by_name(
        &mut self,
        table: &TableName,
        record: &TrailRecord,
    ) -> Result<StoredTrail, PersistenceError> {
        let t = self.table(table)?;
        let existing = t
            .rows
            .iter()
            .find(|(_, row)| row.name == record.name)
            .map(|(id, _)| *id);
        let id = existing.unwrap_or(t.next_id);
        if existing.is_none() {
            t.next_id += 1;
        }
        t.rows.insert(
            id,
            MemoryRow {
                name: record.name.clone(),
                track: record.track.clone(),
            },
        );
        Ok(StoredTrail {
            id,
            name: record.name.clone(),
        })
    }

    async fn upsert_by_id(
        &mut self,
        table: &TableName,
        id: i32,
        record: &TrailRecord,
    ) -> Result<StoredTrail, PersistenceError> {
        let t = self.table(table)?;
        t.check_unique_name(id, &record.name)?;
        t.rows.insert(
            id,
            MemoryRow {
                name: record.name.clone(),
                track: record.track.clone(),
            },
        );
        t.next_id = t.next_id.max(id + 1);
        Ok(StoredTrail {
            id,
            name: record.name.clone(),
        })
    }

    async fn replace_track(
        &mut self,
        table: &TableName,
        id: i32,
        name: Option<&str>,
        track: &TrailTrack,
    ) -> Result<StoredTrail, PersistenceError> {
        let t = self.table(table)?;
        if let Some(name) = name {
            t.check_unique_name(id, name)?;
        }
        let row = t.rows.get_mut(&id).ok_or_else(|| PersistenceError::NotFound {
            table: table.to_string(),
            id,
        })?;
        if let Some(name) = name {
            row.name = name.to_owned();
        }
        row.track = track.clone();
        Ok(StoredTrail {
            id,
            name: row.name.clone(),
        })
    }

    async fn commit(self) -> Result<(), PersistenceError> {
        *self.tables.lock().await = self.staged;
        Ok(())
    }

    async fn rollback(self) -> Result<(), PersistenceError> {
        Ok(())
    }
}
