//! The geographic datastore trails are written to.
//!
//! A run talks to the store through one [`TrailTransaction`]: nothing it writes
//! is visible to anyone else until [`TrailTransaction::commit`], and
//! [`TrailTransaction::rollback`] discards all of it.

#[cfg(test)]
pub mod memory;
pub mod postgres;

use crate::{
    config::TableName,
    error::PersistenceError,
    types::model::trail::{StoredTrail, TrailRecord, TrailTrack},
};

pub trait TrailStore {
    type Transaction: TrailTransaction;

    async fn begin(&self) -> Result<Self::Transaction, PersistenceError>;
}

pub trait TrailTransaction {
    /// Creates the trail table and its spatial index when missing.
    async fn ensure_schema(&mut self, table: &TableName) -> Result<(), PersistenceError>;

    async fn upsert_by_name(
        &mut self,
        table: &TableName,
        record: &TrailRecord,
    ) -> Result<StoredTrail, PersistenceError>;

    async fn upsert_by_id(
        &mut self,
        table: &TableName,
        id: i32,
        record: &TrailRecord,
    ) -> Result<StoredTrail, PersistenceError>;

    /// Overwrites geometry, profile and totals of an existing trail. The name
    /// only changes when `name` is given.
    async fn replace_track(
        &mut self,
        table: &TableName,
        id: i32,
        name: Option<&str>,
        track: &TrailTrack,
    ) -> Result<StoredTrail, PersistenceError>;

    async fn commit(self) -> Result<(), PersistenceError>;

    async fn rollback(self) -> Result<(), PersistenceError>;
}
