//! Record stores.
//!
//! A [`RecordStore`] owns the persisted representation of one collection.
//! Two backends implement it:
//!
//! - [`FileCollection`]: one key of a JSON document shared by several
//!   collections, rewritten wholesale on every mutation.
//! - [`DbCollection`]: rows of a libsql table, one statement per operation.
//!
//! Handlers only ever see `Arc<dyn RecordStore>`.

mod database;
mod file;

pub use database::{Database, DbCollection};
pub use file::{FileCollection, JsonFileStore};

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Fields, Record};

#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Collection name, also the key or tag the records are stored under.
    fn name(&self) -> &str;

    /// The whole collection in storage order.
    async fn list(&self) -> Result<Vec<Record>>;

    /// Returns `NotFound` when no record carries `id`.
    async fn get(&self, id: &str) -> Result<Record>;

    /// Assigns a fresh id, appends and persists. Returns the created record.
    async fn insert(&self, fields: Fields) -> Result<Record>;

    /// Merges `fields` over the record, persists, and returns the whole
    /// collection afterwards.
    async fn replace_merge(&self, id: &str, fields: Fields) -> Result<Vec<Record>>;

    /// Same merge as [`RecordStore::replace_merge`] but returns only the
    /// updated record.
    async fn update(&self, id: &str, fields: Fields) -> Result<Record>;

    /// Removes the record and returns it. `NotFound` if nothing matched.
    async fn delete(&self, id: &str) -> Result<Record>;
}
