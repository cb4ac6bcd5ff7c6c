//! Notes
//!
//! A schema-checked collection with an enveloped response format:
//! `{"notes": [...]}` for listings, `{"note": {...}}` for single notes. A
//! note has a `title` and a required `body`; anything else in a request is
//! dropped. Updates are partial (`PATCH`) and answer with the updated note.
//!
//! Usually backed by the database store, but any [`RecordStore`] works.

mod handler;
mod routes;
pub mod schema;

pub use routes::routes;

use std::sync::Arc;

use crate::store::RecordStore;

#[derive(Clone)]
pub struct Notes {
    store: Arc<dyn RecordStore>,
}

impl Notes {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Notes { store }
    }
}
