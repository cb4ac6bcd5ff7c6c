//! Generic resource handler.
//!
//! One instance per configured collection, mounted under `/api/<name>`:
//!
//! | Verb + path        | Success                        | Failure          |
//! |--------------------|--------------------------------|------------------|
//! | `GET /`            | 200, JSON array                | 500              |
//! | `GET /:id`         | 200, record                    | 404, empty body  |
//! | `POST /`           | 201, created record            | 500              |
//! | `PUT`/`PATCH /:id` | 200, whole collection          | 404, 500         |
//! | `DELETE /:id`      | 200, `Record Deleted: <id>`    | 404, 500         |
//!
//! Request bodies must be JSON objects and are stored as sent.
//!
//! # Usage
//!
//! ```rust,ignore
//! let books = Resource::new(Arc::new(file_store.collection("books")));
//! let app = Router::new().nest("/api/books", resource::routes(books));
//! ```

mod handler;
mod routes;

pub use routes::routes;

use std::sync::Arc;

use crate::store::RecordStore;

#[derive(Clone)]
pub struct Resource {
    store: Arc<dyn RecordStore>,
}

impl Resource {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Resource { store }
    }

    pub fn name(&self) -> &str {
        self.store.name()
    }
}
