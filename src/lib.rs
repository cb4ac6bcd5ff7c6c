use std::error::Error;

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod id;
pub mod model;
pub mod notes;
pub mod resource;
pub mod store;

pub fn unpack_error(err: &(dyn Error)) -> String {
    let mut parts = Vec::new();
    parts.push(err.to_string());
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}
