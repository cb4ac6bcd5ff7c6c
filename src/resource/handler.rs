use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::Resource;
use crate::api::{self, JsonBody};
use crate::error::StoreError;

fn error_response(resource: &Resource, op: &str, err: StoreError) -> Response {
    match err {
        StoreError::NotFound(id) => {
            tracing::info!(collection = resource.name(), id = %id, "{} miss", op);
            StatusCode::NOT_FOUND.into_response()
        }
        StoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
        err @ StoreError::Persistence(_) => {
            tracing::error!(collection = resource.name(), error = %err, "{} failed", op);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

pub async fn list_records(State(resource): State<Resource>) -> Response {
    match resource.store.list().await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => error_response(&resource, "list", e),
    }
}

pub async fn get_record(State(resource): State<Resource>, Path(id): Path<String>) -> Response {
    match resource.store.get(&id).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => error_response(&resource, "get", e),
    }
}

pub async fn create_record(State(resource): State<Resource>, body: JsonBody) -> Response {
    let fields = match api::fields_or_empty(body) {
        Ok(fields) => fields,
        Err(response) => return response,
    };

    match resource.store.insert(fields).await {
        Ok(record) => {
            tracing::info!(collection = resource.name(), id = %record.id, "record created");
            (StatusCode::CREATED, Json(record)).into_response()
        }
        Err(e) => error_response(&resource, "create", e),
    }
}

/// Serves both PUT and PATCH. Answers with the whole collection, which is
/// what existing clients of this API read back after an update.
pub async fn update_record(
    State(resource): State<Resource>,
    Path(id): Path<String>,
    body: JsonBody,
) -> Response {
    let fields = match api::fields_or_empty(body) {
        Ok(fields) => fields,
        Err(response) => return response,
    };

    match resource.store.replace_merge(&id, fields).await {
        Ok(records) => {
            tracing::info!(collection = resource.name(), id = %id, "record updated");
            (StatusCode::OK, Json(records)).into_response()
        }
        Err(e) => error_response(&resource, "update", e),
    }
}

pub async fn delete_record(State(resource): State<Resource>, Path(id): Path<String>) -> Response {
    match resource.store.delete(&id).await {
        Ok(record) => {
            tracing::info!(collection = resource.name(), id = %record.id, "record deleted");
            (StatusCode::OK, format!("Record Deleted: {}", record.id)).into_response()
        }
        Err(e) => error_response(&resource, "delete", e),
    }
}
