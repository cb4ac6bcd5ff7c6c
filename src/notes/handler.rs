use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::{Notes, schema};
use crate::api::JsonBody;
use crate::error::StoreError;
use crate::model::Record;

#[derive(Debug, Serialize)]
struct NoteResponse {
    note: Record,
}

#[derive(Debug, Serialize)]
struct NotesResponse {
    notes: Vec<Record>,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Serialize)]
struct FailResponse {
    status: &'static str,
    message: String,
}

fn success<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

fn created(note: Record) -> Response {
    (StatusCode::CREATED, Json(NoteResponse { note })).into_response()
}

fn fail(status: StatusCode, msg: String) -> Response {
    (
        status,
        Json(FailResponse {
            status: "fail",
            message: msg,
        }),
    )
        .into_response()
}

fn error_response(op: &str, err: StoreError) -> Response {
    match err {
        StoreError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(MessageResponse {
                message: "Note not found".to_string(),
            }),
        )
            .into_response(),
        StoreError::Validation(msg) => {
            tracing::info!(error = %msg, "{} note rejected", op);
            fail(StatusCode::BAD_REQUEST, msg)
        }
        err @ StoreError::Persistence(_) => {
            tracing::error!(error = %err, "failed to {} note", op);
            fail(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

pub async fn list_notes(State(notes): State<Notes>) -> Response {
    match notes.store.list().await {
        Ok(notes) => success(NotesResponse { notes }),
        Err(e) => error_response("list", e),
    }
}

pub async fn get_note(State(notes): State<Notes>, Path(id): Path<String>) -> Response {
    match notes.store.get(&id).await {
        Ok(note) => success(NoteResponse { note }),
        Err(e) => error_response("get", e),
    }
}

pub async fn create_note(State(notes): State<Notes>, body: JsonBody) -> Response {
    let fields = match body {
        Ok(Json(fields)) => fields,
        Err(rejection) => return fail(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let fields = match schema::for_create(fields) {
        Ok(fields) => fields,
        Err(e) => return error_response("create", e),
    };

    match notes.store.insert(fields).await {
        Ok(note) => {
            tracing::info!(id = %note.id, "note created");
            created(note)
        }
        Err(e) => error_response("create", e),
    }
}

pub async fn update_note(
    State(notes): State<Notes>,
    Path(id): Path<String>,
    body: JsonBody,
) -> Response {
    let fields = match body {
        Ok(Json(fields)) => fields,
        Err(rejection) => return fail(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let fields = match schema::for_update(fields) {
        Ok(fields) => fields,
        Err(e) => return error_response("update", e),
    };

    match notes.store.update(&id, fields).await {
        Ok(note) => {
            tracing::info!(id = %note.id, "note updated");
            success(NoteResponse { note })
        }
        Err(e) => error_response("update", e),
    }
}

pub async fn delete_note(State(notes): State<Notes>, Path(id): Path<String>) -> Response {
    match notes.store.delete(&id).await {
        Ok(note) => {
            tracing::info!(id = %note.id, "note deleted");
            success(serde_json::json!({ "status": "success" }))
        }
        Err(e) => error_response("delete", e),
    }
}
