use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::model::Fields;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn new(msg: &str) -> Self {
        StatusResponse {
            status: msg.to_owned(),
        }
    }
}

pub async fn status() -> impl IntoResponse {
    tracing::info!("got status request");
    Json(StatusResponse::new("started"))
}

pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Body extractor result for handlers that accept any JSON object.
pub type JsonBody = Result<Json<Fields>, JsonRejection>;

/// Like the JSON extractor, but a request without a JSON content type counts
/// as an empty object instead of being refused.
pub fn fields_or_empty(body: JsonBody) -> Result<Fields, Response> {
    match body {
        Ok(Json(fields)) => Ok(fields),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(Fields::new()),
        Err(other) => Err(rejection(other)),
    }
}

pub fn rejection(rejection: JsonRejection) -> Response {
    tracing::info!(error = %rejection.body_text(), "rejected request body");
    (rejection.status(), rejection.body_text()).into_response()
}
