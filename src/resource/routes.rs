use axum::{Router, routing::get};

use super::{Resource, handler};

pub fn routes(resource: Resource) -> Router {
    Router::new()
        .route("/", get(handler::list_records).post(handler::create_record))
        .route(
            "/:id",
            get(handler::get_record)
                .put(handler::update_record)
                .patch(handler::update_record)
                .delete(handler::delete_record),
        )
        .with_state(resource)
}
