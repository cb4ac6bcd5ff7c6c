use axum::{Router, routing::get};

use super::{Notes, handler};

pub fn routes(notes: Notes) -> Router {
    Router::new()
        .route("/", get(handler::list_notes).post(handler::create_note))
        .route(
            "/:id",
            get(handler::get_note)
                .patch(handler::update_note)
                .delete(handler::delete_note),
        )
        .with_state(notes)
}
