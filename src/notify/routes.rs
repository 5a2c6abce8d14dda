use axum::{Router, routing::post};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/timeline_update", post(handler::timeline_update))
        .route("/locations_update", post(handler::locations_update))
        .route("/test/timeline_update", post(handler::test_timeline_update))
        .route("/test/locations_update", post(handler::test_locations_update))
}
