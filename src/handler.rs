use std::sync::Arc;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::notify::{self, NotifyService};

#[derive(Clone)]
pub struct AppState {
    pub notify: Arc<NotifyService>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    integrations: Vec<String>,
}

pub async fn healthcheck(State(state): State<AppState>) -> impl IntoResponse {
    info!("got healthcheck request");
    Json(HealthResponse {
        status: "ok",
        integrations: state
            .notify
            .integrations()
            .names()
            .into_iter()
            .map(str::to_owned)
            .collect(),
    })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(healthcheck))
        .merge(notify::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
