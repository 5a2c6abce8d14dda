use axum::{body::Bytes, extract::State, http::StatusCode};

use crate::error::NotifyError;
use crate::handler::AppState;
use crate::model::{Namespace, Notification};

#[derive(Debug, Clone, Copy)]
enum Kind {
    Timeline,
    Locations,
}

fn parse(body: &[u8]) -> Result<Notification, NotifyError> {
    serde_json::from_slice::<Notification>(body).map_err(|e| {
        tracing::warn!("rejecting malformed notification: {}", e);
        NotifyError::from(e)
    })
}

async fn handle(
    state: AppState,
    namespace: Namespace,
    kind: Kind,
    body: Bytes,
) -> Result<StatusCode, NotifyError> {
    let notification = parse(&body)?;

    let result = match kind {
        Kind::Timeline => state.notify.timeline_update(namespace, &notification).await,
        Kind::Locations => state.notify.locations_update(namespace, &notification).await,
    };

    match result {
        Ok(outcome) => {
            tracing::debug!(?outcome, "notification handled");
            Ok(StatusCode::OK)
        }
        Err(e) => {
            tracing::error!(
                user = %notification.user_token,
                item = %notification.item_id,
                "failed to handle {:?} notification: {}",
                kind,
                e
            );
            Err(e)
        }
    }
}

pub async fn timeline_update(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, NotifyError> {
    handle(state, Namespace::Production, Kind::Timeline, body).await
}

pub async fn locations_update(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, NotifyError> {
    handle(state, Namespace::Production, Kind::Locations, body).await
}

pub async fn test_timeline_update(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, NotifyError> {
    handle(state, Namespace::Test, Kind::Timeline, body).await
}

pub async fn test_locations_update(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, NotifyError> {
    handle(state, Namespace::Test, Kind::Locations, body).await
}
