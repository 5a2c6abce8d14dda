//! Notification Module
//!
//! Receives the push notifications the upstream API sends when a user's
//! timeline or location changes. The payload is never trusted as data: it only
//! names an item, which is fetched again with the user's own credentials
//! before anything is done with it.
//!
//! Every notification that parses is acknowledged with `200 OK`, including the
//! ones rejected during validation, so upstream never retries them.
//!
//! # Routes
//!
//! - `POST /timeline_update`, `POST /locations_update`
//! - `POST /test/timeline_update`, `POST /test/locations_update` use the test
//!   user namespace

mod handler;
mod routes;
mod service;

#[cfg(test)]
pub(crate) mod fakes;

pub use routes::routes;
pub use service::{DispatchReport, IgnoreReason, NotifyService, Outcome};
