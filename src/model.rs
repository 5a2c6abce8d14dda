use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Selects which user table a lookup targets. The `/test` route prefix maps to `Test`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Production,
    Test,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Production => "production",
            Namespace::Test => "test",
        }
    }

    pub(crate) fn users_table(&self) -> &'static str {
        match self {
            Namespace::Production => "users",
            Namespace::Test => "test_users",
        }
    }

    pub(crate) fn credentials_table(&self) -> &'static str {
        match self {
            Namespace::Production => "credentials",
            Namespace::Test => "test_credentials",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub verify_token: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_update: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(id: &str, verify_token: &str) -> Self {
        User {
            id: id.to_owned(),
            verify_token: verify_token.to_owned(),
            latitude: None,
            longitude: None,
            location_update: None,
        }
    }
}

/// Body of a push notification. Only lives for the duration of one request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub user_token: String,
    #[serde(default)]
    pub verify_token: Option<String>,
    pub collection: String,
    #[serde(default)]
    pub operation: Option<String>,
    pub item_id: String,
}

pub const TIMELINE_COLLECTION: &str = "timeline";
pub const LOCATIONS_COLLECTION: &str = "locations";
pub const UPDATE_OPERATION: &str = "UPDATE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_item_id: Option<String>,
    /// Fields this service does not interpret, kept so items round-trip intact.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TimelineItem {
    pub fn from_text(text: &str) -> Self {
        TimelineItem {
            text: Some(text.to_owned()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Location {
    /// Returns `(latitude, longitude)` only when both are present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}
