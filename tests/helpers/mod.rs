//! Shared setup for router tests: a real user store in a temp directory and
//! an upstream that serves canned items and records every call.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use mirrorhook::db::Database;
use mirrorhook::error::UpstreamError;
use mirrorhook::handler::{AppState, router};
use mirrorhook::integrations::Integrations;
use mirrorhook::model::{Location, Namespace, TimelineItem, User};
use mirrorhook::notify::NotifyService;
use mirrorhook::store::{CredentialResolver, UserStore};
use mirrorhook::upstream::Mirror;

#[derive(Default)]
pub struct CannedMirror {
    pub items: Mutex<HashMap<String, TimelineItem>>,
    pub locations: Mutex<HashMap<String, Location>>,
    pub fetches: Mutex<Vec<String>>,
    pub inserted: Mutex<Vec<TimelineItem>>,
    pub reject_inserts: AtomicBool,
}

impl CannedMirror {
    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }
}

fn missing(id: &str) -> UpstreamError {
    UpstreamError::StatusError {
        status: 404,
        body: format!("{} not found", id),
    }
}

#[async_trait]
impl Mirror for CannedMirror {
    async fn get_timeline_item(&self, id: &str) -> Result<TimelineItem, UpstreamError> {
        self.fetches.lock().unwrap().push(id.to_string());
        self.items.lock().unwrap().get(id).cloned().ok_or_else(|| missing(id))
    }

    async fn get_location(&self, id: &str) -> Result<Location, UpstreamError> {
        self.fetches.lock().unwrap().push(id.to_string());
        self.locations.lock().unwrap().get(id).cloned().ok_or_else(|| missing(id))
    }

    async fn insert_timeline_item(&self, item: &TimelineItem) -> Result<TimelineItem, UpstreamError> {
        if self.reject_inserts.load(Ordering::SeqCst) {
            return Err(UpstreamError::StatusError {
                status: 503,
                body: "backend unavailable".to_string(),
            });
        }
        self.inserted.lock().unwrap().push(item.clone());
        Ok(item.clone())
    }
}

/// Authorizes every user the database holds an access token for.
pub struct DbBackedCredentials {
    db: Arc<Database>,
    mirror: Arc<CannedMirror>,
}

#[async_trait]
impl CredentialResolver for DbBackedCredentials {
    async fn resolve(&self, user_id: &str, namespace: Namespace) -> Result<Option<Arc<dyn Mirror>>> {
        let token = self
            .db
            .get_access_token(namespace, user_id, chrono::Utc::now())
            .await?;
        Ok(token.map(|_| self.mirror.clone() as Arc<dyn Mirror>))
    }
}

/// Knows every user as `secret` but cannot persist anything.
pub struct ReadOnlyStore;

#[async_trait]
impl UserStore for ReadOnlyStore {
    async fn get_user(&self, _namespace: Namespace, id: &str) -> Result<Option<User>> {
        Ok(Some(User::new(id, "secret")))
    }

    async fn put_user(&self, _namespace: Namespace, _user: &User) -> Result<()> {
        anyhow::bail!("attempt to write a readonly database")
    }
}

/// Hands the same mirror to every user.
pub struct AlwaysAuthorized(pub Arc<CannedMirror>);

#[async_trait]
impl CredentialResolver for AlwaysAuthorized {
    async fn resolve(&self, _user_id: &str, _namespace: Namespace) -> Result<Option<Arc<dyn Mirror>>> {
        Ok(Some(self.0.clone() as Arc<dyn Mirror>))
    }
}

/// Router over an arbitrary user store, for failure paths the real database
/// does not produce on demand.
pub fn router_with_store(users: Arc<dyn UserStore>, mirror: Arc<CannedMirror>) -> Router {
    let notify = NotifyService::new(users, Arc::new(AlwaysAuthorized(mirror)), Integrations::new());
    router(AppState {
        notify: Arc::new(notify),
    })
}

pub async fn post_to(router: &Router, path: &str, body: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    read(response).await
}

pub struct TestApp {
    pub router: Router,
    pub db: Arc<Database>,
    pub mirror: Arc<CannedMirror>,
    _temp_dir: TempDir,
}

impl TestApp {
    pub async fn new(integrations: Integrations) -> TestApp {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(Database::open(&temp_dir.path().join("test.db")).await.unwrap());
        let mirror = Arc::new(CannedMirror::default());
        let credentials = Arc::new(DbBackedCredentials {
            db: db.clone(),
            mirror: mirror.clone(),
        });
        let notify = Arc::new(NotifyService::new(db.clone(), credentials, integrations));

        TestApp {
            router: router(AppState { notify }),
            db,
            mirror,
            _temp_dir: temp_dir,
        }
    }

    /// Registers `u1` with secret `secret` and a valid access token.
    pub async fn with_user(self, namespace: Namespace) -> TestApp {
        self.db.create_user(namespace, "u1", "secret").await.unwrap();
        self.db
            .store_credentials(namespace, "u1", "token", None)
            .await
            .unwrap();
        self
    }

    pub async fn post(&self, path: &str, body: &str) -> (StatusCode, String) {
        post_to(&self.router, path, body).await
    }

    pub async fn get(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        read(response).await
    }
}

async fn read(response: Response<Body>) -> (StatusCode, String) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}
