//! In-memory stand-ins for the notification service's collaborators.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use crate::error::UpstreamError;
use crate::integrations::{Integration, ItemHandler, LocationChanges, LocationHandler};
use crate::model::{Location, Namespace, TimelineItem, User};
use crate::store::{CredentialResolver, UserStore};
use crate::upstream::Mirror;

#[derive(Default)]
pub struct FakeUsers {
    users: Mutex<HashMap<(Namespace, String), User>>,
    pub puts: Mutex<Vec<(Namespace, User)>>,
}

impl FakeUsers {
    pub fn with_user(namespace: Namespace, user: User) -> Arc<Self> {
        let store = FakeUsers::default();
        store
            .users
            .lock()
            .unwrap()
            .insert((namespace, user.id.clone()), user);
        Arc::new(store)
    }

    pub fn user(&self, namespace: Namespace, id: &str) -> Option<User> {
        self.users.lock().unwrap().get(&(namespace, id.to_string())).cloned()
    }
}

#[async_trait]
impl UserStore for FakeUsers {
    async fn get_user(&self, namespace: Namespace, id: &str) -> Result<Option<User>> {
        Ok(self.user(namespace, id))
    }

    async fn put_user(&self, namespace: Namespace, user: &User) -> Result<()> {
        self.puts.lock().unwrap().push((namespace, user.clone()));
        self.users
            .lock()
            .unwrap()
            .insert((namespace, user.id.clone()), user.clone());
        Ok(())
    }
}

/// Store that serves `u1`/`secret` but fails on the configured call.
pub struct BrokenUsers {
    pub fail_gets: bool,
}

#[async_trait]
impl UserStore for BrokenUsers {
    async fn get_user(&self, _namespace: Namespace, id: &str) -> Result<Option<User>> {
        if self.fail_gets {
            anyhow::bail!("database is locked");
        }
        Ok(Some(User::new(id, "secret")))
    }

    async fn put_user(&self, _namespace: Namespace, _user: &User) -> Result<()> {
        anyhow::bail!("disk I/O error")
    }
}

#[derive(Default)]
pub struct FakeMirror {
    pub items: HashMap<String, TimelineItem>,
    pub locations: HashMap<String, Location>,
    /// Inserts succeed until this many items have been stored.
    pub insert_limit: Option<usize>,
    pub fetches: Mutex<Vec<String>>,
    pub inserted: Mutex<Vec<TimelineItem>>,
}

impl FakeMirror {
    fn not_found(id: &str) -> UpstreamError {
        UpstreamError::StatusError {
            status: 404,
            body: format!("{} not found", id),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }
}

#[async_trait]
impl Mirror for FakeMirror {
    async fn get_timeline_item(&self, id: &str) -> Result<TimelineItem, UpstreamError> {
        self.fetches.lock().unwrap().push(format!("timeline/{}", id));
        self.items.get(id).cloned().ok_or_else(|| Self::not_found(id))
    }

    async fn get_location(&self, id: &str) -> Result<Location, UpstreamError> {
        self.fetches.lock().unwrap().push(format!("locations/{}", id));
        self.locations.get(id).cloned().ok_or_else(|| Self::not_found(id))
    }

    async fn insert_timeline_item(&self, item: &TimelineItem) -> Result<TimelineItem, UpstreamError> {
        let mut inserted = self.inserted.lock().unwrap();
        if self.insert_limit.is_some_and(|limit| inserted.len() >= limit) {
            return Err(UpstreamError::StatusError {
                status: 503,
                body: "unavailable".to_string(),
            });
        }

        let mut stored = item.clone();
        stored.id = Some(format!("new-{}", inserted.len()));
        inserted.push(item.clone());
        Ok(stored)
    }
}

/// Hands out the same mirror for every user, or none at all.
pub struct FakeCredentials {
    pub mirror: Option<Arc<FakeMirror>>,
    pub resolved: Mutex<Vec<(String, Namespace)>>,
}

impl FakeCredentials {
    pub fn with(mirror: Option<Arc<FakeMirror>>) -> Arc<Self> {
        Arc::new(FakeCredentials {
            mirror,
            resolved: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl CredentialResolver for FakeCredentials {
    async fn resolve(&self, user_id: &str, namespace: Namespace) -> Result<Option<Arc<dyn Mirror>>> {
        self.resolved
            .lock()
            .unwrap()
            .push((user_id.to_string(), namespace));
        Ok(self.mirror.clone().map(|m| m as Arc<dyn Mirror>))
    }
}

/// Integration with configurable capabilities that records what it saw.
#[derive(Default)]
pub struct Recorder {
    pub name: &'static str,
    pub items: bool,
    pub locations: bool,
    pub fail: bool,
    pub changes: LocationChanges,
    pub seen_items: Mutex<Vec<TimelineItem>>,
    pub seen_locations: Mutex<Vec<Location>>,
}

impl Integration for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn item_handler(&self) -> Option<&dyn ItemHandler> {
        if self.items { Some(self) } else { None }
    }

    fn location_handler(&self) -> Option<&dyn LocationHandler> {
        if self.locations { Some(self) } else { None }
    }
}

#[async_trait]
impl ItemHandler for Recorder {
    async fn handle_item(&self, item: &TimelineItem, _mirror: &dyn Mirror) -> Result<()> {
        self.seen_items.lock().unwrap().push(item.clone());
        if self.fail {
            anyhow::bail!("{} refused the item", self.name);
        }
        Ok(())
    }
}

#[async_trait]
impl LocationHandler for Recorder {
    async fn handle_location(&self, location: &Location) -> Result<LocationChanges> {
        self.seen_locations.lock().unwrap().push(location.clone());
        if self.fail {
            anyhow::bail!("{} refused the location", self.name);
        }
        Ok(self.changes.clone())
    }
}
