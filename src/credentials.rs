use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;

use crate::db::Database;
use crate::model::Namespace;
use crate::store::CredentialResolver;
use crate::upstream::{Mirror, MirrorClient};

/// Builds upstream clients from the access tokens kept in the database.
/// Issuing and refreshing tokens happens elsewhere.
pub struct StoredCredentials {
    db: Arc<Database>,
    http: Client,
    base_url: String,
}

impl StoredCredentials {
    pub fn new(db: Arc<Database>, http: Client, base_url: &str) -> Self {
        Self {
            db,
            http,
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl CredentialResolver for StoredCredentials {
    async fn resolve(&self, user_id: &str, namespace: Namespace) -> Result<Option<Arc<dyn Mirror>>> {
        let Some(token) = self.db.get_access_token(namespace, user_id, Utc::now()).await? else {
            return Ok(None);
        };

        let client = MirrorClient::new(self.http.clone(), &self.base_url, &token)?;
        Ok(Some(Arc::new(client)))
    }
}
