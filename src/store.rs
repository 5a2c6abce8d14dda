use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{Namespace, User};
use crate::upstream::Mirror;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns the user with the given upstream id, or None if it is not known
    /// in this namespace.
    async fn get_user(&self, namespace: Namespace, id: &str) -> Result<Option<User>>;

    /// Persists every mutable field of an existing user.
    async fn put_user(&self, namespace: Namespace, user: &User) -> Result<()>;
}

#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Returns a client authorized to act for the user, or None when no usable
    /// credentials are stored.
    async fn resolve(&self, user_id: &str, namespace: Namespace) -> Result<Option<Arc<dyn Mirror>>>;
}
