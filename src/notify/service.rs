use std::sync::Arc;

use chrono::Utc;

use crate::error::NotifyError;
use crate::integrations::Integrations;
use crate::model::{
    LOCATIONS_COLLECTION, Location, Namespace, Notification, TIMELINE_COLLECTION, TimelineItem,
    UPDATE_OPERATION, User,
};
use crate::store::{CredentialResolver, UserStore};
use crate::upstream::Mirror;

/// Why a notification was acknowledged without being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    UnknownUser,
    WrongVerifyToken,
    WrongCollection,
    WrongOperation,
    NoCredentials,
}

impl IgnoreReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreReason::UnknownUser | IgnoreReason::WrongVerifyToken => "wrong user",
            IgnoreReason::WrongCollection => "wrong collection",
            IgnoreReason::WrongOperation => "wrong operation",
            IgnoreReason::NoCredentials => "no valid credentials",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Integrations that had the relevant capability and were invoked.
    pub invoked: usize,
    /// Invoked integrations that returned an error.
    pub failed: usize,
    /// Timeline items inserted on behalf of location integrations.
    pub inserted: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ignored(IgnoreReason),
    Processed(DispatchReport),
}

/// Validates notifications, fetches the items they point at and hands those
/// to the registered integrations.
pub struct NotifyService {
    users: Arc<dyn UserStore>,
    credentials: Arc<dyn CredentialResolver>,
    integrations: Integrations,
}

fn ignore(reason: IgnoreReason, notification: &Notification) -> Outcome {
    tracing::info!(
        user = %notification.user_token,
        item = %notification.item_id,
        "ignoring notification: {}",
        reason.as_str()
    );
    Outcome::Ignored(reason)
}

impl NotifyService {
    pub fn new(
        users: Arc<dyn UserStore>,
        credentials: Arc<dyn CredentialResolver>,
        integrations: Integrations,
    ) -> Self {
        Self {
            users,
            credentials,
            integrations,
        }
    }

    pub fn integrations(&self) -> &Integrations {
        &self.integrations
    }

    /// Looks the user up and checks the shared secret. Nothing upstream is
    /// touched before this succeeds.
    async fn verify_user(
        &self,
        namespace: Namespace,
        notification: &Notification,
    ) -> Result<Result<User, IgnoreReason>, NotifyError> {
        let Some(user) = self.users.get_user(namespace, &notification.user_token).await? else {
            return Ok(Err(IgnoreReason::UnknownUser));
        };

        if notification.verify_token.as_deref() != Some(user.verify_token.as_str()) {
            return Ok(Err(IgnoreReason::WrongVerifyToken));
        }

        Ok(Ok(user))
    }

    async fn authorize(
        &self,
        namespace: Namespace,
        user: &User,
    ) -> Result<Option<Arc<dyn Mirror>>, NotifyError> {
        Ok(self.credentials.resolve(&user.id, namespace).await?)
    }

    pub async fn timeline_update(
        &self,
        namespace: Namespace,
        notification: &Notification,
    ) -> Result<Outcome, NotifyError> {
        tracing::info!(
            user = %notification.user_token,
            collection = %notification.collection,
            operation = ?notification.operation,
            item = %notification.item_id,
            namespace = namespace.as_str(),
            "timeline notification received"
        );

        let user = match self.verify_user(namespace, notification).await? {
            Ok(user) => user,
            Err(reason) => return Ok(ignore(reason, notification)),
        };

        if notification.collection != TIMELINE_COLLECTION {
            return Ok(ignore(IgnoreReason::WrongCollection, notification));
        }

        let Some(mirror) = self.authorize(namespace, &user).await? else {
            return Ok(ignore(IgnoreReason::NoCredentials, notification));
        };

        let item = mirror.get_timeline_item(&notification.item_id).await?;
        tracing::info!("fetched timeline item: {:?}", item);

        Ok(Outcome::Processed(
            self.dispatch_item(&item, mirror.as_ref()).await,
        ))
    }

    pub async fn locations_update(
        &self,
        namespace: Namespace,
        notification: &Notification,
    ) -> Result<Outcome, NotifyError> {
        tracing::info!(
            user = %notification.user_token,
            collection = %notification.collection,
            operation = ?notification.operation,
            item = %notification.item_id,
            namespace = namespace.as_str(),
            "location notification received"
        );

        let mut user = match self.verify_user(namespace, notification).await? {
            Ok(user) => user,
            Err(reason) => return Ok(ignore(reason, notification)),
        };

        if notification.collection != LOCATIONS_COLLECTION {
            return Ok(ignore(IgnoreReason::WrongCollection, notification));
        }

        if notification.operation.as_deref() != Some(UPDATE_OPERATION) {
            return Ok(ignore(IgnoreReason::WrongOperation, notification));
        }

        let Some(mirror) = self.authorize(namespace, &user).await? else {
            return Ok(ignore(IgnoreReason::NoCredentials, notification));
        };

        let location = mirror.get_location(&notification.item_id).await?;
        tracing::info!("fetched location: {:?}", location);

        if let Some((latitude, longitude)) = location.coordinates() {
            user.latitude = Some(latitude);
            user.longitude = Some(longitude);
            user.location_update = Some(Utc::now());
            self.users.put_user(namespace, &user).await?;
            tracing::info!(user = %user.id, latitude, longitude, "stored last known location");
        }

        Ok(Outcome::Processed(
            self.dispatch_location(&location, mirror.as_ref()).await?,
        ))
    }

    async fn dispatch_item(&self, item: &TimelineItem, mirror: &dyn Mirror) -> DispatchReport {
        let mut report = DispatchReport::default();

        for integration in self.integrations.iter() {
            let Some(handler) = integration.item_handler() else {
                continue;
            };

            report.invoked += 1;
            if let Err(e) = handler.handle_item(item, mirror).await {
                report.failed += 1;
                tracing::error!(
                    integration = integration.name(),
                    "item handler failed: {:#}",
                    e
                );
            }
        }

        report
    }

    /// Runs every location handler and inserts the items they return. A
    /// handler error only skips that integration. A rejected insert aborts the
    /// whole notification.
    async fn dispatch_location(
        &self,
        location: &Location,
        mirror: &dyn Mirror,
    ) -> Result<DispatchReport, NotifyError> {
        let mut report = DispatchReport::default();

        for integration in self.integrations.iter() {
            let Some(handler) = integration.location_handler() else {
                continue;
            };

            report.invoked += 1;
            let changes = match handler.handle_location(location).await {
                Ok(changes) => changes,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        integration = integration.name(),
                        "location handler failed: {:#}",
                        e
                    );
                    continue;
                }
            };

            for item in &changes.new_items {
                let inserted = mirror.insert_timeline_item(item).await.inspect_err(|e| {
                    tracing::error!(
                        integration = integration.name(),
                        inserted = report.inserted,
                        "failed to insert timeline item: {}",
                        crate::unpack_error(e)
                    );
                })?;
                report.inserted += 1;
                tracing::info!(
                    integration = integration.name(),
                    "inserted timeline item: {:?}",
                    inserted
                );
            }

            // TODO: apply updated_items and deleted_items once the upstream client grows patch/delete calls.
            if !changes.updated_items.is_empty() || !changes.deleted_items.is_empty() {
                tracing::debug!(
                    integration = integration.name(),
                    updated = changes.updated_items.len(),
                    deleted = changes.deleted_items.len(),
                    "timeline updates and deletes are not applied"
                );
            }
        }

        Ok(report)
    }
}
