//! Downstream Integrations
//!
//! An integration consumes the items and locations that notifications point
//! at. Each one exposes any subset of two capabilities:
//!
//! - an [`ItemHandler`], handed every fetched timeline item together with a
//!   client authorized for the item's owner
//! - a [`LocationHandler`], handed every fetched location, which answers with
//!   the timeline changes it wants made
//!
//! A missing capability means the integration is skipped for that kind of
//! notification. The set of integrations is an [`Integrations`] registry built
//! at startup and handed to the notification service.

mod echo;
mod location_card;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{Location, TimelineItem};
use crate::upstream::Mirror;

pub use echo::Echo;
pub use location_card::LocationCard;

#[async_trait]
pub trait ItemHandler: Send + Sync {
    async fn handle_item(&self, item: &TimelineItem, mirror: &dyn Mirror) -> Result<()>;
}

#[async_trait]
pub trait LocationHandler: Send + Sync {
    async fn handle_location(&self, location: &Location) -> Result<LocationChanges>;
}

pub trait Integration: Send + Sync {
    fn name(&self) -> &str;

    fn item_handler(&self) -> Option<&dyn ItemHandler> {
        None
    }

    fn location_handler(&self) -> Option<&dyn LocationHandler> {
        None
    }
}

/// Timeline changes requested by a [`LocationHandler`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationChanges {
    pub new_items: Vec<TimelineItem>,
    pub updated_items: Vec<TimelineItem>,
    /// Ids of timeline items to remove.
    pub deleted_items: Vec<String>,
}

impl LocationChanges {
    pub fn with_new_items(items: Vec<TimelineItem>) -> Self {
        LocationChanges {
            new_items: items,
            ..Default::default()
        }
    }
}

#[derive(Clone, Default)]
pub struct Integrations {
    entries: Vec<Arc<dyn Integration>>,
}

impl Integrations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, integration: Arc<dyn Integration>) -> Self {
        self.entries.push(integration);
        self
    }

    /// Builds the registry of built-in integrations. `enabled` restricts it to
    /// the named ones; `None` registers all of them.
    pub fn builtin(enabled: Option<&[String]>) -> Result<Self> {
        let all: Vec<Arc<dyn Integration>> = vec![Arc::new(Echo::default()), Arc::new(LocationCard)];

        let Some(names) = enabled else {
            return Ok(Integrations { entries: all });
        };

        let mut registry = Integrations::new();
        for name in names {
            let integration = all
                .iter()
                .find(|i| i.name() == name)
                .ok_or_else(|| anyhow::anyhow!("unknown integration: {}", name))?;
            registry = registry.register(integration.clone());
        }
        Ok(registry)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Integration>> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|i| i.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
