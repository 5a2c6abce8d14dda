use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use super::{Integration, ItemHandler};
use crate::model::TimelineItem;
use crate::upstream::Mirror;

const ECHO_SOURCE: &str = "echo";
const MAX_REMEMBERED: usize = 10_000;

/// Answers every timeline item that carries text with a card repeating it.
/// Each item id is answered once per process, so later updates of the same
/// item (pinning, editing) do not produce more cards.
#[derive(Default)]
pub struct Echo {
    answered: Mutex<HashSet<String>>,
}

impl Echo {
    fn already_answered(&self, id: &str) -> bool {
        self.answered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(id)
    }

    fn remember(&self, id: &str) {
        let mut answered = self.answered.lock().unwrap_or_else(|e| e.into_inner());
        if answered.len() >= MAX_REMEMBERED {
            answered.clear();
        }
        answered.insert(id.to_string());
    }

    fn reply_for(item: &TimelineItem) -> Option<TimelineItem> {
        if item.source_item_id.as_deref() == Some(ECHO_SOURCE) {
            return None;
        }

        let text = item.text.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        let mut reply = TimelineItem::from_text(&format!("Echo: {}", text));
        reply.source_item_id = Some(ECHO_SOURCE.to_string());
        reply
            .extra
            .insert("notification".to_string(), serde_json::json!({ "level": "DEFAULT" }));
        Some(reply)
    }
}

impl Integration for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn item_handler(&self) -> Option<&dyn ItemHandler> {
        Some(self)
    }
}

#[async_trait]
impl ItemHandler for Echo {
    async fn handle_item(&self, item: &TimelineItem, mirror: &dyn Mirror) -> Result<()> {
        let Some(reply) = Self::reply_for(item) else {
            tracing::debug!("echo: nothing to answer for item {:?}", item.id);
            return Ok(());
        };

        if item.id.as_deref().is_some_and(|id| self.already_answered(id)) {
            tracing::debug!("echo: already answered item {:?}", item.id);
            return Ok(());
        }

        let inserted = mirror.insert_timeline_item(&reply).await?;
        if let Some(id) = item.id.as_deref() {
            self.remember(id);
        }
        tracing::info!("echo: inserted {:?} in reply to {:?}", inserted.id, item.id);
        Ok(())
    }
}
