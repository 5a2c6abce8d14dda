use anyhow::Result;
use async_trait::async_trait;

use super::{Integration, LocationChanges, LocationHandler};
use crate::model::{Location, TimelineItem};

const LOCATION_CARD_SOURCE: &str = "location_card";

/// Posts a card naming the place every time the user's location changes.
pub struct LocationCard;

impl LocationCard {
    fn card_for(location: &Location) -> Option<TimelineItem> {
        let (lat, lng) = location.coordinates()?;

        let place = location
            .display_name
            .as_deref()
            .or(location.address.as_deref())
            .filter(|p| !p.trim().is_empty());

        let text = match place {
            Some(place) => format!("You are at {} ({:.5}, {:.5})", place, lat, lng),
            None => format!("You are at {:.5}, {:.5}", lat, lng),
        };

        let mut card = TimelineItem::from_text(&text);
        card.source_item_id = Some(LOCATION_CARD_SOURCE.to_string());
        card.extra.insert(
            "location".to_string(),
            serde_json::json!({ "latitude": lat, "longitude": lng }),
        );
        Some(card)
    }
}

impl Integration for LocationCard {
    fn name(&self) -> &str {
        "location_card"
    }

    fn location_handler(&self) -> Option<&dyn LocationHandler> {
        Some(self)
    }
}

#[async_trait]
impl LocationHandler for LocationCard {
    async fn handle_location(&self, location: &Location) -> Result<LocationChanges> {
        Ok(LocationChanges::with_new_items(
            Self::card_for(location).into_iter().collect(),
        ))
    }
}
