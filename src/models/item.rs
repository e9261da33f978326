use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anything the feed mixer can blend.
///
/// The mixer treats entries as opaque payloads identified solely by their id;
/// all other fields are carried through untouched.
pub trait FeedEntry {
    /// Unique identifier within and across the source lists being mixed
    fn feed_id(&self) -> &str;
}

/// A wishlist item as surfaced in the feed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedItem {
    /// Opaque item identifier
    pub id: String,
    /// Wishlist this item belongs to
    pub wishlist_id: String,
    /// Display name of the item
    pub name: String,
    /// Cover image, if any
    pub image_url: Option<String>,
    /// Category inherited from the parent wishlist
    pub category: Option<String>,
    /// Item creation time
    pub created_at: DateTime<Utc>,
    /// Popularity score computed fresh at read time; 0 until annotated
    #[serde(default)]
    pub popularity_score: f64,
}

impl FeedEntry for FeedItem {
    fn feed_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> FeedItem {
        FeedItem {
            id: "item-1".to_string(),
            wishlist_id: "wl-1".to_string(),
            name: "Mechanical keyboard".to_string(),
            image_url: None,
            category: Some("Tech".to_string()),
            created_at: Utc::now(),
            popularity_score: 12.5,
        }
    }

    #[test]
    fn test_feed_entry_id() {
        let item = sample_item();
        assert_eq!(item.feed_id(), "item-1");
    }

    #[test]
    fn test_serde_defaults_score_to_zero() {
        let json = r#"{
            "id": "item-2",
            "wishlist_id": "wl-1",
            "name": "Espresso machine",
            "image_url": null,
            "category": "Maison",
            "created_at": "2024-01-15T10:00:00Z"
        }"#;

        let item: FeedItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.popularity_score, 0.0);
        assert_eq!(item.category.as_deref(), Some("Maison"));
    }
}
