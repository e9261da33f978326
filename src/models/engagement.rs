use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raw engagement counts for a single item, as read from the
/// `item_popularity_stats` aggregate.
///
/// This is a fetch-use-discard snapshot: the aggregate is recomputed
/// periodically outside the request path, and items with no recorded
/// engagement have no row at all (callers default missing entries to zero).
#[derive(Debug, Clone, PartialEq)]
pub struct EngagementStats {
    pub item_id: String,
    pub likes_count: u64,
    pub bookmarks_count: u64,
    pub views_count: u64,
    /// Item creation time, carried so a fresh score can be derived on read
    pub created_at: DateTime<Utc>,
    /// When the aggregate row was last recomputed
    pub last_updated: DateTime<Utc>,
}

/// Engagement counts plus the freshly computed popularity score, as returned
/// by the batch popularity endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PopularitySnapshot {
    pub likes_count: u64,
    pub bookmarks_count: u64,
    pub views_count: u64,
    pub popularity_score: f64,
    pub last_updated: DateTime<Utc>,
}

/// Result of a view-recording attempt.
///
/// `recorded` is false when the (item, viewer, day) view already exists;
/// that is a successful no-op, not a failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewOutcome {
    pub recorded: bool,
}

/// Who is viewing an item. Anonymous views share one daily bucket per item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    User(Uuid),
    Anonymous,
}

impl Viewer {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Viewer::User(id) => Some(*id),
            Viewer::Anonymous => None,
        }
    }
}

impl From<Option<Uuid>> for Viewer {
    fn from(user_id: Option<Uuid>) -> Self {
        match user_id {
            Some(id) => Viewer::User(id),
            None => Viewer::Anonymous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_from_optional_user_id() {
        let id = Uuid::new_v4();
        assert_eq!(Viewer::from(Some(id)), Viewer::User(id));
        assert_eq!(Viewer::from(None), Viewer::Anonymous);
        assert_eq!(Viewer::User(id).user_id(), Some(id));
        assert_eq!(Viewer::Anonymous.user_id(), None);
    }

    #[test]
    fn test_view_outcome_serialization() {
        let outcome = ViewOutcome { recorded: false };
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(json, r#"{"recorded":false}"#);
    }
}
