use serde::{Deserialize, Serialize};

/// The kind of interaction a user had with an item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Like,
    Bookmark,
}

/// One like or bookmark, joined to the category of the item's parent wishlist.
///
/// The category is optional because wishlists are not required to declare one;
/// uncategorized interactions are excluded from the preference tally.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryInteraction {
    pub category: Option<String>,
    pub kind: InteractionKind,
}

/// One entry of a user's inferred taste profile.
///
/// A list of these, sorted descending by score, is recomputed on demand from
/// the user's interaction history and never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryPreference {
    pub category: String,
    pub score: f64,
}
