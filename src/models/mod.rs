pub mod engagement;
pub mod item;
pub mod preference;

pub use engagement::{EngagementStats, PopularitySnapshot, ViewOutcome, Viewer};
pub use item::{FeedEntry, FeedItem};
pub use preference::{CategoryInteraction, CategoryPreference, InteractionKind};
