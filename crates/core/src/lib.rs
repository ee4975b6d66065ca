#![allow(clippy::should_implement_trait)]
pub mod error;
pub mod route;
pub mod types;

pub use error::{ContentRefError, RouteError};
pub use types::{ContentKind, ContentRef, EpisodeKey, PersistedPreference, TitleKind, WatchlistEntry};
