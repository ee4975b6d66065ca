pub mod settings;
pub mod watch_progress;
pub mod watchlist;
