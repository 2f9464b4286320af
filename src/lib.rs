//! aso-monitor - App Store keyword rank monitor
//!
//! Tracks the search ranking of a target app across keywords and countries,
//! persists the observed rankings, and posts per-country tables to Telegram.

pub mod appstore;
pub mod commands;
pub mod config;
pub mod countries;
pub mod format;
pub mod state;
pub mod telegram;

pub use appstore::models::{App, ChartEntry, ChartKind, Suggestion};
pub use appstore::{NodeScraper, StoreSearch};
pub use config::Config;
pub use state::RankRecord;
