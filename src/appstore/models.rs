//! Data models for App Store search results, charts, and suggestions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One app as returned by the store search/list endpoints. Only the fields
/// the monitor cares about; everything else in the payload is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    /// Bundle identifier
    #[serde(rename = "appId")]
    pub app_id: String,
    /// Display title
    #[serde(default)]
    pub title: String,
    /// Average rating
    #[serde(default)]
    pub score: Option<f64>,
    /// Review count
    #[serde(default)]
    pub reviews: Option<u64>,
    /// Price, 0.0 for free apps
    #[serde(default)]
    pub price: Option<f64>,
}

/// 1-based position of the target app within the fetched result window,
/// or `None` when it is not in the window.
pub fn rank_of(apps: &[App], bundle_id: &str) -> Option<u32> {
    apps.iter().position(|app| app.app_id == bundle_id).map(|idx| idx as u32 + 1)
}

/// One search-box autocomplete suggestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub term: String,
}

/// Store chart collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    TopFree,
    TopPaid,
    New,
    TopGrossing,
}

impl ChartKind {
    /// Collection name as the store API expects it.
    pub fn collection(&self) -> &'static str {
        match self {
            ChartKind::TopFree => "topfreeapplications",
            ChartKind::TopPaid => "toppaidapplications",
            ChartKind::New => "newapplications",
            ChartKind::TopGrossing => "topgrossingapplications",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChartKind::TopFree => "Top Free",
            ChartKind::TopPaid => "Top Paid",
            ChartKind::New => "New Apps",
            ChartKind::TopGrossing => "Top Grossing",
        }
    }

    pub fn all() -> &'static [ChartKind] {
        &[ChartKind::TopFree, ChartKind::TopPaid, ChartKind::New, ChartKind::TopGrossing]
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.collection())
    }
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "topfreeapplications" | "free" => Ok(ChartKind::TopFree),
            "toppaidapplications" | "paid" => Ok(ChartKind::TopPaid),
            "newapplications" | "new" => Ok(ChartKind::New),
            "topgrossingapplications" | "grossing" => Ok(ChartKind::TopGrossing),
            _ => Err(format!("Unknown chart: {}. Use: free, paid, new, grossing", s)),
        }
    }
}

/// A located chart position for the target app.
#[derive(Debug, Clone, Serialize)]
pub struct ChartEntry {
    pub position: u32,
    pub collection: String,
    pub country: String,
    pub total_apps: usize,
    pub app: ChartAppInfo,
}

/// Condensed app details attached to a chart hit.
#[derive(Debug, Clone, Serialize)]
pub struct ChartAppInfo {
    pub name: String,
    pub rating: Option<f64>,
    pub reviews: Option<u64>,
    pub price: Option<f64>,
}

impl ChartEntry {
    pub fn locate(
        apps: &[App],
        bundle_id: &str,
        collection: &str,
        country: &str,
    ) -> Option<ChartEntry> {
        let position = rank_of(apps, bundle_id)?;
        let app = &apps[(position - 1) as usize];

        Some(ChartEntry {
            position,
            collection: collection.to_string(),
            country: country.to_string(),
            total_apps: apps.len(),
            app: ChartAppInfo {
                name: app.title.clone(),
                rating: app.score,
                reviews: app.reviews,
                price: app.price,
            },
        })
    }
}

/// Store category ids for category-chart lookups.
const CATEGORIES: &[(u32, &str)] = &[
    (6000, "Business"),
    (6001, "Weather"),
    (6002, "Utilities"),
    (6003, "Travel"),
    (6004, "Sports"),
    (6005, "Social Networking"),
    (6006, "Reference"),
    (6007, "Productivity"),
    (6008, "Photo & Video"),
    (6009, "News"),
    (6010, "Navigation"),
    (6011, "Music"),
    (6012, "Lifestyle"),
    (6013, "Health & Fitness"),
    (6014, "Games"),
    (6015, "Finance"),
    (6016, "Entertainment"),
    (6017, "Education"),
    (6018, "Books"),
    (6019, "Medical"),
    (6020, "Newsstand"),
    (6021, "Catalogs"),
    (6022, "Food & Drink"),
    (6023, "Shopping"),
    (6024, "Stickers"),
    (6025, "Developer Tools"),
    (6026, "Graphics & Design"),
    (6027, "Video Players & Editors"),
    (6028, "Magazines & Newspapers"),
];

/// Category display name, or `"Category {id}"` for unknown ids.
pub fn category_name(category_id: u32) -> String {
    CATEGORIES
        .iter()
        .find(|(id, _)| *id == category_id)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| format!("Category {}", category_id))
}
