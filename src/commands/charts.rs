//! One-off lookup of the app's positions across the store charts.

use crate::appstore::{category_name, ChartEntry, ChartKind, NodeScraper, StoreSearch};
use crate::config::{Config, OutputFormat};
use crate::countries::country_name;
use anyhow::Result;
use tracing::{info, warn};

const CHART_WINDOW: u32 = 200;

/// Checks every chart collection for the configured bundle id.
pub struct ChartsCommand {
    config: Config,
}

impl ChartsCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn execute(&self, country: &str, category: Option<u32>) -> Result<String> {
        let scraper = NodeScraper::new();
        self.execute_with(&scraper, country, category).await
    }

    pub async fn execute_with(
        &self,
        search: &impl StoreSearch,
        country: &str,
        category: Option<u32>,
    ) -> Result<String> {
        let bundle_id = &self.config.bundle_id;

        match search.lookup(bundle_id, country).await {
            Ok(app) => info!(
                "📱 {} ({} / {} reviews)",
                app.title,
                app.score.map(|s| format!("{:.1}★", s)).unwrap_or_else(|| "unrated".to_string()),
                app.reviews.unwrap_or(0)
            ),
            Err(e) => warn!("⚠️ Could not fetch app details: {}", e),
        }

        let mut entries: Vec<ChartEntry> = Vec::new();

        for kind in ChartKind::all() {
            info!("📊 Checking {} in {}", kind.label(), country);

            match search.list(country, kind.collection(), 0, CHART_WINDOW).await {
                Ok(apps) => {
                    match ChartEntry::locate(&apps, bundle_id, kind.collection(), country) {
                        Some(entry) => {
                            info!("✅ {} at #{}", kind.label(), entry.position);
                            entries.push(entry);
                        }
                        None => info!("❌ Not in {} (top {})", kind.label(), apps.len()),
                    }
                }
                Err(e) => warn!("❌ Failed to fetch {}: {}", kind.label(), e),
            }
        }

        if let Some(category) = category {
            let collection = ChartKind::TopFree.collection();
            let label = format!("{}/{}", collection, category_name(category));
            info!("📊 Checking {} in {}", label, country);

            match search.list(country, collection, category, CHART_WINDOW).await {
                Ok(apps) => match ChartEntry::locate(&apps, bundle_id, &label, country) {
                    Some(entry) => {
                        info!("✅ {} at #{}", label, entry.position);
                        entries.push(entry);
                    }
                    None => info!("❌ Not in {} (top {})", label, apps.len()),
                },
                Err(e) => warn!("❌ Failed to fetch {}: {}", label, e),
            }
        }

        self.format_output(&entries, country)
    }

    fn format_output(&self, entries: &[ChartEntry], country: &str) -> Result<String> {
        match self.config.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(entries)?),
            OutputFormat::Table => {
                let mut out = format!(
                    "Chart positions for {} in {}:\n",
                    self.config.bundle_id,
                    country_name(country)
                );

                if entries.is_empty() {
                    out.push_str("  Not found in any chart.\n");
                } else {
                    for entry in entries {
                        out.push_str(&format!(
                            "  {:<40} #{} of {}\n",
                            entry.collection, entry.position, entry.total_apps
                        ));
                    }
                }

                Ok(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appstore::{App, Suggestion};
    use async_trait::async_trait;

    struct MockCharts {
        /// (collection, category) -> apps
        listings: Vec<((String, u32), Vec<App>)>,
    }

    #[async_trait]
    impl StoreSearch for MockCharts {
        async fn search(&self, _: &str, _: &str, _: u32) -> Result<Vec<App>> {
            Ok(Vec::new())
        }

        async fn suggest(&self, _: &str, _: &str) -> Result<Vec<Suggestion>> {
            Ok(Vec::new())
        }

        async fn list(
            &self,
            _country: &str,
            collection: &str,
            category: u32,
            _limit: u32,
        ) -> Result<Vec<App>> {
            self.listings
                .iter()
                .find(|((c, cat), _)| c == collection && *cat == category)
                .map(|(_, apps)| apps.clone())
                .ok_or_else(|| anyhow::anyhow!("listing unavailable"))
        }

        async fn lookup(&self, bundle_id: &str, _country: &str) -> Result<App> {
            Ok(make_apps(&[bundle_id]).remove(0))
        }
    }

    fn make_apps(ids: &[&str]) -> Vec<App> {
        ids.iter()
            .map(|id| App {
                app_id: id.to_string(),
                title: format!("App {}", id),
                score: Some(4.0),
                reviews: Some(10),
                price: Some(0.0),
            })
            .collect()
    }

    fn make_command(format: OutputFormat) -> ChartsCommand {
        ChartsCommand::new(Config {
            bundle_id: "com.example.target".to_string(),
            format,
            ..Config::default()
        })
    }

    #[tokio::test]
    async fn test_found_in_one_chart() {
        let search = MockCharts {
            listings: vec![
                (
                    ("topfreeapplications".to_string(), 0),
                    make_apps(&["com.other", "com.example.target"]),
                ),
                (("toppaidapplications".to_string(), 0), make_apps(&["com.other"])),
                (("newapplications".to_string(), 0), Vec::new()),
                (("topgrossingapplications".to_string(), 0), Vec::new()),
            ],
        };

        let out = make_command(OutputFormat::Table)
            .execute_with(&search, "us", None)
            .await
            .unwrap();

        assert!(out.contains("com.example.target"));
        assert!(out.contains("topfreeapplications"));
        assert!(out.contains("#2 of 2"));
        assert!(!out.contains("toppaidapplications"));
    }

    #[tokio::test]
    async fn test_category_chart_included() {
        let search = MockCharts {
            listings: vec![
                (("topfreeapplications".to_string(), 0), Vec::new()),
                (("toppaidapplications".to_string(), 0), Vec::new()),
                (("newapplications".to_string(), 0), Vec::new()),
                (("topgrossingapplications".to_string(), 0), Vec::new()),
                (
                    ("topfreeapplications".to_string(), 6007),
                    make_apps(&["com.example.target"]),
                ),
            ],
        };

        let out = make_command(OutputFormat::Table)
            .execute_with(&search, "us", Some(6007))
            .await
            .unwrap();

        assert!(out.contains("topfreeapplications/Productivity"));
        assert!(out.contains("#1 of 1"));
    }

    #[tokio::test]
    async fn test_fetch_errors_do_not_abort() {
        // No listings at all: every fetch errors, output degrades gracefully
        let search = MockCharts { listings: Vec::new() };

        let out = make_command(OutputFormat::Table)
            .execute_with(&search, "us", None)
            .await
            .unwrap();

        assert!(out.contains("Not found in any chart"));
    }

    #[tokio::test]
    async fn test_json_output() {
        let search = MockCharts {
            listings: vec![
                (
                    ("topfreeapplications".to_string(), 0),
                    make_apps(&["com.example.target"]),
                ),
                (("toppaidapplications".to_string(), 0), Vec::new()),
                (("newapplications".to_string(), 0), Vec::new()),
                (("topgrossingapplications".to_string(), 0), Vec::new()),
            ],
        };

        let out = make_command(OutputFormat::Json)
            .execute_with(&search, "us", None)
            .await
            .unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["position"], 1);
        assert_eq!(parsed[0]["collection"], "topfreeapplications");
        assert_eq!(parsed[0]["app"]["name"], "App com.example.target");
    }
}
