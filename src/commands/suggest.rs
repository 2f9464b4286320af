//! Collects search-box autocomplete suggestions across the configured
//! markets and flags the ones containing watched terms.

use crate::appstore::{NodeScraper, StoreSearch};
use crate::config::{Config, Keywords};
use crate::countries::country_name;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// country -> keyword -> suggested terms
pub type SuggestionMap = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// A suggestion that contains one of the watched substrings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchHit {
    pub keyword: String,
    pub suggestion: String,
}

#[derive(Debug, Serialize)]
pub struct SuggestReport {
    pub generated_at: String,
    pub countries: usize,
    pub keywords: usize,
    pub suggestions: SuggestionMap,
    pub hits: BTreeMap<String, Vec<WatchHit>>,
}

pub struct SuggestCommand {
    config: Config,
}

impl SuggestCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn execute(&self) -> Result<()> {
        let scraper = NodeScraper::new();
        let report = self.execute_with(&scraper, Path::new("data/results")).await?;

        for (country, hits) in &report.hits {
            info!("🔎 {} watched suggestions in {}:", hits.len(), country_name(country));
            for hit in hits {
                info!("   '{}' -> '{}'", hit.keyword, hit.suggestion);
            }
        }

        Ok(())
    }

    /// Collects suggestions, writes the snapshot and summary files into
    /// `out_dir`, and returns the report.
    pub async fn execute_with(
        &self,
        search: &impl StoreSearch,
        out_dir: &Path,
    ) -> Result<SuggestReport> {
        let keywords = Keywords::load(&self.config.keywords_file)?;
        let countries = keywords.countries_excluding(&self.config.home_country);
        if countries.is_empty() {
            bail!("No countries to collect suggestions for");
        }

        let mut suggestions: SuggestionMap = BTreeMap::new();

        for country in &countries {
            info!("🌍 Collecting suggestions for {}", country_name(country));
            let per_country = suggestions.entry(country.clone()).or_default();

            for (keyword, _) in keywords.iter() {
                let terms = match search.suggest(keyword, country).await {
                    Ok(results) => results.into_iter().map(|s| s.term).collect(),
                    Err(e) => {
                        warn!("❌ Suggest failed for '{}' | {}: {}", keyword, country, e);
                        Vec::new()
                    }
                };

                per_country.insert(keyword.to_string(), terms);

                if self.config.fetch_delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(self.config.fetch_delay_ms)).await;
                }
            }
        }

        let hits = find_watch_hits(&suggestions, &self.config.watch_terms);

        let report = SuggestReport {
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            countries: countries.len(),
            keywords: keywords.len(),
            suggestions,
            hits,
        };

        self.write_snapshots(&report, out_dir)?;

        Ok(report)
    }

    fn write_snapshots(&self, report: &SuggestReport, out_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create {}", out_dir.display()))?;

        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");

        let snapshot = out_dir.join(format!("suggestions_app_{}.json", stamp));
        std::fs::write(&snapshot, serde_json::to_string_pretty(&report.suggestions)?)
            .with_context(|| format!("Failed to write {}", snapshot.display()))?;
        info!("💾 Suggestions saved to {}", snapshot.display());

        let summary = out_dir.join(format!("suggestions_summary_{}.json", stamp));
        std::fs::write(&summary, serde_json::to_string_pretty(report)?)
            .with_context(|| format!("Failed to write {}", summary.display()))?;
        info!("💾 Summary saved to {}", summary.display());

        Ok(())
    }
}

/// Case-insensitive substring scan of every suggestion against the watch
/// terms, grouped by country.
pub fn find_watch_hits(
    suggestions: &SuggestionMap,
    watch_terms: &[String],
) -> BTreeMap<String, Vec<WatchHit>> {
    let watch: Vec<String> = watch_terms.iter().map(|t| t.to_lowercase()).collect();
    let mut hits: BTreeMap<String, Vec<WatchHit>> = BTreeMap::new();

    for (country, per_keyword) in suggestions {
        for (keyword, terms) in per_keyword {
            for term in terms {
                let lowered = term.to_lowercase();
                if watch.iter().any(|w| lowered.contains(w)) {
                    hits.entry(country.clone()).or_default().push(WatchHit {
                        keyword: keyword.clone(),
                        suggestion: term.clone(),
                    });
                }
            }
        }
    }

    hits
}
