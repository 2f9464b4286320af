//! The monitor pass and its continuous-mode driver.

use crate::appstore::{rank_of, NodeScraper, StoreSearch};
use crate::config::{Config, Keywords, RepoConfig, TelegramConfig};
use crate::countries::country_name;
use crate::format::{render, sort_rows, RankRow};
use crate::state::store::select_store;
use crate::state::{
    format_rank, format_transition, now_string, state_key, LocalStore, RankRecord, StateStore,
    StateTable,
};
use crate::telegram::{format_message, TelegramClient};
use anyhow::{Context, Result};
use rand::RngExt;
use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;
use tracing::{info, warn};

/// Drives monitor passes: continuously with a sleep between passes, or a
/// fixed number of times.
pub struct MonitorCommand {
    config: Config,
}

impl MonitorCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs `iterations` passes, or forever when `None`.
    pub async fn run(&self, iterations: Option<u64>) -> Result<()> {
        let telegram = match TelegramConfig::resolve(&self.config) {
            Some(config) => Some(TelegramClient::new(&config)?),
            None => {
                warn!("⚠️ Telegram not configured, reports go to the log only");
                None
            }
        };

        let local = LocalStore::new(&self.config.state_file, &self.config.message_ids_file);
        let repo = RepoConfig::from_env();
        if repo.is_none() {
            info!("💾 No repository credentials, using local state files");
        }
        let store = select_store(repo.as_ref(), local)?;

        let scraper = NodeScraper::new();
        self.run_with(&scraper, store.as_ref(), telegram.as_ref(), iterations).await
    }

    /// Same as [`run`](Self::run), with every collaborator injectable.
    pub async fn run_with(
        &self,
        search: &impl StoreSearch,
        store: &dyn StateStore,
        telegram: Option<&TelegramClient>,
        iterations: Option<u64>,
    ) -> Result<()> {
        let keywords = Keywords::load(&self.config.keywords_file)
            .context("Cannot monitor without a keywords file")?;

        info!("🚀 Monitoring {} ({} keywords, limit {})",
            self.config.bundle_id, keywords.len(), self.config.limit);

        let continuous = iterations.is_none();
        if continuous {
            if let Some(client) = telegram {
                let announcement = format!(
                    "🚀 App Store monitor started for {} with {} keywords",
                    self.config.bundle_id,
                    keywords.len()
                );
                if let Err(e) = client.send(&announcement).await {
                    warn!("❌ Failed to announce start: {}", e);
                }
            }
        }

        let mut iteration = 0u64;
        loop {
            iteration += 1;
            info!("🔄 Pass #{} - {}", iteration, now_string());

            self.run_pass(search, store, telegram, &keywords).await?;

            info!("✅ Pass #{} complete", iteration);

            if let Some(max) = iterations {
                if iteration >= max {
                    return Ok(());
                }
            }

            countdown(self.config.interval_secs).await;
        }
    }

    /// One full pass: fetch every (keyword, country) pair, update state,
    /// publish one table per country, persist.
    async fn run_pass(
        &self,
        search: &impl StoreSearch,
        store: &dyn StateStore,
        telegram: Option<&TelegramClient>,
        keywords: &Keywords,
    ) -> Result<()> {
        let prev_state = store.load_state().await;
        let mut current_state = StateTable::new();
        // BTreeMap keys are the uppercase codes, so countries publish sorted
        let mut grouped: BTreeMap<String, Vec<RankRow>> = BTreeMap::new();
        let now = now_string();

        for (keyword, countries) in keywords.iter() {
            for country in countries {
                let key = state_key(country, keyword);
                let prev = prev_state.get(&key).cloned();
                let prev_rank = prev.as_ref().and_then(|record| record.last_rank);

                info!("🔍 Checking '{}' | {}", keyword, country_name(country));

                let rank = match search.search(keyword, country, self.config.limit).await {
                    Ok(apps) => {
                        let rank = rank_of(&apps, &self.config.bundle_id);
                        match rank {
                            Some(r) => info!("✅ Found at #{}", r),
                            None => info!("❌ Not in the top {}", self.config.limit),
                        }
                        rank
                    }
                    Err(e) => {
                        warn!("❌ Fetch failed for '{}' | {}: {}", keyword, country, e);
                        None
                    }
                };

                let record = RankRecord::update(prev, rank, &now);

                grouped.entry(country.to_uppercase()).or_default().push(RankRow {
                    position: None,
                    keyword: keyword.to_string(),
                    initial: format_rank(record.initial_rank),
                    now: format_transition(prev_rank, rank),
                    updated: record.last_change_time.clone().unwrap_or_else(|| "x".to_string()),
                });

                current_state.insert(key, record);

                self.fetch_delay().await;
            }
        }

        let mut message_ids = store.load_message_ids().await;

        for (country, mut rows) in grouped {
            sort_rows(&mut rows);

            let table = render(&rows, &self.config.table);
            let name = country_name(&country);
            let message = format_message(&name, &table, &now_string());

            match telegram {
                Some(client) => match client.send(&message).await {
                    Ok(message_id) => {
                        message_ids.insert(country.clone(), message_id);
                        info!("✅ Report for {} posted", name);
                    }
                    Err(e) => warn!("❌ Failed to post report for {}: {}", name, e),
                },
                None => info!("💬 Report for {}:\n{}", name, table),
            }
        }

        if let Err(e) = store.save_message_ids(&message_ids).await {
            warn!("❌ Failed to save message ids: {}", e);
        }
        if let Err(e) = store.save_state(&current_state).await {
            warn!("❌ Failed to save state: {}", e);
        }

        Ok(())
    }

    /// Courtesy delay between store fetches.
    async fn fetch_delay(&self) {
        if self.config.fetch_delay_ms == 0 {
            return;
        }

        let jitter = if self.config.fetch_jitter_ms > 0 {
            rand::rng().random_range(0..=self.config.fetch_jitter_ms)
        } else {
            0
        };

        tokio::time::sleep(Duration::from_millis(self.config.fetch_delay_ms + jitter)).await;
    }
}

/// Live countdown on stdout until the next pass.
async fn countdown(seconds: u64) {
    for remaining in (1..=seconds).rev() {
        let (h, m, s) = (remaining / 3600, (remaining % 3600) / 60, remaining % 60);
        print!("\r⏳ Next pass in {:02}:{:02}:{:02} ", h, m, s);
        let _ = std::io::stdout().flush();
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    print!("\r{}\r", " ".repeat(40));
    let _ = std::io::stdout().flush();
}
