//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::format::TableConfig;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bundle id of the app whose rank is tracked
    #[serde(default = "default_bundle_id")]
    pub bundle_id: String,

    /// Default storefront country for one-off lookups
    #[serde(default = "default_country")]
    pub country: String,

    /// Search result window; ranks beyond it count as not found
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Courtesy delay between store fetches in milliseconds
    #[serde(default = "default_fetch_delay_ms")]
    pub fetch_delay_ms: u64,

    /// Random jitter added to the fetch delay (0 to this value)
    #[serde(default)]
    pub fetch_jitter_ms: u64,

    /// Sleep between passes in continuous mode
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Keyword-to-countries mapping file
    #[serde(default = "default_keywords_file")]
    pub keywords_file: PathBuf,

    /// Local state file
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    /// Local message-id file
    #[serde(default = "default_message_ids_file")]
    pub message_ids_file: PathBuf,

    /// Home-market country excluded from suggestion collection
    #[serde(default = "default_home_country")]
    pub home_country: String,

    /// Substrings flagged in the suggestion report
    #[serde(default = "default_watch_terms")]
    pub watch_terms: Vec<String>,

    /// Output format for one-off lookups
    #[serde(default)]
    pub format: OutputFormat,

    /// Report table rendering
    #[serde(default)]
    pub table: TableConfig,

    /// Telegram credentials; environment variables take precedence
    #[serde(default)]
    pub telegram: Option<TelegramSection>,
}

fn default_bundle_id() -> String {
    "com.kotiuzhynskyi.CameraTranslator".to_string()
}

fn default_country() -> String {
    "us".to_string()
}

fn default_limit() -> u32 {
    250
}

fn default_fetch_delay_ms() -> u64 {
    2000
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_keywords_file() -> PathBuf {
    PathBuf::from("data/config/keywords.json")
}

fn default_state_file() -> PathBuf {
    PathBuf::from("data/results/last_state.json")
}

fn default_message_ids_file() -> PathBuf {
    PathBuf::from("data/config/message_ids.json")
}

fn default_home_country() -> String {
    "ru".to_string()
}

fn default_watch_terms() -> Vec<String> {
    vec!["translator".to_string(), "translation".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bundle_id: default_bundle_id(),
            country: default_country(),
            limit: default_limit(),
            fetch_delay_ms: default_fetch_delay_ms(),
            fetch_jitter_ms: 0,
            interval_secs: default_interval_secs(),
            keywords_file: default_keywords_file(),
            state_file: default_state_file(),
            message_ids_file: default_message_ids_file(),
            home_country: default_home_country(),
            watch_terms: default_watch_terms(),
            format: OutputFormat::Table,
            table: TableConfig::default(),
            telegram: None,
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // 1. Explicit path takes precedence
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // 2. Try current directory
        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        // 3. Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("aso-monitor").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        // 4. Return default config
        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(bundle_id) = std::env::var("ASO_BUNDLE_ID") {
            self.bundle_id = bundle_id;
        }

        if let Ok(country) = std::env::var("ASO_COUNTRY") {
            self.country = country;
        }

        if let Ok(limit) = std::env::var("ASO_LIMIT") {
            if let Ok(l) = limit.parse() {
                self.limit = l;
            }
        }

        if let Ok(delay) = std::env::var("ASO_DELAY") {
            if let Ok(d) = delay.parse() {
                self.fetch_delay_ms = d;
            }
        }

        if let Ok(interval) = std::env::var("ASO_INTERVAL") {
            if let Ok(i) = interval.parse() {
                self.interval_secs = i;
            }
        }

        self
    }
}

/// Telegram credentials as they appear in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramSection {
    pub token: String,
    pub chat_id: String,
    #[serde(default)]
    pub topic_id: Option<String>,
}

/// Resolved Telegram credentials.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
    pub topic_id: Option<String>,
}

impl TelegramConfig {
    /// Resolves credentials: environment variables first, then the config
    /// file. `None` disables messaging.
    pub fn resolve(config: &Config) -> Option<Self> {
        let env_token = std::env::var("TELEGRAM_TOKEN").ok();
        let env_chat_id = std::env::var("TELEGRAM_CHAT_ID").ok();

        if let (Some(token), Some(chat_id)) = (env_token, env_chat_id) {
            info!("📱 Using Telegram credentials from environment");
            return Some(Self {
                token,
                chat_id,
                topic_id: std::env::var("TELEGRAM_TOPIC_ID").ok(),
            });
        }

        let section = config.telegram.as_ref()?;
        if section.token.is_empty() || section.token == "YOUR_BOT_TOKEN" {
            return None;
        }

        Some(Self {
            token: section.token.clone(),
            chat_id: section.chat_id.clone(),
            topic_id: section.topic_id.clone(),
        })
    }
}

/// Credentials for the repository-backed state store.
#[derive(Debug, Clone)]
pub struct RepoConfig {
    pub token: String,
    pub repository: String,
}

impl RepoConfig {
    /// Reads `GITHUB_TOKEN` and `GITHUB_REPOSITORY`; both are required for
    /// remote persistence.
    pub fn from_env() -> Option<Self> {
        let token = std::env::var("GITHUB_TOKEN").ok()?;
        let repository = std::env::var("GITHUB_REPOSITORY").ok()?;
        Some(Self { token, repository })
    }
}

/// Keyword-to-countries mapping, in file insertion order.
#[derive(Debug, Clone, Default)]
pub struct Keywords(Vec<(String, Vec<String>)>);

impl Keywords {
    /// Loads the keywords file. Its absence is a hard error: there is
    /// nothing to monitor without it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("❌ Keywords file not found: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse keywords file: {}", path.display()))
    }

    /// Parses the JSON object, keeping key order as written.
    pub fn from_json(content: &str) -> Result<Self> {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(content)?;

        let mut entries = Vec::with_capacity(map.len());
        for (keyword, value) in map {
            let countries: Vec<String> = serde_json::from_value(value)
                .with_context(|| format!("Keyword '{}' must map to a country list", keyword))?;
            if countries.is_empty() {
                bail!("Keyword '{}' has no countries", keyword);
            }
            entries.push((keyword, countries));
        }

        Ok(Self(entries))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(kw, countries)| (kw.as_str(), countries.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total (keyword, country) pair count for a pass.
    pub fn pair_count(&self) -> usize {
        self.0.iter().map(|(_, countries)| countries.len()).sum()
    }

    /// Sorted union of every configured country, minus the home market.
    pub fn countries_excluding(&self, home: &str) -> Vec<String> {
        let home = home.to_lowercase();
        let mut countries: Vec<String> = self
            .0
            .iter()
            .flat_map(|(_, list)| list.iter())
            .map(|c| c.to_lowercase())
            .filter(|c| *c != home)
            .collect();
        countries.sort();
        countries.dedup();
        countries
    }
}

/// Output format for one-off lookups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use: table, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
