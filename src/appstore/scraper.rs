//! Store access through the `app-store-scraper` Node library, invoked as a
//! subprocess with a generated ES-module one-liner.

use crate::appstore::models::{App, Suggestion};
use crate::countries;
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Errors from the scraper subprocess.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("failed to launch node: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("scraper exited with {status}: {stderr}")]
    Exit { status: std::process::ExitStatus, stderr: String },

    #[error("malformed scraper output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Store search operations. A trait so commands can be tested against a
/// scripted implementation instead of the real subprocess.
#[async_trait]
pub trait StoreSearch: Send + Sync {
    /// Search results for a term, in ranking order, up to `limit`.
    async fn search(&self, term: &str, country: &str, limit: u32) -> Result<Vec<App>>;

    /// Autocomplete suggestions for a term.
    async fn suggest(&self, term: &str, country: &str) -> Result<Vec<Suggestion>>;

    /// A chart collection, in ranking order. `category` 0 means all.
    async fn list(
        &self,
        country: &str,
        collection: &str,
        category: u32,
        limit: u32,
    ) -> Result<Vec<App>>;

    /// Store listing details for a single bundle id.
    async fn lookup(&self, bundle_id: &str, country: &str) -> Result<App>;
}

/// Shells out to `node --input-type=module -e <script>`.
pub struct NodeScraper {
    node_bin: String,
}

impl NodeScraper {
    pub fn new() -> Self {
        Self { node_bin: "node".to_string() }
    }

    /// Custom node binary, mainly for environments where `node` is not on
    /// the default PATH.
    pub fn with_node_bin(node_bin: impl Into<String>) -> Self {
        Self { node_bin: node_bin.into() }
    }

    async fn run<T: DeserializeOwned>(&self, script: &str) -> Result<T, ScrapeError> {
        debug!("Running scraper script ({} bytes)", script.len());

        let output = Command::new(&self.node_bin)
            .arg("--input-type=module")
            .arg("-e")
            .arg(script)
            .output()
            .await?;

        if !output.status.success() {
            return Err(ScrapeError::Exit {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

impl Default for NodeScraper {
    fn default() -> Self {
        Self::new()
    }
}

/// Rejects anything that is not a two-letter code before it is spliced into
/// the generated script.
fn checked_country(country: &str) -> Result<String> {
    if !countries::is_valid_code(country) {
        bail!("Invalid country code: {}", country);
    }
    Ok(country.to_lowercase())
}

/// JSON-encodes a user-supplied string so it splices into the script as a
/// literal, never as code.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn search_script(term: &str, country: &str, limit: u32) -> String {
    format!(
        r#"import store from 'app-store-scraper';
store.search({{ term: {term}, country: {country}, num: {limit} }})
  .then(results => console.log(JSON.stringify(results)))
  .catch(err => {{ console.error("ERR", err.message); process.exit(1); }});"#,
        term = js_string(term),
        country = js_string(country),
        limit = limit,
    )
}

fn suggest_script(term: &str, country: &str) -> String {
    format!(
        r#"import store from 'app-store-scraper';
store.suggest({{ term: {term}, country: {country} }})
  .then(results => console.log(JSON.stringify(results)))
  .catch(err => {{ console.error("ERR", err.message); process.exit(1); }});"#,
        term = js_string(term),
        country = js_string(country),
    )
}

fn app_script(bundle_id: &str, country: &str) -> String {
    format!(
        r#"import store from 'app-store-scraper';
store.app({{ appId: {bundle_id}, country: {country} }})
  .then(result => console.log(JSON.stringify(result)))
  .catch(err => {{ console.error("ERR", err.message); process.exit(1); }});"#,
        bundle_id = js_string(bundle_id),
        country = js_string(country),
    )
}

fn list_script(country: &str, collection: &str, category: u32, limit: u32) -> String {
    let category_field =
        if category == 0 { String::new() } else { format!(" category: {},", category) };
    format!(
        r#"import store from 'app-store-scraper';
store.list({{ country: {country},{category} collection: {collection}, num: {limit} }})
  .then(results => console.log(JSON.stringify(results)))
  .catch(err => {{ console.error("ERR", err.message); process.exit(1); }});"#,
        country = js_string(country),
        category = category_field,
        collection = js_string(collection),
        limit = limit,
    )
}

#[async_trait]
impl StoreSearch for NodeScraper {
    async fn search(&self, term: &str, country: &str, limit: u32) -> Result<Vec<App>> {
        let country = checked_country(country)?;
        Ok(self.run(&search_script(term, &country, limit)).await?)
    }

    async fn suggest(&self, term: &str, country: &str) -> Result<Vec<Suggestion>> {
        let country = checked_country(country)?;
        Ok(self.run(&suggest_script(term, &country)).await?)
    }

    async fn list(
        &self,
        country: &str,
        collection: &str,
        category: u32,
        limit: u32,
    ) -> Result<Vec<App>> {
        let country = checked_country(country)?;
        Ok(self.run::<Vec<App>>(&list_script(&country, collection, category, limit)).await?)
    }

    async fn lookup(&self, bundle_id: &str, country: &str) -> Result<App> {
        let country = checked_country(country)?;
        Ok(self.run(&app_script(bundle_id, &country)).await?)
    }
}
