//! State persistence: local JSON files, or a GitHub-hosted file via the
//! contents API with local fallback.

use crate::config::RepoConfig;
use crate::state::record::{RankRecord, StoredRecord};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use wreq::Client;

/// Mapping from `"{country}|{keyword}"` to ranking history. Loaded at pass
/// start, replaced wholesale at pass end.
pub type StateTable = BTreeMap<String, RankRecord>;

/// Mapping from uppercase country code to the last posted Telegram message
/// id. Write-only telemetry at present.
pub type MessageIdTable = BTreeMap<String, i64>;

/// Durable storage for the state and message-id tables.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the state table. Missing or unreadable state yields an empty
    /// table; a pass never aborts over prior state.
    async fn load_state(&self) -> StateTable;

    async fn save_state(&self, state: &StateTable) -> Result<()>;

    async fn load_message_ids(&self) -> MessageIdTable;

    async fn save_message_ids(&self, ids: &MessageIdTable) -> Result<()>;
}

/// JSON files on the local filesystem.
pub struct LocalStore {
    state_path: PathBuf,
    message_ids_path: PathBuf,
}

impl LocalStore {
    pub fn new(state_path: impl Into<PathBuf>, message_ids_path: impl Into<PathBuf>) -> Self {
        Self { state_path: state_path.into(), message_ids_path: message_ids_path.into() }
    }

    fn read_json<T: serde::de::DeserializeOwned + Default>(path: &Path) -> T {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} not found, starting empty", path.display());
                return T::default();
            }
            Err(e) => {
                warn!("❌ Failed to read {}: {}", path.display(), e);
                return T::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                warn!("❌ Failed to parse {}: {}", path.display(), e);
                T::default()
            }
        }
    }

    fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(value)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

#[async_trait]
impl StateStore for LocalStore {
    async fn load_state(&self) -> StateTable {
        let raw: BTreeMap<String, StoredRecord> = Self::read_json(&self.state_path);
        raw.into_iter().map(|(key, stored)| (key, stored.normalize())).collect()
    }

    async fn save_state(&self, state: &StateTable) -> Result<()> {
        Self::write_json(&self.state_path, state)
    }

    async fn load_message_ids(&self) -> MessageIdTable {
        Self::read_json(&self.message_ids_path)
    }

    async fn save_message_ids(&self, ids: &MessageIdTable) -> Result<()> {
        Self::write_json(&self.message_ids_path, ids)
    }
}

/// The same JSON documents stored as files in a GitHub repository, read and
/// written through the contents API. Every remote failure degrades to the
/// wrapped local store.
pub struct RepoStore {
    client: Client,
    token: String,
    repo: String,
    branch: String,
    base_url: String,
    state_repo_path: String,
    message_ids_repo_path: String,
    fallback: LocalStore,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: Option<String>,
    sha: String,
}

impl RepoStore {
    pub fn new(repo: &RepoConfig, fallback: LocalStore) -> Result<Self> {
        Self::with_base_url(repo, fallback, "https://api.github.com".to_string())
    }

    /// Custom API base URL hook for tests.
    pub fn with_base_url(
        repo: &RepoConfig,
        fallback: LocalStore,
        base_url: String,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build GitHub HTTP client")?;

        Ok(Self {
            client,
            token: repo.token.clone(),
            repo: repo.repository.clone(),
            branch: "main".to_string(),
            base_url,
            state_repo_path: "data/results/last_state.json".to_string(),
            message_ids_repo_path: "data/config/message_ids.json".to_string(),
            fallback,
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!("{}/repos/{}/contents/{}", self.base_url, self.repo, path)
    }

    /// Fetches a repository file: decoded content plus its blob `sha`.
    /// `Ok(None)` when the file does not exist yet.
    async fn get_file(&self, path: &str) -> Result<Option<(String, String)>> {
        let response = self
            .client
            .get(self.contents_url(path))
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", "aso-monitor")
            .send()
            .await
            .context("GitHub contents GET failed")?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            bail!("GitHub contents GET returned {}", status);
        }

        let body: ContentsResponse =
            response.json().await.context("Malformed GitHub contents response")?;

        let encoded: String = body
            .content
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        let decoded = BASE64.decode(encoded).context("Invalid base64 content")?;
        let content = String::from_utf8(decoded).context("Content is not UTF-8")?;

        Ok(Some((content, body.sha)))
    }

    /// Creates or updates a repository file, passing the current `sha` when
    /// the file already exists.
    async fn put_file(&self, path: &str, content: &str, message: &str) -> Result<()> {
        let sha = self.get_file(path).await?.map(|(_, sha)| sha);

        let mut body = serde_json::json!({
            "message": message,
            "content": BASE64.encode(content.as_bytes()),
            "branch": self.branch,
        });
        if let Some(sha) = sha {
            body["sha"] = serde_json::Value::String(sha);
        }

        let response = self
            .client
            .put(self.contents_url(path))
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", "aso-monitor")
            .json(&body)
            .send()
            .await
            .context("GitHub contents PUT failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("GitHub contents PUT returned {}", status);
        }

        Ok(())
    }

    async fn load_json<T: serde::de::DeserializeOwned + Default>(&self, path: &str) -> Option<T> {
        match self.get_file(path).await {
            Ok(Some((content, _))) => match serde_json::from_str(&content) {
                Ok(value) => {
                    debug!("✅ Loaded {} from {}", path, self.repo);
                    Some(value)
                }
                Err(e) => {
                    warn!("❌ Failed to parse {} from repository: {}", path, e);
                    None
                }
            },
            Ok(None) => {
                warn!("⚠️ {} not found in repository, using local copy", path);
                None
            }
            Err(e) => {
                warn!("❌ Failed to load {} from repository: {}", path, e);
                None
            }
        }
    }
}

#[async_trait]
impl StateStore for RepoStore {
    async fn load_state(&self) -> StateTable {
        let raw: Option<BTreeMap<String, StoredRecord>> =
            self.load_json(&self.state_repo_path).await;

        match raw {
            Some(raw) => raw.into_iter().map(|(key, stored)| (key, stored.normalize())).collect(),
            None => self.fallback.load_state().await,
        }
    }

    async fn save_state(&self, state: &StateTable) -> Result<()> {
        let content = serde_json::to_string_pretty(state)?;
        let path = self.state_repo_path.clone();

        if let Err(e) = self.put_file(&path, &content, "Update ranking state").await {
            warn!("❌ Failed to save state to repository, saving locally: {}", e);
            return self.fallback.save_state(state).await;
        }

        debug!("✅ State saved to {}:{}", self.repo, path);
        Ok(())
    }

    async fn load_message_ids(&self) -> MessageIdTable {
        match self.load_json(&self.message_ids_repo_path).await {
            Some(ids) => ids,
            None => self.fallback.load_message_ids().await,
        }
    }

    async fn save_message_ids(&self, ids: &MessageIdTable) -> Result<()> {
        let content = serde_json::to_string_pretty(ids)?;
        let path = self.message_ids_repo_path.clone();

        if let Err(e) = self.put_file(&path, &content, "Update message ids").await {
            warn!("❌ Failed to save message ids to repository, saving locally: {}", e);
            return self.fallback.save_message_ids(ids).await;
        }

        Ok(())
    }
}

/// Picks the backing store: the repository when credentials are configured,
/// local files otherwise.
pub fn select_store(repo: Option<&RepoConfig>, local: LocalStore) -> Result<Box<dyn StateStore>> {
    match repo {
        Some(repo) => Ok(Box::new(RepoStore::new(repo, local)?)),
        None => Ok(Box::new(local)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn temp_store(dir: &tempfile::TempDir) -> LocalStore {
        LocalStore::new(dir.path().join("last_state.json"), dir.path().join("message_ids.json"))
    }

    fn repo_config() -> RepoConfig {
        RepoConfig { token: "t0ken".to_string(), repository: "owner/rankings".to_string() }
    }

    #[tokio::test]
    async fn test_local_store_missing_files_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);

        assert!(store.load_state().await.is_empty());
        assert!(store.load_message_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_local_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);

        let mut state = StateTable::new();
        state.insert(
            "us|translate".to_string(),
            RankRecord {
                initial_rank: Some(42),
                last_rank: Some(40),
                last_change_time: Some("01 Jan 10:00".to_string()),
            },
        );
        store.save_state(&state).await.unwrap();

        let loaded = store.load_state().await;
        assert_eq!(loaded, state);

        let mut ids = MessageIdTable::new();
        ids.insert("US".to_string(), 12345);
        store.save_message_ids(&ids).await.unwrap();
        assert_eq!(store.load_message_ids().await, ids);
    }

    #[tokio::test]
    async fn test_local_store_normalizes_legacy_scalars() {
        let dir = tempfile::tempdir().unwrap();
        let state_path = dir.path().join("last_state.json");
        std::fs::write(&state_path, r#"{"us|translate": 7}"#).unwrap();

        let store = LocalStore::new(state_path, dir.path().join("ids.json"));
        let state = store.load_state().await;

        let record = state.get("us|translate").unwrap();
        assert_eq!(record.initial_rank, Some(7));
        assert_eq!(record.last_rank, Some(7));
        assert_eq!(record.last_change_time, None);
    }

    #[tokio::test]
    async fn test_local_store_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state_path = dir.path().join("last_state.json");
        std::fs::write(&state_path, "not json").unwrap();

        let store = LocalStore::new(state_path, dir.path().join("ids.json"));
        assert!(store.load_state().await.is_empty());
    }

    #[tokio::test]
    async fn test_repo_store_loads_base64_content() {
        let server = MockServer::start().await;
        let state_json = r#"{"us|translate": {"initial_rank": 42, "last_rank": 42, "last_change_time": null}}"#;
        // GitHub wraps base64 bodies at 60 columns; decoding must tolerate it.
        let mut encoded = BASE64.encode(state_json.as_bytes());
        encoded.insert(20, '\n');

        Mock::given(method("GET"))
            .and(path("/repos/owner/rankings/contents/data/results/last_state.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": encoded,
                "sha": "abc123",
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = RepoStore::with_base_url(&repo_config(), temp_store(&dir), server.uri()).unwrap();

        let state = store.load_state().await;
        assert_eq!(state.get("us|translate").unwrap().initial_rank, Some(42));
    }

    #[tokio::test]
    async fn test_repo_store_missing_file_falls_back_to_local() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let local = temp_store(&dir);
        let mut state = StateTable::new();
        state.insert("gb|translate".to_string(), RankRecord::default());
        local.save_state(&state).await.unwrap();

        let store = RepoStore::with_base_url(&repo_config(), temp_store(&dir), server.uri()).unwrap();
        let loaded = store.load_state().await;
        assert!(loaded.contains_key("gb|translate"));
    }

    #[tokio::test]
    async fn test_repo_store_save_includes_sha_of_existing_file() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/owner/rankings/contents/data/results/last_state.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": BASE64.encode(b"{}"),
                "sha": "oldsha",
            })))
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/repos/owner/rankings/contents/data/results/last_state.json"))
            .and(body_partial_json(serde_json::json!({"sha": "oldsha", "branch": "main"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = RepoStore::with_base_url(&repo_config(), temp_store(&dir), server.uri()).unwrap();

        store.save_state(&StateTable::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_repo_store_save_failure_falls_back_to_local() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = RepoStore::with_base_url(&repo_config(), temp_store(&dir), server.uri()).unwrap();

        let mut state = StateTable::new();
        state.insert("us|translate".to_string(), RankRecord::default());
        store.save_state(&state).await.unwrap();

        // Landed in the fallback store
        let local = temp_store(&dir);
        assert!(local.load_state().await.contains_key("us|translate"));
    }
}
