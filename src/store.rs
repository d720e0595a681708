//! Article persistence.
//!
//! The pipeline talks to storage only through [`ArticleStore`]: an existence
//! check keyed on the article's source URL and an insert that refuses
//! duplicates. [`JsonlStore`] keeps one JSON record per line in
//! `{store_dir}/articles.jsonl`.

use crate::error::StoreError;
use crate::models::StoredArticle;
use crate::utils::ensure_writable_dir;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

/// File name of the store inside its directory.
pub const STORE_FILE: &str = "articles.jsonl";

/// Storage collaborator used by the pipeline.
pub trait ArticleStore {
    /// Whether an article with this source URL is already stored.
    async fn exists(&self, source_url: &str) -> Result<bool, StoreError>;

    /// Persist `record`, returning its id. Fails with [`StoreError::Conflict`]
    /// when the source URL is already stored.
    async fn insert(&mut self, record: &StoredArticle) -> Result<u64, StoreError>;
}

#[derive(Debug, Deserialize, Serialize)]
struct StoredLine {
    id: u64,
    #[serde(flatten)]
    article: StoredArticle,
}

/// Append-only JSON-lines store.
#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,
    known_urls: HashSet<String>,
    next_id: u64,
}

impl JsonlStore {
    /// Open (or create) the store under `dir`, loading the URLs already stored.
    #[instrument(level = "info", skip_all, fields(%dir))]
    pub async fn open(dir: &str) -> Result<Self, Box<dyn Error>> {
        ensure_writable_dir(dir).await?;
        let path = PathBuf::from(dir).join(STORE_FILE);

        let mut known_urls = HashSet::new();
        let mut next_id = 1;
        match fs::read_to_string(&path).await {
            Ok(existing) => {
                let mut offset = 0;
                let mut lines = existing.split_inclusive('\n').peekable();
                while let Some(line) = lines.next() {
                    let start = offset;
                    offset += line.len();
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<StoredLine>(line) {
                        Ok(stored) => {
                            next_id = next_id.max(stored.id + 1);
                            known_urls.insert(stored.article.source_url);
                        }
                        // An append cut short leaves a partial last record.
                        Err(e) if lines.peek().is_none() => {
                            warn!(error = %e, offset = start, "Dropping partial final record");
                            truncate_file(&path, start as u64).await?;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        info!(path = %path.display(), articles = known_urls.len(), "Opened article store");
        Ok(Self {
            path,
            known_urls,
            next_id,
        })
    }

    /// Number of articles in the store.
    pub fn len(&self) -> usize {
        self.known_urls.len()
    }
}

async fn truncate_file(path: &Path, len: u64) -> std::io::Result<()> {
    let file = OpenOptions::new().write(true).open(path).await?;
    file.set_len(len).await
}

impl ArticleStore for JsonlStore {
    async fn exists(&self, source_url: &str) -> Result<bool, StoreError> {
        Ok(self.known_urls.contains(source_url))
    }

    async fn insert(&mut self, record: &StoredArticle) -> Result<u64, StoreError> {
        if self.known_urls.contains(&record.source_url) {
            return Err(StoreError::Conflict(record.source_url.clone()));
        }
        let id = self.next_id;
        let mut line = serde_json::to_string(&StoredLine {
            id,
            article: record.clone(),
        })?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        self.known_urls.insert(record.source_url.clone());
        self.next_id += 1;
        debug!(id, url = %record.source_url, "Stored article");
        Ok(id)
    }
}

/// In-memory store for pipeline tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub records: Vec<StoredArticle>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn with_urls(urls: &[&str]) -> Self {
        use crate::models::ArticleStatus;
        let records = urls
            .iter()
            .map(|url| StoredArticle {
                title: "Previously stored article".to_string(),
                summary: String::new(),
                content: String::new(),
                featured_image: None,
                category_id: 0,
                status: ArticleStatus::Published,
                published_at: None,
                source_url: url.to_string(),
            })
            .collect();
        Self { records }
    }
}

#[cfg(test)]
impl ArticleStore for MemoryStore {
    async fn exists(&self, source_url: &str) -> Result<bool, StoreError> {
        Ok(self.records.iter().any(|r| r.source_url == source_url))
    }

    async fn insert(&mut self, record: &StoredArticle) -> Result<u64, StoreError> {
        if self.exists(&record.source_url).await? {
            return Err(StoreError::Conflict(record.source_url.clone()));
        }
        self.records.push(record.clone());
        Ok(self.records.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArticleStatus;

    fn record(url: &str) -> StoredArticle {
        StoredArticle {
            title: "Flood Warning Issued for Coastal Districts".to_string(),
            summary: "Summary".to_string(),
            content: "Content".to_string(),
            featured_image: None,
            category_id: 1,
            status: ArticleStatus::Published,
            published_at: None,
            source_url: url.to_string(),
        }
    }

    fn temp_dir(name: &str) -> String {
        let dir = std::env::temp_dir().join(format!(
            "brief_bulletin_store_{}_{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_insert_and_reopen() {
        let dir = temp_dir("reopen");
        let mut store = JsonlStore::open(&dir).await.unwrap();
        assert_eq!(store.insert(&record("https://a.example/x/one")).await.unwrap(), 1);
        assert_eq!(store.insert(&record("https://a.example/x/two")).await.unwrap(), 2);
        assert!(store.exists("https://a.example/x/one").await.unwrap());

        let mut reopened = JsonlStore::open(&dir).await.unwrap();
        assert_eq!(reopened.len(), 2);
        assert!(reopened.exists("https://a.example/x/two").await.unwrap());
        assert!(!reopened.exists("https://a.example/x/three").await.unwrap());
        assert_eq!(
            reopened.insert(&record("https://a.example/x/three")).await.unwrap(),
            3
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let dir = temp_dir("conflict");
        let mut store = JsonlStore::open(&dir).await.unwrap();
        store.insert(&record("https://a.example/x/one")).await.unwrap();
        assert!(matches!(
            store.insert(&record("https://a.example/x/one")).await,
            Err(StoreError::Conflict(url)) if url == "https://a.example/x/one"
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    fn stored_line(id: u64, url: &str) -> String {
        let line = StoredLine {
            id,
            article: record(url),
        };
        format!("{}\n", serde_json::to_string(&line).unwrap())
    }

    #[tokio::test]
    async fn test_open_rejects_corrupt_middle_record() {
        let dir = temp_dir("corrupt");
        std::fs::create_dir_all(&dir).unwrap();
        let contents = format!("{{not json\n{}", stored_line(1, "https://a.example/x/one"));
        std::fs::write(PathBuf::from(&dir).join(STORE_FILE), contents).unwrap();
        assert!(JsonlStore::open(&dir).await.is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_open_drops_partial_final_record() {
        let dir = temp_dir("partial");
        std::fs::create_dir_all(&dir).unwrap();
        let file = PathBuf::from(&dir).join(STORE_FILE);
        let first = stored_line(1, "https://a.example/x/one");
        std::fs::write(&file, format!("{first}{{\"id\":2,\"title\":\"Cut of")).unwrap();

        let mut store = JsonlStore::open(&dir).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(std::fs::read_to_string(&file).unwrap(), first);

        assert_eq!(store.insert(&record("https://a.example/x/two")).await.unwrap(), 2);
        let reopened = JsonlStore::open(&dir).await.unwrap();
        assert_eq!(reopened.len(), 2);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_memory_store_conflict() {
        let mut store = MemoryStore::with_urls(&["https://a.example/x/one"]);
        assert!(store.exists("https://a.example/x/one").await.unwrap());
        assert!(matches!(
            store.insert(&record("https://a.example/x/one")).await,
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(store.insert(&record("https://a.example/x/two")).await.unwrap(), 2);
    }
}
