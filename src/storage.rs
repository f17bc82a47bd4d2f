use crate::constants::{HEADERS_FILE_CONTENT, HEADERS_FILE_NAME};
use crate::error::Result;
use crate::types::CatalogItem;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Destination for the year-partitioned catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Replace the partition for `year` with `items`.
    async fn write_year(&self, year: i32, items: &[CatalogItem]) -> Result<()>;

    /// Write the static access-control header file served next to the partitions.
    async fn write_headers(&self) -> Result<()>;
}

/// Writes `{year}.json` files and `_headers` into one directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn year_path(&self, year: i32) -> PathBuf {
        self.dir.join(format!("{year}.json"))
    }
}

#[async_trait]
impl CatalogStore for FileStore {
    async fn write_year(&self, year: i32, items: &[CatalogItem]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let body = serde_json::to_vec(items)?;
        let path = self.year_path(year);
        tokio::fs::write(&path, body).await?;
        debug!("Wrote {} items to {}", items.len(), path.display());
        Ok(())
    }

    async fn write_headers(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(HEADERS_FILE_NAME);
        tokio::fs::write(&path, HEADERS_FILE_CONTENT).await?;
        info!("Wrote {}", path.display());
        Ok(())
    }
}

/// In-memory store for development/testing.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    years: Arc<Mutex<BTreeMap<i32, Vec<CatalogItem>>>>,
    headers_written: Arc<Mutex<bool>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every partition written so far.
    pub fn snapshot(&self) -> BTreeMap<i32, Vec<CatalogItem>> {
        self.years
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn year(&self, year: i32) -> Option<Vec<CatalogItem>> {
        self.years
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&year)
            .cloned()
    }

    pub fn headers_written(&self) -> bool {
        *self.headers_written.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn write_year(&self, year: i32, items: &[CatalogItem]) -> Result<()> {
        let mut years = self.years.lock().unwrap_or_else(|e| e.into_inner());
        years.insert(year, items.to_vec());
        debug!("Stored {} items for {}", items.len(), year);
        Ok(())
    }

    async fn write_headers(&self) -> Result<()> {
        *self.headers_written.lock().unwrap_or_else(|e| e.into_inner()) = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scores::Scores;

    fn item(id: &str, date: &str) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            imdb_id: "0000001".to_string(),
            rt_id: None,
            name: format!("Item {id}"),
            genres: vec!["Drama".to_string()],
            summary: String::new(),
            poster: None,
            trailer_key: None,
            date: date.to_string(),
            disc_date: None,
            duration: Some(90),
            season: None,
            episodes: None,
            scores: Scores::new(),
            critics: Vec::new(),
            consensus: None,
        }
    }

    #[tokio::test]
    async fn test_file_store_writes_partitions_and_headers() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("db"));

        store.write_headers().await.unwrap();
        store.write_year(2020, &[item("1", "2020-06-01")]).await.unwrap();
        store.write_year(2019, &[]).await.unwrap();

        let headers = std::fs::read_to_string(store.dir().join("_headers")).unwrap();
        assert_eq!(headers, "/*\n  Access-Control-Allow-Origin: *");

        let written: Vec<CatalogItem> =
            serde_json::from_slice(&std::fs::read(store.year_path(2020)).unwrap()).unwrap();
        assert_eq!(written, vec![item("1", "2020-06-01")]);
        assert_eq!(std::fs::read_to_string(store.year_path(2019)).unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_in_memory_store_replaces_partition() {
        let store = InMemoryStore::new();
        store.write_year(2020, &[item("1", "2020-01-01")]).await.unwrap();
        store.write_year(2020, &[item("2", "2020-02-01")]).await.unwrap();
        assert_eq!(store.year(2020).unwrap()[0].id, "2");
        assert!(!store.headers_written());
    }
}
