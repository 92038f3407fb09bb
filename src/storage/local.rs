//! Local filesystem storage implementation.
//!
//! Writes go to a temporary sibling first and are renamed into place, so a
//! reader never observes a half-written artifact.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{DatasetDocument, OutputConfig, RunSummary};
use crate::services::{ROBOTS_FILE, SINGLE_SITEMAP_FILE, SITEMAP_INDEX_FILE, SitemapSet};
use crate::storage::{
    DATASET_FILE, RecordStorage, SUMMARY_FILE, TABLE_FILE, WriteReport, tabular,
};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    data_dir: PathBuf,
    public_dir: PathBuf,
}

impl LocalStorage {
    /// Create a LocalStorage writing datasets and sitemaps to separate roots.
    pub fn new(data_dir: impl Into<PathBuf>, public_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            public_dir: public_dir.into(),
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(&config.data_dir, &config.public_dir)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.ensure_dir(path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(path, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        match self.read_bytes(path).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Remove sitemap files this crate generates (`sitemap.xml`,
    /// `sitemap-index.xml`, `sitemap-<n>.xml`) that `keep` does not name.
    async fn prune_sitemaps(&self, keep: &HashSet<&str>) -> Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.public_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if is_generated_sitemap(name) && !keep.contains(name) {
                tokio::fs::remove_file(entry.path()).await?;
                log::info!("Removed stale {}", name);
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn is_generated_sitemap(name: &str) -> bool {
    if name == SINGLE_SITEMAP_FILE || name == SITEMAP_INDEX_FILE {
        return true;
    }
    name.strip_prefix("sitemap-")
        .and_then(|rest| rest.strip_suffix(".xml"))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

#[async_trait]
impl RecordStorage for LocalStorage {
    async fn write_dataset(&self, dataset: &DatasetDocument) -> WriteReport {
        let mut report = WriteReport::default();

        let path = self.data_dir.join(DATASET_FILE);
        let result = self.write_json(&path, dataset).await;
        report.record(path, result);

        let path = self.data_dir.join(TABLE_FILE);
        let csv = tabular::to_csv(&dataset.records);
        let result = self.write_bytes(&path, csv.as_bytes()).await;
        report.record(path, result);

        let path = self.data_dir.join(SUMMARY_FILE);
        let summary = RunSummary::from_records(&dataset.records);
        let result = self.write_json(&path, &summary).await;
        report.record(path, result);

        report
    }

    async fn load_dataset(&self) -> Result<Option<DatasetDocument>> {
        self.read_json(&self.data_dir.join(DATASET_FILE)).await
    }

    async fn write_sitemaps(&self, set: &SitemapSet, robots: &str) -> WriteReport {
        let mut report = WriteReport::default();

        let keep: HashSet<&str> = set.files().map(|d| d.file_name.as_str()).collect();
        if let Err(e) = self.prune_sitemaps(&keep).await {
            log::warn!("Could not prune stale sitemaps: {}", e);
        }

        for document in set.files() {
            let path = self.public_dir.join(&document.file_name);
            let result = self.write_bytes(&path, document.xml.as_bytes()).await;
            report.record(path, result);
        }

        let path = self.public_dir.join(ROBOTS_FILE);
        let result = self.write_bytes(&path, robots.as_bytes()).await;
        report.record(path, result);

        report
    }
}
