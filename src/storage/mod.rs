//! Storage abstractions for harvested artifacts.
//!
//! ## Directory Structure
//!
//! ```text
//! data/                     # dataset artifacts
//! ├── stations.json         # metadata + canonical records
//! ├── stations.csv          # flat table, one row per record
//! └── summary.json          # record counts per state
//! public/                   # crawl-discovery artifacts
//! ├── sitemap.xml           # when every URL fits in one document
//! ├── sitemap-1.xml         # ...otherwise one file per chunk
//! ├── sitemap-index.xml     # ...plus an index
//! └── robots.txt
//! ```
//!
//! Every artifact is replaced wholesale on each run.

pub mod local;
pub mod tabular;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::DatasetDocument;
use crate::services::SitemapSet;

// Re-export for convenience
pub use local::LocalStorage;

pub const DATASET_FILE: &str = "stations.json";
pub const TABLE_FILE: &str = "stations.csv";
pub const SUMMARY_FILE: &str = "summary.json";

/// Outcome of writing a group of artifacts.
///
/// A failed artifact does not stop the others from being written.
#[derive(Debug, Default)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl WriteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub(crate) fn record(&mut self, path: PathBuf, result: Result<()>) {
        match result {
            Ok(()) => {
                log::info!("Wrote {}", path.display());
                self.written.push(path);
            }
            Err(e) => {
                log::error!("Failed to write {}: {}", path.display(), e);
                self.failed.push((path, e.to_string()));
            }
        }
    }
}

/// Trait for artifact storage backends.
#[async_trait]
pub trait RecordStorage: Send + Sync {
    /// Write the dataset document, the CSV table and the state summary.
    async fn write_dataset(&self, dataset: &DatasetDocument) -> WriteReport;

    /// Load the dataset written by the last run, if any.
    async fn load_dataset(&self) -> Result<Option<DatasetDocument>>;

    /// Write every sitemap document and robots.txt, removing sitemap files
    /// left over from a previous, larger run.
    async fn write_sitemaps(&self, set: &SitemapSet, robots: &str) -> WriteReport;
}
