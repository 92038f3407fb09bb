// src/pipeline/sitemap.rs

//! Sitemap pipeline: canonical records → sitemap documents + robots.txt.

use chrono::{NaiveDate, Utc};

use crate::error::{AppError, Result};
use crate::models::{CanonicalRecord, Config};
use crate::services::SitemapBuilder;
use crate::storage::{RecordStorage, WriteReport};

use super::summary;

#[derive(Debug)]
pub struct SitemapReport {
    pub documents: usize,
    pub url_count: usize,
    pub sharded: bool,
    /// File robots.txt points crawlers at
    pub entry_point: String,
    pub write: WriteReport,
}

/// Render and publish sitemaps for `records`, dated `run_date`.
pub async fn run_sitemap(
    config: &Config,
    storage: &dyn RecordStorage,
    records: &[CanonicalRecord],
    run_date: NaiveDate,
) -> Result<SitemapReport> {
    let builder = SitemapBuilder::from_config(&config.sitemap, run_date);
    let entries = builder.entries(&config.sitemap, records);
    let set = builder.build(&entries)?;
    let robots = builder.robots(&set, config.sitemap.crawl_delay_secs);

    let write = storage.write_sitemaps(&set, &robots).await;

    let report = SitemapReport {
        documents: set.documents.len(),
        url_count: set.url_count(),
        sharded: set.is_sharded(),
        entry_point: set.entry_point().to_string(),
        write,
    };

    summary(
        "Sitemap",
        &[
            ("URLs", report.url_count.to_string()),
            ("Documents", report.documents.to_string()),
            ("Entry point", report.entry_point.clone()),
            (
                "Artifacts",
                format!(
                    "{} written, {} failed",
                    report.write.written.len(),
                    report.write.failed.len()
                ),
            ),
        ],
    );

    Ok(report)
}

/// Build sitemaps from the dataset a previous run left in storage.
pub async fn run_sitemap_from_storage(
    config: &Config,
    storage: &dyn RecordStorage,
) -> Result<SitemapReport> {
    let dataset = storage.load_dataset().await?.ok_or_else(|| {
        AppError::config("No dataset found. Run 'fetch' before 'sitemap'.")
    })?;
    log::info!(
        "Loaded {} records harvested at {}",
        dataset.records.len(),
        dataset.metadata.generated_at
    );
    run_sitemap(config, storage, &dataset.records, Utc::now().date_naive()).await
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::models::{DatasetDocument, ProviderKind, SchemaInfo, ServiceEndpoint};
    use crate::storage::LocalStorage;

    fn records(n: usize) -> Vec<CanonicalRecord> {
        (1..=n)
            .map(|i| CanonicalRecord {
                id: i.to_string(),
                name: format!("Station {i}"),
                state: "MN".into(),
                ..CanonicalRecord::default()
            })
            .collect()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
    }

    #[tokio::test]
    async fn test_single_document_with_static_pages() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("data"), tmp.path().join("public"));

        let report = run_sitemap(&Config::default(), &storage, &records(3), date())
            .await
            .unwrap();

        assert_eq!(report.url_count, 5);
        assert_eq!(report.documents, 1);
        assert!(!report.sharded);
        assert_eq!(report.entry_point, "sitemap.xml");
        assert!(report.write.is_complete());

        let xml = std::fs::read_to_string(tmp.path().join("public/sitemap.xml")).unwrap();
        assert!(xml.contains("https://firestations.example.org/stations/mn/2-station-2"));
        assert!(xml.contains("<lastmod>2026-10-15</lastmod>"));
    }

    #[tokio::test]
    async fn test_sharded_documents_and_robots() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("data"), tmp.path().join("public"));
        let mut config = Config::default();
        config.sitemap.static_pages.clear();
        config.sitemap.max_urls_per_file = 4;

        let report = run_sitemap(&config, &storage, &records(10), date())
            .await
            .unwrap();

        assert_eq!(report.documents, 3);
        assert!(report.sharded);
        assert_eq!(report.entry_point, "sitemap-index.xml");
        let public = tmp.path().join("public");
        assert!(public.join("sitemap-3.xml").exists());
        let robots = std::fs::read_to_string(public.join("robots.txt")).unwrap();
        assert!(robots.contains("Sitemap: https://firestations.example.org/sitemap-index.xml"));
    }

    #[tokio::test]
    async fn test_from_storage_requires_dataset() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("data"), tmp.path().join("public"));

        let err = run_sitemap_from_storage(&Config::default(), &storage)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        let endpoint = ServiceEndpoint {
            provider: ProviderKind::Primary,
            identifier: "Fire_Stations".into(),
            base_url: "https://primary.test/Fire_Stations/FeatureServer/0".into(),
            schema: SchemaInfo::default(),
        };
        let dataset = DatasetDocument::new("Fire Stations", &endpoint, 2, None, records(2));
        storage.write_dataset(&dataset).await;

        let report = run_sitemap_from_storage(&Config::default(), &storage)
            .await
            .unwrap();
        assert_eq!(report.url_count, 4);
    }
}
