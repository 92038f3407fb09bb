// src/pipeline/acquire.rs

//! Acquisition pipeline: resolve → fetch → normalize → write.

use chrono::Utc;

use crate::error::Result;
use crate::models::{Config, DatasetDocument};
use crate::services::{EndpointResolver, FeatureSource, RecordFetcher, normalize_all};
use crate::storage::{RecordStorage, WriteReport};

use super::summary;

/// Everything the acquisition stage produced.
#[derive(Debug)]
pub struct AcquisitionReport {
    pub dataset: DatasetDocument,
    pub batches_requested: usize,
    pub write: WriteReport,
}

/// Download the dataset and write its artifacts.
///
/// Fails only when no endpoint resolves or the count query fails or reports
/// zero records. A truncated download is still written; the reason ends up
/// in the dataset metadata.
pub async fn run_acquisition(
    config: &Config,
    source: &dyn FeatureSource,
    storage: &dyn RecordStorage,
) -> Result<AcquisitionReport> {
    let start_time = Utc::now();

    let resolver = EndpointResolver::from_config(source, &config.source);
    log::info!(
        "Resolving endpoint from {} candidate(s)...",
        resolver.candidates().len()
    );
    let endpoint = resolver.resolve().await?;

    let fetcher = RecordFetcher::new(source, &config.fetch);
    let outcome = fetcher.fetch_all(&endpoint).await?;

    let declared_total = outcome.declared_total;
    let batches_requested = outcome.batches_requested;
    let fetched = outcome.features.len();
    let truncated = outcome.stop.as_ref().map(ToString::to_string);

    let records = normalize_all(outcome.features);
    let dataset = DatasetDocument::new(
        &config.source.label,
        &endpoint,
        declared_total,
        truncated,
        records,
    )
    .with_fetched_count(fetched);

    let write = storage.write_dataset(&dataset).await;

    let elapsed = Utc::now() - start_time;
    summary(
        "Acquisition",
        &[
            ("Endpoint", format!("{} ({})", endpoint.base_url, endpoint.provider)),
            ("Declared", declared_total.to_string()),
            ("Fetched", fetched.to_string()),
            ("Records", dataset.records.len().to_string()),
            ("Batches", batches_requested.to_string()),
            (
                "Stopped early",
                dataset.metadata.truncated.clone().unwrap_or_else(|| "no".into()),
            ),
            (
                "Artifacts",
                format!("{} written, {} failed", write.written.len(), write.failed.len()),
            ),
            ("Elapsed", format!("{}s", elapsed.num_seconds())),
        ],
    );

    Ok(AcquisitionReport {
        dataset,
        batches_requested,
        write,
    })
}
