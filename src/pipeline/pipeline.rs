// src/pipeline/pipeline.rs

//! Full pipeline: acquisition, then sitemap generation.

use chrono::Utc;

use crate::error::Result;
use crate::models::Config;
use crate::services::FeatureSource;
use crate::storage::RecordStorage;

use super::{run_acquisition, run_sitemap};

/// Run both stages against `source`, writing through `storage`.
///
/// Acquisition errors abort the run. A sitemap failure is logged and the
/// harvested dataset is kept.
pub async fn run_pipeline(
    config: &Config,
    source: &dyn FeatureSource,
    storage: &dyn RecordStorage,
) -> Result<()> {
    log::info!("Step 1/2: Acquiring records...");
    let acquisition = run_acquisition(config, source, storage).await?;

    log::info!("Step 2/2: Building sitemaps...");
    let run_date = Utc::now().date_naive();
    if let Err(e) = run_sitemap(config, storage, &acquisition.dataset.records, run_date).await {
        log::error!("Sitemap generation failed: {}", e);
    }

    if !acquisition.write.is_complete() {
        log::warn!(
            "{} dataset artifact(s) could not be written",
            acquisition.write.failed.len()
        );
    }
    log::info!("Pipeline complete");
    Ok(())
}
