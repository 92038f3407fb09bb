//! Pipeline entry points.
//!
//! - `run_acquisition`: Resolve, fetch, normalize and write the dataset
//! - `run_sitemap`: Build sitemaps and robots.txt from canonical records
//! - `run_pipeline`: Both, in order

pub mod acquire;
pub mod pipeline;
pub mod sitemap;

pub use acquire::{AcquisitionReport, run_acquisition};
pub use pipeline::run_pipeline;
pub use sitemap::{SitemapReport, run_sitemap, run_sitemap_from_storage};

/// Log a titled block of key/value lines.
fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {}", title);
    for (key, value) in items {
        log::info!("    {}: {}", key, value);
    }
}
