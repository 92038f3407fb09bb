//! Service layer for the harvester.
//!
//! This module contains the business logic for:
//! - Transport to the feature service (`FeatureSource`)
//! - Endpoint discovery with mirror fallback (`EndpointResolver`)
//! - Batched record download (`RecordFetcher`)
//! - Field mapping to canonical records (`normalize`)
//! - Sitemap and robots.txt rendering (`SitemapBuilder`)

mod fetcher;
mod normalizer;
mod resolver;
mod sitemap;
pub mod source;

pub use fetcher::{Batch, FetchOutcome, FetchStop, RecordFetcher};
pub use normalizer::{normalize, normalize_all};
pub use resolver::{Candidate, EndpointResolver, parse_schema};
pub use sitemap::{
    ROBOTS_FILE, SINGLE_SITEMAP_FILE, SITEMAP_INDEX_FILE, SITEMAP_NAMESPACE, SitemapBuilder,
    SitemapDocument, SitemapSet, record_path,
};
pub use source::{FeatureSource, HttpFeatureSource, provider_error};
