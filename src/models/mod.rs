// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod endpoint;
mod feature;
mod record;
mod sitemap;

// Re-export all public types
pub use config::{
    Config, FetchConfig, HttpConfig, OutputConfig, SitemapConfig, SourceConfig, StaticPage,
};
pub use endpoint::{
    OUTPUT_SPATIAL_REFERENCE, ProviderKind, SchemaInfo, ServiceEndpoint, metadata_url,
};
pub use feature::{Geometry, RawFeature};
pub use record::{
    CanonicalRecord, DEFAULT_STATUS, DatasetDocument, RunMetadata, RunSummary, StateCount,
    UNKNOWN_NAME,
};
pub use sitemap::{ChangeFrequency, SitemapEntry};
