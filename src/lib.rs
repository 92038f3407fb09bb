// src/lib.rs

//! Fire station harvester library
//!
//! Locates the public fire station feature service, downloads every record
//! in batches, normalizes them into one schema and publishes JSON, CSV and
//! sitemap artifacts for the directory site.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
