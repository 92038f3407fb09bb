//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::ChangeFrequency;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Feature service candidates
    #[serde(default)]
    pub source: SourceConfig,

    /// Paging behavior
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Output artifact locations
    #[serde(default)]
    pub output: OutputConfig,

    /// Sitemap and robots.txt policy
    #[serde(default)]
    pub sitemap: SitemapConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        Url::parse(&self.source.primary_base).map_err(|e| {
            AppError::validation(format!("source.primary_base is not a URL: {e}"))
        })?;
        if self.source.candidates.iter().all(|c| c.trim().is_empty()) {
            return Err(AppError::validation("No primary candidates defined"));
        }
        Url::parse(&self.source.mirror_url).map_err(|e| {
            AppError::validation(format!("source.mirror_url is not a URL: {e}"))
        })?;
        if self.fetch.batch_size == 0 || self.fetch.batch_size > defaults::MAX_BATCH_SIZE {
            return Err(AppError::validation(format!(
                "fetch.batch_size must be within 1..={}",
                defaults::MAX_BATCH_SIZE
            )));
        }
        if self.sitemap.max_urls_per_file == 0
            || self.sitemap.max_urls_per_file > defaults::SITEMAP_URL_CEILING
        {
            return Err(AppError::validation(format!(
                "sitemap.max_urls_per_file must be within 1..={}",
                defaults::SITEMAP_URL_CEILING
            )));
        }
        Url::parse(&self.sitemap.site_url).map_err(|e| {
            AppError::validation(format!("sitemap.site_url is not a URL: {e}"))
        })?;
        if !self.sitemap.record_path.contains("{id}") {
            return Err(AppError::validation(
                "sitemap.record_path must contain the {id} placeholder",
            ));
        }
        let priorities = std::iter::once(self.sitemap.priority)
            .chain(self.sitemap.static_pages.iter().map(|p| p.priority));
        for priority in priorities {
            if !(0.0..=1.0).contains(&priority) {
                return Err(AppError::validation(format!(
                    "sitemap priority {priority} is outside 0.0..=1.0"
                )));
            }
        }
        Ok(())
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Where the dataset can be found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Human-readable dataset label written into the output metadata
    #[serde(default = "defaults::source_label")]
    pub label: String,

    /// Primary provider services root (`.../arcgis/rest/services`)
    #[serde(default = "defaults::primary_base")]
    pub primary_base: String,

    /// Service names to try against the primary provider, in order
    #[serde(default = "defaults::candidates")]
    pub candidates: Vec<String>,

    /// Identifier reported for the mirror endpoint
    #[serde(default = "defaults::mirror_identifier")]
    pub mirror_identifier: String,

    /// Full layer URL of the mirror (`.../FeatureServer/0`)
    #[serde(default = "defaults::mirror_url")]
    pub mirror_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            label: defaults::source_label(),
            primary_base: defaults::primary_base(),
            candidates: defaults::candidates(),
            mirror_identifier: defaults::mirror_identifier(),
            mirror_url: defaults::mirror_url(),
        }
    }
}

/// Paging behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Records per page request
    #[serde(default = "defaults::batch_size")]
    pub batch_size: u64,

    /// Courtesy delay between page requests in milliseconds
    #[serde(default = "defaults::batch_delay")]
    pub batch_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            batch_size: defaults::batch_size(),
            batch_delay_ms: defaults::batch_delay(),
        }
    }
}

/// Output artifact locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the dataset artifacts
    #[serde(default = "defaults::data_dir")]
    pub data_dir: PathBuf,

    /// Directory receiving sitemaps and robots.txt
    #[serde(default = "defaults::public_dir")]
    pub public_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
            public_dir: defaults::public_dir(),
        }
    }
}

/// Sitemap and robots.txt policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapConfig {
    /// Public origin of the directory site
    #[serde(default = "defaults::site_url")]
    pub site_url: String,

    /// Path template for record pages; supports `{id}`, `{state}` and `{slug}`
    #[serde(default = "defaults::record_path")]
    pub record_path: String,

    /// Maximum `<url>` entries per sitemap document
    #[serde(default = "defaults::max_urls_per_file")]
    pub max_urls_per_file: usize,

    /// Change frequency advertised for record pages
    #[serde(default)]
    pub change_frequency: ChangeFrequency,

    /// Priority advertised for record pages
    #[serde(default = "defaults::priority")]
    pub priority: f32,

    /// `Crawl-delay` written to robots.txt, in seconds
    #[serde(default = "defaults::crawl_delay")]
    pub crawl_delay_secs: u32,

    /// Hand-maintained pages listed ahead of the records
    #[serde(default = "defaults::static_pages")]
    pub static_pages: Vec<StaticPage>,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            site_url: defaults::site_url(),
            record_path: defaults::record_path(),
            max_urls_per_file: defaults::max_urls_per_file(),
            change_frequency: ChangeFrequency::default(),
            priority: defaults::priority(),
            crawl_delay_secs: defaults::crawl_delay(),
            static_pages: defaults::static_pages(),
        }
    }
}

/// A fixed page of the site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticPage {
    /// Path relative to `site_url`
    pub path: String,

    #[serde(default)]
    pub change_frequency: ChangeFrequency,

    #[serde(default = "defaults::priority")]
    pub priority: f32,
}

mod defaults {
    use std::path::PathBuf;

    use super::StaticPage;
    use crate::models::ChangeFrequency;

    /// Per-request ceiling documented by the provider.
    pub const MAX_BATCH_SIZE: u64 = 2000;
    /// Hard limit of the sitemap protocol.
    pub const SITEMAP_URL_CEILING: usize = 50_000;

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; harvester/0.1)".into()
    }
    pub fn timeout() -> u64 {
        60
    }

    // Source defaults
    pub fn source_label() -> String {
        "HIFLD Fire Stations".into()
    }
    pub fn primary_base() -> String {
        "https://services1.arcgis.com/Hp6G80Pky0om7QvQ/arcgis/rest/services".into()
    }
    pub fn candidates() -> Vec<String> {
        vec![
            "Fire_Stations".into(),
            "Fire_Station".into(),
            "FireStations".into(),
            "Fire_and_Emergency_Medical_Service_Stations".into(),
        ]
    }
    pub fn mirror_identifier() -> String {
        "Structures_Fire_Stations".into()
    }
    pub fn mirror_url() -> String {
        "https://carto.nationalmap.gov/arcgis/rest/services/structures/MapServer/51".into()
    }

    // Fetch defaults
    pub fn batch_size() -> u64 {
        MAX_BATCH_SIZE
    }
    pub fn batch_delay() -> u64 {
        500
    }

    // Output defaults
    pub fn data_dir() -> PathBuf {
        PathBuf::from("data")
    }
    pub fn public_dir() -> PathBuf {
        PathBuf::from("public")
    }

    // Sitemap defaults
    pub fn site_url() -> String {
        "https://firestations.example.org".into()
    }
    pub fn record_path() -> String {
        "/stations/{state}/{id}-{slug}".into()
    }
    pub fn max_urls_per_file() -> usize {
        45_000
    }
    pub fn priority() -> f32 {
        0.5
    }
    pub fn crawl_delay() -> u32 {
        1
    }
    pub fn static_pages() -> Vec<StaticPage> {
        vec![
            StaticPage {
                path: "/".into(),
                change_frequency: ChangeFrequency::Weekly,
                priority: 1.0,
            },
            StaticPage {
                path: "/states".into(),
                change_frequency: ChangeFrequency::Monthly,
                priority: 0.8,
            },
        ]
    }
}
