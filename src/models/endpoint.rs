//! Resolved feature service endpoints and the queries issued against them.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

/// Spatial reference requested for geometry (WGS84).
pub const OUTPUT_SPATIAL_REFERENCE: &str = "4326";

/// Which provider served the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Primary,
    Mirror,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Primary => f.write_str("primary"),
            ProviderKind::Mirror => f.write_str("mirror"),
        }
    }
}

/// Layer metadata returned by the probe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaInfo {
    /// Layer name; non-empty for any accepted endpoint
    pub name: String,

    /// Attribute field names advertised by the layer
    #[serde(default)]
    pub fields: Vec<String>,

    #[serde(default)]
    pub geometry_type: Option<String>,

    /// Per-request record ceiling advertised by the layer
    #[serde(default)]
    pub max_record_count: Option<u64>,
}

/// A probed, schema-valid feature layer. Immutable for the rest of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub provider: ProviderKind,
    pub identifier: String,
    /// Layer URL, e.g. `.../Fire_Stations/FeatureServer/0`
    pub base_url: String,
    pub schema: SchemaInfo,
}

impl ServiceEndpoint {
    /// Count-only query URL.
    pub fn count_url(&self) -> Result<String> {
        query_url(
            &self.base_url,
            &[("where", "1=1"), ("returnCountOnly", "true"), ("f", "json")],
        )
    }

    /// Page query URL for `count` records starting at `offset`.
    pub fn page_url(&self, offset: u64, count: u64) -> Result<String> {
        let offset = offset.to_string();
        let count = count.to_string();
        query_url(
            &self.base_url,
            &[
                ("where", "1=1"),
                ("outFields", "*"),
                ("returnGeometry", "true"),
                ("outSR", OUTPUT_SPATIAL_REFERENCE),
                ("resultOffset", offset.as_str()),
                ("resultRecordCount", count.as_str()),
                ("f", "json"),
            ],
        )
    }
}

/// Metadata probe URL for a layer.
pub fn metadata_url(layer_url: &str) -> Result<String> {
    let mut url = Url::parse(layer_url)?;
    url.query_pairs_mut().append_pair("f", "json");
    Ok(url.into())
}

fn query_url(layer_url: &str, params: &[(&str, &str)]) -> Result<String> {
    let mut url = Url::parse(&format!("{}/query", layer_url.trim_end_matches('/')))?;
    url.query_pairs_mut().extend_pairs(params);
    Ok(url.into())
}
