//! Canonical station records and the documents built from them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ProviderKind, ServiceEndpoint};

/// Name used when neither provider supplies one.
pub const UNKNOWN_NAME: &str = "Unknown";
/// Status used when the provider omits it.
pub const DEFAULT_STATUS: &str = "OPEN";

/// Schema-independent representation of one station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Provider object identifier, unique within a run
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub county: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub phone: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: String,
}

impl Default for CanonicalRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: UNKNOWN_NAME.to_string(),
            address: String::new(),
            city: String::new(),
            state: String::new(),
            zip: String::new(),
            county: String::new(),
            kind: String::new(),
            phone: String::new(),
            latitude: None,
            longitude: None,
            status: DEFAULT_STATUS.to_string(),
        }
    }
}

/// Run metadata stored alongside the records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Dataset label from configuration
    pub source: String,
    pub provider: ProviderKind,
    pub identifier: String,
    /// Resolved layer URL
    pub endpoint: String,
    pub generated_at: DateTime<Utc>,
    /// Count advertised by the service; advisory only
    pub declared_count: u64,
    /// Features downloaded, before duplicate ids were dropped
    #[serde(default)]
    pub fetched_count: usize,
    /// Canonical records written
    pub record_count: usize,
    /// Why paging stopped before the declared count, if it did
    #[serde(default)]
    pub truncated: Option<String>,
}

/// The structured dataset document (`stations.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetDocument {
    pub metadata: RunMetadata,
    pub records: Vec<CanonicalRecord>,
}

impl DatasetDocument {
    pub fn new(
        source: &str,
        endpoint: &ServiceEndpoint,
        declared_count: u64,
        truncated: Option<String>,
        records: Vec<CanonicalRecord>,
    ) -> Self {
        Self {
            metadata: RunMetadata {
                source: source.to_string(),
                provider: endpoint.provider,
                identifier: endpoint.identifier.clone(),
                endpoint: endpoint.base_url.clone(),
                generated_at: Utc::now(),
                declared_count,
                fetched_count: records.len(),
                record_count: records.len(),
                truncated,
            },
            records,
        }
    }

    /// Record how many features were downloaded when normalization dropped
    /// some of them.
    pub fn with_fetched_count(mut self, fetched_count: usize) -> Self {
        self.metadata.fetched_count = fetched_count;
        self
    }
}

/// Records per state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCount {
    pub state: String,
    pub count: usize,
}

/// Per-state aggregate, sorted by count descending then state ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunSummary {
    pub states: Vec<StateCount>,
}

impl RunSummary {
    pub fn from_records(records: &[CanonicalRecord]) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for record in records {
            *counts.entry(record.state.as_str()).or_insert(0) += 1;
        }

        let mut states: Vec<StateCount> = counts
            .into_iter()
            .map(|(state, count)| StateCount {
                state: state.to_string(),
                count,
            })
            .collect();
        states.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.state.cmp(&b.state)));

        Self { states }
    }

    pub fn total(&self) -> usize {
        self.states.iter().map(|s| s.count).sum()
    }
}
