// src/services/resolver.rs

//! Endpoint resolution.
//!
//! Probes candidate layers in priority order and returns the first one that
//! answers with a usable schema. Primary-provider candidates come first,
//! followed by a single mirror. Any failure of a single probe (transport,
//! timeout, non-JSON body, provider error, missing name) only moves the
//! search on to the next candidate.

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{ProviderKind, SchemaInfo, ServiceEndpoint, SourceConfig, metadata_url};
use crate::services::source::{FeatureSource, provider_error};
use crate::utils::join_site_url;

/// One layer to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub provider: ProviderKind,
    pub identifier: String,
    /// Layer URL, without query
    pub layer_url: String,
}

impl Candidate {
    /// A named service on the primary provider.
    pub fn primary(services_root: &str, name: &str) -> Self {
        Self {
            provider: ProviderKind::Primary,
            identifier: name.to_string(),
            layer_url: join_site_url(services_root, &format!("{name}/FeatureServer/0")),
        }
    }

    pub fn mirror(identifier: &str, layer_url: &str) -> Self {
        Self {
            provider: ProviderKind::Mirror,
            identifier: identifier.to_string(),
            layer_url: layer_url.trim_end_matches('/').to_string(),
        }
    }
}

/// First-match resolver over an ordered candidate list.
pub struct EndpointResolver<'a> {
    source: &'a dyn FeatureSource,
    candidates: Vec<Candidate>,
}

impl<'a> EndpointResolver<'a> {
    pub fn new(source: &'a dyn FeatureSource, candidates: Vec<Candidate>) -> Self {
        Self { source, candidates }
    }

    /// Primary candidates in configured order, then the mirror.
    pub fn from_config(source: &'a dyn FeatureSource, config: &SourceConfig) -> Self {
        let mut candidates: Vec<Candidate> = config
            .candidates
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(|name| Candidate::primary(&config.primary_base, name))
            .collect();
        candidates.push(Candidate::mirror(
            &config.mirror_identifier,
            &config.mirror_url,
        ));
        Self::new(source, candidates)
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Return the first candidate whose probe succeeds.
    pub async fn resolve(&self) -> Result<ServiceEndpoint> {
        for (position, candidate) in self.candidates.iter().enumerate() {
            log::info!(
                "Probing {} candidate {}/{}: {}",
                candidate.provider,
                position + 1,
                self.candidates.len(),
                candidate.identifier
            );

            match self.probe(candidate).await {
                Ok(endpoint) => {
                    log::info!(
                        "Resolved {} endpoint '{}' ({})",
                        endpoint.provider,
                        endpoint.schema.name,
                        endpoint.base_url
                    );
                    return Ok(endpoint);
                }
                Err(e) => log::warn!("Candidate {} rejected: {}", candidate.identifier, e),
            }
        }

        Err(AppError::NoEndpointAvailable {
            probed: self.candidates.len(),
        })
    }

    async fn probe(&self, candidate: &Candidate) -> Result<ServiceEndpoint> {
        let url = metadata_url(&candidate.layer_url)?;
        let body = self.source.get_json(&url).await?;
        let schema = parse_schema(&url, &body)?;

        Ok(ServiceEndpoint {
            provider: candidate.provider,
            identifier: candidate.identifier.clone(),
            base_url: candidate.layer_url.clone(),
            schema,
        })
    }
}

/// Accept a probe body iff it has no `error` and a non-empty `name`.
pub fn parse_schema(context: &str, body: &Value) -> Result<SchemaInfo> {
    if let Some(message) = provider_error(body) {
        return Err(AppError::malformed(
            context,
            format!("provider error: {message}"),
        ));
    }

    let name = body
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::malformed(context, "layer metadata has no name"))?;

    let fields: Vec<String> = body
        .get("fields")
        .and_then(Value::as_array)
        .map(|fields| {
            fields
                .iter()
                .filter_map(|f| f.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(SchemaInfo {
        name: name.to_string(),
        fields,
        geometry_type: body
            .get("geometryType")
            .and_then(Value::as_str)
            .map(str::to_string),
        max_record_count: body.get("maxRecordCount").and_then(Value::as_u64),
    })
}
