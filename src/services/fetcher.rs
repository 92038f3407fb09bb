// src/services/fetcher.rs

//! Record fetcher.
//!
//! Pages through a resolved layer with offset/limit queries, one request at
//! a time. A failing batch ends paging but keeps everything fetched before
//! it; nothing is retried.

use std::fmt;
use std::pin::pin;
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{FetchConfig, RawFeature, ServiceEndpoint};
use crate::services::source::{FeatureSource, provider_error};

/// One successfully fetched page.
#[derive(Debug)]
pub struct Batch {
    pub offset: u64,
    pub features: Vec<RawFeature>,
}

/// Why paging ended before the declared total.
#[derive(Debug)]
pub enum FetchStop {
    /// The page at `offset` came back with no features.
    ///
    /// Treated as end of data even though the declared total was not
    /// reached; a transient empty page is indistinguishable from a real end.
    EmptyBatch { offset: u64 },

    /// The page request failed ([`AppError::BatchFetch`] or
    /// [`AppError::MalformedResponse`]).
    Failed(AppError),
}

impl fmt::Display for FetchStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStop::EmptyBatch { offset } => write!(f, "empty batch at offset {offset}"),
            FetchStop::Failed(error) => write!(f, "{error}"),
        }
    }
}

/// Everything one fetch run produced.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Features in arrival order
    pub features: Vec<RawFeature>,
    /// Count advertised by the service; advisory only
    pub declared_total: u64,
    pub batch_size: u64,
    pub batches_requested: usize,
    pub stop: Option<FetchStop>,
}

impl FetchOutcome {
    /// Whether paging ran through every offset below the declared total.
    pub fn is_complete(&self) -> bool {
        self.stop.is_none()
    }

    /// Number of page requests a complete run issues.
    pub fn expected_batches(&self) -> u64 {
        if self.batch_size == 0 {
            return 0;
        }
        self.declared_total.div_ceil(self.batch_size)
    }
}

/// Sequential pager over a [`FeatureSource`].
pub struct RecordFetcher<'a> {
    source: &'a dyn FeatureSource,
    batch_size: u64,
    delay: Duration,
}

impl<'a> RecordFetcher<'a> {
    pub fn new(source: &'a dyn FeatureSource, config: &FetchConfig) -> Self {
        Self {
            source,
            batch_size: config.batch_size.max(1),
            delay: Duration::from_millis(config.batch_delay_ms),
        }
    }

    /// Configured batch size, lowered to the layer's advertised ceiling.
    pub fn batch_size_for(&self, endpoint: &ServiceEndpoint) -> u64 {
        match endpoint.schema.max_record_count {
            Some(ceiling) if ceiling > 0 => self.batch_size.min(ceiling),
            _ => self.batch_size,
        }
    }

    /// Declared record count of the layer.
    ///
    /// Fails with [`AppError::EmptyDataset`] when the layer declares zero
    /// records and with [`AppError::CountQuery`] when no count comes back.
    pub async fn count(&self, endpoint: &ServiceEndpoint) -> Result<u64> {
        let url = endpoint.count_url()?;
        let body = self
            .source
            .get_json(&url)
            .await
            .map_err(|e| AppError::count(&endpoint.base_url, e))?;

        if let Some(message) = provider_error(&body) {
            return Err(AppError::count(
                &endpoint.base_url,
                format!("provider error: {message}"),
            ));
        }

        let count = body
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| AppError::count(&endpoint.base_url, "response has no count"))?;

        if count == 0 {
            return Err(AppError::EmptyDataset {
                endpoint: endpoint.base_url.clone(),
            });
        }
        Ok(count)
    }

    /// Lazy stream of pages covering offsets `0..total`.
    ///
    /// The stream ends after the last offset, or right after the first item
    /// that is an `Err`.
    pub fn batches<'s>(
        &'s self,
        endpoint: &'s ServiceEndpoint,
        total: u64,
    ) -> impl Stream<Item = std::result::Result<Batch, FetchStop>> + 's {
        let batch_size = self.batch_size_for(endpoint);

        stream::unfold(Some(0u64), move |next| async move {
            let Some(offset) = next.filter(|offset| *offset < total) else {
                return None;
            };
            if offset > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            match self.fetch_batch(endpoint, offset, batch_size).await {
                Ok(features) => {
                    let batch = Batch { offset, features };
                    Some((Ok(batch), Some(offset + batch_size)))
                }
                Err(stop) => Some((Err(stop), None)),
            }
        })
    }

    /// Count, then drain every batch into a [`FetchOutcome`].
    ///
    /// Only the count query can fail this call; batch failures end up in
    /// [`FetchOutcome::stop`].
    pub async fn fetch_all(&self, endpoint: &ServiceEndpoint) -> Result<FetchOutcome> {
        let declared_total = self.count(endpoint).await?;
        let batch_size = self.batch_size_for(endpoint);

        let mut outcome = FetchOutcome {
            declared_total,
            batch_size,
            ..FetchOutcome::default()
        };
        log::info!(
            "Layer declares {} records; fetching {} batch(es) of {}",
            declared_total,
            outcome.expected_batches(),
            batch_size
        );

        let mut batches = pin!(self.batches(endpoint, declared_total));
        while let Some(result) = batches.next().await {
            outcome.batches_requested += 1;
            match result {
                Ok(batch) => {
                    outcome.features.extend(batch.features);
                    log::info!(
                        "Batch {}/{} at offset {}: {} of {} records",
                        outcome.batches_requested,
                        outcome.expected_batches(),
                        batch.offset,
                        outcome.features.len(),
                        declared_total
                    );
                }
                Err(stop) => {
                    log::warn!(
                        "Stopped paging after {} of {} records: {}",
                        outcome.features.len(),
                        declared_total,
                        stop
                    );
                    outcome.stop = Some(stop);
                }
            }
        }

        Ok(outcome)
    }

    async fn fetch_batch(
        &self,
        endpoint: &ServiceEndpoint,
        offset: u64,
        batch_size: u64,
    ) -> std::result::Result<Vec<RawFeature>, FetchStop> {
        let url = endpoint
            .page_url(offset, batch_size)
            .map_err(|e| FetchStop::Failed(AppError::batch(offset, e)))?;

        let mut body = match self.source.get_json(&url).await {
            Ok(body) => body,
            Err(e @ AppError::MalformedResponse { .. }) => return Err(FetchStop::Failed(e)),
            Err(e) => return Err(FetchStop::Failed(AppError::batch(offset, e))),
        };

        if let Some(message) = provider_error(&body) {
            return Err(FetchStop::Failed(AppError::batch(
                offset,
                format!("provider error: {message}"),
            )));
        }

        let features = body
            .get_mut("features")
            .map(Value::take)
            .ok_or_else(|| {
                FetchStop::Failed(AppError::malformed(
                    format!("batch at offset {offset}"),
                    "response has no features array",
                ))
            })?;
        let features: Vec<RawFeature> = serde_json::from_value(features).map_err(|e| {
            FetchStop::Failed(AppError::malformed(format!("batch at offset {offset}"), e))
        })?;

        if features.is_empty() {
            return Err(FetchStop::EmptyBatch { offset });
        }
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;
    use tokio::time::Instant;

    use super::*;
    use crate::models::{ProviderKind, SchemaInfo};
    use crate::services::source::testing::{ScriptedSource, feature_page, paged_layer, param};

    fn endpoint(max_record_count: Option<u64>) -> ServiceEndpoint {
        ServiceEndpoint {
            provider: ProviderKind::Primary,
            identifier: "Fire_Stations".into(),
            base_url: "https://primary.test/rest/services/Fire_Stations/FeatureServer/0".into(),
            schema: SchemaInfo {
                name: "Fire Stations".into(),
                max_record_count,
                ..SchemaInfo::default()
            },
        }
    }

    fn config(batch_size: u64) -> FetchConfig {
        FetchConfig {
            batch_size,
            batch_delay_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_end_to_end_5000_records() {
        let source = ScriptedSource::new(|url| paged_layer(url, 5000));
        let fetcher = RecordFetcher::new(&source, &config(2000));

        let outcome = fetcher.fetch_all(&endpoint(None)).await.unwrap();

        assert_eq!(source.page_offsets(), vec![0, 2000, 4000]);
        assert_eq!(outcome.features.len(), 5000);
        assert_eq!(outcome.batches_requested, 3);
        assert_eq!(outcome.expected_batches(), 3);
        assert!(outcome.is_complete());
    }

    #[tokio::test]
    async fn test_issues_ceil_total_over_batch_requests() {
        for (total, batch, expected) in [(1, 2000, 1), (2000, 2000, 1), (2001, 2000, 2), (9, 4, 3)] {
            let source = ScriptedSource::new(move |url| paged_layer(url, total));
            let fetcher = RecordFetcher::new(&source, &config(batch));

            let outcome = fetcher.fetch_all(&endpoint(None)).await.unwrap();

            assert_eq!(source.page_offsets().len(), expected, "total={total} batch={batch}");
            assert_eq!(outcome.features.len() as u64, total);
        }
    }

    #[tokio::test]
    async fn test_preserves_arrival_order() {
        let source = ScriptedSource::new(|url| paged_layer(url, 10));
        let fetcher = RecordFetcher::new(&source, &config(3));

        let outcome = fetcher.fetch_all(&endpoint(None)).await.unwrap();

        let ids: Vec<u64> = outcome
            .features
            .iter()
            .filter_map(|f| f.attribute("OBJECTID").and_then(|v| v.as_u64()))
            .collect();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_provider_error_keeps_partial_results() {
        let source = ScriptedSource::new(|url| {
            if param(url, "resultOffset").as_deref() == Some("2000") {
                return Ok(json!({
                    "error": { "code": 500, "message": "Unable to complete operation." }
                }));
            }
            paged_layer(url, 5000)
        });
        let fetcher = RecordFetcher::new(&source, &config(2000));

        let outcome = fetcher.fetch_all(&endpoint(None)).await.unwrap();

        assert_eq!(source.page_offsets(), vec![0, 2000]);
        assert_eq!(outcome.features.len(), 2000);
        assert!(matches!(
            outcome.stop,
            Some(FetchStop::Failed(AppError::BatchFetch { offset: 2000, .. }))
        ));
    }

    #[tokio::test]
    async fn test_transport_error_keeps_partial_results() {
        let source = ScriptedSource::new(|url| {
            if param(url, "resultOffset").as_deref() == Some("4000") {
                return Err(AppError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "operation timed out",
                )));
            }
            paged_layer(url, 5000)
        });
        let fetcher = RecordFetcher::new(&source, &config(2000));

        let outcome = fetcher.fetch_all(&endpoint(None)).await.unwrap();

        assert_eq!(outcome.features.len(), 4000);
        assert_eq!(outcome.batches_requested, 3);
        assert!(!outcome.is_complete());
    }

    #[tokio::test]
    async fn test_malformed_batch_stops_paging() {
        let source = ScriptedSource::new(|url| {
            if param(url, "resultOffset").as_deref() == Some("2000") {
                return Ok(json!({ "features": "nope" }));
            }
            paged_layer(url, 5000)
        });
        let fetcher = RecordFetcher::new(&source, &config(2000));

        let outcome = fetcher.fetch_all(&endpoint(None)).await.unwrap();

        assert_eq!(outcome.features.len(), 2000);
        assert!(matches!(
            outcome.stop,
            Some(FetchStop::Failed(AppError::MalformedResponse { .. }))
        ));
    }

    #[tokio::test]
    async fn test_empty_batch_is_end_of_data() {
        let source = ScriptedSource::new(|url| {
            if param(url, "returnCountOnly").is_some() {
                return Ok(json!({ "count": 5000 }));
            }
            match param(url, "resultOffset").as_deref() {
                Some("0") => Ok(feature_page(1, 2000)),
                _ => Ok(json!({ "features": [] })),
            }
        });
        let fetcher = RecordFetcher::new(&source, &config(2000));

        let outcome = fetcher.fetch_all(&endpoint(None)).await.unwrap();

        assert_eq!(source.page_offsets(), vec![0, 2000]);
        assert_eq!(outcome.features.len(), 2000);
        assert_eq!(outcome.declared_total, 5000);
        assert!(matches!(outcome.stop, Some(FetchStop::EmptyBatch { offset: 2000 })));
    }

    #[tokio::test]
    async fn test_zero_count_is_empty_dataset() {
        let source = ScriptedSource::new(|url| paged_layer(url, 0));
        let fetcher = RecordFetcher::new(&source, &config(2000));

        let err = fetcher.fetch_all(&endpoint(None)).await.unwrap_err();

        assert!(matches!(err, AppError::EmptyDataset { .. }));
        assert!(source.page_offsets().is_empty());
    }

    #[tokio::test]
    async fn test_count_query_error_is_fatal() {
        let source = ScriptedSource::new(|_| {
            Ok(json!({ "error": { "code": 499, "message": "Token Required" } }))
        });
        let fetcher = RecordFetcher::new(&source, &config(2000));

        let err = fetcher.count(&endpoint(None)).await.unwrap_err();

        assert!(matches!(err, AppError::CountQuery { .. }));
        assert!(err.is_fatal());
        assert!(err.to_string().contains("Token Required"));
    }

    #[tokio::test]
    async fn test_count_transport_failure_is_fatal() {
        let source = ScriptedSource::new(|_| {
            Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            )))
        });
        let fetcher = RecordFetcher::new(&source, &config(2000));

        let err = fetcher.fetch_all(&endpoint(None)).await.unwrap_err();

        assert!(matches!(err, AppError::CountQuery { .. }));
        assert!(err.is_fatal());
        assert!(source.page_offsets().is_empty());
    }

    #[tokio::test]
    async fn test_count_without_count_field_is_fatal() {
        let source = ScriptedSource::new(|_| Ok(json!({ "features": [] })));
        let fetcher = RecordFetcher::new(&source, &config(2000));

        let err = fetcher.count(&endpoint(None)).await.unwrap_err();

        assert!(matches!(err, AppError::CountQuery { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_courtesy_delay_between_batches_only() {
        let start = Instant::now();
        let page_times = Mutex::new(Vec::new());
        let source = ScriptedSource::new(|url| {
            if param(url, "resultOffset").is_some() {
                page_times.lock().unwrap().push(start.elapsed());
            }
            paged_layer(url, 5000)
        });
        let fetcher = RecordFetcher::new(
            &source,
            &FetchConfig {
                batch_size: 2000,
                batch_delay_ms: 500,
            },
        );

        let outcome = fetcher.fetch_all(&endpoint(None)).await.unwrap();

        assert_eq!(outcome.batches_requested, 3);
        let page_times = page_times.lock().unwrap().clone();
        assert_eq!(page_times.len(), 3);
        assert_eq!(page_times[0], Duration::ZERO);
        for (i, at) in page_times.iter().enumerate() {
            let expected = Duration::from_millis(500) * i as u32;
            assert!(
                *at >= expected && *at < expected + Duration::from_millis(50),
                "page {i} requested at {at:?}"
            );
        }
        assert!(start.elapsed() >= Duration::from_millis(1000));
        assert!(start.elapsed() < Duration::from_millis(1100));
    }

    #[tokio::test]
    async fn test_batch_size_capped_by_layer_limit() {
        let source = ScriptedSource::new(|url| paged_layer(url, 2500));
        let fetcher = RecordFetcher::new(&source, &config(2000));

        let outcome = fetcher.fetch_all(&endpoint(Some(1000))).await.unwrap();

        assert_eq!(source.page_offsets(), vec![0, 1000, 2000]);
        assert_eq!(outcome.features.len(), 2500);
    }

    #[tokio::test]
    async fn test_batches_stream_is_lazy() {
        let source = ScriptedSource::new(|url| paged_layer(url, 6000));
        let fetcher = RecordFetcher::new(&source, &config(2000));
        let endpoint = endpoint(None);

        let mut batches = pin!(fetcher.batches(&endpoint, 6000));
        let first = batches.next().await.unwrap().unwrap();

        assert_eq!(first.offset, 0);
        assert_eq!(source.page_offsets(), vec![0]);
    }
}
