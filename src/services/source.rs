// src/services/source.rs

//! Feature service transport.
//!
//! Every request the harvester makes is a JSON `GET`. The [`FeatureSource`]
//! trait keeps the resolver and fetcher independent of `reqwest`.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::HttpConfig;
use crate::utils::http::create_client;

/// Read-only access to a feature service.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// `GET` the URL and parse the body as JSON.
    ///
    /// Bodies that are not JSON fail with [`AppError::MalformedResponse`];
    /// transport failures and timeouts fail with [`AppError::Http`].
    async fn get_json(&self, url: &str) -> Result<Value>;
}

/// [`FeatureSource`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpFeatureSource {
    client: Client,
}

impl HttpFeatureSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        Ok(Self::new(create_client(config)?))
    }
}

#[async_trait]
impl FeatureSource for HttpFeatureSource {
    async fn get_json(&self, url: &str) -> Result<Value> {
        log::debug!("GET {}", url);
        let text = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        serde_json::from_str(&text).map_err(|e| AppError::malformed(url, e))
    }
}

/// Provider-level error carried in a response body, if any.
///
/// The service reports failures with HTTP 200 and a top-level `error`
/// object, usually holding a `message`.
pub fn provider_error(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());
    Some(message)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted in-memory feature services.

    use std::sync::Mutex;

    use serde_json::{Value, json};
    use url::Url;

    use super::*;

    /// A [`FeatureSource`] answering from a closure and recording every URL.
    pub(crate) struct ScriptedSource<F> {
        respond: F,
        requests: Mutex<Vec<String>>,
    }

    impl<F> ScriptedSource<F>
    where
        F: Fn(&Url) -> Result<Value> + Send + Sync,
    {
        pub(crate) fn new(respond: F) -> Self {
            Self {
                respond,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        /// `resultOffset` of every page request, in order.
        pub(crate) fn page_offsets(&self) -> Vec<u64> {
            self.requests()
                .iter()
                .filter_map(|u| Url::parse(u).ok())
                .filter_map(|u| param(&u, "resultOffset"))
                .filter_map(|v| v.parse().ok())
                .collect()
        }
    }

    #[async_trait]
    impl<F> FeatureSource for ScriptedSource<F>
    where
        F: Fn(&Url) -> Result<Value> + Send + Sync,
    {
        async fn get_json(&self, url: &str) -> Result<Value> {
            self.requests.lock().unwrap().push(url.to_string());
            let parsed = Url::parse(url)?;
            (self.respond)(&parsed)
        }
    }

    pub(crate) fn param(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    pub(crate) fn layer_metadata(name: &str) -> Value {
        json!({
            "name": name,
            "geometryType": "esriGeometryPoint",
            "maxRecordCount": 2000,
            "fields": [{ "name": "OBJECTID" }, { "name": "NAME" }, { "name": "STATE" }]
        })
    }

    /// A page of `len` point features with ids starting at `first_id`.
    pub(crate) fn feature_page(first_id: u64, len: u64) -> Value {
        let features: Vec<Value> = (first_id..first_id + len)
            .map(|id| {
                json!({
                    "attributes": { "OBJECTID": id, "NAME": format!("Station {id}"), "STATE": "MN" },
                    "geometry": { "x": -93.0, "y": 45.0 }
                })
            })
            .collect();
        json!({ "features": features })
    }

    /// Answers count and page queries for a layer holding `total` records.
    pub(crate) fn paged_layer(url: &Url, total: u64) -> Result<Value> {
        if param(url, "returnCountOnly").as_deref() == Some("true") {
            return Ok(json!({ "count": total }));
        }
        let offset: u64 = param(url, "resultOffset")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let size: u64 = param(url, "resultRecordCount")
            .and_then(|v| v.parse().ok())
            .unwrap_or(2000);
        let len = size.min(total.saturating_sub(offset));
        Ok(feature_page(offset + 1, len))
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    /// Serve one connection on localhost. `None` reads the request and
    /// never answers.
    async fn serve_once(response: Option<String>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            match response {
                Some(response) => {
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
                None => tokio::time::sleep(Duration::from_secs(30)).await,
            }
        });
        format!("http://{addr}/Fire_Stations/FeatureServer/0?f=json")
    }

    fn source(timeout_secs: u64) -> HttpFeatureSource {
        HttpFeatureSource::from_config(&HttpConfig {
            timeout_secs,
            ..HttpConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_http_source_parses_json_body() {
        let url = serve_once(Some(http_response("200 OK", r#"{"name":"Fire Stations"}"#))).await;

        let body = source(5).get_json(&url).await.unwrap();

        assert_eq!(body["name"], "Fire Stations");
    }

    #[tokio::test]
    async fn test_http_source_garbage_body_is_malformed() {
        let url = serve_once(Some(http_response("200 OK", "<html>Service Unavailable</html>"))).await;

        let err = source(5).get_json(&url).await.unwrap_err();

        assert!(matches!(err, AppError::MalformedResponse { .. }), "{err}");
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_http_source_error_status_is_http_error() {
        let url = serve_once(Some(http_response("500 Internal Server Error", "{}"))).await;

        let err = source(5).get_json(&url).await.unwrap_err();

        match err {
            AppError::Http(e) => assert_eq!(e.status().map(|s| s.as_u16()), Some(500)),
            other => panic!("expected HTTP error, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_http_source_times_out_stalled_request() {
        let url = serve_once(None).await;
        let started = Instant::now();

        let err = source(1).get_json(&url).await.unwrap_err();

        assert!(matches!(err, AppError::Http(ref e) if e.is_timeout()), "{err}");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_provider_error_message() {
        let body = json!({ "error": { "code": 400, "message": "Invalid query" } });
        assert_eq!(provider_error(&body), Some("Invalid query".to_string()));
    }

    #[test]
    fn test_provider_error_without_message() {
        let body = json!({ "error": { "code": 500 } });
        assert_eq!(provider_error(&body), Some(r#"{"code":500}"#.to_string()));
    }

    #[test]
    fn test_no_provider_error() {
        assert!(provider_error(&json!({ "name": "Fire_Stations" })).is_none());
    }
}
