//! HttpClient middleware used for catalog sources and the tally service
//!
//! Responsible for
//!  - handing all HTTP requests
//!  - logging/tracing
//!  - retries and backoff (for timeouts and connection errors)
//!  - honouring 429 Retry-After

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use reqwest::{
    ClientBuilder, Method, StatusCode,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, RETRY_AFTER},
};
use serde::{Serialize, de::DeserializeOwned};
use snafu::prelude::*;
use tracing::{debug, error, info, trace, warn};

use crate::{
    Result,
    client::SecretKey,
    config::RETRY_AFTER_MAX_SECS,
    error::{GalleryError, HttpSnafu, SerializationSnafu},
};

/// Header carrying the service api key
const API_KEY_HEADER: &str = "apikey";

/// Header requesting an empty body on writes
const PREFER_HEADER: &str = "prefer";
const PREFER_MINIMAL: &str = "return=minimal";

/// HTTP metrics tracked using atomic counters for thread-safe access.
/// These counters are cumulative and never reset during the client's lifetime.
#[derive(Debug, Default)]
pub struct HttpMetrics {
    /// Total number of HTTP requests sent
    total_requests: AtomicU64,
    /// Total number of successful responses (2xx status codes)
    successful_responses: AtomicU64,
    /// Total number of error responses (non-2xx status codes)
    errors: AtomicU64,
    /// Total number of retry attempts
    retries: AtomicU64,
    /// Total bytes sent in request bodies
    bytes_sent: AtomicU64,
    /// Total bytes received in response bodies
    bytes_received: AtomicU64,
    /// Total number of 429 responses
    rate_limit_errors: AtomicU64,
}

impl HttpMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of current metrics as plain u64 values
    pub fn snapshot(&self) -> HttpMetricsSnapshot {
        HttpMetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_responses: self.successful_responses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            rate_limit_errors: self.rate_limit_errors.load(Ordering::Relaxed),
        }
    }

    fn increment_requests(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    fn increment_success(&self) {
        self.successful_responses.fetch_add(1, Ordering::Relaxed);
    }

    fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    fn increment_retries(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    fn add_bytes_sent(&self, bytes: u64) {
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    fn add_bytes_received(&self, bytes: u64) {
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    fn increment_rate_limit_errors(&self) {
        self.rate_limit_errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of HTTP metrics with plain u64 values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HttpMetricsSnapshot {
    /// Total number of HTTP requests sent
    pub total_requests: u64,
    /// Total number of successful responses (2xx status codes)
    pub successful_responses: u64,
    /// Total number of error responses
    pub errors: u64,
    /// Total number of retry attempts
    pub retries: u64,
    /// Total bytes sent in request bodies
    pub bytes_sent: u64,
    /// Total bytes received in response bodies
    pub bytes_received: u64,
    /// Total number of 429 responses
    pub rate_limit_errors: u64,
}

impl HttpMetricsSnapshot {
    /// Sums two snapshots (catalog client + tally client)
    pub fn combine(self, other: Self) -> Self {
        Self {
            total_requests: self.total_requests + other.total_requests,
            successful_responses: self.successful_responses + other.successful_responses,
            errors: self.errors + other.errors,
            retries: self.retries + other.retries,
            bytes_sent: self.bytes_sent + other.bytes_sent,
            bytes_received: self.bytes_received + other.bytes_received,
            rate_limit_errors: self.rate_limit_errors + other.rate_limit_errors,
        }
    }
}

impl fmt::Display for HttpMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "requests={} success={} errors={} retries={} rate_limit={} sent={} recv={}",
            self.total_requests,
            self.successful_responses,
            self.errors,
            self.retries,
            self.rate_limit_errors,
            format_bytes(self.bytes_sent),
            format_bytes(self.bytes_received),
        )
    }
}

#[allow(clippy::cast_precision_loss)]
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes}B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// status codes where it's ok to retry and backoff
fn retry_for_status(code: StatusCode) -> bool {
    match code {
      StatusCode::TOO_MANY_REQUESTS /* 429 */ |
      StatusCode::GATEWAY_TIMEOUT /* 504 */ |
      StatusCode::REQUEST_TIMEOUT /* 408 */ => true,
      _ => false,
    }
}

#[derive(Clone, Default)]
pub(crate) struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("body", &self.body.as_ref().map_or(0, Bytes::len))
            .finish()
    }
}

#[derive(Debug)]
pub(crate) struct HttpClient {
    pub client: reqwest::Client,

    /// Prefix for request paths. Empty for clients that fetch absolute urls.
    pub base_url: String,

    api_key: Option<SecretKey>,

    /// Retries for idempotent requests; 0 disables retry.
    max_retries: u32,

    /// HTTP request/response metrics
    pub metrics: Arc<HttpMetrics>,
}

/// Parse Retry-After (delta-seconds form) from a 429 response.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = headers.get(RETRY_AFTER)?.to_str().ok()?;
    match header.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(_) => {
            warn!("Could not parse 429 response header 'retry-after: {header}'");
            None
        }
    }
}

impl HttpClient {
    pub fn new(
        builder: ClientBuilder,
        base_url: impl Into<String>,
        api_key: Option<SecretKey>,
        max_retries: u32,
    ) -> Result<Self> {
        let client = builder.build().context(HttpSnafu {
            method: "client-init",
            url: "",
        })?;
        Ok(Self::from_client(client, base_url, api_key, max_retries))
    }

    /// Wraps an already-built client; clones of one `reqwest::Client` share a pool.
    pub fn from_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<SecretKey>,
        max_retries: u32,
    ) -> Self {
        HttpClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            max_retries,
            metrics: Arc::new(HttpMetrics::new()),
        }
    }

    /// Returns a snapshot of current HTTP metrics
    pub fn metrics_snapshot(&self) -> HttpMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Fetches a json document from an absolute url.
    pub(crate) async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url, "fetch");
        self.send(HttpRequest {
            method: Method::GET,
            path: url.into(),
            query: Vec::new(),
            body: None,
        })
        .await
    }

    pub(crate) async fn get_request<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<T> {
        let req = HttpRequest {
            method: Method::GET,
            path: path.into(),
            query,
            body: None,
        };
        self.send(req).await
    }

    pub(crate) async fn post_request<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let req = HttpRequest {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: Some(Bytes::from(
                serde_json::to_vec(body).context(SerializationSnafu)?,
            )),
        };
        self.send(req).await
    }

    /// Makes a PATCH request with JSON body. Rows are selected by `query`.
    pub(crate) async fn patch_request<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        query: Vec<(String, String)>,
    ) -> Result<T> {
        let req = HttpRequest {
            method: Method::PATCH,
            path: path.into(),
            query,
            body: Some(Bytes::from(
                serde_json::to_vec(body).context(SerializationSnafu)?,
            )),
        };
        self.send(req).await
    }

    /// Makes a DELETE request. Rows are selected by `query`.
    pub(crate) async fn delete_request<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<T> {
        let req = HttpRequest {
            method: Method::DELETE,
            path: path.into(),
            query,
            body: None,
        };
        self.send(req).await
    }

    /// This function handles all http requests (get,post,patch,delete)
    /// - honours 429 Retry-After
    /// - retries up to `max_retries` times for connection failures or server timeout
    /// - maps http error codes into `GalleryErrors`
    /// - deserializes json response body into return type T
    pub(crate) async fn send<T: DeserializeOwned>(&self, req: HttpRequest) -> Result<T> {
        let mut attempt = 0u32;

        let full_url = format!("{}{}", self.base_url, req.path);
        let mut req_builder = self
            .client
            .request(req.method.clone(), &full_url)
            .query(&req.query);
        if let Some(key) = &self.api_key {
            req_builder = req_builder
                .header(API_KEY_HEADER, key.expose())
                .header(AUTHORIZATION, format!("Bearer {}", key.expose()));
        }
        if req.body.is_some() {
            req_builder = req_builder
                .header(CONTENT_TYPE, "application/json")
                .header(PREFER_HEADER, PREFER_MINIMAL);
        }

        // debug log (if tracing enabled)
        log_request(&req_builder, req.body.as_ref());

        let body_size = req.body.as_ref().map_or(0, |b| b.len() as u64);

        loop {
            let request = req_builder
                .try_clone()
                .ok_or_else(|| GalleryError::Other {
                    message: "reqwest::RequestBuilder internal error".into(),
                })?
                .body(req.body.clone().unwrap_or_default());

            self.metrics.increment_requests();
            self.metrics.add_bytes_sent(body_size);

            match request.send().await {
                Ok(response) => {
                    let code = response.status();
                    match code {
                        ok if ok.is_success() => {
                            // If we fail to fully read the response, don't retry. The server may
                            // have applied a non-idempotent write.
                            let body = response.bytes().await.context(HttpSnafu {
                                method: req.method.to_string(),
                                url: req.path.clone(),
                            })?;
                            self.metrics.increment_success();
                            self.metrics.add_bytes_received(body.len() as u64);

                            log_response(&req.path, &body);

                            // deserialization failure should not be retried
                            return deserialize_json(&body);
                        }
                        StatusCode::NOT_FOUND /* 404 */ | StatusCode::GONE /* 410 */ => {
                            self.metrics.increment_errors();
                            let message = response.text().await.unwrap_or_default();
                            error!(?code, ?message, ?req, "http");
                            return Err(GalleryError::NotFound {
                                obj_type: "resource".into(),
                                key: req.path,
                            });
                        }
                        _ => {
                            let retry_after = if code == StatusCode::TOO_MANY_REQUESTS {
                                self.metrics.increment_rate_limit_errors();
                                parse_retry_after(response.headers())
                            } else {
                                None
                            };
                            let message = response.text().await.unwrap_or_default();
                            error!(?code, ?req, message, attempt, "http");
                            self.metrics.increment_errors();
                            if attempt < self.max_retries
                                && retry_for_status(code)
                                && is_idempotent_method(&req.method)
                            {
                                match retry_after {
                                    Some(wait)
                                        if wait > Duration::from_secs(RETRY_AFTER_MAX_SECS) =>
                                    {
                                        error!(
                                            attempt,
                                            ?req,
                                            "http 429 retry-after={}s exceeds max",
                                            wait.as_secs()
                                        );
                                    }
                                    Some(wait) => {
                                        info!("RateLimit: pausing for {} sec", wait.as_secs());
                                        tokio::time::sleep(wait).await;
                                        self.metrics.increment_retries();
                                        attempt += 1;
                                        continue;
                                    }
                                    None => {
                                        log_and_backoff(attempt, code.to_string()).await;
                                        self.metrics.increment_retries();
                                        attempt += 1;
                                        continue;
                                    }
                                }
                            }
                            return Err(GalleryError::ApiError {
                                code: code.as_u16(),
                                method: req.method.to_string(),
                                url: req.path,
                                message,
                            });
                        }
                    }
                }
                Err(e) => {
                    error!(source=?e, ?req, "http");
                    if (e.is_connect() || e.is_timeout())
                        && is_idempotent_method(&req.method)
                        && attempt < self.max_retries
                    {
                        log_and_backoff(attempt, e.to_string()).await;
                        self.metrics.increment_retries();
                        attempt += 1;
                        continue;
                    }
                    self.metrics.increment_errors();
                    if attempt > 0 && attempt >= self.max_retries {
                        warn!(attempt, ?req, "giving up");
                    }
                    return Err(GalleryError::Http {
                        method: req.method.to_string(),
                        url: req.path,
                        source: e,
                    });
                }
            }
        }
    }
}

// dump request
// requires RUST_LOG=gallery::http_json=trace
fn log_request(builder: &reqwest::RequestBuilder, body: Option<&Bytes>) {
    if tracing::enabled!(target: "gallery::http_json", tracing::Level::TRACE)
        && let Some(req) = builder.try_clone().and_then(|b| b.build().ok())
    {
        let method = req.method().as_str();
        let url = req.url();
        let body = body
            .map(|b| String::from_utf8_lossy(b).to_string())
            .unwrap_or_default();
        // don't log headers so we don't leak the api key
        trace!(target: "gallery::http_json", "{method} url={url} body={body}");
    }
}

// dump json response, for debugging
fn log_response(path: &str, body: &Bytes) {
    if tracing::enabled!(target: "gallery::http_json", tracing::Level::TRACE) {
        trace!(target: "gallery::http_json", "Response path={path} body={}",
            String::from_utf8_lossy(body)
        );
    }
}

// deserialize, reporting errors with 'serde_path_to_error', which provides
// detailed json path to the error.
// An empty body (writes with `Prefer: return=minimal`) decodes as json null.
pub(crate) fn deserialize_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"null".as_slice()
    } else {
        body
    };
    let mut deserializer = serde_json::Deserializer::from_slice(body);
    match serde_path_to_error::deserialize(&mut deserializer) {
        Ok(value) => Ok(value),
        Err(err) => {
            error!("Deserialization failed at {}: {}", err.path(), err);
            Err(GalleryError::Deserialization {
                source: err.into_inner(),
            })
        }
    }
}

/// exponential backoff: 1s, 2s, 4s, with jitter
fn backoff_delay(attempt: u32, jitter: f64) -> Duration {
    let base_delay = 2u64.pow(attempt.min(10));
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let jittered_delay = ((base_delay as f64) * (0.5 + jitter)).round() as u64;
    Duration::from_secs(jittered_delay.max(1))
}

// log attempt and sleep for exponential backoff
async fn log_and_backoff(attempt: u32, err: String) {
    let delay = backoff_delay(attempt, rand::random::<f64>());
    warn!(
        "Recoverable error {err}. Attempt {attempt}. Waiting {}s before retry",
        delay.as_secs()
    );
    tokio::time::sleep(delay).await;
}

fn is_idempotent_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_retry_for_status() {
        assert!(retry_for_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(retry_for_status(StatusCode::REQUEST_TIMEOUT));
        assert!(retry_for_status(StatusCode::GATEWAY_TIMEOUT));
        assert!(!retry_for_status(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static("3"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(3)));
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2026 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_backoff_delay() {
        assert_eq!(backoff_delay(0, 0.0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1, 0.5), Duration::from_secs(2));
        assert_eq!(backoff_delay(2, 0.99), Duration::from_secs(6));
    }

    #[test]
    fn test_idempotent_methods() {
        assert!(is_idempotent_method(&Method::GET));
        assert!(is_idempotent_method(&Method::DELETE));
        assert!(!is_idempotent_method(&Method::POST));
        assert!(!is_idempotent_method(&Method::PATCH));
    }

    #[test]
    fn test_empty_body_decodes_as_unit() {
        let unit: Result<()> = deserialize_json(b"");
        assert!(unit.is_ok());
        let rows: Vec<u32> = deserialize_json(b"[1,2]").unwrap();
        assert_eq!(rows, vec![1, 2]);
        let bad: Result<Vec<u32>> = deserialize_json(b"{\"a\":1}");
        assert!(matches!(bad, Err(GalleryError::Deserialization { .. })));
    }

    #[test]
    fn test_metrics_combine() {
        let a = HttpMetricsSnapshot {
            total_requests: 2,
            errors: 1,
            ..Default::default()
        };
        let b = HttpMetricsSnapshot {
            total_requests: 3,
            retries: 1,
            ..Default::default()
        };
        let c = a.combine(b);
        assert_eq!(c.total_requests, 5);
        assert_eq!(c.errors, 1);
        assert_eq!(c.retries, 1);
        assert!(c.to_string().contains("requests=5"));
    }
}
