//! HTTP fetch pipeline backing the worker's network seam.
//!
//! ### Response snapshots
//! - Every received response is returned whatever its status; the strategies
//!   decide what is cacheable.
//! - Bodies are read in full and capped at `max_bytes` (default 5MB).
//! - Max redirects: 5
//!
//! ### Response kinds
//! - Navigations and same-origin requests produce `basic` responses
//! - Cross-origin `no-cors` requests produce `opaque` responses
//! - Other cross-origin requests produce `cors` responses

use async_trait::async_trait;
use reqwest::{Client, header};
use std::time::{Duration, Instant};
use url::Url;

use tether_core::http::same_origin;
use tether_core::{AppConfig, Error, Method, Network, RequestMode, ResourceRequest, ResponseKind, ResponseSnapshot};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "tether/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Origin the application is served from (default: http://localhost:8080)
    pub origin: Url,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "tether/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
            origin: Url::parse("http://localhost:8080").expect("static origin parses"),
        }
    }
}

impl FetchConfig {
    /// Derive the fetch settings from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            origin,
            ..Default::default()
        })
    }
}

/// Kind of response a request yields, seen from the application origin.
pub fn response_kind(request: &ResourceRequest, origin: &Url) -> ResponseKind {
    if request.is_navigation() || same_origin(&request.url, origin) {
        return ResponseKind::Basic;
    }
    match request.mode {
        RequestMode::NoCors => ResponseKind::Opaque,
        _ => ResponseKind::Cors,
    }
}

fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

fn accept_header(request: &ResourceRequest) -> &'static str {
    if request.is_navigation() { "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8" } else { "*/*" }
}

/// HTTP fetch client producing response snapshots.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::FetchFailed(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn map_transport_error(url: &Url, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::FetchTimeout(format!("{url}: {err}"))
        } else {
            Error::FetchFailed(format!("{url}: network error: {err}"))
        }
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &ResourceRequest) -> Result<ResponseSnapshot, Error> {
        let start = Instant::now();
        let url = &request.url;

        let mut builder = self
            .http
            .request(http_method(request.method), url.as_str())
            .header(header::ACCEPT, accept_header(request));
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_transport_error(url, e))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_transport_error(url, e))?;

        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", body.len(), self.config.max_bytes)));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            url,
            status.as_u16(),
            fetch_ms,
            body.len()
        );

        Ok(ResponseSnapshot {
            url: url.to_string(),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            kind: response_kind(request, &self.config.origin),
            headers,
            body,
        })
    }
}
