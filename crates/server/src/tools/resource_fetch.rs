//! resource_fetch tool implementation.
//!
//! Runs one request through the worker exactly as an intercepted page
//! request would be, and reports where the response came from.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use tether_core::http::canonicalize;
use tether_core::{Error, Method, RequestMode, ResourceRequest};
use tether_worker::{Served, ServiceWorker};

use crate::error::{ToolError, to_json};

/// Bodies longer than this are cut before being returned as text.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Input parameters for the resource_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResourceFetchParams {
    /// Absolute URL, or a path resolved against the application origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode: "navigate" (default), "same-origin", "no-cors" or "cors".
    #[serde(default = "default_mode")]
    pub mode: String,
}

fn default_method() -> String {
    "GET".into()
}

fn default_mode() -> String {
    "navigate".into()
}

/// Output structure for the resource_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResourceFetchOutput {
    /// The resolved request URL.
    pub url: String,
    pub status: u16,
    pub status_text: String,
    /// Response kind: basic, cors, opaque or synthetic.
    pub kind: String,
    /// Where the response came from: network, cache, offline or passthrough.
    pub source: String,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as lossy UTF-8.
    pub body: String,
    pub body_truncated: bool,
}

impl ResourceFetchOutput {
    fn new(url: &Url, served: Served) -> Self {
        let response = served.response;
        let body_truncated = response.body.len() > MAX_BODY_BYTES;
        let body = &response.body[..response.body.len().min(MAX_BODY_BYTES)];

        Self {
            url: url.to_string(),
            status: response.status,
            status_text: response.status_text.clone(),
            kind: response.kind.as_str().to_string(),
            source: served.source.as_str().to_string(),
            content_type: response.content_type().map(str::to_string),
            body: String::from_utf8_lossy(body).into_owned(),
            body_truncated,
            headers: response.headers,
        }
    }
}

/// Parse tool arguments into a resource request.
fn build_request(origin: &Url, params: &ResourceFetchParams) -> Result<ResourceRequest, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()).into());
    }

    let method: Method = params.method.parse()?;
    let mode: RequestMode = params.mode.parse()?;
    let url = canonicalize(params.url.trim(), origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    Ok(ResourceRequest::get(url).with_method(method).with_mode(mode))
}

/// Implementation of the resource_fetch tool.
pub async fn fetch_impl(
    worker: &ServiceWorker, origin: &Url, params: ResourceFetchParams,
) -> Result<CallToolResult, McpError> {
    let request = build_request(origin, &params)?;
    let url = request.url.clone();

    let served = worker.handle_fetch(request).await?;
    tracing::debug!(url = %url, source = served.source.as_str(), status = served.response.status, "resource served");

    let json = to_json(&ResourceFetchOutput::new(&url, served))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
