//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::cache::{refresh_impl, status_impl};
use crate::tools::{ResourceFetchParams, fetch_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use tether_worker::ServiceWorker;
use url::Url;

/// The main MCP server handler for tether.
#[derive(Clone)]
pub struct TetherServer {
    worker: Arc<ServiceWorker>,
    origin: Url,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl TetherServer {
    /// Create a server handler around an installed worker.
    pub fn new(worker: Arc<ServiceWorker>, origin: Url) -> Self {
        Self { worker, origin, tool_router: Self::tool_router() }
    }

    /// Fetch a resource through the offline-first worker.
    #[tool(
        description = "Fetch a URL or application path through the offline-first cache. Returns status, headers, body, and whether the response came from the network, the cache, an offline page, or passthrough."
    )]
    async fn resource_fetch(&self, params: Parameters<ResourceFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, &self.origin, params.0).await
    }

    /// Report the worker state and cache generations.
    #[tool(description = "Show the worker lifecycle state, the current cache generation, and every stored generation with its entry count.")]
    async fn cache_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker).await
    }

    /// Re-populate the current generation from the manifest.
    #[tool(description = "Re-fetch every manifest asset into the current cache generation. All-or-nothing: on failure the generation is left as it was.")]
    async fn cache_refresh(&self) -> Result<CallToolResult, McpError> {
        refresh_impl(&self.worker).await
    }
}

impl ServerHandler for TetherServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "tether".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
