//! cache_status tool implementation.
//!
//! Reports the worker state and every generation in the store.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tether_core::GenerationInfo;
use tether_worker::ServiceWorker;

use crate::error::to_json;

/// Output from the cache_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatusOutput {
    /// Lifecycle state: parsed, installing, installed, activating or activated.
    pub state: String,
    /// Generation requests are answered from.
    pub current_generation: String,
    /// Every generation in the store, oldest first.
    pub generations: Vec<GenerationInfo>,
}

/// Implementation of the cache_status tool.
pub async fn status_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let status = worker.status().await?;

    let output = CacheStatusOutput {
        state: status.state.to_string(),
        current_generation: status.current_generation,
        generations: status.generations,
    };

    Ok(CallToolResult::success(vec![Content::text(to_json(&output)?)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{offline_worker, output_json};

    #[tokio::test]
    async fn test_status_before_install() {
        let (worker, _) = offline_worker().await;

        let output: CacheStatusOutput = output_json(&status_impl(&worker).await.unwrap());
        assert_eq!(output.state, "parsed");
        assert_eq!(output.current_generation, "tether-v1");
        assert!(output.generations.is_empty());
    }

    #[tokio::test]
    async fn test_status_after_degraded_install() {
        let (worker, _) = offline_worker().await;
        worker.on_install().await;
        worker.on_activate().await.unwrap();

        let output: CacheStatusOutput = output_json(&status_impl(&worker).await.unwrap());
        assert_eq!(output.state, "activated");
        assert_eq!(output.generations.len(), 1);
        assert_eq!(output.generations[0].name, "tether-v1");
        assert_eq!(output.generations[0].entries, 0);
    }
}
