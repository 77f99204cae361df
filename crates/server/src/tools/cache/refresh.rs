//! cache_refresh tool implementation.
//!
//! Re-runs installation so the current generation picks up fresh copies of
//! every manifest asset.

use chrono::Utc;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tether_worker::{InstallOutcome, ServiceWorker};

use crate::error::to_json;

/// Output from the cache_refresh tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheRefreshOutput {
    pub generation: String,
    /// Whether every manifest entry was stored.
    pub complete: bool,
    /// Number of entries written on success.
    pub entries: Option<usize>,
    /// Why population failed, if it did.
    pub reason: Option<String>,
    /// ISO8601 timestamp of the refresh.
    pub refreshed_at: String,
}

/// Implementation of the cache_refresh tool.
///
/// A failed population is reported in the output rather than as a tool error;
/// whatever the generation held before stays in place.
pub async fn refresh_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let outcome = worker.on_install().await;
    let refreshed_at = Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    let (entries, reason) = match outcome {
        InstallOutcome::Complete { entries } => (Some(entries), None),
        InstallOutcome::Degraded { reason } => (None, Some(reason)),
    };

    let output = CacheRefreshOutput {
        generation: worker.current_generation().to_string(),
        complete: entries.is_some(),
        entries,
        reason,
        refreshed_at,
    };

    Ok(CallToolResult::success(vec![Content::text(to_json(&output)?)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{offline_worker, output_json};

    #[tokio::test]
    async fn test_refresh_offline_reports_degraded() {
        let (worker, _) = offline_worker().await;

        let output: CacheRefreshOutput = output_json(&refresh_impl(&worker).await.unwrap());
        assert!(!output.complete);
        assert_eq!(output.entries, None);
        assert!(output.reason.unwrap().contains("PRECACHE_FAILED"));
        assert_eq!(output.generation, "tether-v1");
    }
}
