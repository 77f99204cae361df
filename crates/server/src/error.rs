//! Tool-level errors for the tether server.
//!
//! Errors raised by the worker and the store convert through
//! `tether_core::Error`; these cover what only the tool layer can get wrong.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid tool arguments (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Tool output could not be encoded.
    #[error("OUTPUT_FAILED: {0}")]
    OutputFailed(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::OutputFailed(msg) => (-32603, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

/// Pretty-printed JSON for a tool result.
pub fn to_json<T: serde::Serialize>(output: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(output).map_err(|e| ToolError::OutputFailed(e.to_string()))
}
