//! Domain-specific error types for savant

use serde_json::json;
use thiserror::Error;

/// Main error type for the savant solver
#[derive(Error, Debug)]
pub enum SavantError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Language model error: {message}")]
    Llm { message: String },

    #[error("{message}")]
    Pipeline { message: String },

    #[error("Problem cannot be solved with ASP: {reason}")]
    ProblemRejected { reason: String },

    #[error("{message}")]
    ComponentParse { message: String },

    #[error("Unification error: {message}")]
    Unification { message: String },

    #[error("Solver error: {message}")]
    Solver { message: String },

    #[error("Timeout error: {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Invalid parameters: {message}")]
    InvalidParams { message: String },

    #[error("MCP protocol error: {message}")]
    Mcp { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<anyhow::Error> for SavantError {
    fn from(err: anyhow::Error) -> Self {
        SavantError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SavantError {
    fn from(err: serde_json::Error) -> Self {
        SavantError::ComponentParse {
            message: format!("Failed to parse program components from LLM output: {err}"),
        }
    }
}

impl From<reqwest::Error> for SavantError {
    fn from(err: reqwest::Error) -> Self {
        SavantError::Llm {
            message: format!("HTTP request failed: {}", err),
        }
    }
}

impl From<std::io::Error> for SavantError {
    fn from(err: std::io::Error) -> Self {
        SavantError::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

impl From<rmcp::ErrorData> for SavantError {
    fn from(err: rmcp::ErrorData) -> Self {
        SavantError::Mcp {
            message: err.message.to_string(),
        }
    }
}

/// Convert SavantError to MCP error
impl From<SavantError> for rmcp::ErrorData {
    fn from(err: SavantError) -> Self {
        let code = match &err {
            SavantError::Config { .. }
            | SavantError::InvalidParams { .. }
            | SavantError::Mcp { .. } => rmcp::model::ErrorCode::INVALID_PARAMS,
            _ => rmcp::model::ErrorCode::INTERNAL_ERROR,
        };
        let details = err.to_string();

        rmcp::ErrorData {
            code,
            message: details.clone().into(),
            data: Some(json!({ "details": details })),
        }
    }
}

/// Result type alias for savant operations
pub type Result<T> = std::result::Result<T, SavantError>;
