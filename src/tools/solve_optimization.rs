//! solve_optimization tool handler

use crate::error::{Result, SavantError};
use crate::server::SavantServer;
use crate::service::SolveResponse;
use rmcp::model::{CallToolRequestParam, CallToolResult};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
pub struct SolveOptimizationParams {
    pub problem: String,
    #[serde(default)]
    pub additional_info: Option<String>,
}

/// Structured tool output for a solver response
pub fn tool_output(response: &SolveResponse) -> Value {
    match response {
        SolveResponse::Solved { solution, program } => json!({
            "status": "solved",
            "solution": solution,
            "program": program,
            "text": format!("Solution: {}", solution),
        }),
        SolveResponse::NeedsMoreInfo { questions } => {
            let mut text = String::from("More information is needed to solve this problem:");
            for (i, q) in questions.iter().enumerate() {
                text.push_str(&format!("\n{}. {}", i + 1, q));
            }
            json!({
                "status": "needs_more_info",
                "questions": questions,
                "text": text,
            })
        }
        SolveResponse::Failed { error } => json!({
            "status": "error",
            "error": error,
            "text": format!("Error: {}", error),
        }),
    }
}

impl SavantServer {
    /// Handle the solve_optimization tool call
    pub async fn handle_solve_optimization(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult> {
        let args = request.arguments.ok_or_else(|| SavantError::Mcp {
            message: "Missing parameters".into(),
        })?;
        let params: SolveOptimizationParams = serde_json::from_value(Value::Object(args))
            .map_err(|e| SavantError::InvalidParams {
                message: format!("Invalid parameters: {}", e),
            })?;
        if params.problem.trim().is_empty() {
            return Err(SavantError::InvalidParams {
                message: "'problem' must not be empty".into(),
            });
        }

        let additional_info = params.additional_info.unwrap_or_default();
        tracing::info!(
            problem_len = params.problem.len(),
            has_additional_info = !additional_info.trim().is_empty(),
            "solve_optimization called"
        );
        let response = self.solver.solve(&params.problem, &additional_info).await;
        Ok(CallToolResult::structured(tool_output(&response)))
    }
}
