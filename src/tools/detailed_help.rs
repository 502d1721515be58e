//! detailed_help tool handler

use crate::error::{Result, SavantError};
use crate::server::SavantServer;
use rmcp::model::{CallToolRequestParam, CallToolResult};
use serde_json::{Value, json};

/// Help document for a tool, or `None` if the tool is unknown
pub fn tool_help(tool: &str) -> Option<Value> {
    let help = match tool {
        "solve_optimization" => json!({
            "name": "solve_optimization",
            "description": "Translate a natural-language optimization problem into an answer set program, solve it with clingo and return the optimal assignment.",
            "arguments": {
                "problem": "string (required), the problem in plain language",
                "additional_info": "string, answers to clarification questions from a previous call"
            },
            "returns": {
                "status": "solved | needs_more_info | error",
                "solution": "string, atoms of the best model plus its optimization cost",
                "program": "string, the ASP program handed to the solver",
                "questions": "string[], what to answer in additional_info",
                "error": "string",
                "text": "string, human-readable summary"
            },
            "examples": [
                {"problem": "Pack items a (weight 3, value 4) and b (weight 4, value 5) into a bag of capacity 5, maximizing value."},
                {"problem": "Schedule three meetings into two rooms.", "additional_info": "Each meeting lasts one hour. Rooms are free from 9 to 12."}
            ]
        }),
        "detailed_help" => json!({
            "name": "detailed_help",
            "description": "Describe a tool's arguments and return value.",
            "arguments": {
                "tool": "string (required), tool name",
                "format": "string, 'full' (default) or 'compact'"
            },
            "returns": {"name": "string", "description": "string", "arguments": "object", "returns": "object"}
        }),
        _ => return None,
    };
    Some(help)
}

impl SavantServer {
    /// Handle the detailed_help tool call
    pub async fn handle_detailed_help(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult> {
        let args = request.arguments.ok_or_else(|| SavantError::Mcp {
            message: "Missing parameters".into(),
        })?;

        let tool = args.get("tool").and_then(|v| v.as_str()).ok_or_else(|| {
            SavantError::InvalidParams {
                message: "'tool' parameter is required".into(),
            }
        })?;
        let format = args
            .get("format")
            .and_then(|v| v.as_str())
            .unwrap_or("full");

        let help = tool_help(tool).ok_or_else(|| SavantError::InvalidParams {
            message: format!("Unknown tool: {}", tool),
        })?;

        let output = if format == "compact" {
            json!({
                "tool": tool,
                "summary": help.get("description").cloned().unwrap_or(Value::Null),
                "arguments": help.get("arguments").cloned().unwrap_or(Value::Null),
            })
        } else {
            help
        };

        Ok(CallToolResult::structured(output))
    }
}
