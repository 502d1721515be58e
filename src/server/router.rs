use crate::server::SavantServer;
use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Implementation, InitializeRequestParam,
        InitializeResult, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo, Tool, ToolsCapability,
    },
    service::{RequestContext, RoleServer},
};
use tracing::info;

/// Tools exposed over MCP, in listing order
pub fn tool_list() -> Vec<Tool> {
    vec![
        Tool {
            name: "solve_optimization".into(),
            title: Some("Solve Optimization Problem".into()),
            description: Some(
                "Solve an optimization problem described in natural language. Returns the solution, or clarification questions when information is missing.".into(),
            ),
            input_schema: crate::schemas::solve_optimization_schema(),
            icons: None,
            annotations: None,
            output_schema: Some(crate::schemas::solve_optimization_output_schema()),
            meta: None,
        },
        Tool {
            name: "detailed_help".into(),
            title: Some("Detailed Help".into()),
            description: Some("Get detailed help for a specific tool".into()),
            input_schema: crate::schemas::detailed_help_schema(),
            icons: None,
            annotations: None,
            output_schema: Some(crate::schemas::detailed_help_output_schema()),
            meta: None,
        },
    ]
}

impl ServerHandler for SavantServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
                ..Default::default()
            },
            server_info: Implementation {
                name: "savant".to_string(),
                title: Some("Savant Optimizer".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                website_url: None,
                icons: None,
            },
            instructions: Some(
                "Call solve_optimization with a problem description. If it answers with needs_more_info, call it again with the answers in additional_info.".to_string(),
            ),
            ..Default::default()
        }
    }

    async fn initialize(
        &self,
        request: InitializeRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<InitializeResult, McpError> {
        let mut info = self.get_info();
        info.protocol_version = request.protocol_version.clone();
        Ok(info)
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, McpError> {
        info!("tools/list requested");
        Ok(ListToolsResult {
            tools: tool_list(),
            ..Default::default()
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, McpError> {
        match request.name.as_ref() {
            "solve_optimization" => self
                .handle_solve_optimization(request)
                .await
                .map_err(|e| e.into()),
            "detailed_help" => self
                .handle_detailed_help(request)
                .await
                .map_err(|e| e.into()),
            _ => Err(McpError {
                code: rmcp::model::ErrorCode::METHOD_NOT_FOUND,
                message: format!("Unknown tool: {}", request.name).into(),
                data: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tools_are_listed_with_output_schemas() {
        let tools = tool_list();
        let names: Vec<_> = tools.iter().map(|t| t.name.to_string()).collect();
        assert_eq!(names, ["solve_optimization", "detailed_help"]);
        assert!(tools.iter().all(|t| t.output_schema.is_some()));
    }
}
