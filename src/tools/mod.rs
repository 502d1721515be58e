//! Tool handlers for the savant MCP server

pub mod detailed_help;
pub mod solve_optimization;
