//! Tracing subscriber setup. Logs always go to stderr; stdout carries MCP frames.

use tracing_subscriber::EnvFilter;

use crate::config::Config;

const FALLBACK_FILTER: &str = "savant=info,rmcp=info";

/// Whether logging should be installed for this run
pub fn logging_enabled(config: &Config, mcp_mode: bool) -> bool {
    !(mcp_mode && config.runtime.mcp_no_log)
}

fn env_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER))
}

/// Install the global subscriber. Returns false when logging is disabled or
/// a subscriber is already set.
pub fn init_tracing(config: &Config, mcp_mode: bool) -> bool {
    if !logging_enabled(config, mcp_mode) {
        return false;
    }
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.runtime.log_level))
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
