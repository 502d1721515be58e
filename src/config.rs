use crate::error::{Result, SavantError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

const DEFAULT_LOG_LEVEL: &str = "savant=info,rmcp=info";

/// Main configuration structure loaded from savant.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub solver: SolverConfig,
    pub server: ServerConfig,
    pub cli: CliConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Language model endpoint and sampling settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `provider/model`, e.g. `openai/gpt-4o`
    pub model: String,
    pub base_url: String,
    pub timeout_ms: u64,
    pub retries: u32,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "openai/gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_ms: 60_000,
            retries: 3,
            temperature: 0.0,
            max_tokens: 2000,
        }
    }
}

/// External answer-set solver settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SolverConfig {
    pub clingo_path: String,
    pub timeout_ms: u64,
    /// Extra command-line arguments passed to clingo verbatim
    pub extra_args: Vec<String>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            clingo_path: "clingo".to_string(),
            timeout_ms: 60_000,
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub mcp_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            mcp_path: "/mcp".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CliConfig {
    /// Upper bound on clarification rounds before giving up
    pub max_clarifications: u32,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            max_clarifications: 5,
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub openai_api_key: Option<String>,
    pub log_level: String,
    pub mcp_no_log: bool,
    /// Config file that was looked for but not found
    pub missing_config_file: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            mcp_no_log: false,
            missing_config_file: None,
        }
    }
}

/// Provider half of the `provider/model` string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
}

impl LlmConfig {
    /// Split the configured model into provider and wire model name.
    pub fn provider_and_model(&self) -> Result<(LlmProvider, &str)> {
        match self.model.split_once('/') {
            None => Ok((LlmProvider::OpenAi, self.model.as_str())),
            Some(("openai", name)) if !name.is_empty() => Ok((LlmProvider::OpenAi, name)),
            Some((provider, _)) => Err(SavantError::Config {
                message: format!(
                    "Unsupported LLM provider '{}' in model '{}'; expected openai/<model>",
                    provider, self.model
                ),
            }),
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses SAVANT_CONFIG environment variable or defaults to "savant.toml"
    pub fn load() -> Result<Self> {
        if let Ok(env_path) = std::env::var("SAVANT_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
        }

        let config_path =
            std::env::var("SAVANT_CONFIG").unwrap_or_else(|_| "savant.toml".to_string());
        Self::load_from(Path::new(&config_path), |key| std::env::var(key).ok())
    }

    /// Read `path` (defaults when it does not exist), apply env overrides and validate.
    pub fn load_from<F>(path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)?,
            Err(_) => {
                let mut config = Self::default();
                config.runtime.missing_config_file = Some(path.display().to_string());
                config
            }
        };
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Report what loading noticed. Called once the tracing subscriber is installed.
    pub fn log_load_notes(&self) {
        if let Some(path) = &self.runtime.missing_config_file {
            tracing::warn!("Config file {} not found, using defaults", path);
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SavantError::Config {
            message: format!("Invalid config file: {}", e),
        })
    }

    /// Apply env overrides (env-first) using the given lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(model) = text("SAVANT_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = text("SAVANT_LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(v) = parse_env(&lookup, "SAVANT_LLM_TIMEOUT_MS")? {
            self.llm.timeout_ms = v;
        }
        if let Some(v) = parse_env(&lookup, "SAVANT_LLM_RETRIES")? {
            self.llm.retries = v;
        }
        if let Some(v) = parse_env(&lookup, "SAVANT_LLM_TEMPERATURE")? {
            self.llm.temperature = v;
        }
        if let Some(v) = parse_env(&lookup, "SAVANT_LLM_MAX_TOKENS")? {
            self.llm.max_tokens = v;
        }
        if let Some(path) = text("SAVANT_CLINGO_PATH") {
            self.solver.clingo_path = path;
        }
        if let Some(v) = parse_env(&lookup, "SAVANT_SOLVER_TIMEOUT_MS")? {
            self.solver.timeout_ms = v;
        }
        if let Some(host) = text("SAVANT_HTTP_HOST") {
            self.server.host = host;
        }
        if let Some(v) = parse_env(&lookup, "SAVANT_PORT")? {
            self.server.port = v;
        }
        if let Some(v) = parse_env(&lookup, "SAVANT_MAX_CLARIFICATIONS")? {
            self.cli.max_clarifications = v;
        }

        self.runtime = RuntimeConfig {
            openai_api_key: text("OPENAI_API_KEY"),
            log_level: text("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            mcp_no_log: lookup("MCP_NO_LOG").is_some_and(|v| v == "1" || v == "true"),
            missing_config_file: self.runtime.missing_config_file.take(),
        };
        Ok(())
    }

    /// Validate and clamp loaded values
    pub fn validate(&mut self) -> Result<()> {
        self.llm.provider_and_model()?;

        if self.llm.retries == 0 {
            self.llm.retries = 1;
        } else if self.llm.retries > 10 {
            tracing::warn!("llm retries {} exceeds max 10, clamping to 10", self.llm.retries);
            self.llm.retries = 10;
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(SavantError::Config {
                message: format!(
                    "temperature must be between 0.0 and 2.0, got {}",
                    self.llm.temperature
                ),
            });
        }

        if !self.llm.base_url.starts_with("http://") && !self.llm.base_url.starts_with("https://")
        {
            return Err(SavantError::Config {
                message: format!(
                    "LLM base URL '{}' must start with http:// or https://",
                    self.llm.base_url
                ),
            });
        }

        if self.server.port == 0 {
            return Err(SavantError::Config {
                message: "server port must be non-zero".into(),
            });
        }
        if !self.server.mcp_path.starts_with('/') {
            self.server.mcp_path = format!("/{}", self.server.mcp_path);
        }

        if self.solver.timeout_ms == 0 {
            return Err(SavantError::Config {
                message: "solver timeout must be non-zero".into(),
            });
        }
        if self.cli.max_clarifications == 0 {
            self.cli.max_clarifications = 1;
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_env<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| SavantError::Config {
                message: format!("{} has invalid value '{}': {}", key, raw, e),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.llm.model, "openai/gpt-4o");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.solver.clingo_path, "clingo");
        assert_eq!(config.cli.max_clarifications, 5);
        assert_eq!(config.runtime.log_level, "savant=info,rmcp=info");
    }

    #[test]
    fn missing_file_is_remembered_for_later_logging() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("savant.toml");
        let config =
            Config::load_from(&path, lookup_from(&[("SAVANT_PORT", "9100")])).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(
            config.runtime.missing_config_file.as_deref(),
            Some(path.display().to_string().as_str())
        );
    }

    #[test]
    fn existing_file_is_read_then_overridden() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("savant.toml");
        std::fs::write(&path, "[solver]\nclingo_path = \"/opt/clingo\"\ntimeout_ms = 5000\n").unwrap();
        let config = Config::load_from(
            &path,
            lookup_from(&[("SAVANT_SOLVER_TIMEOUT_MS", "7000")]),
        )
        .unwrap();
        assert_eq!(config.solver.clingo_path, "/opt/clingo");
        assert_eq!(config.solver.timeout_ms, 7000);
        assert!(config.runtime.missing_config_file.is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_sections() {
        let config = Config::from_toml_str(
            r#"
            [llm]
            model = "openai/gpt-4o-mini"

            [solver]
            extra_args = ["--parallel-mode=2"]
            "#,
        )
        .unwrap();
        assert_eq!(config.llm.model, "openai/gpt-4o-mini");
        assert_eq!(config.llm.retries, 3);
        assert_eq!(config.solver.extra_args, vec!["--parallel-mode=2"]);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = Config::default();
        config
            .apply_env(lookup_from(&[
                ("SAVANT_LLM_MODEL", "openai/gpt-4.1"),
                ("SAVANT_PORT", "9100"),
                ("OPENAI_API_KEY", "sk-test"),
                ("MCP_NO_LOG", "1"),
            ]))
            .unwrap();
        assert_eq!(config.llm.model, "openai/gpt-4.1");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.runtime.openai_api_key.as_deref(), Some("sk-test"));
        assert!(config.runtime.mcp_no_log);
    }

    #[test]
    fn unparseable_env_number_is_a_config_error() {
        let mut config = Config::default();
        let err = config
            .apply_env(lookup_from(&[("SAVANT_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, SavantError::Config { .. }));
        assert!(err.to_string().contains("SAVANT_PORT"));
    }

    #[test]
    fn provider_prefix_is_stripped() {
        let llm = LlmConfig::default();
        let (provider, model) = llm.provider_and_model().unwrap();
        assert_eq!(provider, LlmProvider::OpenAi);
        assert_eq!(model, "gpt-4o");

        let bare = LlmConfig {
            model: "gpt-4o-mini".into(),
            ..LlmConfig::default()
        };
        assert_eq!(bare.provider_and_model().unwrap().1, "gpt-4o-mini");
    }

    #[test]
    fn unknown_provider_fails_validation() {
        let mut config = Config::default();
        config.llm.model = "anthropic/some-model".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn retries_are_clamped() {
        let mut config = Config::default();
        config.llm.retries = 0;
        config.validate().unwrap();
        assert_eq!(config.llm.retries, 1);

        config.llm.retries = 99;
        config.validate().unwrap();
        assert_eq!(config.llm.retries, 10);
    }
}
