//! Orchestrator configuration.
//!
//! Built once at start-up from command-line arguments (with environment
//! fallbacks) and shared by reference from then on.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max concurrent agents must be at least 1")]
    ZeroConcurrency,

    #[error("agent timeout must be at least 1 second")]
    ZeroTimeout,
}

/// Settings for the Claude-backed agent runner.
#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    /// Path to the claude CLI binary.
    pub claude_path: String,

    /// Model override passed to the CLI.
    pub model: Option<String>,

    /// API key handed to the agent process.
    pub anthropic_api_key: Option<String>,

    /// When set, agents get their tools from an MCP server running in this
    /// container image, with the agent's worktree mounted at `/workspace`.
    pub docker_mcp_image: Option<String>,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            claude_path: "claude".to_string(),
            model: None,
            anthropic_api_key: None,
            docker_mcp_image: None,
        }
    }
}

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address.
    pub bind_addr: String,

    /// Workspace Store root; runs live under `<root>/runs/`.
    pub workspace_root: PathBuf,

    /// Ceiling on agents running at once within a run.
    pub max_concurrent_agents: usize,

    /// Per-agent time limit.
    pub agent_timeout: Duration,

    /// Path to the git binary.
    pub git_path: String,

    /// Agent runner settings.
    pub claude: ClaudeConfig,
}

impl Config {
    /// Check values that clap cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_agents == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.agent_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Directory holding every run.
    pub fn runs_root(&self) -> PathBuf {
        self.workspace_root.join("runs")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            workspace_root: PathBuf::from("/workspace"),
            max_concurrent_agents: 4,
            agent_timeout: Duration::from_secs(600),
            git_path: "git".to_string(),
            claude: ClaudeConfig::default(),
        }
    }
}

/// Command-line options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Root directory of the workspace store
    #[arg(long, env = "WORKSPACE_PATH", default_value = "/workspace")]
    pub workspace: PathBuf,

    /// Maximum number of agents running at once within a run
    #[arg(long, env = "FANOUT_MAX_CONCURRENT_AGENTS", default_value = "4")]
    pub max_concurrent_agents: usize,

    /// Per-agent timeout in seconds
    #[arg(long, env = "FANOUT_AGENT_TIMEOUT_SECS", default_value = "600")]
    pub agent_timeout_secs: u64,

    /// Path to the git binary
    #[arg(long, env = "FANOUT_GIT_PATH", default_value = "git")]
    pub git_path: String,

    /// Path to the claude CLI binary
    #[arg(long, env = "FANOUT_CLAUDE_PATH", default_value = "claude")]
    pub claude_path: String,

    /// Model to use (opus, sonnet, haiku, or a full model name)
    #[arg(long, env = "FANOUT_MODEL")]
    pub model: Option<String>,

    /// Anthropic API key passed to agents
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    /// Container image serving agent tools over MCP
    #[arg(long, env = "DOCKER_MCP_IMAGE")]
    pub docker_mcp_image: Option<String>,
}

impl ConfigArgs {
    /// Build a validated config.
    pub fn into_config(self, bind_addr: String) -> Result<Config, ConfigError> {
        let config = Config {
            bind_addr,
            workspace_root: self.workspace,
            max_concurrent_agents: self.max_concurrent_agents,
            agent_timeout: Duration::from_secs(self.agent_timeout_secs),
            git_path: self.git_path,
            claude: ClaudeConfig {
                claude_path: self.claude_path,
                model: self.model,
                anthropic_api_key: self.anthropic_api_key.filter(|k| !k.trim().is_empty()),
                docker_mcp_image: self.docker_mcp_image.filter(|i| !i.trim().is_empty()),
            },
        };
        config.validate()?;
        Ok(config)
    }
}
