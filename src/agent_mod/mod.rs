//! Agent 模块 - agent 类型与就绪检测适配器

pub mod adapter;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

pub use adapter::{get_adapter, AgentAdapter, AgentStatus};

/// Agent 类型，决定使用哪个就绪检测适配器
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Claude,
    Aider,
    Codex,
    /// 任意 CLI，使用 shell 提示符启发式
    Generic,
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentType::Claude => write!(f, "claude"),
            AgentType::Aider => write!(f, "aider"),
            AgentType::Codex => write!(f, "codex"),
            AgentType::Generic => write!(f, "generic"),
        }
    }
}

impl std::str::FromStr for AgentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "claude" | "claude-code" | "claude_code" | "claudecode" => Ok(AgentType::Claude),
            "aider" => Ok(AgentType::Aider),
            "codex" | "codex-cli" | "codex_cli" => Ok(AgentType::Codex),
            "generic" => Ok(AgentType::Generic),
            _ => Err(anyhow!("Unknown agent type: {}", s)),
        }
    }
}
