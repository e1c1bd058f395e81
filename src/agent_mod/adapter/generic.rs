// src/agent_mod/adapter/generic.rs
//! 通用适配器
//!
//! 用于未知或自定义 CLI 工具：最后一个非空行以常见提示符结尾即视为就绪。

use super::*;
use crate::agent::AgentType;
use crate::infra::terminal::last_non_empty_line;

/// shell / REPL 常见的提示符结尾字符
const PROMPT_SUFFIXES: [char; 7] = ['$', '#', '%', '>', '❯', ':', '?'];

/// 通用适配器，用于未知或自定义 CLI
pub struct GenericAdapter {
    config: AgentConfig,
}

impl GenericAdapter {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }
}

impl AgentAdapter for GenericAdapter {
    fn agent_type(&self) -> AgentType {
        AgentType::Generic
    }

    fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn check_ready(&self, terminal_output: &str) -> AgentStatus {
        last_non_empty_line(terminal_output)
            .and_then(|line| line.trim_end().chars().last())
            .is_some_and(|c| PROMPT_SUFFIXES.contains(&c))
            .into()
    }
}
