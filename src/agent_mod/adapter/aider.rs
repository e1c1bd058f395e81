// src/agent_mod/adapter/aider.rs
//! Aider 适配器
//!
//! Aider 空闲时最后一行是 `> `，聊天模式下带前缀（`ask> `、`architect> `），
//! 确认问题以 `(Y)es/(N)o [Yes]:` 结尾。

use super::*;
use crate::agent::AgentType;
use crate::infra::terminal::last_non_empty_line;
use regex::Regex;
use std::sync::LazyLock;

static PROMPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[a-z][a-z-]*)?>(?:\s|$)").expect("Invalid prompt regex")
});

static CONFIRM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(Y\)es/\(N\)o.*:\s*$").expect("Invalid confirm regex")
});

pub struct AiderAdapter {
    config: AgentConfig,
}

impl AiderAdapter {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }
}

impl AgentAdapter for AiderAdapter {
    fn agent_type(&self) -> AgentType {
        AgentType::Aider
    }

    fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn check_ready(&self, terminal_output: &str) -> AgentStatus {
        let Some(last) = last_non_empty_line(terminal_output) else {
            return AgentStatus::busy();
        };
        // 等待模型响应时 spinner 会覆盖在提示符行上
        if last.contains("Waiting for") {
            return AgentStatus::busy();
        }
        (PROMPT_RE.is_match(last) || CONFIRM_RE.is_match(last)).into()
    }
}
