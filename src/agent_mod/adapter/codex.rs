// src/agent_mod/adapter/codex.rs
//! Codex CLI 适配器

use super::*;
use crate::agent::AgentType;
use crate::infra::terminal::recent_non_empty_lines;
use regex::Regex;
use std::sync::LazyLock;

/// 输入框提示符：新版是 `›`，旧版是 `▌`
static COMPOSER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[›▌](?:\s|$)").expect("Invalid composer regex"));

/// `• Working (5s • esc to interrupt)`
static BUSY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)esc to interrupt|^\s*[•◦]?\s*Working\b").expect("Invalid busy regex")
});

const PROMPT_WINDOW_LINES: usize = 8;

pub struct CodexAdapter {
    config: AgentConfig,
}

impl CodexAdapter {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }
}

impl AgentAdapter for CodexAdapter {
    fn agent_type(&self) -> AgentType {
        AgentType::Codex
    }

    fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn check_ready(&self, terminal_output: &str) -> AgentStatus {
        let lines = recent_non_empty_lines(terminal_output, PROMPT_WINDOW_LINES);
        if lines.iter().any(|line| BUSY_RE.is_match(line)) {
            return AgentStatus::busy();
        }
        lines.iter().any(|line| COMPOSER_RE.is_match(line)).into()
    }
}
