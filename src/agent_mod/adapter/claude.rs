// src/agent_mod/adapter/claude.rs
//! Claude Code 适配器

use super::*;
use crate::agent::AgentType;
use crate::infra::terminal::recent_non_empty_lines;
use regex::Regex;
use std::sync::LazyLock;

/// 静态编译的提示符正则表达式，避免每次调用都编译
///
/// 匹配行首的 `>` / `❯`，包括输入框内的 `│ > `，提示符后可以有用户正在输入的文字
static PROMPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:│\s*)?[❯>](?:\s|$)").expect("Invalid prompt regex"));

/// 生成中的状态行，例如 `✻ Thinking… (esc to interrupt)`
static BUSY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)esc to interrupt").expect("Invalid busy regex"));

/// 只看底部的几行：输入框、提示行和 spinner 都在这里
const PROMPT_WINDOW_LINES: usize = 8;

pub struct ClaudeAdapter {
    config: AgentConfig,
}

impl ClaudeAdapter {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }
}

impl AgentAdapter for ClaudeAdapter {
    fn agent_type(&self) -> AgentType {
        AgentType::Claude
    }

    fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn check_ready(&self, terminal_output: &str) -> AgentStatus {
        // Claude Code 就绪状态检测：
        // 1. 底部有 ❯ 或 > 提示符（用户输入时也算空闲）
        // 2. 没有 "esc to interrupt" 生成中标记
        let lines = recent_non_empty_lines(terminal_output, PROMPT_WINDOW_LINES);
        if lines.iter().any(|line| BUSY_RE.is_match(line)) {
            return AgentStatus::busy();
        }
        lines.iter().any(|line| PROMPT_RE.is_match(line)).into()
    }
}
