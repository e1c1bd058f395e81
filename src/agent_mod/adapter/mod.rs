// src/agent_mod/adapter/mod.rs
//! Agent CLI 适配器模块
//!
//! 每种 AI 编码工具一个适配器，封装它的启动命令和提示符约定。
//! 新增 agent 只需要新增一个适配器，activity monitor 不需要改动。

mod types;

pub use types::*;

use crate::agent::AgentType;
use crate::config::AgentConfig;
use std::path::PathBuf;

/// Agent CLI 适配器 trait
pub trait AgentAdapter: Send + Sync {
    /// 获取 Agent 类型
    fn agent_type(&self) -> AgentType;

    /// 获取 agent 配置
    fn config(&self) -> &AgentConfig;

    /// 检测就绪状态
    ///
    /// 输入是已经去掉控制序列的终端文本。不能 panic，不能做 I/O。
    fn check_ready(&self, terminal_output: &str) -> AgentStatus;

    /// 显示名称
    fn display_name(&self) -> &str {
        &self.config().name
    }

    /// 获取启动命令 (command, args)
    fn get_launch_command(&self) -> (String, Vec<String>) {
        let config = self.config();
        (config.command.clone(), config.args.clone())
    }

    /// 工作目录：配置优先，其次当前目录
    fn working_directory(&self) -> PathBuf {
        self.config()
            .working_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// 检测命令是否已安装
    fn is_installed(&self) -> bool {
        let command = &self.config().command;
        let program = command.split_whitespace().next().unwrap_or(command);
        which::which(program).is_ok()
    }
}

/// 根据 agent id 和配置获取适配器
///
/// 配置中的 `kind` 优先；否则由 agent id 推断，无法识别时使用通用适配器。
pub fn get_adapter(agent_id: &str, config: &AgentConfig) -> Box<dyn AgentAdapter> {
    let agent_type = config
        .kind
        .or_else(|| agent_id.parse().ok())
        .unwrap_or(AgentType::Generic);

    match agent_type {
        AgentType::Claude => Box::new(claude::ClaudeAdapter::new(config.clone())),
        AgentType::Aider => Box::new(aider::AiderAdapter::new(config.clone())),
        AgentType::Codex => Box::new(codex::CodexAdapter::new(config.clone())),
        AgentType::Generic => Box::new(generic::GenericAdapter::new(config.clone())),
    }
}

pub mod aider;
pub mod claude;
pub mod codex;
pub mod generic;
