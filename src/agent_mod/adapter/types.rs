// src/agent_mod/adapter/types.rs
//! 基础类型定义

use serde::{Deserialize, Serialize};

/// 就绪检测结果
///
/// 目前只有一个布尔值，后续可以扩展更细的状态（例如等待权限确认）。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatus {
    /// agent 是否在等待用户输入
    pub is_ready: bool,
}

impl AgentStatus {
    pub fn busy() -> Self {
        Self { is_ready: false }
    }
}

impl From<bool> for AgentStatus {
    fn from(is_ready: bool) -> Self {
        Self { is_ready }
    }
}
