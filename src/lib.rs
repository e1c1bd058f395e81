//! Agent Arcade - 等 AI 编码代理干活的时候玩游戏
//!
//! tmux 上方 pane 跑 agent，下方 pane 跑游戏；agent 回到输入提示符时提醒你回去。

pub mod cli;
pub mod config;
pub mod infra;
#[path = "agent_mod/mod.rs"]
pub mod agent;
pub mod watcher;

pub use agent::{get_adapter, AgentAdapter, AgentStatus, AgentType};
pub use config::{AgentConfig, ArcadeConfig, MonitorConfig, NotificationsConfig};
pub use infra::{strip_control_sequences, PaneHandle, PaneRole, TerminalBackend, TmuxManager};
pub use watcher::{ActivityMonitor, AgentLaunch, PaneSupervisor, StopSignal};
