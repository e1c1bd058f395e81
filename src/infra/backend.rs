//! 终端后端抽象 - 监控循环和守护循环只通过这个 trait 访问 tmux

use anyhow::Result;
use std::fmt;
use std::path::Path;

/// Arcade session 里的两个 pane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaneRole {
    /// 上方 pane，运行 AI agent
    Agent,
    /// 下方 pane，运行游戏
    Game,
}

impl PaneRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaneRole::Agent => "agent",
            PaneRole::Game => "game",
        }
    }
}

impl fmt::Display for PaneRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// tmux pane id（例如 `%3`），创建 session 时分配
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaneHandle(String);

impl PaneHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaneHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 终端多路复用器操作
///
/// 两个后台循环会并发调用，实现必须是 `Send + Sync`。
pub trait TerminalBackend: Send + Sync {
    /// 捕获 pane 最近 `lines` 行输出（包含控制序列）
    fn capture_window_output(&self, pane: PaneRole, lines: u32) -> Result<String>;

    /// pane 中的进程是否已经退出
    fn is_pane_dead(&self, pane: PaneRole) -> Result<bool>;

    /// 更新状态栏上的 agent 状态
    fn set_agent_state(&self, is_idle: bool) -> Result<()>;

    /// 状态栏当前显示的游戏
    fn current_game(&self) -> Option<String>;

    /// 更新状态栏上的游戏名，`None` 表示在选择界面
    fn set_game_status(&self, game: Option<&str>) -> Result<()>;

    /// 在 pane 上显示临时消息
    fn send_display_message(&self, pane: PaneRole, duration_ms: u64, text: &str) -> Result<()>;

    /// 在 agent pane 中（重新）启动 agent
    fn launch_ai_agent(&self, command: &str, args: &[String], working_dir: Option<&Path>)
        -> Result<()>;

    /// 在 game pane 中（重新）启动游戏
    fn launch_game_runner(&self) -> Result<()>;

    /// 终止整个 session，重复调用无副作用
    fn kill_session(&self) -> Result<()>;
}
