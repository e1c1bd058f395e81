//! 基础设施层 - tmux、终端后端抽象、控制序列清理

pub mod ansi;
pub mod backend;
pub mod terminal;
pub mod tmux;

pub use ansi::strip_control_sequences;
pub use backend::{PaneHandle, PaneRole, TerminalBackend};
pub use tmux::TmuxManager;
