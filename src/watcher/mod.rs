//! 后台循环 - agent 活动监控、游戏状态检测、pane 守护

pub mod activity;
pub mod game;
pub mod signal;
pub mod supervisor;

pub use activity::{ActivityMonitor, MonitorState, StateObserver, IDLE_GRACE_PERIOD};
pub use game::{detect_game, sync_game_status};
pub use signal::StopSignal;
pub use supervisor::{
    AgentLaunch, FatalHandler, PaneSupervisor, PaneWatchdog, SupervisorVerdict,
    MAX_RELAUNCH_FAILURES,
};
