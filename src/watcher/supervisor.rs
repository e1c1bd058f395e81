//! Pane supervisor - 进程退出后重启 pane，连续失败时终止 session

use crate::agent::AgentAdapter;
use crate::infra::{PaneRole, TerminalBackend};
use crate::watcher::signal::{join_with_timeout, StopSignal};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 单个 pane 连续重启失败的上限
pub const MAX_RELAUNCH_FAILURES: u32 = 3;

const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// 重启后等待进程起来再复查的时间
const DEFAULT_SETTLE: Duration = Duration::from_millis(500);

const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// 致命错误时调用，参数为退出码
pub type FatalHandler = Arc<dyn Fn(i32) + Send + Sync>;

/// 重启 agent 所需的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentLaunch {
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl AgentLaunch {
    pub fn from_adapter(adapter: &dyn AgentAdapter) -> Self {
        let (command, args) = adapter.get_launch_command();
        Self {
            command,
            args,
            working_dir: Some(adapter.working_directory()),
        }
    }
}

/// 一轮检查的结论
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorVerdict {
    Healthy,
    Fatal { pane: PaneRole, failures: u32 },
}

/// 单轮检查逻辑，不含线程，便于直接测试
pub struct PaneWatchdog {
    backend: Arc<dyn TerminalBackend>,
    agent: AgentLaunch,
    settle: Duration,
    agent_failures: u32,
    game_failures: u32,
}

impl PaneWatchdog {
    pub fn new(backend: Arc<dyn TerminalBackend>, agent: AgentLaunch) -> Self {
        Self {
            backend,
            agent,
            settle: DEFAULT_SETTLE,
            agent_failures: 0,
            game_failures: 0,
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// 当前连续失败次数
    pub fn failures(&self, pane: PaneRole) -> u32 {
        match pane {
            PaneRole::Agent => self.agent_failures,
            PaneRole::Game => self.game_failures,
        }
    }

    fn failures_mut(&mut self, pane: PaneRole) -> &mut u32 {
        match pane {
            PaneRole::Agent => &mut self.agent_failures,
            PaneRole::Game => &mut self.game_failures,
        }
    }

    /// 检查两个 pane，必要时重启
    pub fn check_once(&mut self) -> SupervisorVerdict {
        for pane in [PaneRole::Agent, PaneRole::Game] {
            let dead = match self.backend.is_pane_dead(pane) {
                Ok(dead) => dead,
                Err(e) => {
                    warn!(%pane, error = %e, "Could not query pane state");
                    continue;
                }
            };

            if !dead {
                *self.failures_mut(pane) = 0;
                continue;
            }

            info!(%pane, "Pane process exited, relaunching");
            match self.relaunch(pane) {
                Ok(()) => {
                    debug!(%pane, "Pane relaunched");
                    *self.failures_mut(pane) = 0;
                }
                Err(e) => {
                    let failures = self.failures_mut(pane);
                    *failures += 1;
                    let failures = *failures;
                    warn!(%pane, failures, error = %format!("{:#}", e), "Pane relaunch failed");
                    if failures >= MAX_RELAUNCH_FAILURES {
                        return SupervisorVerdict::Fatal { pane, failures };
                    }
                }
            }
        }
        SupervisorVerdict::Healthy
    }

    fn relaunch(&self, pane: PaneRole) -> Result<()> {
        match pane {
            PaneRole::Agent => self.backend.launch_ai_agent(
                &self.agent.command,
                &self.agent.args,
                self.agent.working_dir.as_deref(),
            )?,
            PaneRole::Game => self.backend.launch_game_runner()?,
        }

        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }
        if self.backend.is_pane_dead(pane).context("重启后无法查询 pane 状态")? {
            anyhow::bail!("{} pane 重启后立即退出", pane);
        }
        Ok(())
    }
}

/// 后台守护循环
pub struct PaneSupervisor {
    backend: Arc<dyn TerminalBackend>,
    agent: AgentLaunch,
    tick: Duration,
    settle: Duration,
    fatal: FatalHandler,
    stop: Mutex<StopSignal>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PaneSupervisor {
    pub fn new(backend: Arc<dyn TerminalBackend>, agent: AgentLaunch) -> Self {
        Self {
            backend,
            agent,
            tick: DEFAULT_TICK,
            settle: DEFAULT_SETTLE,
            fatal: Arc::new(exit_process),
            stop: Mutex::new(StopSignal::new()),
            worker: Mutex::new(None),
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// 替换致命错误处理（默认直接退出进程）
    pub fn with_fatal_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.fatal = Arc::new(handler);
        self
    }

    pub fn with_stop_signal(self, stop: StopSignal) -> Self {
        *self.stop.lock().unwrap_or_else(|e| e.into_inner()) = stop;
        self
    }

    /// 启动守护线程，每次启动失败计数从零开始
    pub fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        if worker.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Ok(());
        }

        let stop = {
            let mut stop = self.stop.lock().unwrap_or_else(|e| e.into_inner());
            if stop.is_triggered() {
                *stop = StopSignal::new();
            }
            stop.clone()
        };

        let watchdog =
            PaneWatchdog::new(Arc::clone(&self.backend), self.agent.clone()).with_settle(self.settle);
        let backend = Arc::clone(&self.backend);
        let fatal = Arc::clone(&self.fatal);
        let tick = self.tick;

        let handle = thread::Builder::new()
            .name("pane-supervisor".to_string())
            .spawn(move || supervise(watchdog, backend.as_ref(), fatal, tick, &stop))
            .context("无法启动 pane supervisor 线程")?;
        *worker = Some(handle);
        Ok(())
    }

    pub fn stop(&self) {
        self.stop.lock().unwrap_or_else(|e| e.into_inner()).trigger();

        let handle = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            if !join_with_timeout(handle, STOP_TIMEOUT) {
                warn!("Pane supervisor did not exit in time, detaching");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for PaneSupervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn exit_process(code: i32) {
    std::process::exit(code)
}

fn supervise(
    mut watchdog: PaneWatchdog,
    backend: &dyn TerminalBackend,
    fatal: FatalHandler,
    tick: Duration,
    stop: &StopSignal,
) {
    info!(tick_ms = tick.as_millis() as u64, "Pane supervisor started");

    while !stop.is_triggered() {
        if let SupervisorVerdict::Fatal { pane, failures } = watchdog.check_once() {
            error!(%pane, failures, "Pane keeps failing to restart, shutting down session");
            if let Err(e) = backend.kill_session() {
                warn!(error = %e, "Could not kill session");
            }
            eprintln!(
                "agent-arcade: {} pane failed to restart {} times in a row, session closed",
                pane, failures
            );
            fatal(1);
            break;
        }
        if stop.wait_timeout(tick) {
            break;
        }
    }

    info!("Pane supervisor stopped");
}
