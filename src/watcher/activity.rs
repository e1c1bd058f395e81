//! Activity monitor - 轮询 agent pane，判断 agent 是空闲还是在生成
//!
//! 每个 tick：捕获 agent pane → 清理控制序列 → 适配器就绪检测 →
//! 带宽限期的状态机 → 状态变化时更新状态栏、发送通知、回调观察者。
//! 同一个 tick 里顺带检查 game pane 上正在玩的游戏。

use crate::agent::AgentAdapter;
use crate::config::{ArcadeConfig, MonitorConfig, NotificationsConfig};
use crate::infra::{strip_control_sequences, PaneRole, TerminalBackend};
use crate::watcher::game::sync_game_status;
use crate::watcher::signal::{join_with_timeout, StopSignal};
use anyhow::{Context, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// 最近一次就绪后的宽限期，期间非就绪帧仍视为空闲
///
/// 用户在 agent pane 里打字时，回显会让提示符短暂消失。
pub const IDLE_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// stop() 等待循环退出的上限
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// 状态变化回调，参数为新的 is_idle
pub type StateObserver = Arc<dyn Fn(bool) + Send + Sync>;

/// 监控循环的可变状态，只由监控线程持有
#[derive(Debug, Clone)]
pub struct MonitorState {
    pub last_output: String,
    pub last_change_time: Instant,
    pub is_idle: bool,
    /// 最近一次适配器报告就绪的时间
    pub last_idle_time: Instant,
}

impl MonitorState {
    /// 初始状态为空闲
    pub fn new(now: Instant) -> Self {
        Self {
            last_output: String::new(),
            last_change_time: now,
            is_idle: true,
            last_idle_time: now,
        }
    }

    /// 记录捕获的原始输出，输出变化时返回 true
    pub fn record_output(&mut self, output: &str, now: Instant) -> bool {
        if output == self.last_output {
            return false;
        }
        self.last_output.clear();
        self.last_output.push_str(output);
        self.last_change_time = now;
        true
    }

    /// 输出保持不变的时长
    pub fn unchanged_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_change_time)
    }

    /// 输入一次就绪检测结果，状态发生变化时返回新状态
    pub fn observe(&mut self, ready: bool, now: Instant) -> Option<bool> {
        let is_idle = if ready {
            self.last_idle_time = now;
            true
        } else {
            now.saturating_duration_since(self.last_idle_time) < IDLE_GRACE_PERIOD
        };

        if is_idle == self.is_idle {
            return None;
        }
        self.is_idle = is_idle;
        Some(is_idle)
    }
}

/// 监控线程和外部句柄共享的部分
struct MonitorShared {
    backend: Arc<dyn TerminalBackend>,
    adapter: Box<dyn AgentAdapter>,
    config: MonitorConfig,
    notifications: NotificationsConfig,
    is_idle: AtomicBool,
    observer: Mutex<Option<StateObserver>>,
}

impl MonitorShared {
    fn run(&self, stop: &StopSignal) {
        info!(
            agent = %self.adapter.display_name(),
            interval_ms = self.config.check_interval.as_millis() as u64,
            buffer_lines = self.config.buffer_lines,
            "Activity monitor started"
        );

        let mut state = MonitorState::new(Instant::now());
        while !stop.is_triggered() {
            match catch_unwind(AssertUnwindSafe(|| self.tick(&mut state))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %format!("{:#}", e), "Monitor tick failed"),
                Err(_) => error!("Monitor tick panicked"),
            }
            if stop.wait_timeout(self.config.check_interval) {
                break;
            }
        }

        info!("Activity monitor stopped");
    }

    fn tick(&self, state: &mut MonitorState) -> Result<()> {
        let output = self
            .backend
            .capture_window_output(PaneRole::Agent, self.config.buffer_lines)
            .context("捕获 agent pane 失败")?;
        let now = Instant::now();

        if !state.record_output(&output, now) {
            let unchanged = state.unchanged_for(now);
            if unchanged >= self.config.inactivity_timeout {
                debug!(unchanged_ms = unchanged.as_millis() as u64, "Agent output unchanged");
            }
        }

        let clean = strip_control_sequences(&output);
        let status = self.adapter.check_ready(&clean);

        if let Some(is_idle) = state.observe(status.is_ready, now) {
            self.is_idle.store(is_idle, Ordering::SeqCst);
            info!(agent = %self.adapter.display_name(), is_idle, "Agent state changed");

            if let Err(e) = self.backend.set_agent_state(is_idle) {
                warn!(error = %e, "Could not update agent status");
            }
            if is_idle && self.notifications.enabled {
                self.send_notification();
            }
            self.notify_observer(is_idle);
        }

        if let Err(e) = sync_game_status(self.backend.as_ref()) {
            debug!(error = %e, "Game status check failed");
        }

        Ok(())
    }

    /// 在 game pane 上显示 agent 就绪提示，失败只记录警告
    fn send_notification(&self) {
        if !self.notifications.visual {
            return;
        }
        let duration_ms = self.notifications.flash_duration_ms();
        match self
            .backend
            .send_display_message(PaneRole::Game, duration_ms, &self.notifications.message)
        {
            Ok(()) => debug!(duration_ms, "Ready notification sent"),
            Err(e) => warn!(error = %e, "Could not send notification"),
        }
    }

    fn notify_observer(&self, is_idle: bool) {
        let observer = self
            .observer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(observer) = observer {
            observer(is_idle);
        }
    }
}

/// Agent 活动监控器
///
/// `start()` 启动后台轮询线程，`stop()` 停止并最多等待两秒。
pub struct ActivityMonitor {
    shared: Arc<MonitorShared>,
    stop: Mutex<StopSignal>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ActivityMonitor {
    pub fn new(
        backend: Arc<dyn TerminalBackend>,
        adapter: Box<dyn AgentAdapter>,
        config: MonitorConfig,
        notifications: NotificationsConfig,
    ) -> Self {
        Self {
            shared: Arc::new(MonitorShared {
                backend,
                adapter,
                config,
                notifications,
                is_idle: AtomicBool::new(true),
                observer: Mutex::new(None),
            }),
            stop: Mutex::new(StopSignal::new()),
            worker: Mutex::new(None),
        }
    }

    /// 使用完整配置中的 monitoring / notifications 部分创建
    pub fn from_config(
        backend: Arc<dyn TerminalBackend>,
        adapter: Box<dyn AgentAdapter>,
        config: &ArcadeConfig,
    ) -> Self {
        Self::new(backend, adapter, config.monitor_config(), config.notifications.clone())
    }

    /// 与其他循环共享停止信号
    pub fn with_stop_signal(self, stop: StopSignal) -> Self {
        *self.stop.lock().unwrap_or_else(|e| e.into_inner()) = stop;
        self
    }

    /// 启动后台轮询，已经在运行时不做任何事
    pub fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        if worker.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Ok(());
        }

        let stop = {
            let mut stop = self.stop.lock().unwrap_or_else(|e| e.into_inner());
            // 已触发的信号可能还被超时未退出的旧线程持有，换一个新的
            if stop.is_triggered() {
                *stop = StopSignal::new();
            }
            stop.clone()
        };

        self.shared.is_idle.store(true, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("activity-monitor".to_string())
            .spawn(move || shared.run(&stop))
            .context("无法启动 activity monitor 线程")?;
        *worker = Some(handle);
        Ok(())
    }

    /// 停止轮询；未启动时直接返回
    pub fn stop(&self) {
        self.stop.lock().unwrap_or_else(|e| e.into_inner()).trigger();

        let handle = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            if !join_with_timeout(handle, STOP_TIMEOUT) {
                warn!("Activity monitor did not exit in time, detaching");
            }
        }
    }

    /// 后台线程是否在运行
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// 当前状态：true 表示空闲（等待输入或用户正在输入），false 表示 agent 在生成
    pub fn is_idle(&self) -> bool {
        self.shared.is_idle.load(Ordering::SeqCst)
    }

    /// 注册状态变化回调（只保留一个），在监控线程中同步调用
    pub fn set_on_state_changed<F>(&self, observer: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        *self.shared.observer.lock().unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(observer));
    }

    /// 移除状态变化回调
    pub fn clear_on_state_changed(&self) {
        *self.shared.observer.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl Drop for ActivityMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: Instant, millis: u64) -> Instant {
        base + Duration::from_millis(millis)
    }

    #[test]
    fn test_initial_state_is_idle() {
        let now = Instant::now();
        let state = MonitorState::new(now);
        assert!(state.is_idle);
        assert_eq!(state.last_idle_time, now);
        assert!(state.last_output.is_empty());
    }

    #[test]
    fn test_grace_period_absorbs_short_flicker() {
        // Given: t=0 就绪，之后 0.5s、1.5s 两帧非就绪
        let base = Instant::now();
        let mut state = MonitorState::new(base);
        let mut seen = Vec::new();

        for (ready, t) in [(true, 0), (false, 500), (false, 1500)] {
            state.observe(ready, at(base, t));
            seen.push(state.is_idle);
        }

        // Then: 一直保持空闲
        assert_eq!(seen, vec![true, true, true]);
    }

    #[test]
    fn test_grace_period_expires() {
        let base = Instant::now();
        let mut state = MonitorState::new(base);
        let mut seen = Vec::new();

        for (ready, t) in [(true, 0), (false, 500), (false, 2500)] {
            state.observe(ready, at(base, t));
            seen.push(state.is_idle);
        }

        assert_eq!(seen, vec![true, true, false]);
    }

    #[test]
    fn test_forced_idle_does_not_extend_grace() {
        // 宽限期内的非就绪帧不刷新 last_idle_time
        let base = Instant::now();
        let mut state = MonitorState::new(base);
        assert_eq!(state.observe(false, at(base, 1500)), None);
        assert_eq!(state.observe(false, at(base, 2000)), Some(false));
    }

    #[test]
    fn test_observe_reports_transitions_only() {
        let base = Instant::now();
        let mut state = MonitorState::new(base);

        assert_eq!(state.observe(true, at(base, 0)), None);
        assert_eq!(state.observe(false, at(base, 3000)), Some(false));
        assert_eq!(state.observe(false, at(base, 3500)), None);
        assert_eq!(state.observe(true, at(base, 4000)), Some(true));
        assert_eq!(state.observe(true, at(base, 4500)), None);
    }

    #[test]
    fn test_record_output_tracks_changes() {
        let base = Instant::now();
        let mut state = MonitorState::new(base);

        assert!(state.record_output("a", at(base, 100)));
        assert_eq!(state.last_change_time, at(base, 100));
        assert!(!state.record_output("a", at(base, 600)));
        assert_eq!(state.last_change_time, at(base, 100));
        assert_eq!(state.unchanged_for(at(base, 600)), Duration::from_millis(500));
        assert!(state.record_output("b", at(base, 700)));
        assert_eq!(state.last_output, "b");
    }
}
