//! Pane supervisor 集成测试

mod common;

use agent_arcade::watcher::{
    AgentLaunch, PaneSupervisor, PaneWatchdog, StopSignal, SupervisorVerdict, MAX_RELAUNCH_FAILURES,
};
use agent_arcade::{PaneRole, TerminalBackend};
use common::{wait_until, Call, FakeBackend};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn launch() -> AgentLaunch {
    AgentLaunch {
        command: "claude".to_string(),
        args: vec![],
        working_dir: None,
    }
}

fn watchdog(backend: &Arc<FakeBackend>) -> PaneWatchdog {
    let backend: Arc<dyn TerminalBackend> = backend.clone();
    PaneWatchdog::new(backend, launch()).with_settle(Duration::ZERO)
}

#[test]
fn test_healthy_panes_are_left_alone() {
    let backend = Arc::new(FakeBackend::new());
    let mut watchdog = watchdog(&backend);

    assert_eq!(watchdog.check_once(), SupervisorVerdict::Healthy);
    assert!(backend.calls().is_empty());
}

#[test]
fn test_dead_pane_is_relaunched() {
    // Given: 游戏进程已退出
    let backend = Arc::new(FakeBackend::new());
    backend.set_dead(PaneRole::Game, true);
    let mut watchdog = watchdog(&backend);

    // When
    let verdict = watchdog.check_once();

    // Then: 重启游戏，不碰 agent
    assert_eq!(verdict, SupervisorVerdict::Healthy);
    assert_eq!(backend.calls(), vec![Call::LaunchGame]);
    assert_eq!(watchdog.failures(PaneRole::Game), 0);
}

#[test]
fn test_dead_agent_relaunched_with_configured_command() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_dead(PaneRole::Agent, true);
    let mut watchdog = watchdog(&backend);

    watchdog.check_once();

    assert_eq!(backend.calls(), vec![Call::LaunchAgent("claude".to_string())]);
}

#[test]
fn test_three_failures_are_fatal() {
    // Given: agent 已退出且每次重启都失败
    let backend = Arc::new(FakeBackend::new());
    backend.set_dead(PaneRole::Agent, true);
    backend.fail_launch(PaneRole::Agent, true);
    let mut watchdog = watchdog(&backend);

    // When/Then: 前两次仍然健康，第三次致命
    assert_eq!(watchdog.check_once(), SupervisorVerdict::Healthy);
    assert_eq!(watchdog.failures(PaneRole::Agent), 1);
    assert_eq!(watchdog.check_once(), SupervisorVerdict::Healthy);
    assert_eq!(watchdog.failures(PaneRole::Agent), 2);
    assert_eq!(
        watchdog.check_once(),
        SupervisorVerdict::Fatal { pane: PaneRole::Agent, failures: MAX_RELAUNCH_FAILURES }
    );
}

#[test]
fn test_success_at_two_failures_resets_counter() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_dead(PaneRole::Agent, true);
    backend.fail_launch(PaneRole::Agent, true);
    let mut watchdog = watchdog(&backend);

    watchdog.check_once();
    watchdog.check_once();
    assert_eq!(watchdog.failures(PaneRole::Agent), 2);

    // When: 第三次重启成功
    backend.fail_launch(PaneRole::Agent, false);
    assert_eq!(watchdog.check_once(), SupervisorVerdict::Healthy);

    // Then: 计数归零
    assert_eq!(watchdog.failures(PaneRole::Agent), 0);
}

#[test]
fn test_process_dying_right_after_launch_counts_as_failure() {
    // Given: 启动调用成功，但进程马上退出
    let backend = Arc::new(FakeBackend::new());
    backend.set_dead(PaneRole::Game, true);
    backend.die_after_launch(PaneRole::Game, true);
    let mut watchdog = watchdog(&backend);

    for _ in 0..2 {
        assert_eq!(watchdog.check_once(), SupervisorVerdict::Healthy);
    }
    assert_eq!(
        watchdog.check_once(),
        SupervisorVerdict::Fatal { pane: PaneRole::Game, failures: 3 }
    );
}

#[test]
fn test_alive_pane_resets_counter() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_dead(PaneRole::Game, true);
    backend.fail_launch(PaneRole::Game, true);
    let mut watchdog = watchdog(&backend);

    watchdog.check_once();
    assert_eq!(watchdog.failures(PaneRole::Game), 1);

    // 进程自己恢复了（例如用户手动重启）
    backend.set_dead(PaneRole::Game, false);
    watchdog.check_once();
    assert_eq!(watchdog.failures(PaneRole::Game), 0);
}

#[test]
fn test_query_errors_are_not_counted() {
    let backend = Arc::new(FakeBackend::new());
    backend.fail_query(PaneRole::Agent, true);
    let mut watchdog = watchdog(&backend);

    for _ in 0..5 {
        assert_eq!(watchdog.check_once(), SupervisorVerdict::Healthy);
    }
    assert_eq!(watchdog.failures(PaneRole::Agent), 0);
    assert!(backend.calls().is_empty());
}

#[test]
fn test_supervisor_tears_down_and_exits_nonzero() {
    // Given: agent 无法重启
    let backend = Arc::new(FakeBackend::new());
    backend.set_dead(PaneRole::Agent, true);
    backend.fail_launch(PaneRole::Agent, true);

    let exit_code = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&exit_code);
    let supervisor = PaneSupervisor::new(backend.clone(), launch())
        .with_tick(Duration::from_millis(10))
        .with_settle(Duration::ZERO)
        .with_fatal_handler(move |code| *sink.lock().unwrap() = Some(code));

    // When
    supervisor.start().unwrap();

    // Then: session 被终止，退出码非零，循环结束
    assert!(wait_until(Duration::from_secs(2), || exit_code.lock().unwrap().is_some()));
    assert_eq!(*exit_code.lock().unwrap(), Some(1));
    assert_eq!(backend.count(|c| *c == Call::Kill), 1);
    assert_eq!(backend.count(|c| matches!(c, Call::LaunchAgent(_))), 3);
    assert!(wait_until(Duration::from_secs(2), || !supervisor.is_running()));
}

#[test]
fn test_supervisor_stop_before_start() {
    let backend = Arc::new(FakeBackend::new());
    let supervisor = PaneSupervisor::new(backend, launch());
    supervisor.stop();
    assert!(!supervisor.is_running());
}

#[test]
fn test_shared_stop_signal_stops_supervisor() {
    let backend = Arc::new(FakeBackend::new());
    let stop = StopSignal::new();
    let supervisor = PaneSupervisor::new(backend, launch())
        .with_tick(Duration::from_millis(10))
        .with_stop_signal(stop.clone());

    supervisor.start().unwrap();
    assert!(supervisor.is_running());

    stop.trigger();
    assert!(wait_until(Duration::from_secs(2), || !supervisor.is_running()));
    supervisor.stop();
}
