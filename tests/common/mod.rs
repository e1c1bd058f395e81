//! 测试用的终端后端：输出可脚本化，所有调用都会被记录

#![allow(dead_code)]

use agent_arcade::{PaneRole, TerminalBackend};
use anyhow::{anyhow, Result};
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetAgentState(bool),
    SetGame(Option<String>),
    Display { pane: PaneRole, duration_ms: u64, text: String },
    LaunchAgent(String),
    LaunchGame,
    Kill,
}

#[derive(Default)]
struct Pane {
    output: String,
    capture_fails: bool,
    dead: bool,
    query_fails: bool,
    launch_fails: bool,
    /// 启动调用成功但进程马上退出
    dies_after_launch: bool,
}

#[derive(Default)]
pub struct FakeBackend {
    agent: Mutex<Pane>,
    game: Mutex<Pane>,
    current_game: Mutex<Option<String>>,
    display_fails: Mutex<bool>,
    calls: Mutex<Vec<Call>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn pane(&self, role: PaneRole) -> std::sync::MutexGuard<'_, Pane> {
        match role {
            PaneRole::Agent => self.agent.lock().unwrap(),
            PaneRole::Game => self.game.lock().unwrap(),
        }
    }

    pub fn set_output(&self, role: PaneRole, output: &str) {
        self.pane(role).output = output.to_string();
    }

    pub fn fail_capture(&self, role: PaneRole, fails: bool) {
        self.pane(role).capture_fails = fails;
    }

    pub fn set_dead(&self, role: PaneRole, dead: bool) {
        self.pane(role).dead = dead;
    }

    pub fn fail_query(&self, role: PaneRole, fails: bool) {
        self.pane(role).query_fails = fails;
    }

    pub fn fail_launch(&self, role: PaneRole, fails: bool) {
        self.pane(role).launch_fails = fails;
    }

    pub fn die_after_launch(&self, role: PaneRole, dies: bool) {
        self.pane(role).dies_after_launch = dies;
    }

    pub fn fail_display(&self, fails: bool) {
        *self.display_fails.lock().unwrap() = fails;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| matches(call)).count()
    }

    pub fn agent_states(&self) -> Vec<bool> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SetAgentState(idle) => Some(idle),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn launch(&self, role: PaneRole) -> Result<()> {
        let mut pane = self.pane(role);
        if pane.launch_fails {
            return Err(anyhow!("launch failed"));
        }
        pane.dead = pane.dies_after_launch;
        Ok(())
    }
}

impl TerminalBackend for FakeBackend {
    fn capture_window_output(&self, pane: PaneRole, _lines: u32) -> Result<String> {
        let pane = self.pane(pane);
        if pane.capture_fails {
            return Err(anyhow!("capture failed"));
        }
        Ok(pane.output.clone())
    }

    fn is_pane_dead(&self, pane: PaneRole) -> Result<bool> {
        let pane = self.pane(pane);
        if pane.query_fails {
            return Err(anyhow!("query failed"));
        }
        Ok(pane.dead)
    }

    fn set_agent_state(&self, is_idle: bool) -> Result<()> {
        self.record(Call::SetAgentState(is_idle));
        Ok(())
    }

    fn current_game(&self) -> Option<String> {
        self.current_game.lock().unwrap().clone()
    }

    fn set_game_status(&self, game: Option<&str>) -> Result<()> {
        *self.current_game.lock().unwrap() = game.map(String::from);
        self.record(Call::SetGame(game.map(String::from)));
        Ok(())
    }

    fn send_display_message(&self, pane: PaneRole, duration_ms: u64, text: &str) -> Result<()> {
        self.record(Call::Display { pane, duration_ms, text: text.to_string() });
        if *self.display_fails.lock().unwrap() {
            return Err(anyhow!("display failed"));
        }
        Ok(())
    }

    fn launch_ai_agent(&self, command: &str, _args: &[String], _dir: Option<&Path>) -> Result<()> {
        self.record(Call::LaunchAgent(command.to_string()));
        self.launch(PaneRole::Agent)
    }

    fn launch_game_runner(&self) -> Result<()> {
        self.record(Call::LaunchGame);
        self.launch(PaneRole::Game)
    }

    fn kill_session(&self) -> Result<()> {
        self.record(Call::Kill);
        Ok(())
    }
}

/// 轮询直到条件成立或超时
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}
