//! tmux 管理模块 - 封装 tmux 操作
//!
//! 一个 session，一个 window，上下两个 pane：上方 agent，下方游戏。

use crate::config::{join_command, ArcadeConfig, GameRunnerConfig, KeybindingsConfig, TmuxConfig};
use crate::infra::backend::{PaneHandle, PaneRole, TerminalBackend};
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, error, info};

/// 状态栏左侧标题
const STATUS_LEFT: &str = "🎮 AGENT ARCADE | ";

/// 在 tmux 内部启动时，轮询 session 是否结束的间隔
const SESSION_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// session 中两个 pane 的 id
#[derive(Debug, Clone)]
struct SessionPanes {
    agent: PaneHandle,
    game: PaneHandle,
}

/// 状态栏右侧显示的内容
#[derive(Debug, Clone, Default, PartialEq)]
struct StatusLine {
    agent_idle: Option<bool>,
    current_game: Option<String>,
}

impl StatusLine {
    fn render(&self) -> String {
        let game = self
            .current_game
            .as_deref()
            .map(|g| format!("🕹 {} | ", g))
            .unwrap_or_default();
        let agent = match self.agent_idle {
            Some(true) => "#[fg=green]● AI READY#[default]",
            Some(false) => "#[fg=yellow]◐ AI WORKING#[default]",
            None => "",
        };
        format!("{}{}", game, agent)
    }
}

/// 覆盖前 prefix 表中这些键的绑定
///
/// `bind-key` 作用于整个 tmux server，session 结束后要还原，
/// 否则用户其他 session 里的 `q` 仍然会执行 kill-session。
#[derive(Debug, Clone, Default, PartialEq)]
struct SavedBindings {
    keys: Vec<String>,
    /// `list-keys` 输出的原始行，可以直接作为 tmux 命令重新执行
    previous: Vec<String>,
}

/// tmux 管理器
pub struct TmuxManager {
    session_name: String,
    status_bar: bool,
    game_runner: GameRunnerConfig,
    panes: Option<SessionPanes>,
    status: Mutex<StatusLine>,
    saved_bindings: Mutex<Option<SavedBindings>>,
}

impl TmuxManager {
    /// 创建管理器，tmux 不可用时返回错误
    pub fn new(config: &ArcadeConfig) -> Result<Self> {
        if !Self::is_available() {
            return Err(anyhow!(
                "tmux 未安装或不可用\n请先安装 tmux: brew install tmux (macOS) 或 apt-get install tmux (Linux)"
            ));
        }
        Ok(Self::with_config(&config.tmux, &config.game_runner))
    }

    fn with_config(tmux: &TmuxConfig, game_runner: &GameRunnerConfig) -> Self {
        Self {
            session_name: tmux.session_name.clone(),
            status_bar: tmux.status_bar,
            game_runner: game_runner.clone(),
            panes: None,
            status: Mutex::new(StatusLine::default()),
            saved_bindings: Mutex::new(None),
        }
    }

    /// tmux 命令是否可用
    pub fn is_available() -> bool {
        Command::new("tmux")
            .arg("-V")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// 检查 session 是否存在
    pub fn session_exists(&self) -> bool {
        Command::new("tmux")
            .args(["has-session", "-t", self.session_name.as_str()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// 创建 session 并切分出 agent / game 两个 pane
    ///
    /// 同名的旧 session 会先被终止。
    pub fn create_session(&mut self, config: &ArcadeConfig, working_dir: Option<&Path>) -> Result<()> {
        if self.session_exists() {
            info!(session = %self.session_name, "Killing stale tmux session");
            self.kill_session()?;
        }

        debug!(session = %self.session_name, working_dir = ?working_dir, "Creating tmux session");

        let mut args: Vec<String> = vec![
            "new-session".into(),
            "-d".into(),
            "-s".into(),
            self.session_name.clone(),
            "-P".into(),
            "-F".into(),
            "#{pane_id}".into(),
        ];
        if let Some(dir) = working_dir {
            args.push("-c".into());
            args.push(dir.to_string_lossy().into_owned());
        }
        let agent = PaneHandle::new(self.output(&args).context("创建 tmux session 失败")?.trim());

        // 上方 pane 占 pane_split_ratio%，下方是剩余部分
        let game_percentage = 100 - u32::from(config.tmux.pane_split_ratio);
        let mut args: Vec<String> = vec![
            "split-window".into(),
            "-v".into(),
            "-p".into(),
            game_percentage.to_string(),
            "-t".into(),
            agent.to_string(),
            "-P".into(),
            "-F".into(),
            "#{pane_id}".into(),
        ];
        if let Some(dir) = working_dir {
            args.push("-c".into());
            args.push(dir.to_string_lossy().into_owned());
        }
        let game = PaneHandle::new(self.output(&args).context("切分 pane 失败")?.trim());

        info!(session = %self.session_name, agent_pane = %agent, game_pane = %game, "Tmux session created");
        self.panes = Some(SessionPanes { agent, game });

        self.configure_session(&config.tmux, &config.keybindings)
    }

    /// 设置 session 选项和快捷键
    fn configure_session(&self, tmux: &TmuxConfig, keys: &KeybindingsConfig) -> Result<()> {
        let session = self.session_name.as_str();
        let agent = self.pane(PaneRole::Agent)?.to_string();
        let game = self.pane(PaneRole::Game)?.to_string();

        // 进程退出后保留 pane，pane 守护循环才能发现并重启
        self.run(&["set-option", "-w", "-t", session, "remain-on-exit", "on"])?;

        if tmux.mouse_mode {
            self.run(&["set-option", "-t", session, "mouse", "on"])?;
        }

        if tmux.status_bar {
            self.run(&["set-option", "-t", session, "status", "on"])?;
            self.run(&["set-option", "-t", session, "status-left", STATUS_LEFT])?;
            self.run(&["set-option", "-t", session, "status-left-length", "40"])?;
            self.run(&["set-option", "-t", session, "status-right-length", "60"])?;
        } else {
            self.run(&["set-option", "-t", session, "status", "off"])?;
        }

        self.run(&["set-option", "-t", session, "prefix", keys.prefix.as_str()])?;

        // 快捷键是 server 级别的，先记下原有绑定，kill_session 时还原
        self.save_bindings(keys);
        self.run(&["bind-key", "-T", "prefix", keys.prefix.as_str(), "send-prefix"])?;
        self.run(&["bind-key", "-T", "prefix", keys.switch_to_ai.as_str(), "select-pane", "-t", agent.as_str()])?;
        self.run(&["bind-key", "-T", "prefix", keys.switch_to_game.as_str(), "select-pane", "-t", game.as_str()])?;
        self.run(&["bind-key", "-T", "prefix", keys.quit.as_str(), "kill-session", "-t", session])?;

        debug!(session = %session, prefix = %keys.prefix, "Tmux session configured");
        Ok(())
    }

    fn save_bindings(&self, keys: &KeybindingsConfig) {
        let mut saved = SavedBindings::default();
        for key in [&keys.prefix, &keys.switch_to_ai, &keys.switch_to_game, &keys.quit] {
            if saved.keys.contains(key) {
                continue;
            }
            saved.keys.push(key.clone());
            // 未绑定的键 list-keys 会失败，视为没有原绑定
            if let Some(listing) = self.query(&["list-keys", "-T", "prefix", key.as_str()]) {
                saved
                    .previous
                    .extend(listing.lines().filter(|l| !l.trim().is_empty()).map(String::from));
            }
        }
        debug!(keys = ?saved.keys, previous = saved.previous.len(), "Saved tmux key bindings");
        *self.saved_bindings.lock().unwrap_or_else(|e| e.into_inner()) = Some(saved);
    }

    /// 解除本 session 的快捷键并还原原有绑定，只执行一次
    ///
    /// server 已经退出时命令会失败，此时绑定也随 server 消失，忽略错误。
    fn restore_bindings(&self) {
        let Some(saved) = self.saved_bindings.lock().unwrap_or_else(|e| e.into_inner()).take()
        else {
            return;
        };

        for key in &saved.keys {
            if self.query(&["unbind-key", "-T", "prefix", key.as_str()]).is_none() {
                debug!(key = %key, "Could not unbind key");
            }
        }
        if saved.previous.is_empty() {
            return;
        }

        let tag: String = self
            .session_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        let path = std::env::temp_dir()
            .join(format!("agent-arcade-keys-{}-{}.conf", std::process::id(), tag));
        let script = saved.previous.join("\n") + "\n";
        match std::fs::write(&path, script) {
            Ok(()) => {
                let path_str = path.to_string_lossy().into_owned();
                if self.query(&["source-file", path_str.as_str()]).is_none() {
                    debug!(path = %path.display(), "Could not restore key bindings");
                }
                let _ = std::fs::remove_file(&path);
            }
            Err(e) => debug!(error = %e, "Could not write key binding script"),
        }
    }

    /// 获取 pane id，session 未创建时返回错误
    pub fn pane(&self, role: PaneRole) -> Result<&PaneHandle> {
        let panes = self
            .panes
            .as_ref()
            .ok_or_else(|| anyhow!("tmux session 尚未创建: {}", self.session_name))?;
        Ok(match role {
            PaneRole::Agent => &panes.agent,
            PaneRole::Game => &panes.game,
        })
    }

    /// 在 pane 中启动命令，替换 pane 里原有的进程
    fn respawn(&self, role: PaneRole, command_line: &str, working_dir: Option<&Path>) -> Result<()> {
        let pane = self.pane(role)?.to_string();
        let mut args: Vec<String> = vec!["respawn-pane".into(), "-k".into(), "-t".into(), pane];
        if let Some(dir) = working_dir {
            args.push("-c".into());
            args.push(dir.to_string_lossy().into_owned());
        }
        args.push(command_line.to_string());

        info!(pane = %role, command = %command_line, "Launching process in pane");
        self.run(&args)
    }

    /// 选中 agent pane 并 attach（阻塞直到 detach 或 session 结束）
    ///
    /// 已经在 tmux 中时改用 switch-client，并等待 session 结束。
    pub fn attach(&self) -> Result<()> {
        let agent = self.pane(PaneRole::Agent)?.to_string();
        self.run(&["select-pane", "-t", agent.as_str()])?;

        if std::env::var_os("TMUX").is_some() {
            self.run(&["switch-client", "-t", self.session_name.as_str()])?;
            while self.session_exists() {
                std::thread::sleep(SESSION_POLL_INTERVAL);
            }
            return Ok(());
        }

        let status = Command::new("tmux")
            .args(["attach-session", "-t", self.session_name.as_str()])
            .status()
            .context("无法执行 tmux")?;

        if status.success() {
            Ok(())
        } else {
            Err(anyhow!("tmux attach-session 失败: {}", self.session_name))
        }
    }

    fn update_status(&self, update: impl FnOnce(&mut StatusLine)) -> Result<()> {
        let rendered = {
            let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
            update(&mut status);
            status.render()
        };
        if !self.status_bar {
            return Ok(());
        }
        self.run(&["set-option", "-t", self.session_name.as_str(), "status-right", rendered.as_str()])
    }

    /// 执行 tmux 命令，只关心是否成功
    fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<()> {
        self.output(args).map(|_| ())
    }

    /// 执行预期可能失败的 tmux 命令，失败时返回 None 且不记错误日志
    fn query(&self, args: &[&str]) -> Option<String> {
        Command::new("tmux")
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .ok()
            .filter(|output| output.status.success())
            .map(|output| String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// 执行 tmux 命令并返回 stdout
    fn output<S: AsRef<str>>(&self, args: &[S]) -> Result<String> {
        let args: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();
        let output = Command::new("tmux")
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .context("无法执行 tmux")?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(command = ?args.first(), stderr = %stderr.trim(), "tmux command failed");
            Err(anyhow!("tmux {} 失败: {}", args.join(" "), stderr.trim()))
        }
    }
}

impl TerminalBackend for TmuxManager {
    fn capture_window_output(&self, pane: PaneRole, lines: u32) -> Result<String> {
        let target = self.pane(pane)?.to_string();
        let start = format!("-{}", lines);
        self.output(&[
            "capture-pane",
            "-t",
            target.as_str(),
            "-p", // print to stdout
            "-e", // keep escape sequences
            "-S",
            start.as_str(),
        ])
    }

    fn is_pane_dead(&self, pane: PaneRole) -> Result<bool> {
        let target = self.pane(pane)?.to_string();
        let output = self.output(&["display-message", "-p", "-t", target.as_str(), "#{pane_dead}"])?;
        Ok(output.trim() == "1")
    }

    fn set_agent_state(&self, is_idle: bool) -> Result<()> {
        debug!(is_idle, "Updating agent status");
        self.update_status(|status| status.agent_idle = Some(is_idle))
    }

    fn current_game(&self) -> Option<String> {
        self.status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .current_game
            .clone()
    }

    fn set_game_status(&self, game: Option<&str>) -> Result<()> {
        debug!(game = ?game, "Updating game status");
        self.update_status(|status| status.current_game = game.map(String::from))
    }

    fn send_display_message(&self, pane: PaneRole, duration_ms: u64, text: &str) -> Result<()> {
        let target = self.pane(pane)?.to_string();
        let duration = duration_ms.to_string();
        self.run(&["display-message", "-t", target.as_str(), "-d", duration.as_str(), text])
    }

    fn launch_ai_agent(&self, command: &str, args: &[String], working_dir: Option<&Path>) -> Result<()> {
        self.respawn(PaneRole::Agent, &join_command(command, args), working_dir)
    }

    fn launch_game_runner(&self) -> Result<()> {
        self.respawn(PaneRole::Game, &self.game_runner.command_line(), None)
    }

    fn kill_session(&self) -> Result<()> {
        self.restore_bindings();
        if !self.session_exists() {
            return Ok(());
        }
        debug!(session = %self.session_name, "Killing tmux session");
        self.run(&["kill-session", "-t", self.session_name.as_str()])?;
        info!(session = %self.session_name, "Tmux session killed");
        Ok(())
    }
}
