// src/cli/start.rs
//! Start 命令 - 创建 arcade session 并 attach
//!
//! 创建 tmux session（上方 agent、下方游戏），启动 activity monitor 和
//! pane supervisor，然后 attach。退出时停止后台循环并终止 session。

use crate::agent::{get_adapter, AgentAdapter};
use crate::cli::config::load_config;
use crate::cli::launcher::{self, LauncherChoice};
use crate::config::ArcadeConfig;
use crate::infra::{TerminalBackend, TmuxManager};
use crate::watcher::{ActivityMonitor, AgentLaunch, PaneSupervisor, StopSignal};
use anyhow::{anyhow, Context, Result};
use clap::Args;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use tracing::{info, warn};

/// Start 命令参数
#[derive(Args, Debug, Default)]
pub struct StartArgs {
    /// 要启动的 agent id（见 `agents` 命令），不指定时显示选择菜单
    #[arg(long, short)]
    pub agent: Option<String>,

    /// 不启动 agent，直接在当前终端玩游戏
    #[arg(long, conflicts_with = "agent")]
    pub games_only: bool,
}

/// 析构时终止 session，重复终止无副作用
pub struct SessionGuard {
    backend: Arc<dyn TerminalBackend>,
}

impl SessionGuard {
    pub fn new(backend: Arc<dyn TerminalBackend>) -> Self {
        Self { backend }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Err(e) = self.backend.kill_session() {
            warn!(error = %e, "Could not kill tmux session");
        }
    }
}

/// 处理 start 命令
pub async fn handle_start(args: StartArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;

    if args.games_only {
        return run_games_only(&config);
    }

    let agent_id = match args.agent {
        Some(id) => id,
        None => match launcher::choose(&config)? {
            LauncherChoice::Agent(id) => id,
            LauncherChoice::GamesOnly => return run_games_only(&config),
            LauncherChoice::Quit => return Ok(()),
        },
    };

    let agent_config = config.get_agent(&agent_id)?;
    let adapter = get_adapter(&agent_id, agent_config);
    if !adapter.is_installed() {
        return Err(anyhow!(
            "{} 命令未找到: {}\n请先安装，或在配置文件中修改 agents.{}.command",
            adapter.display_name(),
            agent_config.command,
            agent_id
        ));
    }

    run_session(config, adapter).await
}

/// 完整的 session 生命周期
async fn run_session(config: ArcadeConfig, adapter: Box<dyn AgentAdapter>) -> Result<()> {
    let agent_name = adapter.display_name().to_string();
    let launch = AgentLaunch::from_adapter(adapter.as_ref());

    let mut tmux = TmuxManager::new(&config)?;
    tmux.create_session(&config, launch.working_dir.as_deref())?;
    let tmux = Arc::new(tmux);
    let backend: Arc<dyn TerminalBackend> = tmux.clone();
    let _guard = SessionGuard::new(Arc::clone(&backend));

    backend
        .launch_ai_agent(&launch.command, &launch.args, launch.working_dir.as_deref())
        .context("启动 agent 失败")?;
    backend.launch_game_runner().context("启动游戏失败")?;

    let stop = StopSignal::new();
    let monitor = ActivityMonitor::from_config(Arc::clone(&backend), adapter, &config)
        .with_stop_signal(stop.clone());
    let supervisor =
        PaneSupervisor::new(Arc::clone(&backend), launch).with_stop_signal(stop.clone());
    monitor.start()?;
    supervisor.start()?;

    info!(agent = %agent_name, session = %tmux.session_name(), "Arcade session started");
    print_instructions(&config, &agent_name);

    let attach_tmux = Arc::clone(&tmux);
    let attach = tokio::task::spawn_blocking(move || attach_tmux.attach());

    tokio::select! {
        result = attach => match result {
            Ok(Ok(())) => info!("Tmux client detached"),
            Ok(Err(e)) => warn!(error = %e, "Tmux attach failed"),
            Err(e) => warn!(error = %e, "Attach task failed"),
        },
        () = wait_for_shutdown_signal() => {}
    }

    stop.trigger();
    monitor.stop();
    supervisor.stop();
    info!("Arcade session finished");
    Ok(())
}

/// 不启动 agent，前台运行游戏 runner
fn run_games_only(config: &ArcadeConfig) -> Result<()> {
    let runner = &config.game_runner;
    info!(command = %runner.command_line(), "Starting games only");

    let status = Command::new(&runner.command)
        .args(&runner.args)
        .status()
        .with_context(|| format!("无法启动游戏: {}", runner.command))?;

    if !status.success() {
        warn!(status = %status, "Game runner exited with failure");
    }
    Ok(())
}

fn print_instructions(config: &ArcadeConfig, agent_name: &str) {
    let keys = &config.keybindings;
    println!("🕹  AGENT ARCADE - {}", agent_name);
    println!();
    println!("  上方 pane: {}    下方 pane: 游戏", agent_name);
    println!("  {} {}  切换到 agent", keys.prefix, keys.switch_to_ai);
    println!("  {} {}  切换到游戏", keys.prefix, keys.switch_to_game);
    println!("  {} {}  退出", keys.prefix, keys.quit);
    if config.notifications.enabled {
        println!("  agent 等待输入时会在游戏 pane 上提示");
    }
    println!();
}

/// 等待 Ctrl+C 或 SIGTERM
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Could not install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Could not install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C signal"),
        () = terminate => info!("Received SIGTERM signal"),
    }
}
