//! Agent Arcade CLI
//!
//! 在 tmux 里一边跑 AI 编码代理 (Claude Code, Aider, Codex)，一边玩游戏

use agent_arcade::cli::{
    handle_agents, handle_config, handle_start, load_config, AgentsArgs, ConfigArgs, StartArgs,
};
use agent_arcade::config::{data_dir, log_path};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "agent-arcade")]
#[command(about = "Agent Arcade - 等 AI agent 干活的时候玩游戏")]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 ~/.agent-arcade/config.json）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 日志输出到 stderr 而不是日志文件
    #[arg(long, global = true)]
    log_stderr: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// 启动 arcade session（默认命令）
    Start(StartArgs),
    /// 列出配置中的 agent
    Agents(AgentsArgs),
    /// 查看或初始化配置文件
    Config(ConfigArgs),
}

/// 初始化日志
///
/// start 会 attach 到 tmux，日志写到 stderr 会盖住 tmux 画面，所以默认写文件。
fn init_logging(to_file: bool) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("agent_arcade=info"));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false);

    if to_file {
        let dir = data_dir();
        fs::create_dir_all(&dir).with_context(|| format!("创建数据目录失败: {}", dir.display()))?;
        let path = log_path();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("打开日志文件失败: {}", path.display()))?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    } else {
        builder.with_writer(std::io::stderr).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or_else(|| Commands::Start(StartArgs::default()));

    let log_to_file = matches!(command, Commands::Start(_)) && !cli.log_stderr;
    init_logging(log_to_file)?;
    debug!(config = ?cli.config, "Starting agent-arcade");

    let config_path = cli.config.as_deref();
    match command {
        Commands::Start(args) => handle_start(args, config_path).await,
        Commands::Agents(args) => {
            let config = load_config(config_path)?;
            handle_agents(args, &config)
        }
        Commands::Config(args) => handle_config(args, config_path),
    }
}
