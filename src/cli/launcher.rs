// src/cli/launcher.rs
//! 交互式启动菜单 - 未指定 `--agent` 时选择要启动的 agent

use crate::agent::get_adapter;
use crate::config::ArcadeConfig;
use anyhow::Result;
use dialoguer::Select;

/// 菜单选择结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LauncherChoice {
    Agent(String),
    GamesOnly,
    Quit,
}

/// 菜单项：(显示文本, 选择结果)，agent 按 id 排序，最后是 Games only 和 Quit
pub fn launcher_items(config: &ArcadeConfig) -> Vec<(String, LauncherChoice)> {
    let mut items: Vec<(String, LauncherChoice)> = config
        .agents
        .iter()
        .map(|(id, agent)| {
            let adapter = get_adapter(id, agent);
            let label = if adapter.is_installed() {
                format!("{} ({})", agent.name, agent.command)
            } else {
                format!("{} ({}) - 未安装", agent.name, agent.command)
            };
            (label, LauncherChoice::Agent(id.clone()))
        })
        .collect();

    items.push(("🎮 Games only".to_string(), LauncherChoice::GamesOnly));
    items.push(("Quit".to_string(), LauncherChoice::Quit));
    items
}

/// 显示菜单，Esc / q 视为退出
pub fn choose(config: &ArcadeConfig) -> Result<LauncherChoice> {
    let items = launcher_items(config);
    let labels: Vec<&str> = items.iter().map(|(label, _)| label.as_str()).collect();

    println!("🕹  AGENT ARCADE\n");
    let selection = Select::new()
        .with_prompt("选择要启动的 AI agent")
        .items(&labels)
        .default(0)
        .interact_opt()?;

    Ok(selection
        .and_then(|index| items.into_iter().nth(index))
        .map(|(_, choice)| choice)
        .unwrap_or(LauncherChoice::Quit))
}
