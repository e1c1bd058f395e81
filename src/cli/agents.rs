// src/cli/agents.rs
//! Agents 命令 - 列出配置中的 agent

use crate::agent::{get_adapter, AgentType};
use crate::cli::output::{format_json, pad};
use crate::config::ArcadeConfig;
use anyhow::Result;
use clap::Args;
use serde::Serialize;

/// Agents 命令参数
#[derive(Args, Debug, Default)]
pub struct AgentsArgs {
    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

/// 单个 agent 的摘要
#[derive(Debug, Serialize)]
pub struct AgentSummary {
    pub id: String,
    pub name: String,
    pub command: String,
    pub kind: AgentType,
    pub installed: bool,
}

/// 收集所有 agent 的摘要，按 id 排序
pub fn summarize_agents(config: &ArcadeConfig) -> Vec<AgentSummary> {
    config
        .agents
        .iter()
        .map(|(id, agent)| {
            let adapter = get_adapter(id, agent);
            AgentSummary {
                id: id.clone(),
                name: agent.name.clone(),
                command: agent.command.clone(),
                kind: adapter.agent_type(),
                installed: adapter.is_installed(),
            }
        })
        .collect()
}

/// 处理 agents 命令
pub fn handle_agents(args: AgentsArgs, config: &ArcadeConfig) -> Result<()> {
    let agents = summarize_agents(config);

    if args.json {
        println!("{}", format_json(&agents)?);
        return Ok(());
    }

    if agents.is_empty() {
        println!("没有配置任何 agent");
        return Ok(());
    }

    println!("{} {} {} {}", pad("ID", 14), pad("NAME", 16), pad("KIND", 8), "INSTALLED");
    for agent in &agents {
        println!(
            "{} {} {} {}",
            pad(&agent.id, 14),
            pad(&agent.name, 16),
            pad(&agent.kind.to_string(), 8),
            if agent.installed { "yes" } else { "no" }
        );
    }
    Ok(())
}
