// src/cli/config.rs
//! Config 命令 - 查看或初始化配置文件

use crate::cli::output::format_json;
use crate::config::{default_config_path, ArcadeConfig};
use anyhow::{bail, Result};
use clap::Args;
use std::path::{Path, PathBuf};

/// Config 命令参数
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// 写入默认配置文件
    #[arg(long)]
    pub init: bool,

    /// 与 --init 一起使用，覆盖已有文件
    #[arg(long, requires = "init")]
    pub force: bool,
}

/// 按 `--config` 或默认路径加载配置
pub fn load_config(path: Option<&Path>) -> Result<ArcadeConfig> {
    match path {
        Some(path) => ArcadeConfig::load_from(path),
        None => ArcadeConfig::load(),
    }
}

/// 处理 config 命令
pub fn handle_config(args: ConfigArgs, path: Option<&Path>) -> Result<()> {
    let path: PathBuf = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);

    if args.init {
        init_config(&path, args.force)?;
        println!("已写入默认配置: {}", path.display());
        return Ok(());
    }

    let config = ArcadeConfig::load_from(&path)?;
    if !path.exists() {
        eprintln!("# {} 不存在，以下为默认配置", path.display());
    }
    println!("{}", format_json(&config)?);
    Ok(())
}

/// 写入默认配置，已存在且未指定 force 时报错
pub fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("配置文件已存在: {}（使用 --force 覆盖）", path.display());
    }
    ArcadeConfig::default().save_to(path)
}
