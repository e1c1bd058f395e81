//! 配置模块 - `~/.agent-arcade/config.json`
//!
//! 所有字段都有默认值，配置文件不存在时直接使用默认配置。

use crate::agent::AgentType;
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// 数据目录名（位于 home 目录下）
const DATA_DIR_NAME: &str = ".agent-arcade";

/// 配置文件名
const CONFIG_FILE_NAME: &str = "config.json";

const LOG_FILE_NAME: &str = "arcade.log";

/// 数据目录：配置文件和日志都放在这里
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

/// 默认配置文件路径
pub fn default_config_path() -> PathBuf {
    data_dir().join(CONFIG_FILE_NAME)
}

/// attach 期间的日志文件
pub fn log_path() -> PathBuf {
    data_dir().join(LOG_FILE_NAME)
}

/// tmux session 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmuxConfig {
    pub session_name: String,
    /// agent pane 占的高度百分比
    pub pane_split_ratio: u8,
    pub mouse_mode: bool,
    pub status_bar: bool,
}

impl Default for TmuxConfig {
    fn default() -> Self {
        Self {
            session_name: "agent-arcade".to_string(),
            pane_split_ratio: 70,
            mouse_mode: true,
            status_bar: true,
        }
    }
}

/// 快捷键配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeybindingsConfig {
    pub prefix: String,
    pub switch_to_ai: String,
    pub switch_to_game: String,
    pub quit: String,
}

impl Default for KeybindingsConfig {
    fn default() -> Self {
        Self {
            prefix: "C-a".to_string(),
            switch_to_ai: "Up".to_string(),
            switch_to_game: "Down".to_string(),
            quit: "q".to_string(),
        }
    }
}

/// 监控配置（配置文件中以秒为单位）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringSection {
    pub check_interval: f64,
    pub inactivity_timeout: f64,
    pub buffer_lines: u32,
}

impl Default for MonitoringSection {
    fn default() -> Self {
        Self {
            check_interval: 0.5,
            inactivity_timeout: 3.0,
            buffer_lines: 50,
        }
    }
}

/// Activity monitor 的运行参数，加载后不再变化
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorConfig {
    pub check_interval: Duration,
    pub inactivity_timeout: Duration,
    pub buffer_lines: u32,
}

impl MonitoringSection {
    /// 转换为运行参数，调用前应先通过 `ArcadeConfig::validate`
    pub fn to_monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            check_interval: secs_to_duration(self.check_interval),
            inactivity_timeout: secs_to_duration(self.inactivity_timeout),
            buffer_lines: self.buffer_lines,
        }
    }
}

/// 负数和 NaN 视为 0，超出范围时取最大值
fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

/// 通知配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub enabled: bool,
    /// 在 game pane 上闪烁提示
    pub visual: bool,
    pub message: String,
    /// 提示持续时间（秒）
    pub flash_duration: f64,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            visual: true,
            message: "🤖 AI agent is ready for input!".to_string(),
            flash_duration: 2.0,
        }
    }
}

impl NotificationsConfig {
    /// 提示持续时间（毫秒）
    pub fn flash_duration_ms(&self) -> u64 {
        (self.flash_duration.max(0.0) * 1000.0) as u64
    }
}

/// 单个 agent 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// 显示名称
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// 工作目录，未设置时使用当前目录
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    /// 就绪检测使用的适配器，未设置时由 agent id 推断
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<AgentType>,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            working_dir: None,
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: AgentType) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// 游戏 runner 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRunnerConfig {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for GameRunnerConfig {
    fn default() -> Self {
        Self {
            command: "agent-arcade-games".to_string(),
            args: Vec::new(),
        }
    }
}

impl GameRunnerConfig {
    /// 完整命令行
    pub fn command_line(&self) -> String {
        join_command(&self.command, &self.args)
    }
}

/// 拼接命令和参数，含空白或引号的参数用单引号包裹
pub fn join_command(command: &str, args: &[String]) -> String {
    let mut line = command.to_string();
    for arg in args {
        line.push(' ');
        if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || "'\"$`\\;&|<>()".contains(c)) {
            line.push('\'');
            line.push_str(&arg.replace('\'', r"'\''"));
            line.push('\'');
        } else {
            line.push_str(arg);
        }
    }
    line
}

fn default_agents() -> BTreeMap<String, AgentConfig> {
    let mut agents = BTreeMap::new();
    agents.insert(
        "claude_code".to_string(),
        AgentConfig::new("Claude Code", "claude").with_kind(AgentType::Claude),
    );
    agents.insert(
        "aider".to_string(),
        AgentConfig::new("Aider", "aider").with_kind(AgentType::Aider),
    );
    agents.insert(
        "codex".to_string(),
        AgentConfig::new("Codex", "codex").with_kind(AgentType::Codex),
    );
    agents
}

/// 完整配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcadeConfig {
    pub tmux: TmuxConfig,
    pub keybindings: KeybindingsConfig,
    pub monitoring: MonitoringSection,
    pub notifications: NotificationsConfig,
    pub agents: BTreeMap<String, AgentConfig>,
    pub game_runner: GameRunnerConfig,
}

impl Default for ArcadeConfig {
    fn default() -> Self {
        Self {
            tmux: TmuxConfig::default(),
            keybindings: KeybindingsConfig::default(),
            monitoring: MonitoringSection::default(),
            notifications: NotificationsConfig::default(),
            agents: default_agents(),
            game_runner: GameRunnerConfig::default(),
        }
    }
}

impl ArcadeConfig {
    /// 从默认路径加载
    pub fn load() -> Result<Self> {
        Self::load_from(&default_config_path())
    }

    /// 从指定路径加载，文件不存在时返回默认配置
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config: ArcadeConfig = serde_json::from_str(&content)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        config.validate()?;

        info!(path = %path.display(), agents = config.agents.len(), "Config loaded");
        Ok(config)
    }

    /// 写入配置文件（会创建父目录）
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("创建目录失败: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("写入配置文件失败: {}", path.display()))?;
        Ok(())
    }

    /// 检查配置取值
    pub fn validate(&self) -> Result<()> {
        let monitoring = &self.monitoring;
        if !monitoring.check_interval.is_finite() || monitoring.check_interval <= 0.0 {
            bail!("monitoring.check_interval 必须大于 0: {}", monitoring.check_interval);
        }
        if !monitoring.inactivity_timeout.is_finite() || monitoring.inactivity_timeout < 0.0 {
            bail!("monitoring.inactivity_timeout 不能为负数: {}", monitoring.inactivity_timeout);
        }
        for (key, secs) in [
            ("monitoring.check_interval", monitoring.check_interval),
            ("monitoring.inactivity_timeout", monitoring.inactivity_timeout),
        ] {
            if Duration::try_from_secs_f64(secs).is_err() {
                bail!("{} 超出范围: {}", key, secs);
            }
        }
        if monitoring.buffer_lines == 0 {
            bail!("monitoring.buffer_lines 必须大于 0");
        }
        if !self.notifications.flash_duration.is_finite() || self.notifications.flash_duration < 0.0 {
            bail!("notifications.flash_duration 不能为负数: {}", self.notifications.flash_duration);
        }
        if !(10..=90).contains(&self.tmux.pane_split_ratio) {
            bail!("tmux.pane_split_ratio 必须在 10-90 之间: {}", self.tmux.pane_split_ratio);
        }
        if self.tmux.session_name.trim().is_empty() {
            bail!("tmux.session_name 不能为空");
        }
        for (id, agent) in &self.agents {
            if agent.command.trim().is_empty() {
                bail!("agents.{}.command 不能为空", id);
            }
        }
        if self.game_runner.command.trim().is_empty() {
            bail!("game_runner.command 不能为空");
        }
        Ok(())
    }

    /// 查找 agent 配置
    pub fn get_agent(&self, agent_id: &str) -> Result<&AgentConfig> {
        self.agents.get(agent_id).ok_or_else(|| {
            let known: Vec<&str> = self.agents.keys().map(String::as_str).collect();
            anyhow!("未知的 agent: {}，可选: {}", agent_id, known.join(", "))
        })
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        self.monitoring.to_monitor_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = ArcadeConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.agents.contains_key("claude_code"));
        assert_eq!(config.tmux.pane_split_ratio, 70);
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ArcadeConfig::load_from(&dir.path().join("missing.json")).unwrap();
        assert_eq!(config.tmux.session_name, "agent-arcade");
        assert_eq!(config.monitoring.buffer_lines, 50);
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"monitoring": {"check_interval": 1.5}, "notifications": {"visual": false}}"#,
        )
        .unwrap();

        let config = ArcadeConfig::load_from(&path).unwrap();
        assert_eq!(config.monitoring.check_interval, 1.5);
        assert_eq!(config.monitoring.buffer_lines, 50);
        assert!(!config.notifications.visual);
        assert!(config.notifications.enabled);
        assert_eq!(config.monitor_config().check_interval, Duration::from_millis(1500));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"monitoring": {"check_interval": 0}}"#).unwrap();
        assert!(ArcadeConfig::load_from(&path).is_err());

        fs::write(&path, r#"{"tmux": {"pane_split_ratio": 95}}"#).unwrap();
        assert!(ArcadeConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_load_rejects_out_of_range_durations() {
        // Given: 有限但无法表示为 Duration 的秒数
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        for body in [
            r#"{"monitoring": {"check_interval": 1e20}}"#,
            r#"{"monitoring": {"inactivity_timeout": 1e300}}"#,
        ] {
            fs::write(&path, body).unwrap();
            // Then: 加载时报错，而不是在转换时 panic
            let err = ArcadeConfig::load_from(&path).unwrap_err();
            assert!(err.to_string().contains("超出范围"), "{}", err);
        }
    }

    #[test]
    fn test_monitor_config_conversion_is_total() {
        let mut section = MonitoringSection::default();
        section.check_interval = 1e20;
        section.inactivity_timeout = f64::NAN;
        let config = section.to_monitor_config();
        assert_eq!(config.check_interval, Duration::MAX);
        assert_eq!(config.inactivity_timeout, Duration::ZERO);
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let err = ArcadeConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("解析配置文件失败"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = ArcadeConfig::default();
        config.agents.insert(
            "my_cli".to_string(),
            AgentConfig::new("My CLI", "my-cli"),
        );
        config.save_to(&path).unwrap();

        let loaded = ArcadeConfig::load_from(&path).unwrap();
        assert_eq!(loaded.get_agent("my_cli").unwrap().command, "my-cli");
        assert!(loaded.get_agent("my_cli").unwrap().kind.is_none());
    }

    #[test]
    fn test_get_agent_unknown_lists_known_ids() {
        let config = ArcadeConfig::default();
        let err = config.get_agent("nope").unwrap_err().to_string();
        assert!(err.contains("nope"));
        assert!(err.contains("claude_code"));
    }

    #[test]
    fn test_flash_duration_ms() {
        let notifications = NotificationsConfig {
            flash_duration: 1.25,
            ..Default::default()
        };
        assert_eq!(notifications.flash_duration_ms(), 1250);
    }

    #[test]
    fn test_join_command_quotes_special_args() {
        let args = vec!["--model".to_string(), "gpt 4".to_string(), "it's".to_string()];
        assert_eq!(
            join_command("aider", &args),
            r#"aider --model 'gpt 4' 'it'\''s'"#
        );
        assert_eq!(join_command("claude", &[]), "claude");
    }
}
