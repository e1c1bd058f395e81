//! Output formatting for CLI commands

use anyhow::Result;
use serde::Serialize;

/// Pretty JSON for `--json` style output
pub fn format_json<T: Serialize>(data: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

/// 固定宽度的表格列，超长内容不截断
pub fn pad(value: &str, width: usize) -> String {
    format!("{:<width$}", value, width = width)
}
