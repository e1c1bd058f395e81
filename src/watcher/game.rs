//! 游戏状态检测 - 从 game pane 的输出推断当前在玩的游戏

use crate::infra::{strip_control_sequences, PaneRole, TerminalBackend};
use anyhow::Result;

/// 捕获 game pane 的行数
pub const GAME_STATUS_LINES: u32 = 10;

/// 已知游戏：(状态栏名称, 小写别名)
const KNOWN_GAMES: [(&str, &str); 3] = [("Snake", "snake"), ("Pong", "pong"), ("Tetris", "tetris")];

/// 游戏选择界面的标记
const SELECTOR_MARKERS: [&str; 2] = ["Game Selection", "Select a game"];

/// 从输出中识别游戏名，选择界面或无法识别时返回 None
///
/// 选择界面会列出所有游戏名，所以先判断选择界面。
pub fn detect_game(output: &str) -> Option<&'static str> {
    if SELECTOR_MARKERS.iter().any(|marker| output.contains(marker)) {
        return None;
    }
    KNOWN_GAMES
        .iter()
        .find(|(name, alias)| output.contains(name) || output.contains(alias))
        .map(|(name, _)| *name)
}

/// 捕获 game pane 并在游戏变化时更新状态栏
pub fn sync_game_status(backend: &dyn TerminalBackend) -> Result<Option<&'static str>> {
    let output = backend.capture_window_output(PaneRole::Game, GAME_STATUS_LINES)?;
    let game = detect_game(&strip_control_sequences(&output));
    if backend.current_game().as_deref() != game {
        backend.set_game_status(game)?;
    }
    Ok(game)
}
