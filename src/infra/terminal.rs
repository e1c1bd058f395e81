//! 终端快照处理工具

/// 最后 N 个非空行（tmux 会用空行填满 pane 底部）
pub fn recent_non_empty_lines(text: &str, n: usize) -> Vec<&str> {
    let mut lines: Vec<&str> = text
        .lines()
        .rev()
        .filter(|line| !line.trim().is_empty())
        .take(n)
        .collect();
    lines.reverse();
    lines
}

/// 最后一个非空行
pub fn last_non_empty_line(text: &str) -> Option<&str> {
    text.lines().rev().find(|line| !line.trim().is_empty())
}
