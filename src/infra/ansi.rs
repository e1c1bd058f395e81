//! 控制序列清理 - 移除终端转义序列，保留可见文本
//!
//! `tmux capture-pane -e` 的输出带有 SGR 颜色、光标移动等序列，
//! 就绪检测之前必须先清理掉。

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// CSI 序列（ESC [ 参数字节 中间字节 结束字节）以及 ESC + 单字符的 Fe 序列
static ANSI_ESCAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").expect("Invalid ANSI escape regex")
});

/// 移除文本中的终端控制序列
///
/// 没有可移除的序列时直接借用输入。移除一个序列可能拼出新的序列
/// （例如 `"\x1b\x1b[0m[0m"`），因此重复替换直到不再匹配，保证幂等。
pub fn strip_control_sequences(text: &str) -> Cow<'_, str> {
    if !ANSI_ESCAPE_RE.is_match(text) {
        return Cow::Borrowed(text);
    }

    let mut cleaned = ANSI_ESCAPE_RE.replace_all(text, "").into_owned();
    while ANSI_ESCAPE_RE.is_match(&cleaned) {
        cleaned = ANSI_ESCAPE_RE.replace_all(&cleaned, "").into_owned();
    }
    Cow::Owned(cleaned)
}
