// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 错误信息的最大长度（字符）
const MAX_ERROR_LEN: usize = 500;

/// 把原始错误文本改写为面向操作者的可执行摘要并截断
///
/// 特定的错误模式（IP黑名单、代理失效、限流、连接重置）对
/// 操作者有明确的处理手段，原始异常文本则没有。未匹配任何
/// 模式的错误保留原文并截断。
pub fn rewrite_error(raw: &str) -> String {
    let lower = raw.to_lowercase();

    let rewritten = if lower.contains("blacklist") {
        format!(
            "IP/Proxy blacklisted by the platform. Rotate the account's proxy before retrying. ({})",
            raw
        )
    } else if lower.contains("socks5 authentication failed") || lower.contains("proxy authentication")
    {
        format!(
            "Proxy Authentication Failed: Please check your proxy credentials. ({})",
            raw
        )
    } else if lower.contains("proxy") {
        format!(
            "Proxy error: verify the assigned proxy is reachable and valid. ({})",
            raw
        )
    } else if lower.contains("429") || lower.contains("too many requests") {
        format!(
            "Rate limited by the platform (429). Reduce action frequency for this account. ({})",
            raw
        )
    } else if lower.contains("400") {
        format!(
            "Request rejected by the platform (400). The action may be restricted for this account. ({})",
            raw
        )
    } else if lower.contains("eof") {
        format!(
            "Connection reset by the platform (EOF). Usually transient; retry the task. ({})",
            raw
        )
    } else {
        raw.to_string()
    };

    truncate(&rewritten, MAX_ERROR_LEN)
}

/// 按字符边界截断
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.chars().take(max_chars).collect()
}
