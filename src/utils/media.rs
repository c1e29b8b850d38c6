// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::path::{Path, PathBuf};

/// 将媒体引用解析为本地文件系统上的绝对路径
///
/// 支持三种形式：
/// - 纯文件名（不含路径分隔符）：相对配置的媒体根目录解析
/// - 容器内绝对路径（/app/ 前缀）：映射到媒体根目录的上级
/// - 其他路径：原样返回（可能已经是宿主机路径）
///
/// # 参数
///
/// * `media_ref` - 任务参数中的媒体引用
/// * `media_root` - 配置的媒体根目录
pub fn resolve_media_path(media_ref: &str, media_root: &Path) -> Option<PathBuf> {
    if media_ref.is_empty() {
        return None;
    }

    if !media_ref.contains('/') && !media_ref.contains('\\') {
        return Some(media_root.join(media_ref));
    }

    let normalized = media_ref.replace('\\', "/");
    if let Some(relative) = normalized.strip_prefix("/app/") {
        // 容器内的 /app 对应媒体根目录的上级
        let base = media_root.parent().unwrap_or(media_root);
        return Some(base.join(relative));
    }

    Some(PathBuf::from(media_ref))
}
