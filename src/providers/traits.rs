// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::account::{Account, Fingerprint};
use async_trait::async_trait;
use thiserror::Error;

/// 提供方错误类型
///
/// 按重试语义分类的错误分类法。执行器是唯一的分类边界：
/// 它根据该分类决定有界重试、视为成功或立即终止。
#[derive(Error, Debug)]
pub enum ProviderError {
    /// 会话失效，需要重连并强制完整登录后重试一次
    #[error("login required: {0}")]
    LoginRequired(String),

    /// 平台要求人工验证，终止且不重试
    #[error("challenge required: {0}")]
    ChallengeRequired(String),

    /// 需要两步验证码（首次提交被拒时重新生成一次）
    #[error("two factor code required")]
    TwoFactorRequired,

    /// 账号在平台侧被停用，终止并翻转账号状态
    #[error("account disabled upstream: {0}")]
    AccountDisabled(String),

    /// 触发限流或风控拦截，终止
    #[error("rate limited or blocked: {0}")]
    Blocked(String),

    /// 代理认证被拒绝，终止
    #[error("proxy authentication failed: {0}")]
    ProxyAuth(String),

    /// 无害的响应模式校验噪音，视为成功
    #[error("schema validation noise: {0}")]
    Benign(String),

    /// 连接被重置（EOF类），延迟后重试一次
    #[error("connection reset: {0}")]
    ConnectionReset(String),

    /// 传输层错误
    #[error("transport error: {0}")]
    Transport(String),

    /// 其他未识别的错误
    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    /// 根据错误文本对未分类错误归类
    ///
    /// 提供方网关返回的错误信息并不总携带结构化类别，
    /// 与原始异常文本的匹配模式保持一致。
    pub fn from_message(msg: &str) -> Self {
        let lower = msg.to_lowercase();
        if lower.contains("login_required") || lower.contains("login required") {
            ProviderError::LoginRequired(msg.to_string())
        } else if lower.contains("challenge") || lower.contains("checkpoint") {
            ProviderError::ChallengeRequired(msg.to_string())
        } else if lower.contains("two_factor") || lower.contains("2fa required") {
            ProviderError::TwoFactorRequired
        } else if lower.contains("this user is inactive") || lower.contains("user inactive") {
            ProviderError::AccountDisabled(msg.to_string())
        } else if lower.contains("socks5 authentication failed")
            || lower.contains("proxy authentication")
        {
            ProviderError::ProxyAuth(msg.to_string())
        } else if lower.contains("validation error") || lower.contains("field required") {
            ProviderError::Benign(msg.to_string())
        } else if lower.contains("eof") || lower.contains("connection reset") {
            ProviderError::ConnectionReset(msg.to_string())
        } else if lower.contains("blacklist")
            || lower.contains("feedback_required")
            || lower.contains("429")
        {
            ProviderError::Blocked(msg.to_string())
        } else {
            ProviderError::Other(msg.to_string())
        }
    }
}

/// 登录凭据
#[derive(Debug, Clone)]
pub struct LoginCredentials {
    /// 平台用户名
    pub username: String,
    /// 密码
    pub password: String,
    /// 两步验证码（可选）
    pub verification_code: Option<String>,
}

/// 会话探测结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionProbe {
    /// 会话有效
    Valid,
    /// 会话已过期，需要重新登录
    Expired,
}

/// 提供方动作客户端特质
///
/// 对外部社交平台的能力接口抽象。具体协议实现不属于核心，
/// 核心只依赖该接口。所有调用从执行器视角是同步的，由tokio
/// 在独立执行单元内承载，不会阻塞调度循环。
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// 使用凭据执行完整登录，返回可持久化的会话材料
    async fn login(&mut self, credentials: &LoginCredentials)
        -> Result<serde_json::Value, ProviderError>;

    /// 使用缓存的会话标识符快速恢复登录（贪婪复用路径）
    async fn resume_session(
        &mut self,
        session_id: &str,
    ) -> Result<serde_json::Value, ProviderError>;

    /// 廉价的只读探测，验证当前会话是否可用
    async fn check_session(&mut self) -> Result<SessionProbe, ProviderError>;

    /// 预热：一次无害的只读请求，用于在高风险动作前稳定会话
    async fn warmup(&mut self) -> Result<(), ProviderError>;

    /// 应用模拟设备档案（user agent与设备参数）
    ///
    /// 只应在未复用会话时调用：在已恢复的会话上套用新设备
    /// 会造成设备/会话不匹配并触发额外验证
    fn apply_fingerprint(&mut self, fingerprint: &Fingerprint);

    /// 完全重建内部状态，清除所有缓存的连接与会话残留
    async fn reconnect(&mut self) -> Result<(), ProviderError>;

    /// 发布图文帖子
    async fn post_photo(
        &mut self,
        media_path: &str,
        caption: &str,
        share_to_threads: bool,
    ) -> Result<(), ProviderError>;

    /// 发布短视频
    async fn post_reel(
        &mut self,
        media_path: &str,
        caption: &str,
        share_to_threads: bool,
    ) -> Result<(), ProviderError>;

    /// 发布限时动态，可附带外部链接
    async fn post_story(
        &mut self,
        media_path: &str,
        caption: &str,
        link: Option<&str>,
    ) -> Result<(), ProviderError>;

    /// 从短码解析媒体ID（离线计算，不产生额外请求）
    async fn media_id_from_code(&mut self, shortcode: &str) -> Result<String, ProviderError>;

    /// 从完整URL解析媒体ID（短码提取失败时的回退路径）
    async fn media_id_from_url(&mut self, url: &str) -> Result<String, ProviderError>;

    /// 预读媒体信息，模拟真实浏览行为；失败不致命
    async fn media_info(&mut self, media_id: &str) -> Result<(), ProviderError>;

    /// 点赞媒体
    async fn like_media(&mut self, media_id: &str) -> Result<(), ProviderError>;

    /// 从用户名解析用户ID（相当于访问对方主页）
    async fn user_id_from_username(&mut self, username: &str) -> Result<String, ProviderError>;

    /// 获取用户最近的媒体ID列表
    async fn recent_media(
        &mut self,
        user_id: &str,
        count: u32,
    ) -> Result<Vec<String>, ProviderError>;

    /// 关注用户
    async fn follow_user(&mut self, user_id: &str) -> Result<(), ProviderError>;

    /// 从动态URL解析动态ID
    async fn story_id_from_url(&mut self, url: &str) -> Result<String, ProviderError>;

    /// 浏览动态
    async fn view_story(&mut self, story_id: &str) -> Result<(), ProviderError>;

    /// 导出当前会话材料用于持久化
    fn session_settings(&self) -> serde_json::Value;
}

/// 提供方客户端工厂特质
///
/// 为每次任务执行构建一个按账号配置好的客户端：
/// 先设置出站代理（保证一致的网络环境），再加载缓存的会话材料。
/// 设备指纹由会话管理器在确认未复用会话后单独应用。
pub trait ProviderClientFactory: Send + Sync {
    /// 创建客户端实例
    fn create(
        &self,
        account: &Account,
    ) -> Result<Box<dyn ProviderClient>, ProviderError>;
}
