// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::account::{Account, Fingerprint};
use crate::providers::traits::{
    LoginCredentials, ProviderClient, ProviderClientFactory, ProviderError, SessionProbe,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// 提供方网关REST客户端
///
/// 默认的 ProviderClient 实现，经由内部部署的协议网关与外部
/// 平台通信。网关封装了具体的私有协议；本客户端只负责按账号
/// 配置出站代理与设备身份，并把网关错误映射到统一的错误分类。
pub struct RestProviderClient {
    http: reqwest::Client,
    base_url: String,
    proxy: Option<String>,
    timeout: Duration,
    user_agent: Option<String>,
    device: Option<Value>,
    session: Value,
}

impl RestProviderClient {
    /// 创建客户端
    ///
    /// # 参数
    ///
    /// * `base_url` - 网关地址
    /// * `proxy` - 账号分配的出站代理URL
    /// * `timeout` - 单请求超时
    pub fn new(
        base_url: String,
        proxy: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = Self::build_http(&proxy, None, timeout)?;
        Ok(Self {
            http,
            base_url,
            proxy,
            timeout,
            user_agent: None,
            device: None,
            session: Value::Null,
        })
    }

    /// 加载缓存的会话材料
    pub fn load_session(&mut self, session: Value) {
        self.session = session;
    }

    fn build_http(
        proxy: &Option<String>,
        user_agent: Option<&str>,
        timeout: Duration,
    ) -> Result<reqwest::Client, ProviderError> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .cookie_store(true);

        if let Some(proxy_url) = proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| ProviderError::Transport(format!("invalid proxy url: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        if let Some(ua) = user_agent {
            builder = builder.user_agent(ua.to_string());
        }

        builder
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))
    }

    /// 调用网关并把响应映射到统一错误分类
    async fn call(&self, path: &str, body: Value) -> Result<Value, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.post(&url).json(&body);
        if let Some(session_id) = self.session.get("sessionid").and_then(Value::as_str) {
            request = request.header("X-Session-Id", session_id);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let payload: Value = response.json().await.unwrap_or(Value::Null);

        if status.is_success() {
            return Ok(payload);
        }

        let message = payload
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| format!("gateway returned {}", status));

        Err(map_gateway_error(status, &message))
    }
}

/// 网关错误码到错误分类的映射
fn map_gateway_error(status: StatusCode, message: &str) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED => ProviderError::LoginRequired(message.to_string()),
        StatusCode::FORBIDDEN => {
            // 403 既可能是风控验证也可能是账号停用，按文本细分
            ProviderError::from_message(message)
        }
        StatusCode::TOO_MANY_REQUESTS => ProviderError::Blocked(message.to_string()),
        StatusCode::PROXY_AUTHENTICATION_REQUIRED => ProviderError::ProxyAuth(message.to_string()),
        _ => ProviderError::from_message(message),
    }
}

fn map_transport_error(e: reqwest::Error) -> ProviderError {
    let text = e.to_string();
    if e.is_timeout() {
        ProviderError::Transport(format!("request timed out: {}", text))
    } else if e.is_connect() {
        // 代理认证失败与连接重置都表现为连接错误，按文本细分
        ProviderError::from_message(&text)
    } else {
        ProviderError::Transport(text)
    }
}

#[async_trait]
impl ProviderClient for RestProviderClient {
    async fn login(
        &mut self,
        credentials: &LoginCredentials,
    ) -> Result<Value, ProviderError> {
        debug!(username = %credentials.username, "Performing full login via gateway");
        let payload = self
            .call(
                "/v1/login",
                json!({
                    "username": credentials.username,
                    "password": credentials.password,
                    "verification_code": credentials.verification_code,
                    "user_agent": self.user_agent,
                    "device": self.device,
                }),
            )
            .await?;

        let session = payload.get("session").cloned().unwrap_or(Value::Null);
        if session.is_null() {
            return Err(ProviderError::Other("login returned no session".into()));
        }
        self.session = session.clone();
        Ok(session)
    }

    async fn resume_session(&mut self, session_id: &str) -> Result<Value, ProviderError> {
        let payload = self
            .call("/v1/session/resume", json!({ "session_id": session_id }))
            .await?;

        let session = payload
            .get("session")
            .cloned()
            .unwrap_or_else(|| self.session.clone());
        self.session = session.clone();
        Ok(session)
    }

    async fn check_session(&mut self) -> Result<SessionProbe, ProviderError> {
        match self.call("/v1/session/check", json!({})).await {
            Ok(_) => Ok(SessionProbe::Valid),
            Err(ProviderError::LoginRequired(_)) => Ok(SessionProbe::Expired),
            Err(e) => Err(e),
        }
    }

    async fn warmup(&mut self) -> Result<(), ProviderError> {
        // 时间线是标准的首页动作，风险最低
        self.call("/v1/feed/timeline", json!({})).await.map(|_| ())
    }

    fn apply_fingerprint(&mut self, fingerprint: &Fingerprint) {
        self.user_agent = Some(fingerprint.user_agent.clone());
        self.device = Some(fingerprint.device.clone());
        match Self::build_http(&self.proxy, self.user_agent.as_deref(), self.timeout) {
            Ok(http) => self.http = http,
            Err(e) => warn!("Failed to rebuild client with fingerprint: {}", e),
        }
    }

    async fn reconnect(&mut self) -> Result<(), ProviderError> {
        self.session = Value::Null;
        self.http = Self::build_http(&self.proxy, self.user_agent.as_deref(), self.timeout)?;
        Ok(())
    }

    async fn post_photo(
        &mut self,
        media_path: &str,
        caption: &str,
        share_to_threads: bool,
    ) -> Result<(), ProviderError> {
        self.call(
            "/v1/media/photo",
            json!({
                "media_path": media_path,
                "caption": caption,
                "share_to_threads": share_to_threads,
            }),
        )
        .await
        .map(|_| ())
    }

    async fn post_reel(
        &mut self,
        media_path: &str,
        caption: &str,
        share_to_threads: bool,
    ) -> Result<(), ProviderError> {
        self.call(
            "/v1/media/reel",
            json!({
                "media_path": media_path,
                "caption": caption,
                "share_to_threads": share_to_threads,
            }),
        )
        .await
        .map(|_| ())
    }

    async fn post_story(
        &mut self,
        media_path: &str,
        caption: &str,
        link: Option<&str>,
    ) -> Result<(), ProviderError> {
        self.call(
            "/v1/media/story",
            json!({
                "media_path": media_path,
                "caption": caption,
                "link": link,
            }),
        )
        .await
        .map(|_| ())
    }

    async fn media_id_from_code(&mut self, shortcode: &str) -> Result<String, ProviderError> {
        let payload = self
            .call("/v1/media/id-from-code", json!({ "shortcode": shortcode }))
            .await?;
        extract_id(&payload, "media_id")
    }

    async fn media_id_from_url(&mut self, url: &str) -> Result<String, ProviderError> {
        let payload = self
            .call("/v1/media/id-from-url", json!({ "url": url }))
            .await?;
        extract_id(&payload, "media_id")
    }

    async fn media_info(&mut self, media_id: &str) -> Result<(), ProviderError> {
        self.call("/v1/media/info", json!({ "media_id": media_id }))
            .await
            .map(|_| ())
    }

    async fn like_media(&mut self, media_id: &str) -> Result<(), ProviderError> {
        self.call("/v1/media/like", json!({ "media_id": media_id }))
            .await
            .map(|_| ())
    }

    async fn user_id_from_username(&mut self, username: &str) -> Result<String, ProviderError> {
        let payload = self
            .call("/v1/users/id-from-username", json!({ "username": username }))
            .await?;
        extract_id(&payload, "user_id")
    }

    async fn recent_media(
        &mut self,
        user_id: &str,
        count: u32,
    ) -> Result<Vec<String>, ProviderError> {
        let payload = self
            .call(
                "/v1/users/recent-media",
                json!({ "user_id": user_id, "count": count }),
            )
            .await?;
        Ok(payload
            .get("media_ids")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn follow_user(&mut self, user_id: &str) -> Result<(), ProviderError> {
        self.call("/v1/users/follow", json!({ "user_id": user_id }))
            .await
            .map(|_| ())
    }

    async fn story_id_from_url(&mut self, url: &str) -> Result<String, ProviderError> {
        let payload = self
            .call("/v1/stories/id-from-url", json!({ "url": url }))
            .await?;
        extract_id(&payload, "story_id")
    }

    async fn view_story(&mut self, story_id: &str) -> Result<(), ProviderError> {
        self.call("/v1/stories/seen", json!({ "story_ids": [story_id] }))
            .await
            .map(|_| ())
    }

    fn session_settings(&self) -> Value {
        self.session.clone()
    }
}

fn extract_id(payload: &Value, key: &str) -> Result<String, ProviderError> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| ProviderError::Other(format!("gateway response missing {}", key)))
}

/// REST客户端工厂
///
/// 为每次执行构建一个按账号配置的客户端：先设置代理，再加载
/// 缓存的会话材料。指纹由会话管理器在未复用会话时单独应用。
pub struct RestProviderFactory {
    base_url: String,
    timeout: Duration,
}

impl RestProviderFactory {
    /// 创建工厂
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self { base_url, timeout }
    }
}

impl ProviderClientFactory for RestProviderFactory {
    fn create(&self, account: &Account) -> Result<Box<dyn ProviderClient>, ProviderError> {
        let mut client = RestProviderClient::new(
            self.base_url.clone(),
            account.proxy.clone(),
            self.timeout,
        )?;
        if let Some(session) = &account.session {
            client.load_session(session.clone());
        }
        Ok(Box::new(client))
    }
}
