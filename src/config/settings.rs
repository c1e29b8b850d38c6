// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 包含数据库、服务器、调度执行、提供方网关、代理分配
/// 与批量登录等所有配置项
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 服务器配置
    pub server: ServerSettings,
    /// 调度与执行配置
    pub worker: WorkerSettings,
    /// 提供方网关配置
    pub provider: ProviderSettings,
    /// 代理分配配置
    pub proxy: ProxySettings,
    /// 批量登录配置
    pub bulk_login: BulkLoginSettings,
    /// 可观测性配置
    pub telemetry: TelemetrySettings,
}

/// 数据库配置设置
#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// 服务器配置设置
#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 调度与执行配置设置
#[derive(Debug, Deserialize)]
pub struct WorkerSettings {
    /// 同时执行的任务数上限
    pub concurrency: usize,
    /// 调度器扫描间隔（秒）
    pub poll_interval_secs: u64,
    /// 媒体文件根目录
    pub media_path: String,
}

/// 提供方网关配置设置
#[derive(Debug, Deserialize)]
pub struct ProviderSettings {
    /// 网关地址
    pub gateway_url: String,
    /// 单请求超时（秒）
    pub request_timeout_secs: u64,
}

/// 代理分配配置设置
#[derive(Debug, Deserialize)]
pub struct ProxySettings {
    /// 每个代理URL的默认账号容量
    pub default_max_accounts_per_proxy: u32,
}

/// 批量登录配置设置
#[derive(Debug, Deserialize)]
pub struct BulkLoginSettings {
    /// 错峰最小延迟（秒）
    pub min_delay_secs: u64,
    /// 错峰最大延迟（秒）
    pub max_delay_secs: u64,
    /// 每批账号数
    pub batch_size: usize,
    /// 已完成作业在注册表中的保留时间（秒）
    pub job_ttl_secs: u64,
}

/// 可观测性配置设置
#[derive(Debug, Deserialize)]
pub struct TelemetrySettings {
    /// 指标导出器监听地址
    pub metrics_addr: String,
    /// 未设置 RUST_LOG 时使用的日志过滤器
    pub log_filter: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从配置文件与环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Start with default settings
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            // Default DB pool settings
            .set_default("database.max_connections", 100)?
            .set_default("database.min_connections", 10)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Default worker settings
            .set_default("worker.concurrency", 5)?
            .set_default("worker.poll_interval_secs", 10)?
            .set_default("worker.media_path", "./media")?
            // Default provider gateway settings
            .set_default("provider.gateway_url", "http://127.0.0.1:8700")?
            .set_default("provider.request_timeout_secs", 120)?
            // Default proxy allocation settings
            .set_default("proxy.default_max_accounts_per_proxy", 3)?
            // Default bulk login settings
            .set_default("bulk_login.min_delay_secs", 30)?
            .set_default("bulk_login.max_delay_secs", 120)?
            .set_default("bulk_login.batch_size", 5)?
            .set_default("bulk_login.job_ttl_secs", 3600)?
            // Default telemetry settings
            .set_default("telemetry.metrics_addr", "0.0.0.0:9000")?
            .set_default("telemetry.log_filter", "info,postrs=debug")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("POSTRS").separator("__"));

        builder.build()?.try_deserialize()
    }
}
