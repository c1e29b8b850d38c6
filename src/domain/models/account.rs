// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 自动化账号实体
///
/// 表示一个外部平台身份，持有加密的凭据、可选的两步验证种子、
/// 分配的出站代理（以URL字符串冗余存储，非外键）、设备指纹引用
/// 和缓存的会话材料。核心引擎只读写其中的一小部分字段：
/// status、proxy、session 和 last_error。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// 账号唯一标识符
    pub id: Uuid,
    /// 所属租户ID
    pub tenant_id: Uuid,
    /// 平台用户名
    pub username: String,
    /// 加密后的密码
    pub password_encrypted: Option<String>,
    /// 两步验证种子（base32，可能含空格或连字符）
    pub seed_2fa: Option<String>,
    /// 登录方式
    pub login_method: LoginMethod,
    /// 分配的代理URL，按字符串匹配 ProxyTemplate，非外键
    pub proxy: Option<String>,
    /// 设备指纹ID
    pub fingerprint_id: Option<Uuid>,
    /// 缓存的会话材料，含会话标识符
    pub session: Option<serde_json::Value>,
    /// 账号状态
    pub status: AccountStatus,
    /// 最近一次错误原因
    pub last_error: Option<String>,
    /// 是否为校验账号，每个租户至多一个
    pub is_checker: bool,
    /// 最近一次成功登录时间
    pub last_login: Option<DateTime<FixedOffset>>,
    /// 创建时间
    pub created_at: DateTime<FixedOffset>,
    /// 更新时间
    pub updated_at: DateTime<FixedOffset>,
}

/// 登录方式枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoginMethod {
    /// 仅密码
    #[default]
    Password,
    /// 密码 + TOTP两步验证
    TwoFactor,
    /// 仅导入的会话Cookie
    Cookies,
}

impl fmt::Display for LoginMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LoginMethod::Password => write!(f, "password"),
            LoginMethod::TwoFactor => write!(f, "two_factor"),
            LoginMethod::Cookies => write!(f, "cookies"),
        }
    }
}

impl FromStr for LoginMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "password" => Ok(LoginMethod::Password),
            "two_factor" => Ok(LoginMethod::TwoFactor),
            "cookies" => Ok(LoginMethod::Cookies),
            _ => Err(()),
        }
    }
}

/// 账号状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// 从未登录或会话已清除
    #[default]
    Offline,
    /// 登录进行中
    Authenticating,
    /// 会话有效
    Active,
    /// 平台要求人工验证，自动化终止
    Challenge,
    /// 最近一次登录失败
    Failed,
    /// 平台侧已停用
    Inactive,
    /// 平台侧已封禁
    Banned,
}

impl AccountStatus {
    /// 判断账号是否处于可直接复用会话的状态
    pub fn is_active(&self) -> bool {
        matches!(self, AccountStatus::Active)
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AccountStatus::Offline => write!(f, "offline"),
            AccountStatus::Authenticating => write!(f, "authenticating"),
            AccountStatus::Active => write!(f, "active"),
            AccountStatus::Challenge => write!(f, "challenge"),
            AccountStatus::Failed => write!(f, "failed"),
            AccountStatus::Inactive => write!(f, "inactive"),
            AccountStatus::Banned => write!(f, "banned"),
        }
    }
}

impl FromStr for AccountStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "offline" => Ok(AccountStatus::Offline),
            "authenticating" => Ok(AccountStatus::Authenticating),
            "active" => Ok(AccountStatus::Active),
            "challenge" => Ok(AccountStatus::Challenge),
            "failed" => Ok(AccountStatus::Failed),
            "inactive" => Ok(AccountStatus::Inactive),
            "banned" => Ok(AccountStatus::Banned),
            _ => Err(()),
        }
    }
}

impl Account {
    /// 从缓存的会话材料中取出会话标识符
    ///
    /// 贪婪会话复用路径使用该标识符做快速恢复登录
    pub fn session_id(&self) -> Option<String> {
        self.session
            .as_ref()
            .and_then(|s| s.get("sessionid"))
            .and_then(|v| v.as_str())
            .map(str::to_owned)
    }
}

/// 设备指纹实体
///
/// 每个账号生成一次的模拟设备档案，跨会话复用。
/// 包含 user agent、屏幕分辨率、系统版本与应用版本，
/// 完整的设备参数以JSON形式保存。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fingerprint {
    /// 指纹唯一标识符
    pub id: Uuid,
    /// 所属租户ID
    pub tenant_id: Uuid,
    /// User-Agent字符串
    pub user_agent: String,
    /// 应用版本
    pub app_version: Option<String>,
    /// 操作系统版本
    pub os_version: Option<String>,
    /// 屏幕分辨率
    pub screen_resolution: Option<String>,
    /// 完整设备参数（厂商、机型、dpi、设备ID等）
    pub device: serde_json::Value,
    /// 创建时间
    pub created_at: DateTime<FixedOffset>,
}

impl Fingerprint {
    /// 创建指纹实体
    pub fn new(tenant_id: Uuid, user_agent: String, device: serde_json::Value) -> Self {
        let app_version = device
            .get("app_version")
            .and_then(|v| v.as_str())
            .map(str::to_owned);
        let os_version = device
            .get("android_release")
            .and_then(|v| v.as_str())
            .map(|r| format!("Android {}", r));
        let screen_resolution = device
            .get("resolution")
            .and_then(|v| v.as_str())
            .map(str::to_owned);

        Self {
            id: Uuid::new_v4(),
            tenant_id,
            user_agent,
            app_version,
            os_version,
            screen_resolution,
            device,
            created_at: Utc::now().into(),
        }
    }
}
