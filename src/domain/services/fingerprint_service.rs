// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::account::Fingerprint;
use crate::domain::repositories::fingerprint_repository::FingerprintRepository;
use crate::domain::repositories::task_repository::RepositoryError;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const ANDROID_VERSIONS: &[u32] = &[29, 30, 31, 32, 33, 34];

const MANUFACTURERS: &[(&str, &[&str])] = &[
    (
        "Samsung",
        &[
            "Galaxy S22",
            "Galaxy S23",
            "Galaxy S24",
            "Galaxy A54",
            "Galaxy Ultra S23",
        ],
    ),
    (
        "Xiaomi",
        &["Mi 12", "Mi 13", "Redmi Note 12", "Redmi Note 13", "POCO F5"],
    ),
    ("Google", &["Pixel 7", "Pixel 7 Pro", "Pixel 8", "Pixel 8 Pro"]),
    ("OnePlus", &["OnePlus 10 Pro", "OnePlus 11", "OnePlus 12"]),
    ("Oppo", &["Find X6", "Reno 10", "A98"]),
    ("Vivo", &["X90", "V27", "Y100"]),
];

const RESOLUTIONS: &[&str] = &["1080x2400", "1440x3120", "1080x2340", "1440x2560"];

// Stable app version and version-code pairs (late 2024 builds).
const STABLE_VERSIONS: &[(&str, &str)] = &[
    ("316.0.0.38.109", "561498679"),
    ("323.0.0.37.108", "582522774"),
    ("330.0.0.38.107", "603812733"),
];

/// 生成一份随机的模拟安卓设备档案
///
/// 厂商、机型、系统版本、分辨率与应用版本均来自固定池，
/// 设备ID与手机ID每次随机生成。
pub fn generate_device_profile<R: Rng + ?Sized>(rng: &mut R) -> (String, serde_json::Value) {
    let (manufacturer, models) = MANUFACTURERS.choose(rng).copied().unwrap_or(("Samsung", &[]));
    let model = models.choose(rng).copied().unwrap_or("Generic Model");
    let android_version = ANDROID_VERSIONS.choose(rng).copied().unwrap_or(33);
    let android_release = rng.random_range(11..=14).to_string();
    let resolution = RESOLUTIONS.choose(rng).copied().unwrap_or("1080x2400");
    let (app_version, version_code) = STABLE_VERSIONS
        .choose(rng)
        .copied()
        .unwrap_or(("330.0.0.38.107", "603812733"));
    let device_codename = model.to_lowercase().replace(' ', "_");

    let user_agent = format!(
        "Instagram {} Android ({}/{}; 440dpi; {}; {}; {}; {}; qcom; en_US; {})",
        app_version,
        android_version,
        android_release,
        resolution,
        manufacturer,
        model,
        device_codename,
        version_code
    );

    let device = json!({
        "app_version": app_version,
        "android_version": android_version,
        "android_release": android_release,
        "dpi": "440dpi",
        "resolution": resolution,
        "manufacturer": manufacturer,
        "model": model,
        "device": device_codename,
        "cpu": "qcom",
        "version_code": version_code,
        "device_id": Uuid::new_v4().to_string(),
        "phone_id": Uuid::new_v4().to_string(),
        "timezone_offset": rng.random_range(-12i64..=12) * 3600,
    });

    (user_agent, device)
}

/// 设备指纹服务
///
/// 账号导入时为每个账号生成一次设备档案并持久化，之后跨会话复用。
pub struct FingerprintService {
    fingerprint_repo: Arc<dyn FingerprintRepository>,
}

impl FingerprintService {
    /// 创建设备指纹服务
    pub fn new(fingerprint_repo: Arc<dyn FingerprintRepository>) -> Self {
        Self { fingerprint_repo }
    }

    /// 为租户生成并持久化一份新指纹
    pub async fn create_fingerprint(
        &self,
        tenant_id: Uuid,
    ) -> Result<Fingerprint, RepositoryError> {
        let (user_agent, device) = generate_device_profile(&mut rand::rng());
        debug!(
            manufacturer = device.get("manufacturer").and_then(|v| v.as_str()),
            model = device.get("model").and_then(|v| v.as_str()),
            "generated device profile"
        );
        let fingerprint = Fingerprint::new(tenant_id, user_agent, device);
        self.fingerprint_repo.create(&fingerprint).await
    }

    /// 根据ID查找指纹
    pub async fn get_fingerprint(
        &self,
        id: Uuid,
    ) -> Result<Option<Fingerprint>, RepositoryError> {
        self.fingerprint_repo.find_by_id(id).await
    }
}
