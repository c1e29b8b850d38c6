// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use uuid::Uuid;

static HEADER_NAME: &str = "x-tenant-id";

/// 租户标识提取器
///
/// 从 `X-Tenant-Id` 请求头解析租户UUID。所有受保护的接口都以
/// 该租户为作用域，缺失或非法时直接拒绝请求。授权与配额判定
/// 在上游策略层完成，这里假定请求已经过授权。
#[derive(Debug, Clone, Copy)]
pub struct TenantId(pub Uuid);

impl<S> FromRequestParts<S> for TenantId
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tenant_id = parts
            .headers
            .get(HEADER_NAME)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok());

        match tenant_id {
            Some(id) => Ok(TenantId(id)),
            None => {
                let status = axum::http::StatusCode::BAD_REQUEST;
                let body = Json(json!({ "error": "Missing or invalid X-Tenant-Id header" }));
                Err((status, body).into_response())
            }
        }
    }
}
