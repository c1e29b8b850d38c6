// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 安装 Prometheus 指标导出器
///
/// 导出器在独立的监听地址上提供拉取端点，与业务 HTTP 服务分开。
/// 地址无效或端口被占用时仅告警，不中断进程启动。
pub fn init_metrics(listen_addr: &str) {
    let addr: SocketAddr = match listen_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("metrics listen address '{}' is invalid: {}", listen_addr, e);
            return;
        }
    };

    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => info!("Metrics exporter listening on {}", addr),
        Err(e) => warn!("Prometheus exporter not started: {}", e),
    }
}
