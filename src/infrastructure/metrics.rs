// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

pub const TASKS_DISPATCHED: &str = "trigger_task_dispatched_total";
pub const TASKS_SUCCEEDED: &str = "trigger_task_succeeded_total";
pub const TASKS_FAILED: &str = "trigger_task_failed_total";
pub const TASKS_MISSING_HANDLER: &str = "trigger_task_missing_handler_total";
pub const RETENTION_DELETED: &str = "trigger_task_retention_deleted_total";

/// 安装Prometheus导出器并注册指标说明
///
/// 地址无法解析时返回错误；端口被占用时只记录警告。
pub fn init_metrics(listen_addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = listen_addr.parse()?;

    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!("Failed to install Prometheus recorder: {}. This might happen if the port is already in use.", e);
        return Ok(());
    }

    describe_counter!(TASKS_DISPATCHED, "Tasks submitted to the worker pool");
    describe_counter!(TASKS_SUCCEEDED, "Tasks whose handler committed");
    describe_counter!(TASKS_FAILED, "Tasks whose handler failed or panicked");
    describe_counter!(
        TASKS_MISSING_HANDLER,
        "Tasks skipped because no handler is registered"
    );
    describe_counter!(RETENTION_DELETED, "Finished tasks removed by retention");

    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

pub fn record_dispatched() {
    counter!(TASKS_DISPATCHED).increment(1);
}

pub fn record_outcome(task_type: &str, succeeded: bool) {
    let name = if succeeded { TASKS_SUCCEEDED } else { TASKS_FAILED };
    counter!(name, "task_type" => task_type.to_string()).increment(1);
}

pub fn record_missing_handler(task_type: &str) {
    counter!(TASKS_MISSING_HANDLER, "task_type" => task_type.to_string()).increment(1);
}

pub fn record_retention_deleted(rows: u64) {
    counter!(RETENTION_DELETED).increment(rows);
}
