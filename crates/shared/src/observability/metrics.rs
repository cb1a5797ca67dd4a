//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 未安装 recorder 时（如单元测试）所有记录函数均为空操作。

use std::net::SocketAddr;

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

/// 安装 Prometheus recorder 并在指定端口暴露 `/metrics`
///
/// 需要在 tokio 运行时内调用。
pub fn init(service_name: &str, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    register_common_metrics(service_name);

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// 注册通用指标描述
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!(
        "notifications_dispatched_total",
        "Total number of notification records by channel and status"
    );
    metrics::describe_counter!(
        "broadcast_recipients_total",
        "Total number of broadcast recipients by outcome"
    );
    metrics::describe_counter!("broadcast_batches_total", "Total number of broadcast batches");
    metrics::describe_histogram!(
        "broadcast_duration_seconds",
        "Broadcast duration in seconds"
    );
    metrics::describe_counter!(
        "channel_sends_total",
        "Total number of channel send attempts by channel and status"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录通知记录写入结果
#[inline]
pub fn record_dispatch(channel: &str, status: &str) {
    metrics::counter!(
        "notifications_dispatched_total",
        "channel" => channel.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录渠道发送结果
#[inline]
pub fn record_channel_send(channel: &str, success: bool) {
    let status = if success { "success" } else { "failed" };
    metrics::counter!(
        "channel_sends_total",
        "channel" => channel.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 记录一次广播的汇总结果
#[inline]
pub fn record_broadcast(
    announcement_type: &str,
    batches: usize,
    success_count: usize,
    failure_count: usize,
    duration_secs: f64,
) {
    metrics::counter!("broadcast_batches_total").increment(batches as u64);
    metrics::counter!("broadcast_recipients_total", "status" => "success")
        .increment(success_count as u64);
    metrics::counter!("broadcast_recipients_total", "status" => "failed")
        .increment(failure_count as u64);
    metrics::histogram!(
        "broadcast_duration_seconds",
        "announcement_type" => announcement_type.to_string()
    )
    .record(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_without_recorder_is_noop() {
        record_dispatch("EMAIL", "recorded");
        record_channel_send("SMS", false);
        record_broadcast("URGENT", 3, 119, 1, 2.5);
    }
}
