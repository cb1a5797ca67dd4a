//! 统一可观测性模块
//!
//! 提供 logging 与 metrics 的统一初始化。
//! 进程入口调用一次 [`init`]，其余代码只通过 `tracing` 宏与 [`metrics`] 子模块中的辅助函数记录。

pub mod metrics;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;

use crate::config::ObservabilityConfig;

/// 统一初始化可观测性
///
/// 初始化顺序：
/// 1. Tracing（日志）
/// 2. Metrics（Prometheus 指标，按配置启用）
///
/// # Example
///
/// ```ignore
/// use market_shared::config::AppConfig;
/// use market_shared::observability;
///
/// let config = AppConfig::load("notification-dispatcher")?;
/// observability::init(&config.service_name, &config.observability)?;
/// ```
pub fn init(service_name: &str, config: &ObservabilityConfig) -> Result<()> {
    tracing::init(config)?;

    if config.metrics_enabled {
        metrics::init(service_name, config.metrics_port)?;
    }

    info!(
        service = %service_name,
        metrics_enabled = config.metrics_enabled,
        metrics_port = config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}
