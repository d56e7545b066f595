//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集。
//! 注册表嵌入在宿主进程中，recorder 只负责聚合，文本快照通过 [`render`] 交给宿主暴露。

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing::{info, warn};

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// 安装 Prometheus recorder
///
/// 进程内只能安装一次全局 recorder；已安装时返回 `Ok(false)`。
pub fn init(service_name: &str) -> Result<bool> {
    if PROMETHEUS_HANDLE.get().is_some() {
        return Ok(false);
    }

    let handle = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            warn!(error = %e, "Prometheus recorder 安装失败，可能已有其他 recorder");
            return Ok(false);
        }
    };

    let _ = PROMETHEUS_HANDLE.set(handle);
    describe_metrics();

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
    info!(service = %service_name, "Prometheus recorder installed");
    Ok(true)
}

/// 注册通知注册表的指标描述
///
/// 这些描述会出现在渲染结果的 HELP 注释中
pub fn describe_metrics() {
    metrics::describe_gauge!(
        "notification_visible_count",
        "Number of visible notifications in visible channels"
    );
    metrics::describe_counter!(
        "notifications_published_total",
        "Total number of notifications published"
    );
    metrics::describe_counter!(
        "notifications_closed_total",
        "Total number of notifications closed"
    );
    metrics::describe_counter!(
        "notification_channels_deleted_total",
        "Total number of notification channels deleted"
    );
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// 渲染当前指标快照，recorder 未安装时返回 None
pub fn render() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录全局可见通知数
#[inline]
pub fn set_visible_count(count: usize) {
    metrics::gauge!("notification_visible_count").set(count as f64);
}

/// 记录通知发布
#[inline]
pub fn record_published(context: &str, channel_id: &str) {
    metrics::counter!(
        "notifications_published_total",
        "context" => context.to_string(),
        "channel" => channel_id.to_string()
    )
    .increment(1);
}

/// 记录通知关闭
#[inline]
pub fn record_closed(context: &str, channel_id: &str, reason: &'static str) {
    metrics::counter!(
        "notifications_closed_total",
        "context" => context.to_string(),
        "channel" => channel_id.to_string(),
        "reason" => reason
    )
    .increment(1);
}

/// 记录渠道删除
#[inline]
pub fn record_channel_deleted(context: &str, channel_id: &str) {
    metrics::counter!(
        "notification_channels_deleted_total",
        "context" => context.to_string(),
        "channel" => channel_id.to_string()
    )
    .increment(1);
}
