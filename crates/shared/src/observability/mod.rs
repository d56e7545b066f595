//! 统一可观测性模块
//!
//! 提供日志（tracing）与指标（metrics）的统一初始化和管理。
//! 注册表运行在宿主进程内，不自带导出端口：日志写到标准输出，
//! 指标由宿主按需通过 [`metrics::render`] 拉取文本快照。

pub mod metrics;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;
use serde::Deserialize;

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// 服务名称，用于标识日志和指标的来源
    pub service_name: String,

    /// 日志级别（如 "info", "debug"），RUST_LOG 优先
    pub log_level: String,

    /// 是否启用 JSON 格式日志
    pub json_logs: bool,

    /// 是否安装 Prometheus 指标 recorder
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "notification-registry".to_string(),
            log_level: default_log_level(),
            json_logs: false,
            metrics_enabled: true,
        }
    }
}

impl ObservabilityConfig {
    /// 从环境变量加载配置
    pub fn from_env(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| default_log_level()),
            json_logs: std::env::var("JSON_LOGS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        }
    }
}

/// 可观测性资源守卫
///
/// 持有可观测性资源的生命周期，drop 时记录关闭日志。
pub struct ObservabilityGuard {
    service_name: String,
    metrics_installed: bool,
}

impl ObservabilityGuard {
    /// 创建一个空的 Guard（用于测试或禁用可观测性时）
    pub fn empty() -> Self {
        Self {
            service_name: String::new(),
            metrics_installed: false,
        }
    }

    /// 指标 recorder 是否已由本 Guard 安装
    pub fn metrics_installed(&self) -> bool {
        self.metrics_installed
    }
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        if !self.service_name.is_empty() {
            info!(service = %self.service_name, "Shutting down observability...");
        }
    }
}

/// 统一初始化可观测性
///
/// 初始化顺序：
/// 1. Tracing（日志）
/// 2. Metrics（Prometheus recorder，可关闭）
///
/// # Example
///
/// ```ignore
/// use notice_shared::observability::{init, ObservabilityConfig};
///
/// fn main() -> anyhow::Result<()> {
///     let config = ObservabilityConfig::from_env("notification-demo");
///     let _guard = init(&config)?;
///
///     // 应用逻辑...
///
///     Ok(())
/// }
/// ```
pub fn init(config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    tracing::init(config)?;

    let metrics_installed = if config.metrics_enabled {
        metrics::init(&config.service_name)?
    } else {
        false
    };

    info!(
        service = %config.service_name,
        log_level = %config.log_level,
        json_logs = config.json_logs,
        metrics_installed,
        "Observability initialized"
    );

    Ok(ObservabilityGuard {
        service_name: config.service_name.clone(),
        metrics_installed,
    })
}
