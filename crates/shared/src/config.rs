//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

use crate::observability::ObservabilityConfig;

/// 单条系统通知的种子配置
///
/// 标题和正文属于本地化资源，由宿主程序通过配置提供；
/// `id` 对应注册表中系统通知目录的 snake_case 名称。
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SystemNotificationConfig {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// 初始可见性（系统通知默认隐藏）
    #[serde(default)]
    pub visible: bool,
}

/// 注册表配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// 系统通知专用渠道 ID
    pub system_channel_id: String,
    /// 系统通知专用渠道显示名称
    pub system_channel_name: String,
    /// 注册表事件广播缓冲区大小，慢订阅者超过该长度后会丢失最旧的事件
    pub event_capacity: usize,
    /// 系统通知种子表覆盖项
    pub system_notifications: Vec<SystemNotificationConfig>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            system_channel_id: "System".to_string(),
            system_channel_name: "System".to_string(),
            event_capacity: 256,
            system_notifications: Vec::new(),
        }
    }
}

impl RegistryConfig {
    /// 查找指定系统通知的种子覆盖项
    pub fn system_notification(&self, id: &str) -> Option<&SystemNotificationConfig> {
        self.system_notifications.iter().find(|n| n.id == id)
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub registry: RegistryConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. 环境变量（NOTICE_ 前缀，层级用双下划线分隔，如 NOTICE_REGISTRY__EVENT_CAPACITY -> registry.event_capacity）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
        Self::load_from_dir(service_name, Path::new(&config_dir))
    }

    /// 从指定目录加载配置，目录或文件不存在时使用默认值
    pub fn load_from_dir(service_name: &str, config_dir: &Path) -> Result<Self, ConfigError> {
        let env = std::env::var("NOTICE_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = Config::builder()
            // 默认配置
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .set_default("observability.service_name", service_name)?
            // 加载默认配置文件
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // 加载环境特定配置
            .add_source(File::from(config_dir.join(format!("{}.toml", env))).required(false))
            // 环境变量覆盖（NOTICE_REGISTRY__SYSTEM_CHANNEL_ID -> registry.system_channel_id）
            .add_source(
                Environment::with_prefix("NOTICE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 从 TOML 文本加载配置（宿主程序内嵌配置或测试使用）
    pub fn from_toml_str(service_name: &str, toml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("service_name", service_name)?
            .set_default("observability.service_name", service_name)?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
