//! 注册表变更信号
//!
//! 每个信号只描述"谁的哪个属性变了"，不携带完整的通知内容；
//! 订阅方收到信号后按需重新读取快照。

use serde::Serialize;

/// 注册表事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistryEvent {
    /// 全局可见计数变化
    CountChanged { count: usize },
    /// 已发布通知的可见性变化
    #[serde(rename_all = "camelCase")]
    NotificationVisibilityChanged {
        context: String,
        channel_id: String,
        id: i32,
        visible: bool,
    },
    /// 已发布通知被删除（随即被关闭）
    #[serde(rename_all = "camelCase")]
    NotificationDeleted {
        context: String,
        channel_id: String,
        id: i32,
    },
    /// 已注册渠道的可见性变化
    #[serde(rename_all = "camelCase")]
    ChannelVisibilityChanged {
        context: String,
        channel_id: String,
        visible: bool,
    },
}

impl RegistryEvent {
    /// 发生变化的属性名
    pub fn property(&self) -> &'static str {
        match self {
            Self::CountChanged { .. } => "Count",
            Self::NotificationVisibilityChanged { .. } => "Visible",
            Self::NotificationDeleted { .. } => "Deleted",
            Self::ChannelVisibilityChanged { .. } => "Visible",
        }
    }
}
