//! 通知注册表错误类型

use thiserror::Error;

use crate::system::SystemNotificationId;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("无效的参数: {field} - {message}")]
    InvalidArgument { field: String, message: String },

    #[error("通知渠道未找到: channel_id={channel_id:?}")]
    ChannelNotFound { channel_id: String },

    #[error("通知已发布到其他管理器或其他 id: id={id}")]
    AlreadyPublished { id: i32 },

    #[error("通知渠道已注册到其他管理器: channel_id={channel_id}")]
    ChannelInUse { channel_id: String },

    #[error("系统通知未找到: {0}")]
    SystemNotificationNotFound(SystemNotificationId),

    #[error("全局通知服务已初始化")]
    AlreadyInitialized,
}

pub type Result<T> = std::result::Result<T, NotificationError>;

impl NotificationError {
    pub(crate) fn invalid_argument(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::ChannelNotFound { .. } => "CHANNEL_NOT_FOUND",
            Self::AlreadyPublished { .. } => "ALREADY_PUBLISHED",
            Self::ChannelInUse { .. } => "CHANNEL_IN_USE",
            Self::SystemNotificationNotFound(_) => "SYSTEM_NOTIFICATION_NOT_FOUND",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
        }
    }

    /// 是否属于"未找到"类错误
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ChannelNotFound { .. } | Self::SystemNotificationNotFound(_)
        )
    }
}
