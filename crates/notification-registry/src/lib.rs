//! 进程内通知注册表
//!
//! 提供可复用的通知管理能力，支持：
//! - 通知和通知渠道的可见性控制
//! - 按上下文隔离的通知管理器
//! - 全局可见计数（订阅式更新）
//! - 内置系统通知目录

pub mod channel;
pub mod context;
mod counter;
pub mod error;
pub mod events;
pub mod icon;
pub mod manager;
pub mod notification;
pub mod service;
pub mod system;
pub mod test_utils;

pub use channel::{DEFAULT_CHANNEL_ID, NotificationChannel};
pub use context::ManagerContext;
pub use error::{NotificationError, Result};
pub use events::RegistryEvent;
pub use icon::{BitmapIcon, Icon, IconResource};
pub use manager::{ChannelSnapshot, NotificationManager, NotificationManagerSnapshot};
pub use notification::{Notification, NotificationBuilder, NotificationView};
pub use service::NotificationsService;
pub use system::SystemNotificationId;
