//! 系统通知目录
//!
//! 系统通知在服务创建时发布到内部的系统管理器和系统渠道，
//! 以目录中的整数 id 作为管理器 id。系统通知不可删除，初始隐藏，
//! 只能通过 [`crate::NotificationsService::set_system_notif_visibility`] 切换可见性。

use std::collections::HashMap;
use std::fmt;

use notice_shared::config::RegistryConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::channel::NotificationChannel;
use crate::notification::Notification;

/// 系统通知标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemNotificationId {
    /// 光输出诊断
    OpticalOutputDiagnosis,
}

impl SystemNotificationId {
    /// 目录中的全部系统通知
    pub const ALL: [SystemNotificationId; 1] = [SystemNotificationId::OpticalOutputDiagnosis];

    /// 在系统管理器中使用的 id
    pub fn as_i32(self) -> i32 {
        match self {
            Self::OpticalOutputDiagnosis => 0,
        }
    }

    /// 配置中使用的名称
    pub fn key(self) -> &'static str {
        match self {
            Self::OpticalOutputDiagnosis => "optical_output_diagnosis",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.key() == key)
    }

    pub fn default_title(self) -> &'static str {
        match self {
            Self::OpticalOutputDiagnosis => "Optical output diagnosis",
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            Self::OpticalOutputDiagnosis => {
                "An optical output problem was detected. Run the diagnosis to find the cause."
            }
        }
    }
}

impl fmt::Display for SystemNotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// 构建系统通知种子表
///
/// 目录中的每个 id 都有一条通知；配置只能覆盖标题、正文和初始可见性，
/// 配置中出现的未知 id 会被忽略并记录警告。
pub(crate) fn seed_table(
    config: &RegistryConfig,
    channel: &NotificationChannel,
) -> HashMap<SystemNotificationId, Notification> {
    for seed in &config.system_notifications {
        if SystemNotificationId::from_key(&seed.id).is_none() {
            warn!(id = %seed.id, "未知的系统通知 id，忽略");
        }
    }

    SystemNotificationId::ALL
        .into_iter()
        .map(|id| {
            let seed = config.system_notification(id.key());
            let title = seed
                .and_then(|s| s.title.clone())
                .unwrap_or_else(|| id.default_title().to_string());
            let message = seed
                .and_then(|s| s.message.clone())
                .unwrap_or_else(|| id.default_message().to_string());
            let visible = seed.is_some_and(|s| s.visible);
            let notification = Notification::builder()
                .with_title(title)
                .with_message(message)
                .with_visible(visible)
                .with_deletable(false)
                .with_channel(channel)
                .build();
            (id, notification)
        })
        .collect()
}
