//! 测试工具模块
//!
//! 提供单元测试、集成测试和基准测试共用的数据生成器。

use std::sync::atomic::{AtomicU64, Ordering};

use notice_shared::config::RegistryConfig;

use crate::channel::NotificationChannel;
use crate::context::ManagerContext;
use crate::icon::{BitmapIcon, Icon};
use crate::notification::Notification;
use crate::service::NotificationsService;

/// 生成唯一的测试上下文
///
/// 使用原子计数器确保并行测试时的唯一性
pub fn test_context(prefix: &str) -> ManagerContext {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    ManagerContext::named(format!("{}-{}", prefix, COUNTER.fetch_add(1, Ordering::SeqCst)))
}

/// 创建独立的通知服务，不影响进程级实例
pub fn isolated_service() -> NotificationsService {
    NotificationsService::new(&RegistryConfig::default()).expect("默认配置必须可用")
}

/// 测试数据生成器
pub struct TestDataGenerator;

impl TestDataGenerator {
    /// 生成测试渠道
    pub fn channel(id: &str) -> NotificationChannel {
        NotificationChannel::with_name(id, format!("Channel {}", id)).expect("渠道 ID 不能为空")
    }

    /// 生成可见的测试通知
    pub fn notification(channel_id: &str, seq: usize) -> Notification {
        Notification::builder()
            .with_title(format!("Title {}", seq))
            .with_message(format!("Message {}", seq))
            .with_channel_id(channel_id)
            .expect("渠道 ID 不能为空")
            .build()
    }

    /// 生成带位图图标的测试通知
    pub fn notification_with_icon(channel_id: &str, seq: usize) -> Notification {
        Notification::builder()
            .with_icon(Icon::new(BitmapIcon::new(16, 16, vec![0; 16 * 16 * 4])))
            .with_title(format!("Title {}", seq))
            .with_message(format!("Message {}", seq))
            .with_channel_id(channel_id)
            .expect("渠道 ID 不能为空")
            .build()
    }

    /// 批量生成测试通知，可见性交替
    pub fn notifications(channel_id: &str, count: usize) -> Vec<Notification> {
        (0..count)
            .map(|seq| {
                let notification = Self::notification(channel_id, seq);
                notification.set_visible(seq % 2 == 0);
                notification
            })
            .collect()
    }
}
