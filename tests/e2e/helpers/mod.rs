//! 自定义断言宏和辅助函数

use notification_registry::NotificationsService;

/// 断言全局计数与各管理器重新统计的结果一致
#[macro_export]
macro_rules! assert_count_consistent {
    ($service:expr) => {
        let count = $service.count();
        let audited = $service.audit_count();
        assert_eq!(
            count, audited,
            "全局计数 {} 与重新统计结果 {} 不一致",
            count, audited
        );
    };
}

/// 断言全局计数为指定值且与重新统计结果一致
#[macro_export]
macro_rules! assert_count {
    ($service:expr, $expected:expr) => {
        $crate::assert_count_consistent!($service);
        assert_eq!($service.count(), $expected, "全局计数应为 {}", $expected);
    };
}

/// 按可见通知统计各渠道的数量
pub fn visible_by_channel(service: &NotificationsService) -> std::collections::BTreeMap<String, usize> {
    let mut counts = std::collections::BTreeMap::new();
    for notification in service.notifications() {
        *counts.entry(notification.channel_id().to_string()).or_insert(0) += 1;
    }
    counts
}
