//! 通知注册表集成测试
//!
//! 通过公开 API 验证完整的通知生命周期与可见计数不变量。

use std::sync::Arc;

use notification_registry::test_utils::{TestDataGenerator, isolated_service, test_context};
use notification_registry::{
    BitmapIcon, Icon, Notification, NotificationChannel, NotificationError, RegistryEvent,
    SystemNotificationId,
};

/// 通知可见、渠道切换、关闭的完整流程
#[test]
fn test_visibility_lifecycle() {
    let service = isolated_service();
    let manager = service.get_notification_manager("X");
    let channel = NotificationChannel::new("chan1").unwrap();
    manager.create_notification_channel(&channel).unwrap();

    let n1 = TestDataGenerator::notification("chan1", 1);
    manager.notify(1, n1.clone()).unwrap();
    assert_eq!(service.count(), 1);

    n1.set_visible(false);
    assert_eq!(service.count(), 0);

    channel.set_visible(false);
    channel.set_visible(true);
    assert_eq!(service.count(), 0);

    n1.set_visible(true);
    assert_eq!(service.count(), 1);

    assert!(manager.close("chan1", 1));
    assert_eq!(service.count(), 0);
    assert!(manager.notifications().is_empty());
}

/// 同一 id 重复发布视为替换
#[test]
fn test_replace_by_id() {
    let service = isolated_service();
    let manager = service.get_notification_manager(test_context("replace"));
    manager
        .create_notification_channel(&TestDataGenerator::channel("chan1"))
        .unwrap();

    manager
        .notify(1, TestDataGenerator::notification("chan1", 1))
        .unwrap();
    manager
        .notify(1, TestDataGenerator::notification("chan1", 2))
        .unwrap();

    assert_eq!(service.count(), 1);
    let visible = manager.notifications();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].title(), "Title 2");
}

/// 发布到未注册渠道失败且不产生任何修改
#[test]
fn test_notify_unknown_channel() {
    let service = isolated_service();
    let manager = service.get_notification_manager(test_context("unknown"));

    let err = manager
        .notify(1, TestDataGenerator::notification("missing", 1))
        .unwrap_err();
    assert!(matches!(err, NotificationError::ChannelNotFound { ref channel_id } if channel_id == "missing"));
    assert!(err.is_not_found());
    assert_eq!(service.count(), 0);
    assert!(manager.channel_ids().is_empty());
}

/// 不可删除的通知不会被删除，也不会产生删除信号
#[test]
fn test_non_deletable_notification() {
    let service = isolated_service();
    let mut events = service.subscribe_events();
    let manager = service.get_notification_manager(test_context("sticky"));
    let channel = TestDataGenerator::channel("chan1");
    manager.create_notification_channel(&channel).unwrap();

    let sticky = Notification::builder()
        .with_title("Sticky")
        .with_channel(&channel)
        .with_deletable(false)
        .build();
    manager.notify(1, sticky.clone()).unwrap();

    assert!(!sticky.delete());
    assert!(!sticky.is_deleted());
    assert_eq!(service.count(), 1);

    let received: Vec<RegistryEvent> = std::iter::from_fn(|| events.try_recv().ok()).collect();
    assert!(
        received
            .iter()
            .all(|e| !matches!(e, RegistryEvent::NotificationDeleted { .. }))
    );
}

/// 删除渠道后计数立即反映移除结果，图标被释放
#[test]
fn test_delete_channel_releases_everything() {
    let service = isolated_service();
    let manager = service.get_notification_manager(test_context("cleanup"));
    manager
        .create_notification_channel(&TestDataGenerator::channel("chan1"))
        .unwrap();
    manager
        .create_notification_channel(&TestDataGenerator::channel("chan2"))
        .unwrap();

    let bitmap = Arc::new(BitmapIcon::new(2, 2, vec![255; 16]));
    let with_icon = Notification::builder()
        .with_icon(Icon::new(bitmap.clone()))
        .with_channel_id("chan1")
        .unwrap()
        .build();
    manager.notify(1, with_icon).unwrap();
    for (id, notification) in TestDataGenerator::notifications("chan1", 4).into_iter().enumerate() {
        manager.notify(id as i32 + 10, notification).unwrap();
    }
    manager
        .notify(1, TestDataGenerator::notification("chan2", 1))
        .unwrap();
    assert_eq!(service.count(), 4);

    assert!(manager.delete_notification_channel("chan1"));
    assert_eq!(service.count(), 1);
    assert_eq!(service.audit_count(), 1);
    assert!(!bitmap.is_loaded());
    assert_eq!(manager.channel_ids(), vec!["chan2".to_string()]);
}

/// 删除已发布通知会关闭它并发出删除信号
#[test]
fn test_delete_published_notification() {
    let service = isolated_service();
    let manager = service.get_notification_manager("deleter");
    manager
        .create_notification_channel(&TestDataGenerator::channel("chan1"))
        .unwrap();

    let n1 = TestDataGenerator::notification_with_icon("chan1", 1);
    manager.notify(3, n1.clone()).unwrap();
    let mut events = service.subscribe_events();

    assert!(n1.delete());
    assert_eq!(service.count(), 0);
    assert_eq!(manager.get_notification_id(&n1), None);
    assert!(n1.icon().unwrap().is_released());

    let received: Vec<RegistryEvent> = std::iter::from_fn(|| events.try_recv().ok()).collect();
    assert_eq!(
        received,
        vec![
            RegistryEvent::CountChanged { count: 0 },
            RegistryEvent::NotificationDeleted {
                context: "deleter".to_string(),
                channel_id: "chan1".to_string(),
                id: 3,
            },
        ]
    );
}

/// 快照与注册表互不影响
#[test]
fn test_manager_snapshots() {
    let service = isolated_service();
    let manager = service.get_notification_manager(test_context("snapshot"));
    let channel = TestDataGenerator::channel("chan1");
    manager.create_notification_channel(&channel).unwrap();
    manager
        .notify(1, TestDataGenerator::notification("chan1", 1))
        .unwrap();

    let snapshots = service.notification_managers();
    assert_eq!(snapshots.len(), 1);
    let snapshot = &snapshots[0];
    assert_eq!(snapshot.context(), manager.context());

    let copy = snapshot.channel("chan1").unwrap();
    assert_eq!(copy.channel(), &channel);
    copy.channel().set_visible(false);

    assert!(channel.is_visible());
    assert_eq!(service.count(), 1);
    assert!(snapshot.notifications().is_empty());
}

/// 系统通知随服务创建，只能切换可见性
#[test]
fn test_system_notification() {
    let service = isolated_service();
    let id = SystemNotificationId::OpticalOutputDiagnosis;
    let notification = service.system_notification(id).unwrap();
    assert!(!notification.is_visible());

    service.set_system_notif_visibility(id, true).unwrap();
    assert_eq!(service.count(), 1);
    assert!(service.notifications().iter().any(|n| n.ptr_eq(notification)));
    assert!(service.notification_managers().is_empty());

    assert!(!notification.delete());
    service.set_system_notif_visibility(id, false).unwrap();
    assert_eq!(service.count(), 0);
}

/// 可序列化视图与事件
#[test]
fn test_serialized_views() {
    let service = isolated_service();
    let manager = service.get_notification_manager("json");
    manager
        .create_notification_channel(&TestDataGenerator::channel("chan1"))
        .unwrap();
    manager
        .notify(1, TestDataGenerator::notification("chan1", 1))
        .unwrap();

    let views: Vec<_> = service.notifications().iter().map(Notification::to_view).collect();
    let json = serde_json::to_value(&views).unwrap();
    assert_eq!(json[0]["title"], "Title 1");
    assert_eq!(json[0]["channelId"], "chan1");
    assert_eq!(json[0]["visible"], true);

    let event = serde_json::to_value(RegistryEvent::CountChanged { count: 1 }).unwrap();
    assert_eq!(event["type"], "COUNT_CHANGED");
}
