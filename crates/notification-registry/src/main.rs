//! 通知注册表演示程序
//!
//! 加载配置，初始化日志与指标，初始化全局通知服务后演示一次完整的通知生命周期。

use anyhow::Result;
use notice_shared::{config::AppConfig, observability};
use tracing::{info, warn};

use notification_registry::{
    DEFAULT_CHANNEL_ID, ManagerContext, Notification, NotificationChannel, NotificationsService,
    SystemNotificationId,
};

const SERVICE_NAME: &str = "notification-demo";

/// 演示用的上下文
struct DemoApp;

fn main() -> Result<()> {
    // 1. 加载配置：config/default.toml → config/{env}.toml → NOTICE_ 环境变量
    let config = AppConfig::load(SERVICE_NAME).unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        AppConfig {
            service_name: SERVICE_NAME.to_string(),
            ..AppConfig::default()
        }
    });

    // 2. 初始化日志与指标
    let _guard = observability::init(&config.observability)?;
    info!(environment = %config.environment, "Configuration loaded");

    // 3. 初始化全局通知服务
    let service = NotificationsService::init_global(&config.registry)?;
    let mut count_rx = service.subscribe_count();
    let mut events = service.subscribe_events();

    // 4. 注册渠道并发布通知
    let manager = service.get_notification_manager(ManagerContext::of::<DemoApp>());
    let channel = NotificationChannel::with_name(DEFAULT_CHANNEL_ID, "Miscellaneous")?;
    manager.create_notification_channel(&channel)?;

    let welcome = Notification::builder()
        .with_title("Welcome")
        .with_message("The notification registry is running")
        .with_channel(&channel)
        .build();
    let update = Notification::builder()
        .with_title("Update available")
        .with_message("A new version can be installed")
        .with_channel(&channel)
        .build();
    manager.notify(1, welcome.clone())?;
    manager.notify(2, update.clone())?;
    info!(count = service.count(), "Notifications published");

    // 5. 切换可见性与系统通知
    channel.set_visible(false);
    info!(count = service.count(), "Channel hidden");
    channel.set_visible(true);

    service.set_system_notif_visibility(SystemNotificationId::OpticalOutputDiagnosis, true)?;
    update.delete();

    for notification in service.notifications() {
        info!(view = %serde_json::to_string(&notification.to_view())?, "{}", notification);
    }

    // 6. 核对计数并输出信号
    if count_rx.has_changed()? {
        info!(count = *count_rx.borrow_and_update(), "Latest count");
    }
    while let Ok(event) = events.try_recv() {
        info!(property = event.property(), event = %serde_json::to_string(&event)?, "Registry event");
    }

    let audited = service.audit_count();
    if audited != service.count() {
        warn!(count = service.count(), audited, "Visible count mismatch");
    }

    manager.close_notification(&welcome);
    info!(count = service.count(), "Demo finished");

    if let Some(rendered) = observability::metrics::render() {
        println!("{}", rendered);
    }

    Ok(())
}
