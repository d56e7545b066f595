//! 配置到服务初始化测试套件
//!
//! 验证从 TOML 配置构建独立服务实例的完整流程。

use notice_shared::config::AppConfig;
use notification_registry::{NotificationsService, SystemNotificationId};

const CONFIG: &str = r#"
    environment = "test"

    [registry]
    system_channel_id = "Diagnostics"
    system_channel_name = "诊断"
    event_capacity = 8

    [[registry.system_notifications]]
    id = "optical_output_diagnosis"
    title = "光输出诊断"
    visible = true

    [observability]
    log_level = "debug"
    metrics_enabled = false
"#;

#[test]
fn test_service_from_toml_config() {
    let config = AppConfig::from_toml_str("e2e", CONFIG).unwrap();
    assert!(!config.is_production());
    assert!(!config.observability.metrics_enabled);

    let service = NotificationsService::new(&config.registry).unwrap();
    assert_eq!(service.system_channel().id(), "Diagnostics");
    assert_eq!(service.system_channel().name(), Some("诊断"));

    let notification = service
        .system_notification(SystemNotificationId::OpticalOutputDiagnosis)
        .unwrap();
    assert_eq!(notification.title(), "光输出诊断");
    assert_eq!(notification.channel_id(), "Diagnostics");
    crate::assert_count!(service, 1);

    service
        .set_system_notif_visibility(SystemNotificationId::OpticalOutputDiagnosis, false)
        .unwrap();
    crate::assert_count!(service, 0);
}

#[test]
fn test_invalid_system_channel_rejected() {
    let config = AppConfig::from_toml_str(
        "e2e",
        r#"
        [registry]
        system_channel_id = ""
        "#,
    )
    .unwrap();

    let err = NotificationsService::new(&config.registry).unwrap_err();
    assert_eq!(err.code(), "INVALID_ARGUMENT");
}

#[test]
fn test_global_instance_initialized_once() {
    let global = NotificationsService::global();
    assert!(std::ptr::eq(global, NotificationsService::global()));

    let config = AppConfig::default();
    let err = NotificationsService::init_global(&config.registry).unwrap_err();
    assert_eq!(err.code(), "ALREADY_INITIALIZED");
}
