//! 计数订阅与事件信号测试套件

use std::sync::Arc;
use std::time::Duration;

use notification_registry::RegistryEvent;
use notification_registry::test_utils::{TestDataGenerator, isolated_service};
use tokio::sync::broadcast::error::TryRecvError;

#[tokio::test]
async fn test_watch_receives_latest_count() -> anyhow::Result<()> {
    let service = Arc::new(isolated_service());
    let mut count_rx = service.subscribe_count();
    assert_eq!(*count_rx.borrow(), 0);

    let producer = {
        let service = service.clone();
        std::thread::spawn(move || -> anyhow::Result<()> {
            let manager = service.get_notification_manager("producer");
            manager.create_notification_channel(&TestDataGenerator::channel("chan1"))?;
            for id in 0..10 {
                manager.notify(id, TestDataGenerator::notification("chan1", id as usize))?;
            }
            Ok(())
        })
    };

    // 等待计数到达最终值，中间值可能被合并
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while *count_rx.borrow_and_update() != 10 {
            count_rx.changed().await?;
        }
        anyhow::Ok(())
    })
    .await;

    producer.join().map_err(|_| anyhow::anyhow!("producer panicked"))??;
    waited??;
    assert_eq!(service.count(), 10);
    Ok(())
}

#[tokio::test]
async fn test_event_stream_order() -> anyhow::Result<()> {
    let service = isolated_service();
    let mut events = service.subscribe_events();
    let manager = service.get_notification_manager("events");
    let channel = TestDataGenerator::channel("chan1");
    manager.create_notification_channel(&channel)?;

    let notification = TestDataGenerator::notification("chan1", 1);
    manager.notify(1, notification.clone())?;
    notification.set_visible(false);
    notification.set_visible(false);
    channel.set_visible(false);

    let mut received = Vec::new();
    while let Ok(event) = events.recv().await {
        let done = matches!(event, RegistryEvent::ChannelVisibilityChanged { .. });
        received.push(event);
        if done {
            break;
        }
    }

    tracing::debug!(?received, "收到的事件");
    assert_eq!(
        received,
        vec![
            RegistryEvent::CountChanged { count: 1 },
            RegistryEvent::CountChanged { count: 0 },
            RegistryEvent::NotificationVisibilityChanged {
                context: "events".to_string(),
                channel_id: "chan1".to_string(),
                id: 1,
                visible: false,
            },
            RegistryEvent::ChannelVisibilityChanged {
                context: "events".to_string(),
                channel_id: "chan1".to_string(),
                visible: false,
            },
        ]
    );

    // 重复设置相同可见性不会产生信号
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

    let properties: Vec<_> = received.iter().map(RegistryEvent::property).collect();
    assert_eq!(properties, vec!["Count", "Count", "Visible", "Visible"]);
    Ok(())
}
