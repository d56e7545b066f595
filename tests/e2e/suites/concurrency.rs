//! 并发一致性测试套件
//!
//! 多线程同时发布、切换可见性、删除和关闭通知，验证全局计数始终等于
//! 按当前状态重新统计的结果。

use std::sync::{Arc, Barrier};
use std::thread;

use notification_registry::test_utils::{TestDataGenerator, isolated_service};
use notification_registry::{NotificationChannel, NotificationsService};

const THREADS: usize = 8;
const ROUNDS: usize = 200;

fn setup(service: &NotificationsService, context: &'static str, channels: &[&str]) -> Vec<NotificationChannel> {
    let manager = service.get_notification_manager(context);
    channels
        .iter()
        .map(|id| {
            let channel = TestDataGenerator::channel(id);
            manager.create_notification_channel(&channel).unwrap();
            channel
        })
        .collect()
}

#[test]
fn test_concurrent_notify_and_toggle() {
    let service = Arc::new(isolated_service());
    let channels = setup(&service, "shared", &["a", "b"]);
    let barrier = Arc::new(Barrier::new(THREADS + 1));

    let workers: Vec<_> = (0..THREADS)
        .map(|worker| {
            let service = service.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let manager = service.get_notification_manager("shared");
                let channel_id = if worker % 2 == 0 { "a" } else { "b" };
                barrier.wait();

                for round in 0..ROUNDS {
                    let id = (worker * ROUNDS + round) as i32;
                    let notification = TestDataGenerator::notification(channel_id, round);
                    manager.notify(id, notification.clone()).unwrap();

                    match round % 4 {
                        0 => notification.set_visible(false),
                        1 => {
                            notification.delete();
                        }
                        2 => {
                            manager.close(channel_id, id);
                        }
                        _ => {
                            notification.set_visible(false);
                            notification.set_visible(true);
                        }
                    }
                }
            })
        })
        .collect();

    // 主线程同时反复切换渠道可见性
    let toggler = {
        let channels = channels.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            barrier.wait();
            for round in 0..ROUNDS {
                let channel = &channels[round % channels.len()];
                channel.set_visible(round % 3 != 0);
            }
            for channel in &channels {
                channel.set_visible(true);
            }
        })
    };

    for worker in workers {
        worker.join().unwrap();
    }
    toggler.join().unwrap();

    // 每个线程每 4 轮留下 1 条可见通知
    crate::assert_count!(service, THREADS * ROUNDS / 4);
}

#[test]
fn test_concurrent_replace_same_ids() {
    let service = Arc::new(isolated_service());
    let _channels = setup(&service, "replace", &["chan1"]);
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|worker| {
            let service = service.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let manager = service.get_notification_manager("replace");
                barrier.wait();
                for round in 0..ROUNDS {
                    // 所有线程争用同一组 id
                    let id = (round % 16) as i32;
                    let notification = TestDataGenerator::notification("chan1", worker);
                    notification.set_visible(round % 2 == 0);
                    manager.notify(id, notification).unwrap();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    crate::assert_count_consistent!(service);
    assert!(service.count() <= 16);
}

#[test]
fn test_concurrent_managers_and_channel_deletion() {
    let service = Arc::new(isolated_service());
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|worker| {
            let service = service.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let manager = service.get_notification_manager(format!("manager-{}", worker));
                barrier.wait();
                for round in 0..ROUNDS / 10 {
                    let channel_id = format!("chan-{}", round % 3);
                    manager
                        .create_notification_channel(&TestDataGenerator::channel(&channel_id))
                        .unwrap();
                    for id in 0..5 {
                        manager
                            .notify(id, TestDataGenerator::notification(&channel_id, id as usize))
                            .unwrap();
                    }
                    if round % 2 == 1 {
                        manager.delete_notification_channel(&channel_id);
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    crate::assert_count_consistent!(service);
    let by_channel = crate::helpers::visible_by_channel(&service);
    assert_eq!(by_channel.values().sum::<usize>(), service.count());
    assert_eq!(service.notification_managers().len(), THREADS);
}
