//! 全局可见计数
//!
//! 计数由专用互斥锁保护，所有读取和增减都经过该锁。
//! 管理器在持有自身映射锁时调用 [`VisibleCounter::adjust`]，计数锁永远是最内层的锁，
//! 且持有期间不会回调任何管理器。
//!
//! `notification_visible_count` 指标是进程级的单一 gauge，只有进程级服务的计数器写入它。

use notice_shared::observability::metrics as registry_metrics;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use crate::events::RegistryEvent;

pub(crate) struct VisibleCounter {
    count: Mutex<usize>,
    count_tx: watch::Sender<usize>,
    events: broadcast::Sender<RegistryEvent>,
    report_metrics: bool,
}

impl VisibleCounter {
    pub(crate) fn new(event_capacity: usize) -> Self {
        let (count_tx, _) = watch::channel(0);
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            count: Mutex::new(0),
            count_tx,
            events,
            report_metrics: false,
        }
    }

    /// 由该计数器驱动可见计数 gauge
    pub(crate) fn with_metrics(mut self) -> Self {
        self.report_metrics = true;
        self
    }

    pub(crate) fn get(&self) -> usize {
        *self.count.lock()
    }

    /// 按增量调整计数，只有数值真正变化时才发出"计数变化"信号
    pub(crate) fn adjust(&self, delta: isize) {
        if delta == 0 {
            return;
        }

        let mut count = self.count.lock();
        let current = *count;
        let next = match current.checked_add_signed(delta) {
            Some(next) => next,
            None => {
                warn!(current, delta, "可见计数下溢，已截断为 0");
                0
            }
        };

        if next != current {
            *count = next;
            self.count_tx.send_replace(next);
            if self.report_metrics {
                registry_metrics::set_visible_count(next);
            }
            let _ = self.events.send(RegistryEvent::CountChanged { count: next });
            debug!(from = current, to = next, "可见计数已更新");
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<usize> {
        self.count_tx.subscribe()
    }

    pub(crate) fn subscribe_events(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// 发出注册表事件；没有订阅者时静默丢弃
    pub(crate) fn emit(&self, event: RegistryEvent) {
        let _ = self.events.send(event);
    }
}
