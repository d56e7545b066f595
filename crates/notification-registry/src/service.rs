//! 通知服务
//!
//! 进程级的通知汇总：按上下文维护管理器表，持有全局可见计数，
//! 并通过内部的系统管理器发布系统通知。
//!
//! 管理器表使用 DashMap。对表的遍历先复制出管理器句柄并释放分片锁，
//! 再逐个进入管理器，因此持有管理器锁时不会再获取分片锁。

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use notice_shared::config::RegistryConfig;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info};

use crate::channel::NotificationChannel;
use crate::context::ManagerContext;
use crate::counter::VisibleCounter;
use crate::error::{NotificationError, Result};
use crate::events::RegistryEvent;
use crate::manager::{NotificationManager, NotificationManagerSnapshot};
use crate::notification::Notification;
use crate::system::{self, SystemNotificationId};

static GLOBAL: OnceLock<NotificationsService> = OnceLock::new();

/// 系统管理器的上下文类型，仅在本模块可见，外部无法构造出相同的上下文
struct SystemContext;

/// 通知服务
pub struct NotificationsService {
    managers: DashMap<ManagerContext, NotificationManager>,
    counter: Arc<VisibleCounter>,
    system_manager: NotificationManager,
    system_channel: NotificationChannel,
    system_notifications: HashMap<SystemNotificationId, Notification>,
}

impl NotificationsService {
    /// 进程级实例
    ///
    /// 首次访问时使用默认配置创建；需要自定义配置时在首次访问前调用 [`Self::init_global`]。
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(|| {
            let config = RegistryConfig::default();
            let channel = NotificationChannel::new_unchecked(
                config.system_channel_id.clone(),
                Some(config.system_channel_name.clone()),
            );
            Self::assemble(&config, channel, true)
        })
    }

    /// 使用指定配置初始化进程级实例，已初始化时返回 `AlreadyInitialized`
    ///
    /// 已初始化时不会创建任何通知，也不会产生指标或日志。
    pub fn init_global(config: &RegistryConfig) -> Result<&'static Self> {
        if GLOBAL.get().is_some() {
            return Err(NotificationError::AlreadyInitialized);
        }

        let channel = NotificationChannel::with_name(
            config.system_channel_id.clone(),
            config.system_channel_name.clone(),
        )?;
        let mut installed = false;
        let service = GLOBAL.get_or_init(|| {
            installed = true;
            Self::assemble(config, channel, true)
        });

        if !installed {
            return Err(NotificationError::AlreadyInitialized);
        }
        info!("全局通知服务已初始化");
        Ok(service)
    }

    /// 创建独立实例（测试或嵌入使用）
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let channel = NotificationChannel::with_name(
            config.system_channel_id.clone(),
            config.system_channel_name.clone(),
        )?;
        Ok(Self::assemble(config, channel, false))
    }

    /// `report_metrics` 只对进程级实例开启，独立实例不写入可见计数 gauge
    fn assemble(
        config: &RegistryConfig,
        system_channel: NotificationChannel,
        report_metrics: bool,
    ) -> Self {
        let mut counter = VisibleCounter::new(config.event_capacity);
        if report_metrics {
            counter = counter.with_metrics();
        }
        let counter = Arc::new(counter);
        let context = ManagerContext::of::<SystemContext>();
        let system_manager = NotificationManager::new(context.clone(), counter.clone());

        let managers = DashMap::new();
        managers.insert(context, system_manager.clone());

        // 新建的系统渠道和种子通知不属于任何管理器，注册和发布不会失败
        if let Err(e) = system_manager.create_notification_channel(&system_channel) {
            error!(error = %e, "系统渠道注册失败");
        }
        let system_notifications = system::seed_table(config, &system_channel);
        for (id, notification) in &system_notifications {
            if let Err(e) = system_manager.notify(id.as_i32(), notification.clone()) {
                error!(error = %e, id = %id, "系统通知发布失败");
            }
        }

        debug!(
            system_channel = %system_channel.id(),
            seeded = system_notifications.len(),
            "通知服务已创建"
        );

        Self {
            managers,
            counter,
            system_manager,
            system_channel,
            system_notifications,
        }
    }

    /// 获取指定上下文的管理器，不存在时创建
    ///
    /// 上下文相等的请求总是得到同一个管理器。
    pub fn get_notification_manager(&self, context: impl Into<ManagerContext>) -> NotificationManager {
        let context = context.into();
        self.managers
            .entry(context.clone())
            .or_insert_with(|| {
                info!(context = %context, "注册通知管理器");
                NotificationManager::new(context, self.counter.clone())
            })
            .value()
            .clone()
    }

    /// 切换系统通知可见性
    pub fn set_system_notif_visibility(&self, id: SystemNotificationId, visible: bool) -> Result<()> {
        let notification = self
            .system_notifications
            .get(&id)
            .ok_or(NotificationError::SystemNotificationNotFound(id))?;
        notification.set_visible(visible);
        debug!(id = %id, visible, "系统通知可见性已更新");
        Ok(())
    }

    pub fn system_notification(&self, id: SystemNotificationId) -> Option<&Notification> {
        self.system_notifications.get(&id)
    }

    pub fn system_channel(&self) -> &NotificationChannel {
        &self.system_channel
    }

    /// 当前全局可见计数
    pub fn count(&self) -> usize {
        self.counter.get()
    }

    /// 订阅全局可见计数，接收端总是持有最新值
    pub fn subscribe_count(&self) -> watch::Receiver<usize> {
        self.counter.subscribe()
    }

    /// 订阅注册表事件
    pub fn subscribe_events(&self) -> broadcast::Receiver<RegistryEvent> {
        self.counter.subscribe_events()
    }

    /// 所有业务管理器的快照（不含系统管理器）
    pub fn notification_managers(&self) -> Vec<NotificationManagerSnapshot> {
        self.manager_handles()
            .into_iter()
            .filter(|manager| manager.context() != self.system_manager.context())
            .map(|manager| manager.snapshot())
            .collect()
    }

    /// 所有管理器（含系统管理器）中的可见通知
    pub fn notifications(&self) -> Vec<Notification> {
        self.manager_handles()
            .into_iter()
            .flat_map(|manager| manager.notifications())
            .collect()
    }

    /// 按各管理器当前状态重新计算的可见计数，用于核对全局计数
    pub fn audit_count(&self) -> usize {
        self.manager_handles()
            .iter()
            .map(NotificationManager::visible_count)
            .sum()
    }

    fn manager_handles(&self) -> Vec<NotificationManager> {
        self.managers
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl fmt::Debug for NotificationsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationsService")
            .field("managers", &self.managers.len())
            .field("count", &self.count())
            .field("system_channel", &self.system_channel.id())
            .finish()
    }
}
