//! 通知管理器
//!
//! 每个上下文（子系统）一个管理器，维护 渠道 → (id → 通知) 的映射。
//!
//! ## 锁规则
//!
//! - 映射由管理器自己的互斥锁保护，读写和快照遍历都必须持有它
//! - 加锁顺序固定为：管理器映射锁 → 渠道/通知状态锁 → 全局计数锁，
//!   任何代码路径都不会反向获取
//! - 已注册渠道和已发布通知的状态只在持有映射锁时修改，
//!   因此持有映射锁期间读到的可见性是稳定的
//! - 图标释放在映射锁释放之后进行

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use notice_shared::observability::metrics as registry_metrics;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::channel::NotificationChannel;
use crate::context::ManagerContext;
use crate::counter::VisibleCounter;
use crate::error::{NotificationError, Result};
use crate::events::RegistryEvent;
use crate::notification::{Notification, Slot};

struct ChannelEntry {
    channel: NotificationChannel,
    notifications: BTreeMap<i32, Notification>,
}

impl ChannelEntry {
    /// 该渠道内计入可见计数的通知数（不含渠道自身可见性）
    fn counted(&self) -> usize {
        self.notifications
            .values()
            .filter(|n| n.lock_state().is_counted())
            .count()
    }
}

pub(crate) struct ManagerCore {
    context: ManagerContext,
    channels: Mutex<BTreeMap<String, ChannelEntry>>,
    counter: Arc<VisibleCounter>,
}

/// 通知管理器句柄
///
/// 相等性和哈希只看上下文。
#[derive(Clone)]
pub struct NotificationManager {
    core: Arc<ManagerCore>,
}

impl NotificationManager {
    pub(crate) fn new(context: ManagerContext, counter: Arc<VisibleCounter>) -> Self {
        debug!(context = %context, "创建通知管理器");
        Self {
            core: Arc::new(ManagerCore {
                context,
                channels: Mutex::new(BTreeMap::new()),
                counter,
            }),
        }
    }

    pub(crate) fn from_core(core: Arc<ManagerCore>) -> Self {
        Self { core }
    }

    pub fn context(&self) -> &ManagerContext {
        &self.core.context
    }

    fn owns(&self, manager: &Weak<ManagerCore>) -> bool {
        std::ptr::eq(manager.as_ptr(), Arc::as_ptr(&self.core))
    }

    fn owns_slot(&self, slot: &Option<Slot>, id: i32) -> bool {
        slot.as_ref()
            .is_some_and(|s| s.id == id && self.owns(&s.manager))
    }

    /// 发布通知
    ///
    /// 通知所属渠道必须已在本管理器注册，否则返回 `ChannelNotFound` 且不做任何修改。
    /// 同一渠道内已有相同 id 的通知时替换之：被替换的通知与管理器脱钩，
    /// 它对全局计数的贡献先被扣除，再计入新通知。
    #[instrument(skip(self, notification), fields(context = %self.core.context, channel_id = %notification.channel_id()))]
    pub fn notify(&self, id: i32, notification: Notification) -> Result<()> {
        let channel_id = notification.channel_id().to_string();

        let displaced = {
            let mut channels = self.core.channels.lock();
            let entry = channels.get_mut(&channel_id).ok_or_else(|| {
                NotificationError::ChannelNotFound {
                    channel_id: channel_id.clone(),
                }
            })?;
            let channel_visible = entry.channel.lock_state().visible;

            let mut delta: isize = 0;
            {
                let mut state = notification.lock_state();
                if state.deleted {
                    return Err(NotificationError::invalid_argument(
                        "notification",
                        "已删除的通知不能再次发布",
                    ));
                }
                if self.owns_slot(&state.slot, id) {
                    debug!(id, "通知已在该位置发布，忽略");
                    return Ok(());
                }
                if let Some(slot) = state.slot.as_ref().filter(|s| s.is_live()) {
                    return Err(NotificationError::AlreadyPublished { id: slot.id });
                }
                state.slot = Some(Slot {
                    manager: Arc::downgrade(&self.core),
                    id,
                });
                if channel_visible && state.is_counted() {
                    delta += 1;
                }
            }

            let displaced = entry.notifications.insert(id, notification);
            if let Some(old) = &displaced {
                let mut state = old.lock_state();
                state.slot = None;
                if channel_visible && state.is_counted() {
                    delta -= 1;
                }
            }

            self.core.counter.adjust(delta);
            displaced
        };

        registry_metrics::record_published(self.core.context.label(), &channel_id);
        if displaced.is_some() {
            info!(id, "通知已替换");
        } else {
            info!(id, "通知已发布");
        }
        Ok(())
    }

    /// 查询通知在本管理器中的 id，未发布到本管理器时返回 None
    pub fn get_notification_id(&self, notification: &Notification) -> Option<i32> {
        // 槽位只在持有映射锁时修改，读取前先加映射锁
        let _channels = self.core.channels.lock();
        let state = notification.lock_state();
        state
            .slot
            .as_ref()
            .filter(|s| self.owns(&s.manager))
            .map(|s| s.id)
    }

    /// 按坐标关闭通知，返回是否真正移除了一条记录
    #[instrument(skip(self), fields(context = %self.core.context))]
    pub fn close(&self, channel_id: &str, id: i32) -> bool {
        if channel_id.is_empty() {
            return false;
        }
        self.close_slot(channel_id, id, None)
    }

    /// 关闭指定的通知对象
    pub fn close_notification(&self, notification: &Notification) -> bool {
        match self.get_notification_id(notification) {
            Some(id) => self.close_slot(notification.channel_id(), id, Some(notification)),
            None => false,
        }
    }

    fn close_slot(&self, channel_id: &str, id: i32, expected: Option<&Notification>) -> bool {
        let removed = {
            let mut channels = self.core.channels.lock();
            let Some(entry) = channels.get_mut(channel_id) else {
                return false;
            };
            let matches = entry
                .notifications
                .get(&id)
                .is_some_and(|n| expected.is_none_or(|e| e.ptr_eq(n)));
            if !matches {
                return false;
            }
            let Some(removed) = entry.notifications.remove(&id) else {
                return false;
            };

            let channel_visible = entry.channel.lock_state().visible;
            let counted = {
                let mut state = removed.lock_state();
                state.slot = None;
                state.is_counted()
            };
            if channel_visible && counted {
                self.core.counter.adjust(-1);
            }
            removed
        };

        removed.release_icon();
        registry_metrics::record_closed(self.core.context.label(), channel_id, "close");
        debug!(channel_id, id, "通知已关闭");
        true
    }

    /// 注册渠道，已存在相同 ID 的渠道时不做任何事
    #[instrument(skip(self, channel), fields(context = %self.core.context, channel_id = %channel.id()))]
    pub fn create_notification_channel(&self, channel: &NotificationChannel) -> Result<()> {
        let mut channels = self.core.channels.lock();
        if channels.contains_key(channel.id()) {
            debug!("渠道已存在，忽略");
            return Ok(());
        }

        {
            let mut state = channel.lock_state();
            let foreign = state
                .owner
                .as_ref()
                .is_some_and(|o| o.strong_count() > 0 && !self.owns(o));
            if foreign {
                return Err(NotificationError::ChannelInUse {
                    channel_id: channel.id().to_string(),
                });
            }
            state.owner = Some(Arc::downgrade(&self.core));
        }

        channels.insert(
            channel.id().to_string(),
            ChannelEntry {
                channel: channel.clone(),
                notifications: BTreeMap::new(),
            },
        );
        info!("渠道已注册");
        Ok(())
    }

    /// 删除渠道并关闭其中所有通知，渠道不存在时返回 false
    #[instrument(skip(self), fields(context = %self.core.context))]
    pub fn delete_notification_channel(&self, channel_id: &str) -> bool {
        let removed = {
            let mut channels = self.core.channels.lock();
            let Some(entry) = channels.remove(channel_id) else {
                return false;
            };

            let channel_visible = {
                let mut state = entry.channel.lock_state();
                state.owner = None;
                state.visible
            };

            let mut delta: isize = 0;
            for notification in entry.notifications.values() {
                let mut state = notification.lock_state();
                state.slot = None;
                if channel_visible && state.is_counted() {
                    delta -= 1;
                }
            }
            self.core.counter.adjust(delta);
            entry.notifications
        };

        for notification in removed.values() {
            notification.release_icon();
            registry_metrics::record_closed(self.core.context.label(), channel_id, "channel_deleted");
        }
        registry_metrics::record_channel_deleted(self.core.context.label(), channel_id);
        info!(closed = removed.len(), "渠道已删除");
        true
    }

    /// 获取已注册的渠道句柄
    pub fn channel(&self, channel_id: &str) -> Option<NotificationChannel> {
        self.core
            .channels
            .lock()
            .get(channel_id)
            .map(|entry| entry.channel.clone())
    }

    /// 已注册渠道的 ID 列表
    pub fn channel_ids(&self) -> Vec<String> {
        self.core.channels.lock().keys().cloned().collect()
    }

    /// 可见渠道中所有可见通知的快照
    pub fn notifications(&self) -> Vec<Notification> {
        let channels = self.core.channels.lock();
        channels
            .values()
            .filter(|entry| entry.channel.lock_state().visible)
            .flat_map(|entry| {
                entry
                    .notifications
                    .values()
                    .filter(|n| n.lock_state().is_counted())
                    .cloned()
            })
            .collect()
    }

    /// 本管理器对全局可见计数的贡献，按当前状态重新计算
    pub fn visible_count(&self) -> usize {
        let channels = self.core.channels.lock();
        channels
            .values()
            .filter(|entry| entry.channel.lock_state().visible)
            .map(ChannelEntry::counted)
            .sum()
    }

    /// 只读快照：渠道为独立副本，通知与注册表共享同一对象
    pub fn snapshot(&self) -> NotificationManagerSnapshot {
        let channels = self.core.channels.lock();
        NotificationManagerSnapshot {
            context: self.core.context.clone(),
            channels: channels
                .values()
                .map(|entry| ChannelSnapshot {
                    channel: entry.channel.clone_detached(),
                    notifications: entry.notifications.clone(),
                })
                .collect(),
        }
    }

    // ------------------------------------------------------------------
    // 状态变更入口（由通知和渠道句柄调用）
    // ------------------------------------------------------------------

    /// 更新已发布通知的可见性；槽位已变化时返回 false，由调用方重试
    pub(crate) fn apply_notification_visibility(
        &self,
        notification: &Notification,
        id: i32,
        visible: bool,
    ) -> bool {
        let channels = self.core.channels.lock();
        let channel_visible = match channels.get(notification.channel_id()) {
            Some(entry) => entry.channel.lock_state().visible,
            None => return false,
        };

        {
            let mut state = notification.lock_state();
            if !self.owns_slot(&state.slot, id) {
                return false;
            }
            if state.visible == visible {
                return true;
            }
            state.visible = visible;
            if channel_visible && !state.deleted {
                self.core.counter.adjust(if visible { 1 } else { -1 });
            }
        }

        self.core.counter.emit(RegistryEvent::NotificationVisibilityChanged {
            context: self.core.context.label().to_string(),
            channel_id: notification.channel_id().to_string(),
            id,
            visible,
        });
        debug!(context = %self.core.context, channel_id = %notification.channel_id(), id, visible, "通知可见性已更新");
        true
    }

    /// 删除并关闭已发布通知；槽位已变化时返回 None，由调用方重试
    pub(crate) fn apply_notification_deleted(
        &self,
        notification: &Notification,
        id: i32,
    ) -> Option<bool> {
        let channel_id = notification.channel_id();
        {
            let mut channels = self.core.channels.lock();
            let entry = channels.get_mut(channel_id)?;
            let channel_visible = entry.channel.lock_state().visible;

            {
                let mut state = notification.lock_state();
                if !self.owns_slot(&state.slot, id) {
                    return None;
                }
                if state.deleted {
                    return Some(false);
                }
                let counted = state.is_counted();
                state.deleted = true;
                state.slot = None;
                if channel_visible && counted {
                    self.core.counter.adjust(-1);
                }
            }

            match entry.notifications.remove(&id) {
                Some(removed) if removed.ptr_eq(notification) => {}
                Some(other) => {
                    // 槽位与映射不一致，说明有代码绕过了映射锁
                    warn!(channel_id, id, "删除的通知与映射中的记录不一致");
                    entry.notifications.insert(id, other);
                }
                None => warn!(channel_id, id, "删除的通知不在映射中"),
            }

            self.core.counter.emit(RegistryEvent::NotificationDeleted {
                context: self.core.context.label().to_string(),
                channel_id: channel_id.to_string(),
                id,
            });
        }

        notification.release_icon();
        registry_metrics::record_closed(self.core.context.label(), channel_id, "deleted");
        info!(context = %self.core.context, channel_id, id, "通知已删除");
        Some(true)
    }

    /// 更新已注册渠道的可见性；渠道已不属于本管理器时返回 false，由调用方重试
    pub(crate) fn apply_channel_visibility(
        &self,
        channel: &NotificationChannel,
        visible: bool,
    ) -> bool {
        let channels = self.core.channels.lock();
        let Some(entry) = channels.get(channel.id()) else {
            return false;
        };
        if !entry.channel.ptr_eq(channel) {
            return false;
        }

        {
            let mut state = channel.lock_state();
            if !state.owner.as_ref().is_some_and(|o| self.owns(o)) {
                return false;
            }
            if state.visible == visible {
                return true;
            }
            state.visible = visible;
        }

        let affected = entry.counted() as isize;
        self.core
            .counter
            .adjust(if visible { affected } else { -affected });

        self.core.counter.emit(RegistryEvent::ChannelVisibilityChanged {
            context: self.core.context.label().to_string(),
            channel_id: channel.id().to_string(),
            visible,
        });
        debug!(context = %self.core.context, channel_id = %channel.id(), visible, affected, "渠道可见性已更新");
        true
    }
}

impl PartialEq for NotificationManager {
    fn eq(&self, other: &Self) -> bool {
        self.core.context == other.core.context
    }
}

impl Eq for NotificationManager {}

impl Hash for NotificationManager {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.core.context.hash(state);
    }
}

impl fmt::Debug for NotificationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationManager")
            .field("context", &self.core.context)
            .field("channels", &self.channel_ids())
            .finish()
    }
}

/// 渠道快照
#[derive(Debug, Clone)]
pub struct ChannelSnapshot {
    channel: NotificationChannel,
    notifications: BTreeMap<i32, Notification>,
}

impl ChannelSnapshot {
    /// 独立的渠道副本，修改其可见性不影响注册表
    pub fn channel(&self) -> &NotificationChannel {
        &self.channel
    }

    pub fn notifications(&self) -> &BTreeMap<i32, Notification> {
        &self.notifications
    }
}

/// 管理器快照
///
/// 与注册表完全脱钩的只读结构，相等性只看上下文。
#[derive(Debug, Clone)]
pub struct NotificationManagerSnapshot {
    context: ManagerContext,
    channels: Vec<ChannelSnapshot>,
}

impl NotificationManagerSnapshot {
    pub fn context(&self) -> &ManagerContext {
        &self.context
    }

    pub fn channels(&self) -> &[ChannelSnapshot] {
        &self.channels
    }

    pub fn channel(&self, channel_id: &str) -> Option<&ChannelSnapshot> {
        self.channels.iter().find(|c| c.channel.id() == channel_id)
    }

    /// 按快照中渠道的可见性筛选出的可见通知
    pub fn notifications(&self) -> Vec<Notification> {
        self.channels
            .iter()
            .filter(|c| c.channel.is_visible())
            .flat_map(|c| c.notifications.values().filter(|n| n.is_visible()).cloned())
            .collect()
    }
}

impl PartialEq for NotificationManagerSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.context == other.context
    }
}

impl Eq for NotificationManagerSnapshot {}
