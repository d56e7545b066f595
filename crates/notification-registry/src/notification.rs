//! 通知
//!
//! 通知的标题、正文、图标和所属渠道在构建后不可变，只有 `visible` 和 `deleted`
//! 两个状态可以改变。通知发布到管理器后会记录自己的"槽位"（所属管理器与 id），
//! 状态变更通过槽位直接路由到管理器，由管理器在同一个临界区内修改状态并调整全局计数。

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use tracing::debug;

use crate::channel::NotificationChannel;
use crate::error::{NotificationError, Result};
use crate::icon::Icon;
use crate::manager::{ManagerCore, NotificationManager};

/// 通知在管理器中的注册位置
pub(crate) struct Slot {
    pub(crate) manager: Weak<ManagerCore>,
    pub(crate) id: i32,
}

impl Slot {
    /// 所属管理器是否仍然存活
    pub(crate) fn is_live(&self) -> bool {
        self.manager.strong_count() > 0
    }
}

pub(crate) struct NotificationState {
    pub(crate) visible: bool,
    pub(crate) deleted: bool,
    pub(crate) slot: Option<Slot>,
}

impl NotificationState {
    /// 当前是否计入全局可见计数（不含渠道可见性）
    pub(crate) fn is_counted(&self) -> bool {
        self.visible && !self.deleted
    }
}

struct NotificationInner {
    icon: Option<Icon>,
    title: String,
    message: String,
    channel_id: String,
    deletable: bool,
    state: Mutex<NotificationState>,
}

/// 通知句柄
///
/// `clone` 得到的是同一条通知的另一个句柄；判断是否为同一条通知请用 [`Notification::ptr_eq`]，
/// `==` 比较的是内容（标题、正文、图标、渠道）。
#[derive(Clone)]
pub struct Notification {
    inner: Arc<NotificationInner>,
}

impl Notification {
    pub fn builder() -> NotificationBuilder {
        NotificationBuilder::new()
    }

    pub fn icon(&self) -> Option<&Icon> {
        self.inner.icon.as_ref()
    }

    pub fn title(&self) -> &str {
        &self.inner.title
    }

    pub fn message(&self) -> &str {
        &self.inner.message
    }

    pub fn channel_id(&self) -> &str {
        &self.inner.channel_id
    }

    pub fn is_deletable(&self) -> bool {
        self.inner.deletable
    }

    pub fn is_visible(&self) -> bool {
        self.inner.state.lock().visible
    }

    pub fn is_deleted(&self) -> bool {
        self.inner.state.lock().deleted
    }

    /// 是否为同一条通知
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// 设置可见性
    ///
    /// 值未变化时不做任何事。已发布的通知由所属管理器更新状态并调整全局计数。
    pub fn set_visible(&self, visible: bool) {
        loop {
            let (manager, id) = {
                let mut state = self.inner.state.lock();
                if state.visible == visible {
                    return;
                }
                match Self::owner(&mut state) {
                    Some(owner) => owner,
                    None => {
                        state.visible = visible;
                        debug!(channel_id = %self.channel_id(), visible, "未发布通知可见性已更新");
                        return;
                    }
                }
            };

            // 锁顺序为 管理器映射锁 → 通知状态锁，进入管理器前必须先释放通知锁
            if manager.apply_notification_visibility(self, id, visible) {
                return;
            }
        }
    }

    /// 删除通知
    ///
    /// 不可删除的通知直接忽略；已删除的通知不会再次触发删除。
    /// 已发布的通知删除后立即被所属管理器关闭并释放图标。
    /// 返回本次调用是否真正执行了删除。
    pub fn delete(&self) -> bool {
        if !self.inner.deletable {
            debug!(channel_id = %self.channel_id(), "通知不可删除，忽略");
            return false;
        }

        loop {
            let (manager, id) = {
                let mut state = self.inner.state.lock();
                if state.deleted {
                    return false;
                }
                match Self::owner(&mut state) {
                    Some(owner) => owner,
                    None => {
                        state.deleted = true;
                        return true;
                    }
                }
            };

            if let Some(deleted) = manager.apply_notification_deleted(self, id) {
                return deleted;
            }
        }
    }

    /// 用于宿主界面的可序列化视图
    pub fn to_view(&self) -> NotificationView {
        let state = self.inner.state.lock();
        NotificationView {
            title: self.inner.title.clone(),
            message: self.inner.message.clone(),
            channel_id: self.inner.channel_id.clone(),
            visible: state.visible,
            deletable: self.inner.deletable,
            deleted: state.deleted,
            has_icon: self.inner.icon.is_some(),
        }
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, NotificationState> {
        self.inner.state.lock()
    }

    /// 释放图标资源，重复调用安全
    pub(crate) fn release_icon(&self) {
        if let Some(icon) = &self.inner.icon {
            icon.release();
        }
    }

    /// 读取槽位对应的存活管理器；管理器已销毁时顺带清除槽位
    fn owner(state: &mut NotificationState) -> Option<(NotificationManager, i32)> {
        let slot = state.slot.as_ref()?;
        match slot.manager.upgrade() {
            Some(core) => Some((NotificationManager::from_core(core), slot.id)),
            None => {
                state.slot = None;
                None
            }
        }
    }
}

impl PartialEq for Notification {
    fn eq(&self, other: &Self) -> bool {
        self.inner.title == other.inner.title
            && self.inner.message == other.inner.message
            && self.inner.icon == other.inner.icon
            && self.inner.channel_id == other.inner.channel_id
    }
}

impl Eq for Notification {}

impl Hash for Notification {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.title.hash(state);
        self.inner.message.hash(state);
        self.inner.icon.hash(state);
        self.inner.channel_id.hash(state);
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Channel ID : {} Title : {} Message : {}",
            self.inner.channel_id, self.inner.title, self.inner.message
        )
    }
}

impl fmt::Debug for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Notification")
            .field("channel_id", &self.inner.channel_id)
            .field("title", &self.inner.title)
            .field("message", &self.inner.message)
            .field("icon", &self.inner.icon)
            .field("visible", &state.visible)
            .field("deletable", &self.inner.deletable)
            .field("deleted", &state.deleted)
            .finish()
    }
}

/// 通知的可序列化视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub title: String,
    pub message: String,
    pub channel_id: String,
    pub visible: bool,
    pub deletable: bool,
    pub deleted: bool,
    pub has_icon: bool,
}

/// 通知构建器
///
/// 未设置的字段使用默认值：标题和正文为空，可见，可删除。
/// 从未设置渠道的通知渠道 ID 为空，发布时会按"渠道未找到"失败。
#[derive(Debug, Default)]
pub struct NotificationBuilder {
    icon: Option<Icon>,
    title: Option<String>,
    message: Option<String>,
    channel_id: Option<String>,
    visible: Option<bool>,
    deletable: Option<bool>,
}

impl NotificationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_icon(mut self, icon: Icon) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// 设置所属渠道，渠道 ID 不能为空
    pub fn with_channel_id(mut self, channel_id: impl Into<String>) -> Result<Self> {
        let channel_id = channel_id.into();
        if channel_id.is_empty() {
            return Err(NotificationError::invalid_argument(
                "channel_id",
                "渠道 ID 不能为空",
            ));
        }
        self.channel_id = Some(channel_id);
        Ok(self)
    }

    /// 设置所属渠道为已创建的渠道对象
    pub fn with_channel(mut self, channel: &NotificationChannel) -> Self {
        self.channel_id = Some(channel.id().to_string());
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    pub fn with_deletable(mut self, deletable: bool) -> Self {
        self.deletable = Some(deletable);
        self
    }

    pub fn build(self) -> Notification {
        Notification {
            inner: Arc::new(NotificationInner {
                icon: self.icon,
                title: self.title.unwrap_or_default(),
                message: self.message.unwrap_or_default(),
                channel_id: self.channel_id.unwrap_or_default(),
                deletable: self.deletable.unwrap_or(true),
                state: Mutex::new(NotificationState {
                    visible: self.visible.unwrap_or(true),
                    deleted: false,
                    slot: None,
                }),
            }),
        }
    }
}
