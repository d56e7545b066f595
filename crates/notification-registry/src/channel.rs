//! 通知渠道
//!
//! 渠道按 ID 判等，带一个可切换的可见性开关。渠道注册到管理器后，
//! 可见性变更由管理器处理：整批调整该渠道内可见通知对全局计数的贡献。

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::error::{NotificationError, Result};
use crate::manager::{ManagerCore, NotificationManager};

/// 默认渠道 ID
pub const DEFAULT_CHANNEL_ID: &str = "miscellaneous";

pub(crate) struct ChannelState {
    pub(crate) visible: bool,
    pub(crate) owner: Option<Weak<ManagerCore>>,
}

struct ChannelInner {
    id: String,
    name: Option<String>,
    state: Mutex<ChannelState>,
}

/// 通知渠道句柄
///
/// `clone` 共享同一个渠道；需要与注册表脱钩的独立副本时使用 [`NotificationChannel::clone_detached`]。
#[derive(Clone)]
pub struct NotificationChannel {
    inner: Arc<ChannelInner>,
}

impl NotificationChannel {
    /// 创建渠道，ID 不能为空
    pub fn new(id: impl Into<String>) -> Result<Self> {
        Self::build(id.into(), None)
    }

    /// 创建带显示名称的渠道
    pub fn with_name(id: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        Self::build(id.into(), Some(name.into()))
    }

    fn build(id: String, name: Option<String>) -> Result<Self> {
        if id.is_empty() {
            return Err(NotificationError::invalid_argument(
                "channel_id",
                "渠道 ID 不能为空",
            ));
        }
        Ok(Self::from_parts(id, name, true))
    }

    fn from_parts(id: String, name: Option<String>, visible: bool) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                id,
                name,
                state: Mutex::new(ChannelState {
                    visible,
                    owner: None,
                }),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub fn is_visible(&self) -> bool {
        self.inner.state.lock().visible
    }

    /// 是否为同一个渠道对象
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// 设置可见性，值未变化时不做任何事
    pub fn set_visible(&self, visible: bool) {
        loop {
            let manager = {
                let mut state = self.inner.state.lock();
                if state.visible == visible {
                    return;
                }
                let owner = state.owner.as_ref().and_then(Weak::upgrade);
                match owner {
                    Some(core) => NotificationManager::from_core(core),
                    None => {
                        state.owner = None;
                        state.visible = visible;
                        debug!(channel_id = %self.id(), visible, "未注册渠道可见性已更新");
                        return;
                    }
                }
            };

            if manager.apply_channel_visibility(self, visible) {
                return;
            }
        }
    }

    /// 独立副本：保留 ID、名称和当前可见性，不关联任何管理器
    pub fn clone_detached(&self) -> Self {
        Self::from_parts(self.inner.id.clone(), self.inner.name.clone(), self.is_visible())
    }

    /// 已知合法 ID 的内部构造
    pub(crate) fn new_unchecked(id: impl Into<String>, name: Option<String>) -> Self {
        Self::from_parts(id.into(), name, true)
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, ChannelState> {
        self.inner.state.lock()
    }
}

impl PartialEq for NotificationChannel {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for NotificationChannel {}

impl Hash for NotificationChannel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationChannel")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("visible", &self.is_visible())
            .finish()
    }
}
