//! 管理器上下文
//!
//! 上下文是管理器的唯一身份：同一上下文在服务中只对应一个管理器。

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;

/// 管理器上下文标识
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ManagerContext {
    /// 以所属子系统的类型作为身份
    Type { id: TypeId, name: &'static str },
    /// 以字符串名称作为身份
    Named(Cow<'static, str>),
}

impl ManagerContext {
    /// 以类型 `T` 作为上下文
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// 以值的类型作为上下文，同类型的不同实例共享一个管理器
    pub fn of_val<T: ?Sized + 'static>(_owner: &T) -> Self {
        Self::of::<T>()
    }

    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Named(name.into())
    }

    /// 用于日志和指标标签的名称
    pub fn label(&self) -> &str {
        match self {
            Self::Type { name, .. } => name,
            Self::Named(name) => name,
        }
    }
}

impl fmt::Display for ManagerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<&'static str> for ManagerContext {
    fn from(name: &'static str) -> Self {
        Self::named(name)
    }
}

impl From<String> for ManagerContext {
    fn from(name: String) -> Self {
        Self::named(name)
    }
}
