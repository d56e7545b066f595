//! 通知图标资源
//!
//! 图标的解码和渲染由宿主负责，注册表只持有一个不透明的资源句柄，
//! 并在通知被关闭时释放它。释放是幂等的：同一资源最多释放一次。

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// 宿主提供的图标资源
#[cfg_attr(test, mockall::automock)]
pub trait IconResource: Send + Sync {
    /// 释放底层资源（位图、纹理句柄等）
    fn release(&self);
}

struct IconInner {
    resource: Box<dyn IconResource>,
    released: AtomicBool,
}

/// 图标句柄
///
/// 克隆共享同一份资源；相等性按资源身份（同一次 `Icon::new` 创建）判断。
#[derive(Clone)]
pub struct Icon {
    inner: Arc<IconInner>,
}

impl Icon {
    pub fn new(resource: impl IconResource + 'static) -> Self {
        Self {
            inner: Arc::new(IconInner {
                resource: Box::new(resource),
                released: AtomicBool::new(false),
            }),
        }
    }

    /// 释放资源，返回本次调用是否真正执行了释放
    pub fn release(&self) -> bool {
        if self.inner.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.inner.resource.release();
        true
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::Acquire)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }
}

impl PartialEq for Icon {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Icon {}

impl std::hash::Hash for Icon {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Icon")
            .field("addr", &format_args!("{:#x}", self.addr()))
            .field("released", &self.is_released())
            .finish()
    }
}

/// 内存位图图标
///
/// 宿主没有自己的资源类型时可直接使用；释放后像素数据被丢弃。
#[derive(Debug)]
pub struct BitmapIcon {
    width: u32,
    height: u32,
    pixels: Mutex<Option<Vec<u8>>>,
}

impl BitmapIcon {
    /// RGBA 像素，长度应为 width * height * 4
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels: Mutex::new(Some(pixels)),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_loaded(&self) -> bool {
        self.pixels.lock().is_some()
    }
}

impl IconResource for BitmapIcon {
    fn release(&self) {
        self.pixels.lock().take();
    }
}

impl IconResource for Arc<BitmapIcon> {
    fn release(&self) {
        self.as_ref().release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_is_idempotent() {
        let mut resource = MockIconResource::new();
        resource.expect_release().times(1).return_const(());

        let icon = Icon::new(resource);
        let shared = icon.clone();

        assert!(icon.release());
        assert!(!icon.release());
        assert!(!shared.release());
        assert!(shared.is_released());
    }

    #[test]
    fn test_icon_identity_equality() {
        let a = Icon::new(BitmapIcon::new(1, 1, vec![0; 4]));
        let b = Icon::new(BitmapIcon::new(1, 1, vec![0; 4]));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_bitmap_icon_release() {
        let bitmap = Arc::new(BitmapIcon::new(2, 2, vec![255; 16]));
        let icon = Icon::new(bitmap.clone());
        assert!(bitmap.is_loaded());
        assert_eq!(bitmap.dimensions(), (2, 2));

        icon.release();
        assert!(!bitmap.is_loaded());
    }
}
