//! 宿主元素
//!
//! 终端的挂载根：一个尺寸可观察的元素模型。宿主页面的布局层在
//! 元素像素盒变化时调用 `set_size`，观察者（自适应插件）据此
//! 重新换算终端几何尺寸。

use std::sync::Arc;

use parking_lot::RwLock;

use crate::terminal::listeners::{ListenerHandle, Listeners};

/// 宿主元素
pub struct HostElement {
    size: RwLock<(f64, f64)>,
    observers: Listeners<(f64, f64)>,
}

impl HostElement {
    /// 以初始像素尺寸创建宿主元素
    pub fn new(width_px: f64, height_px: f64) -> Arc<Self> {
        Arc::new(Self {
            size: RwLock::new((width_px, height_px)),
            observers: Listeners::new(),
        })
    }

    /// 当前像素尺寸 (宽, 高)
    pub fn size(&self) -> (f64, f64) {
        *self.size.read()
    }

    /// 更新像素尺寸；仅在实际变化时通知观察者
    pub fn set_size(&self, width_px: f64, height_px: f64) {
        {
            let mut size = self.size.write();
            if *size == (width_px, height_px) {
                return;
            }
            *size = (width_px, height_px);
        }
        self.observers.emit(&(width_px, height_px));
    }

    /// 观察尺寸变化
    pub fn observe_size(
        &self,
        callback: impl Fn(&(f64, f64)) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.observers.subscribe(callback)
    }

    /// 当前观察者数量（用于泄漏核对）
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}
