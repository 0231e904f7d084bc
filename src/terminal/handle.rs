//! 终端实例封装
//!
//! 以事件注册、写入与几何尺寸为边界封装一个终端实例。渲染与
//! 键盘模拟不在此处实现：渲染层消费 [`TerminalHandle::output`]，
//! 键盘源通过 `feed_input` / `feed_binary` 注入终端侧活动。
//!
//! 终端实例与其插件集合同生共灭：销毁终端会按装载顺序的逆序
//! 级联销毁全部插件，实例不跨挂载复用。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use super::addon::{AddonError, TerminalAddon};
use super::listeners::{ListenerHandle, Listeners};
use crate::element::HostElement;
use crate::scope::Disposable;

/// 默认列数
pub const DEFAULT_COLS: u16 = 80;
/// 默认行数
pub const DEFAULT_ROWS: u16 = 24;

/// 终端几何尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    /// 列数
    pub cols: u16,
    /// 行数
    pub rows: u16,
}

impl Geometry {
    /// 创建几何尺寸
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new(DEFAULT_COLS, DEFAULT_ROWS)
    }
}

/// 终端实例
pub struct TerminalHandle {
    geometry: RwLock<Geometry>,
    host: RwLock<Option<Arc<HostElement>>>,
    disposed: AtomicBool,
    data_listeners: Listeners<String>,
    binary_listeners: Listeners<Vec<u8>>,
    resize_listeners: Listeners<Geometry>,
    open_listeners: Listeners<()>,
    addons: Mutex<Vec<Arc<dyn TerminalAddon>>>,
    output: Mutex<String>,
}

impl TerminalHandle {
    /// 以默认几何尺寸创建未挂载的终端实例
    pub fn new() -> Arc<Self> {
        Self::with_geometry(DEFAULT_COLS, DEFAULT_ROWS)
    }

    /// 以指定几何尺寸创建未挂载的终端实例
    pub fn with_geometry(cols: u16, rows: u16) -> Arc<Self> {
        Arc::new(Self {
            geometry: RwLock::new(Geometry::new(cols, rows)),
            host: RwLock::new(None),
            disposed: AtomicBool::new(false),
            data_listeners: Listeners::new(),
            binary_listeners: Listeners::new(),
            resize_listeners: Listeners::new(),
            open_listeners: Listeners::new(),
            addons: Mutex::new(Vec::new()),
            output: Mutex::new(String::new()),
        })
    }

    /// 当前列数
    pub fn cols(&self) -> u16 {
        self.geometry.read().cols
    }

    /// 当前行数
    pub fn rows(&self) -> u16 {
        self.geometry.read().rows
    }

    /// 当前几何尺寸
    pub fn geometry(&self) -> Geometry {
        *self.geometry.read()
    }

    /// 终端是否已挂载到宿主元素
    pub fn is_open(&self) -> bool {
        self.host.read().is_some()
    }

    /// 获取挂载的宿主元素
    pub fn host(&self) -> Option<Arc<HostElement>> {
        self.host.read().clone()
    }

    /// 装载插件并立即激活（顺序 = 配置顺序）
    pub fn load_addon(
        self: &Arc<Self>,
        addon: Arc<dyn TerminalAddon>,
    ) -> Result<(), AddonError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(AddonError::TerminalDisposed);
        }
        tracing::debug!("[终端] 装载插件: {}", addon.name());
        self.addons.lock().push(addon.clone());
        addon.activate(self.clone())
    }

    /// 将终端挂载到宿主元素并触发一次性挂载回调
    pub fn open(self: &Arc<Self>, host: Arc<HostElement>) {
        if self.disposed.load(Ordering::SeqCst) {
            tracing::warn!("[终端] 实例已销毁，忽略挂载请求");
            return;
        }
        *self.host.write() = Some(host);
        self.open_listeners.emit(&());
    }

    /// 写入一帧后端输出（追加到渲染缓冲）
    pub fn write(&self, data: &str) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        self.output.lock().push_str(data);
    }

    /// 渲染缓冲快照
    pub fn output(&self) -> String {
        self.output.lock().clone()
    }

    /// 注入终端侧文本活动（键盘源）
    pub fn feed_input(&self, data: &str) {
        self.data_listeners.emit(&data.to_string());
    }

    /// 注入终端侧二进制活动
    pub fn feed_binary(&self, data: &[u8]) {
        self.binary_listeners.emit(&data.to_vec());
    }

    /// 变更几何尺寸；仅在实际变化时通知监听器
    pub fn resize(&self, cols: u16, rows: u16) {
        let next = Geometry::new(cols, rows);
        {
            let mut geometry = self.geometry.write();
            if *geometry == next {
                return;
            }
            *geometry = next;
        }
        tracing::debug!("[终端] 几何尺寸变更为 {}x{}", cols, rows);
        self.resize_listeners.emit(&next);
    }

    /// 监听终端文本活动
    pub fn on_data(&self, callback: impl Fn(&String) + Send + Sync + 'static) -> ListenerHandle {
        self.data_listeners.subscribe(callback)
    }

    /// 监听终端二进制活动
    pub fn on_binary(
        &self,
        callback: impl Fn(&Vec<u8>) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.binary_listeners.subscribe(callback)
    }

    /// 监听几何尺寸变化
    pub fn on_resize(
        &self,
        callback: impl Fn(&Geometry) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.resize_listeners.subscribe(callback)
    }

    /// 监听挂载事件（一次性）
    pub fn on_open_once(&self, callback: impl Fn(&()) + Send + Sync + 'static) -> ListenerHandle {
        self.open_listeners.subscribe_once(callback)
    }

    /// 当前登记的监听器总数（用于泄漏核对）
    pub fn listener_count(&self) -> usize {
        self.data_listeners.len()
            + self.binary_listeners.len()
            + self.resize_listeners.len()
            + self.open_listeners.len()
    }

    /// 已装载的插件数量
    pub fn addon_count(&self) -> usize {
        self.addons.lock().len()
    }

    /// 销毁终端实例
    ///
    /// 按装载顺序的逆序级联销毁插件，随后清空全部监听器。幂等。
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let addons: Vec<Arc<dyn TerminalAddon>> = {
            let mut addons = self.addons.lock();
            addons.drain(..).rev().collect()
        };
        for addon in addons {
            tracing::debug!("[终端] 销毁插件: {}", addon.name());
            addon.dispose();
        }

        self.data_listeners.clear();
        self.binary_listeners.clear();
        self.resize_listeners.clear();
        self.open_listeners.clear();
        *self.host.write() = None;
        tracing::debug!("[终端] 实例已销毁");
    }
}

impl Disposable for TerminalHandle {
    fn dispose(&self) {
        TerminalHandle::dispose(self);
    }
}
