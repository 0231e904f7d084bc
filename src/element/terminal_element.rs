//! 终端元素
//!
//! 把终端实例和它的插件集合组合起来，负责挂载/卸载生命周期。
//! 不变式：终端实例与插件集合总是一起创建、一起销毁——插件不会
//! 比终端活得久，终端实例也不跨挂载复用。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::host::HostElement;
use crate::addons::{AutoFitAddon, SessionAddon};
use crate::connection::HassContext;
use crate::mirror::{AmbientSink, AmbientValue};
use crate::terminal::{AddonError, TerminalHandle};

/// 一次挂载期间存活的终端与插件集合
struct MountedTerminal {
    terminal: Arc<TerminalHandle>,
    session: Arc<SessionAddon>,
}

/// 终端元素
pub struct TerminalElement {
    host: Arc<HostElement>,
    hass: RwLock<Option<HassContext>>,
    narrow: AtomicBool,
    mounted: Mutex<Option<MountedTerminal>>,
}

impl TerminalElement {
    /// 基于宿主元素创建未挂载的终端元素
    pub fn new(host: Arc<HostElement>) -> Arc<Self> {
        Arc::new(Self {
            host,
            hass: RwLock::new(None),
            narrow: AtomicBool::new(false),
            mounted: Mutex::new(None),
        })
    }

    /// 挂载回调
    ///
    /// 构造全新的终端实例与插件集合，按配置顺序装载插件，把终端
    /// 挂载到宿主元素；若后端上下文已缓存则立即连接会话插件。
    /// 连接失败不会使挂载失败：失败的会话只表现为无回显（协议中
    /// 没有显式错误通道）。
    pub async fn connected_callback(&self) -> Result<(), AddonError> {
        if let Some(previous) = self.mounted.lock().take() {
            tracing::warn!("[终端元素] 重复挂载，先销毁上一次挂载的终端");
            previous.terminal.dispose();
        }

        let terminal = TerminalHandle::new();
        let fit = AutoFitAddon::new();
        let session = SessionAddon::new();

        // 插件装载顺序 = 配置顺序
        terminal.load_addon(fit)?;
        terminal.load_addon(session.clone())?;
        terminal.open(self.host.clone());

        *self.mounted.lock() = Some(MountedTerminal {
            terminal,
            session: session.clone(),
        });

        // 先取出缓存值再 await：if let 的临时读锁会活过整个块，
        // 挂起期间到达的 set_hass 会在写锁上阻塞
        let context = self.hass.read().clone();
        if let Some(context) = context {
            if let Err(e) = session.connect(context.connection).await {
                tracing::warn!("[终端元素] 挂载时连接会话失败: {}", e);
            }
        }

        tracing::debug!("[终端元素] 已挂载");
        Ok(())
    }

    /// 卸载回调
    ///
    /// 丢弃插件集合并销毁终端（级联销毁全部已装载插件）。
    pub fn disconnected_callback(&self) {
        if let Some(mounted) = self.mounted.lock().take() {
            mounted.terminal.dispose();
            tracing::debug!("[终端元素] 已卸载");
        }
    }

    /// 设置后端上下文
    ///
    /// 已挂载时立即（重）连接会话插件——连接对象未变化时重连是
    /// 空操作；未挂载时只缓存，供下一次挂载使用。
    pub fn set_hass(&self, context: HassContext) {
        *self.hass.write() = Some(context.clone());

        let session = self.mounted.lock().as_ref().map(|m| m.session.clone());
        if let Some(session) = session {
            tokio::spawn(async move {
                if let Err(e) = session.connect(context.connection).await {
                    tracing::warn!("[终端元素] 重连会话失败: {}", e);
                }
            });
        }
    }

    /// 设置窄布局标志
    pub fn set_narrow(&self, narrow: bool) {
        self.narrow.store(narrow, Ordering::SeqCst);
    }

    /// 当前窄布局标志
    pub fn narrow(&self) -> bool {
        self.narrow.load(Ordering::SeqCst)
    }

    /// 是否处于挂载状态
    pub fn is_mounted(&self) -> bool {
        self.mounted.lock().is_some()
    }

    /// 宿主元素
    pub fn host(&self) -> &Arc<HostElement> {
        &self.host
    }

    /// 当前挂载的终端实例
    pub fn terminal(&self) -> Option<Arc<TerminalHandle>> {
        self.mounted.lock().as_ref().map(|m| m.terminal.clone())
    }

    /// 当前挂载的会话插件
    pub fn session(&self) -> Option<Arc<SessionAddon>> {
        self.mounted.lock().as_ref().map(|m| m.session.clone())
    }
}

impl AmbientSink for TerminalElement {
    fn name(&self) -> &str {
        "terminal-element"
    }

    fn apply(&self, value: &AmbientValue) {
        match value {
            AmbientValue::Hass(context) => self.set_hass(context.clone()),
            AmbientValue::Narrow(narrow) => self.set_narrow(*narrow),
        }
    }
}
