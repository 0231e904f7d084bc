//! 会话插件
//!
//! 维护一个终端实例与零或一个后端会话之间的绑定：把终端侧活动
//! 转发给后端，把后端推送的输出帧写回终端。
//!
//! ## 架构说明
//! 会话标识在插件构造时生成一次，整个生命周期不变；每条出站消息
//! 都携带该标识，后端据此在连接对象更换后仍能关联到同一会话。
//! 订阅建立是异步的：`connect` 返回后存在一个窗口，期间终端活动
//! 触发的出站发送各自独立等待连接层的请求/响应契约，不会等待订阅
//! 完成——订阅生效前的早期会话输出可能丢失，这是协议的已接受限制。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use uuid::Uuid;

use crate::connection::{
    same_connection, Connection, ConnectionError, ConsoleMessage, OutputHandler,
};
use crate::scope::{Disposable, DisposeOnce, Scope};
use crate::terminal::{AddonError, Geometry, TerminalAddon, TerminalHandle};

/// 会话插件错误类型
#[derive(Debug, Error)]
pub enum SessionError {
    /// 插件尚未激活
    #[error("会话插件尚未激活，无法绑定连接")]
    NotActivated,

    /// 连接层错误
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// 会话插件
///
/// 同一时刻最多持有一个（连接, 订阅）对。连接对象以只读方式共享，
/// 插件从不修改它。
pub struct SessionAddon {
    session_id: String,
    activated: AtomicBool,
    terminal: RwLock<Option<Weak<TerminalHandle>>>,
    connection: RwLock<Option<Arc<dyn Connection>>>,
    subscription: Mutex<Option<Arc<DisposeOnce>>>,
    rebind_lock: tokio::sync::Mutex<()>,
    scope: Scope,
}

impl SessionAddon {
    /// 创建会话插件并生成进程内唯一的会话标识
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            session_id: Uuid::new_v4().to_string(),
            activated: AtomicBool::new(false),
            terminal: RwLock::new(None),
            connection: RwLock::new(None),
            subscription: Mutex::new(None),
            rebind_lock: tokio::sync::Mutex::new(()),
            scope: Scope::new(),
        })
    }

    /// 会话标识（插件生命周期内不变）
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// 当前绑定的连接
    pub fn connection(&self) -> Option<Arc<dyn Connection>> {
        self.connection.read().clone()
    }

    /// 是否存在存活的会话订阅
    pub fn has_subscription(&self) -> bool {
        self.subscription
            .lock()
            .as_ref()
            .is_some_and(|s| !s.is_done())
    }

    /// 绑定（或重绑）远程连接
    ///
    /// 与已绑定连接为同一对象时是空操作；换绑时先解除旧订阅再建立
    /// 新订阅。并发的 `connect` 调用按到达顺序串行执行，保证任意
    /// 时刻至多存在一个（连接, 订阅）对。订阅建立失败时插件保持
    /// 连接绑定但没有输出通道，不做自动重试，后续以另一个连接调用
    /// `connect` 会再次尝试。
    pub async fn connect(&self, connection: Arc<dyn Connection>) -> Result<(), SessionError> {
        if !self.activated.load(Ordering::SeqCst) {
            return Err(SessionError::NotActivated);
        }

        // 整个重绑流程持有串行锁：订阅建立是异步的，若不串行，
        // 交错的 connect 会各自通过同对象检查并重复订阅
        let _rebind = self.rebind_lock.lock().await;

        if let Some(current) = self.connection.read().clone() {
            if same_connection(&current, &connection) {
                tracing::debug!("[会话插件] 连接对象未变化，跳过重绑: {}", self.session_id);
                return Ok(());
            }
        }

        // 换绑：先解除旧订阅，再绑定新连接
        if let Some(subscription) = self.subscription.lock().take() {
            subscription.dispose();
        }
        *self.connection.write() = Some(connection.clone());

        let terminal = self.terminal.read().clone();
        let handler: OutputHandler = Arc::new(move |data: &str| {
            // 终端销毁后到达的迟到帧被静默丢弃
            if let Some(terminal) = terminal.as_ref().and_then(Weak::upgrade) {
                terminal.write(data);
            }
        });

        tracing::info!("[会话插件] 建立会话订阅: {}", self.session_id);
        let unsubscribe = connection
            .subscribe_message(
                handler,
                ConsoleMessage::CreateSession {
                    session_id: self.session_id.clone(),
                },
            )
            .await?;

        let guard = DisposeOnce::new(unsubscribe);
        *self.subscription.lock() = Some(guard.clone());
        self.scope.bind(guard);
        Ok(())
    }

    fn forward_input(&self, data: String) {
        let Some(connection) = self.connection.read().clone() else {
            tracing::debug!("[会话插件] 未绑定连接，丢弃终端输入");
            return;
        };
        let msg = ConsoleMessage::Input {
            session_id: self.session_id.clone(),
            data,
        };
        tokio::spawn(async move {
            if let Err(e) = connection.send_message(msg).await {
                tracing::warn!("[会话插件] 输入转发失败: {}", e);
            }
        });
    }

    fn forward_resize(&self, geometry: Geometry) {
        let Some(connection) = self.connection.read().clone() else {
            return;
        };
        let msg = ConsoleMessage::Resize {
            session_id: self.session_id.clone(),
            cols: geometry.cols,
            rows: geometry.rows,
        };
        tokio::spawn(async move {
            if let Err(e) = connection.send_message(msg).await {
                tracing::warn!("[会话插件] 尺寸通告失败: {}", e);
            }
        });
    }
}

impl TerminalAddon for SessionAddon {
    fn name(&self) -> &str {
        "session"
    }

    /// 绑定插件到终端实例
    ///
    /// 每个插件实例最多激活一次；登记三个终端事件转发器
    /// （二进制输出、文本输出、几何变化），若此时已绑定连接则立即
    /// 通告终端当前几何尺寸。
    fn activate(self: Arc<Self>, terminal: Arc<TerminalHandle>) -> Result<(), AddonError> {
        if self.activated.swap(true, Ordering::SeqCst) {
            return Err(AddonError::AlreadyActivated);
        }
        *self.terminal.write() = Some(Arc::downgrade(&terminal));

        let addon = self.clone();
        self.scope.bind(terminal.on_binary(move |data| {
            // 二进制块按字节映射为字符，与终端二进制事件的约定一致
            addon.forward_input(data.iter().map(|&b| b as char).collect());
        }));

        let addon = self.clone();
        self.scope
            .bind(terminal.on_data(move |data| addon.forward_input(data.clone())));

        let addon = self.clone();
        self.scope
            .bind(terminal.on_resize(move |geometry| addon.forward_resize(*geometry)));

        if self.connection.read().is_some() {
            self.forward_resize(terminal.geometry());
        }

        tracing::debug!("[会话插件] 已激活: {}", self.session_id);
        Ok(())
    }

    fn dispose(&self) {
        self.scope.dispose();
        self.subscription.lock().take();
        tracing::debug!("[会话插件] 已销毁: {}", self.session_id);
    }
}
