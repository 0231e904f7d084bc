//! 远程连接抽象
//!
//! 定义插件与后端之间的异步消息连接接口。连接对象由宿主提供，
//! 本模块只约定其形状：一个请求/响应原语和一个订阅原语。
//! 连接断开后的重连是连接对象自身的职责，不在此处处理。
//!
//! ## 模块结构
//! - `messages` - 线上消息协议定义
//! - `local` - 进程内连接实现（桥接到本地会话管理器）

mod local;
mod messages;

#[cfg(test)]
pub(crate) mod mock;

pub use local::LocalConnection;
pub use messages::{message_types, ConsoleMessage};

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// 连接错误类型
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// 发送消息失败
    #[error("发送消息失败: {0}")]
    SendFailed(String),

    /// 建立订阅失败
    #[error("建立订阅失败: {0}")]
    SubscribeFailed(String),
}

/// 入站输出帧处理回调
pub type OutputHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// 取消订阅动作
pub type Unsubscribe = Box<dyn FnOnce() + Send>;

/// 远程连接接口
///
/// 连接对象在多个会话插件之间以只读方式共享（从不被修改）。
/// 单个插件的连续出站发送不保证按提交顺序完成；若后端要求逐条
/// 有序，该保证必须由连接层提供。
#[async_trait]
pub trait Connection: Send + Sync {
    /// 请求/响应原语：发送一条消息并等待其结果
    async fn send_message(&self, msg: ConsoleMessage) -> Result<(), ConnectionError>;

    /// 订阅原语：以一条初始消息建立订阅，入站数据帧经 `handler` 回调，
    /// 成功时返回取消订阅动作
    async fn subscribe_message(
        &self,
        handler: OutputHandler,
        msg: ConsoleMessage,
    ) -> Result<Unsubscribe, ConnectionError>;
}

/// 判断两个连接是否为同一对象（数据指针相等）
pub fn same_connection(a: &Arc<dyn Connection>, b: &Arc<dyn Connection>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// 后端上下文
///
/// 宿主向终端元素注入的环境对象，至少包含一个符合 [`Connection`]
/// 形状的连接。
#[derive(Clone)]
pub struct HassContext {
    /// 远程连接
    pub connection: Arc<dyn Connection>,
}

impl HassContext {
    /// 创建后端上下文
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self { connection }
    }

    /// 两个上下文是否持有同一个连接对象
    pub fn same_connection(&self, other: &HassContext) -> bool {
        same_connection(&self.connection, &other.connection)
    }
}

impl std::fmt::Debug for HassContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HassContext")
            .field("connection", &Arc::as_ptr(&self.connection))
            .finish()
    }
}
