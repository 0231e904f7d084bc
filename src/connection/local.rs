//! 进程内连接实现
//!
//! 将控制台消息直接分发到本地会话管理器，用于宿主与后端同进程
//! 部署的场景。消息路由规则与远程后端一致：
//! - `console/create_session` 经订阅原语建立会话并注册输出回调
//! - `console/input` / `console/resize` 按 `session_id` 路由，
//!   会话不存在时以发送失败上报

use std::sync::Arc;

use async_trait::async_trait;

use super::{Connection, ConnectionError, ConsoleMessage, OutputHandler, Unsubscribe};
use crate::server::ConsoleSessionManager;

/// 进程内连接
pub struct LocalConnection {
    manager: Arc<ConsoleSessionManager>,
}

impl LocalConnection {
    /// 基于会话管理器创建连接
    pub fn new(manager: Arc<ConsoleSessionManager>) -> Arc<Self> {
        Arc::new(Self { manager })
    }

    /// 获取底层会话管理器
    pub fn manager(&self) -> &Arc<ConsoleSessionManager> {
        &self.manager
    }
}

#[async_trait]
impl Connection for LocalConnection {
    async fn send_message(&self, msg: ConsoleMessage) -> Result<(), ConnectionError> {
        match msg {
            ConsoleMessage::Input { session_id, data } => self
                .manager
                .write_to_session(&session_id, data.as_bytes())
                .await
                .map_err(|e| ConnectionError::SendFailed(e.to_string())),
            ConsoleMessage::Resize {
                session_id,
                cols,
                rows,
            } => self
                .manager
                .resize_session(&session_id, rows, cols)
                .await
                .map_err(|e| ConnectionError::SendFailed(e.to_string())),
            ConsoleMessage::CreateSession { .. } => Err(ConnectionError::SendFailed(
                "create_session 消息必须经订阅原语发送".to_string(),
            )),
        }
    }

    async fn subscribe_message(
        &self,
        handler: OutputHandler,
        msg: ConsoleMessage,
    ) -> Result<Unsubscribe, ConnectionError> {
        let ConsoleMessage::CreateSession { session_id } = msg else {
            return Err(ConnectionError::SubscribeFailed(format!(
                "不支持以 {} 消息建立订阅",
                msg.message_type()
            )));
        };

        self.manager
            .create_session(&session_id, handler)
            .await
            .map_err(|e| ConnectionError::SubscribeFailed(e.to_string()))?;

        let manager = self.manager.clone();
        Ok(Box::new(move || {
            // 取消订阅动作是同步的，关闭请求交给运行时完成
            tokio::spawn(async move {
                if let Err(e) = manager.close_session(&session_id).await {
                    tracing::debug!("[连接] 取消订阅时关闭会话失败: {}", e);
                }
            });
        }))
    }
}
