//! 后端会话管理器
//!
//! 管理所有后端会话的生命周期，按会话 ID 路由输入与尺寸调整。
//! 会话 ID 由前端的会话插件生成并随每条消息携带，连接对象更换
//! 后仍能关联到已创建的会话。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::error::ServerError;
use super::pty_session::{PtySession, DEFAULT_COLS, DEFAULT_ROWS};
use crate::connection::OutputHandler;

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// 正在连接
    Connecting,
    /// 运行中
    Running,
    /// 已结束
    Done,
    /// 错误
    Error,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::Connecting
    }
}

/// 会话元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// 会话 ID
    pub id: String,
    /// 会话状态
    pub status: SessionStatus,
    /// 创建时间（Unix 时间戳，毫秒）
    pub created_at: i64,
    /// 终端行数
    pub rows: u16,
    /// 终端列数
    pub cols: u16,
}

/// 内部会话数据
struct SessionData {
    session: PtySession,
    metadata: SessionMetadata,
}

/// 后端会话管理器
#[derive(Default)]
pub struct ConsoleSessionManager {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
}

impl ConsoleSessionManager {
    /// 创建新的会话管理器
    pub fn new() -> Arc<Self> {
        tracing::info!("[后端] 会话管理器已初始化");
        Arc::new(Self::default())
    }

    /// 以指定 ID 创建会话并注册输出回调
    ///
    /// PTY 使用默认大小 (24x80) 预创建，前端随后通过 resize 同步
    /// 实际大小。重复的会话 ID 被拒绝。
    pub async fn create_session(
        &self,
        session_id: &str,
        output: OutputHandler,
    ) -> Result<(), ServerError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(session_id) {
            return Err(ServerError::SessionExists(session_id.to_string()));
        }

        let session = PtySession::new(session_id.to_string(), output)?;
        let metadata = SessionMetadata {
            id: session_id.to_string(),
            status: SessionStatus::Running,
            created_at: Utc::now().timestamp_millis(),
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
        };
        sessions.insert(session_id.to_string(), SessionData { session, metadata });

        tracing::info!(
            "[后端] 创建会话: {} (默认大小 {}x{})",
            session_id,
            DEFAULT_COLS,
            DEFAULT_ROWS
        );
        Ok(())
    }

    /// 向会话发送输入
    pub async fn write_to_session(
        &self,
        session_id: &str,
        data: &[u8],
    ) -> Result<(), ServerError> {
        let sessions = self.sessions.read().await;
        let session_data = sessions
            .get(session_id)
            .ok_or_else(|| ServerError::SessionNotFound(session_id.to_string()))?;
        session_data.session.write(data)
    }

    /// 调整会话大小
    pub async fn resize_session(
        &self,
        session_id: &str,
        rows: u16,
        cols: u16,
    ) -> Result<(), ServerError> {
        let mut sessions = self.sessions.write().await;
        let session_data = sessions
            .get_mut(session_id)
            .ok_or_else(|| ServerError::SessionNotFound(session_id.to_string()))?;

        session_data.session.resize(rows, cols)?;
        session_data.metadata.rows = rows;
        session_data.metadata.cols = cols;
        Ok(())
    }

    /// 关闭并移除会话
    pub async fn close_session(&self, session_id: &str) -> Result<(), ServerError> {
        let mut sessions = self.sessions.write().await;
        let session_data = sessions
            .remove(session_id)
            .ok_or_else(|| ServerError::SessionNotFound(session_id.to_string()))?;

        session_data.session.close();
        tracing::info!("[后端] 关闭会话: {}", session_id);
        Ok(())
    }

    /// 获取会话的输出历史
    pub async fn get_session_history(&self, session_id: &str) -> Result<String, ServerError> {
        let sessions = self.sessions.read().await;
        let session_data = sessions
            .get(session_id)
            .ok_or_else(|| ServerError::SessionNotFound(session_id.to_string()))?;
        Ok(session_data.session.history())
    }

    /// 获取单个会话信息
    pub async fn get_session(&self, session_id: &str) -> Option<SessionMetadata> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map(|data| data.metadata.clone())
    }

    /// 获取所有会话列表
    pub async fn list_sessions(&self) -> Vec<SessionMetadata> {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .map(|data| data.metadata.clone())
            .collect()
    }

    /// 活跃会话数量
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
