//! 后端模块错误类型

use thiserror::Error;

/// 后端错误类型
#[derive(Debug, Error)]
pub enum ServerError {
    /// 会话不存在
    #[error("会话不存在: {0}")]
    SessionNotFound(String),

    /// 会话已存在
    #[error("会话已存在: {0}")]
    SessionExists(String),

    /// PTY 创建失败
    #[error("PTY 创建失败: {0}")]
    PtyCreationFailed(String),

    /// 写入失败
    #[error("写入失败: {0}")]
    WriteFailed(String),

    /// 调整大小失败
    #[error("调整大小失败: {0}")]
    ResizeFailed(String),
}

impl From<ServerError> for String {
    fn from(err: ServerError) -> Self {
        err.to_string()
    }
}
