//! 后端会话模块
//!
//! 承载真实的 PTY 会话：会话管理器负责按会话 ID 创建、路由与
//! 关闭，PTY 封装负责进程生命周期与输出读取。前端通过本地连接
//! 适配器（见 `connection::local`）把控制台消息桥接到这里。

mod error;
mod pty_session;
mod session_manager;


pub use error::ServerError;
pub use pty_session::{PtySession, DEFAULT_COLS, DEFAULT_ROWS};
pub use session_manager::{ConsoleSessionManager, SessionMetadata, SessionStatus};
