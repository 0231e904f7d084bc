//! PTY 会话封装
//!
//! 封装单个 PTY 进程，处理输入输出和生命周期管理。
//!
//! ## 架构说明
//! PTY 以默认大小 (24x80) 预创建，前端订阅建立后通过 resize 同步
//! 实际大小。输出由独立线程读取：每一帧经注册的输出回调推送给
//! 订阅方，同时追加到有界的历史缓冲区，供前端重新接入时回放。

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use portable_pty::{native_pty_system, CommandBuilder, PtySize};

use super::error::ServerError;
use super::session_manager::SessionStatus;
use crate::connection::OutputHandler;

/// 默认终端行数
pub const DEFAULT_ROWS: u16 = 24;
/// 默认终端列数
pub const DEFAULT_COLS: u16 = 80;
/// 输出历史缓冲区最大大小 (1MB)
const HISTORY_MAX_SIZE: usize = 1024 * 1024;

/// 有界历史缓冲区
struct HistoryBuffer {
    data: String,
    max_size: usize,
}

impl HistoryBuffer {
    fn new(max_size: usize) -> Self {
        Self {
            data: String::new(),
            max_size,
        }
    }

    fn append(&mut self, frame: &str) {
        self.data.push_str(frame);
        if self.data.len() > self.max_size {
            // 只保留最后 max_size 字节（按字符边界截断）
            let excess = self.data.len() - self.max_size;
            let cut = self
                .data
                .char_indices()
                .map(|(i, _)| i)
                .find(|&i| i >= excess)
                .unwrap_or(0);
            self.data.drain(0..cut);
        }
    }
}

/// PTY 会话
pub struct PtySession {
    id: String,
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    master: Arc<Mutex<Box<dyn portable_pty::MasterPty + Send>>>,
    status: Arc<RwLock<SessionStatus>>,
    shutdown_flag: Arc<AtomicBool>,
    history: Arc<Mutex<HistoryBuffer>>,
}

impl PtySession {
    /// 创建新的 PTY 会话（使用默认大小）
    ///
    /// 输出帧经 `output` 回调推送；回调在读取线程上调用。
    pub fn new(id: String, output: OutputHandler) -> Result<Self, ServerError> {
        Self::with_size(id, DEFAULT_ROWS, DEFAULT_COLS, output)
    }

    /// 创建新的 PTY 会话（指定大小）
    pub fn with_size(
        id: String,
        rows: u16,
        cols: u16,
        output: OutputHandler,
    ) -> Result<Self, ServerError> {
        tracing::info!("[后端] 创建 PTY 会话 {}, 大小: {}x{}", id, cols, rows);

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| ServerError::PtyCreationFailed(e.to_string()))?;

        // 用户默认 shell
        let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/bash".to_string());
        let mut cmd = CommandBuilder::new(&shell);
        cmd.env("TERM", "xterm-256color");
        if let Some(home) = dirs::home_dir() {
            cmd.cwd(home);
        }

        let _child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| ServerError::PtyCreationFailed(e.to_string()))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| ServerError::PtyCreationFailed(e.to_string()))?;
        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| ServerError::PtyCreationFailed(e.to_string()))?;

        let status = Arc::new(RwLock::new(SessionStatus::Running));
        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let history = Arc::new(Mutex::new(HistoryBuffer::new(HISTORY_MAX_SIZE)));

        let id_clone = id.clone();
        let status_clone = status.clone();
        let shutdown_clone = shutdown_flag.clone();
        let history_clone = history.clone();

        // 输出读取线程：逐帧推送给订阅方并记录历史
        std::thread::spawn(move || {
            let mut buffer = [0u8; 4096];
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("[后端] 会话 {} 收到关闭信号", id_clone);
                    break;
                }

                match reader.read(&mut buffer) {
                    Ok(0) => {
                        tracing::info!("[后端] 会话 {} 进程已退出", id_clone);
                        *status_clone.write() = SessionStatus::Done;
                        break;
                    }
                    Ok(n) => {
                        let frame = String::from_utf8_lossy(&buffer[..n]).into_owned();
                        history_clone.lock().append(&frame);
                        output(&frame);
                    }
                    Err(e) => {
                        if shutdown_clone.load(Ordering::Relaxed) {
                            break;
                        }
                        tracing::error!("[后端] 会话 {} 读取错误: {}", id_clone, e);
                        *status_clone.write() = SessionStatus::Error;
                        break;
                    }
                }
            }
        });

        Ok(Self {
            id,
            writer: Arc::new(Mutex::new(writer)),
            master: Arc::new(Mutex::new(pair.master)),
            status,
            shutdown_flag,
            history,
        })
    }

    /// 会话 ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 写入数据到 PTY
    pub fn write(&self, data: &[u8]) -> Result<(), ServerError> {
        let mut writer = self.writer.lock();
        writer
            .write_all(data)
            .map_err(|e| ServerError::WriteFailed(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| ServerError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    /// 调整 PTY 大小
    pub fn resize(&self, rows: u16, cols: u16) -> Result<(), ServerError> {
        self.master
            .lock()
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| ServerError::ResizeFailed(e.to_string()))?;
        tracing::debug!("[后端] 会话 {} 调整大小为 {}x{}", self.id, cols, rows);
        Ok(())
    }

    /// 当前状态
    pub fn status(&self) -> SessionStatus {
        *self.status.read()
    }

    /// 输出历史快照
    pub fn history(&self) -> String {
        self.history.lock().data.clone()
    }

    /// 关闭会话（幂等）
    pub fn close(&self) {
        self.shutdown_flag.store(true, Ordering::Relaxed);
        *self.status.write() = SessionStatus::Done;
        tracing::info!("[后端] 会话 {} 已关闭", self.id);
    }
}
