//! 测试用连接实现
//!
//! 记录全部出站消息与订阅动作，供单元测试断言消息序列和
//! 订阅/取消订阅的相对顺序。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::{Connection, ConnectionError, ConsoleMessage, OutputHandler, Unsubscribe};

/// 测试连接
pub(crate) struct MockConnection {
    label: String,
    /// 经请求/响应原语发送的消息
    pub sent: Mutex<Vec<ConsoleMessage>>,
    /// 经订阅原语发送的初始消息
    pub subscriptions: Mutex<Vec<ConsoleMessage>>,
    /// 按会话 ID 登记的输出回调
    handlers: Arc<Mutex<HashMap<String, OutputHandler>>>,
    /// 订阅/取消订阅事件日志（可跨连接共享）
    pub events: Arc<Mutex<Vec<String>>>,
    /// 下一次订阅是否失败
    pub fail_next_subscribe: AtomicBool,
    /// 下一次订阅在完成前挂起等待的闸门
    subscribe_gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl MockConnection {
    pub(crate) fn new(label: &str) -> Arc<Self> {
        Self::with_events(label, Arc::new(Mutex::new(Vec::new())))
    }

    /// 创建共享事件日志的连接（用于跨连接顺序断言）
    pub(crate) fn with_events(label: &str, events: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            sent: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
            handlers: Arc::new(Mutex::new(HashMap::new())),
            events,
            fail_next_subscribe: AtomicBool::new(false),
            subscribe_gate: Mutex::new(None),
        })
    }

    /// 让下一次订阅挂起，直到返回的发送端被触发
    ///
    /// 用于构造订阅建立期间有其他调用交错到达的时序。
    pub(crate) fn gate_next_subscribe(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.subscribe_gate.lock() = Some(rx);
        tx
    }

    /// 模拟后端向指定会话推送一帧输出
    pub(crate) fn push_output(&self, session_id: &str, data: &str) {
        let handler = self.handlers.lock().get(session_id).cloned();
        if let Some(handler) = handler {
            handler(data);
        }
    }

    /// 当前存活的订阅数量
    pub(crate) fn active_subscriptions(&self) -> usize {
        self.handlers.lock().len()
    }

    /// 按类型筛选已发送消息
    pub(crate) fn sent_of_type(&self, message_type: &str) -> Vec<ConsoleMessage> {
        self.sent
            .lock()
            .iter()
            .filter(|m| m.message_type() == message_type)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn send_message(&self, msg: ConsoleMessage) -> Result<(), ConnectionError> {
        self.events
            .lock()
            .push(format!("send:{}:{}", self.label, msg.message_type()));
        self.sent.lock().push(msg);
        Ok(())
    }

    async fn subscribe_message(
        &self,
        handler: OutputHandler,
        msg: ConsoleMessage,
    ) -> Result<Unsubscribe, ConnectionError> {
        if self.fail_next_subscribe.swap(false, Ordering::SeqCst) {
            return Err(ConnectionError::SubscribeFailed("模拟订阅失败".to_string()));
        }

        let gate = self.subscribe_gate.lock().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let session_id = msg.session_id().to_string();
        self.events.lock().push(format!("subscribe:{}", self.label));
        self.subscriptions.lock().push(msg);
        self.handlers.lock().insert(session_id.clone(), handler);

        let label = self.label.clone();
        let events = self.events.clone();
        let handlers = self.handlers.clone();
        Ok(Box::new(move || {
            events.lock().push(format!("unsubscribe:{}", label));
            handlers.lock().remove(&session_id);
        }))
    }
}
