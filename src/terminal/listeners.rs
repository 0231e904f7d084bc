//! 事件监听器注册表
//!
//! 终端与宿主元素共用的回调登记机制。订阅返回的句柄实现
//! [`Disposable`]，可直接登记到作用域账本；移除操作幂等。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::scope::Disposable;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct ListenerEntry<T> {
    id: u64,
    once: bool,
    callback: Callback<T>,
}

/// 监听器注册表
pub(crate) struct Listeners<T> {
    entries: Arc<RwLock<Vec<ListenerEntry<T>>>>,
    next_id: AtomicU64,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<T: 'static> Listeners<T> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 登记回调，返回可释放的监听句柄
    pub(crate) fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> ListenerHandle {
        self.insert(callback, false)
    }

    /// 登记一次性回调（触发一次后自动移除）
    pub(crate) fn subscribe_once(
        &self,
        callback: impl Fn(&T) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.insert(callback, true)
    }

    fn insert(&self, callback: impl Fn(&T) + Send + Sync + 'static, once: bool) -> ListenerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.write().push(ListenerEntry {
            id,
            once,
            callback: Arc::new(callback),
        });

        let entries = Arc::downgrade(&self.entries);
        ListenerHandle {
            remove: Box::new(move || {
                if let Some(entries) = entries.upgrade() {
                    entries.write().retain(|e| e.id != id);
                }
            }),
        }
    }

    /// 触发所有回调
    ///
    /// 先在锁内取快照并移除一次性条目，再在锁外调用，
    /// 因此回调内部允许登记或移除监听器。
    pub(crate) fn emit(&self, value: &T) {
        let callbacks: Vec<Callback<T>> = {
            let mut entries = self.entries.write();
            let snapshot = entries.iter().map(|e| e.callback.clone()).collect();
            entries.retain(|e| !e.once);
            snapshot
        };
        for callback in callbacks {
            callback(value);
        }
    }

    /// 当前监听器数量
    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// 移除全部监听器
    pub(crate) fn clear(&self) {
        self.entries.write().clear();
    }
}

/// 监听句柄
///
/// 释放时将对应回调从注册表移除；重复释放是空操作。
pub struct ListenerHandle {
    remove: Box<dyn Fn() + Send + Sync>,
}

impl Disposable for ListenerHandle {
    fn dispose(&self) {
        (self.remove)();
    }
}
