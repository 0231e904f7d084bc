//! 资源释放账本
//!
//! 提供统一的资源释放机制：组件在获取资源的同时登记对应的释放动作，
//! 销毁时按登记的逆序执行。
//!
//! ## 模块结构
//! - `Disposable` - 可释放能力 Trait
//! - `Scope` - 释放动作账本（LIFO）
//! - `DisposeOnce` - 一次性释放守卫

use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// 可释放能力 Trait
///
/// 实现此 Trait 的类型可以被 [`Scope::bind`] 登记，在作用域销毁时释放。
pub trait Disposable {
    /// 释放资源（要求幂等）
    fn dispose(&self);
}

impl<T: Disposable + ?Sized> Disposable for Arc<T> {
    fn dispose(&self) {
        (**self).dispose();
    }
}

/// 释放动作账本
///
/// 按登记顺序的逆序（LIFO）执行释放动作。不变式：
/// - 每个动作最多执行一次
/// - `dispose` 幂等，销毁后可继续登记新动作
/// - 销毁过程中允许登记新动作（基于 pop 的遍历天然容忍）
#[derive(Default)]
pub struct Scope {
    actions: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

impl Scope {
    /// 创建空账本
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个可释放对象，销毁时调用其 `dispose`
    pub fn bind(&self, disposable: impl Disposable + Send + 'static) {
        self.on_dispose(move || disposable.dispose());
    }

    /// 登记任意释放动作
    pub fn on_dispose(&self, action: impl FnOnce() + Send + 'static) {
        self.actions.lock().push(Box::new(action));
    }

    /// 当前登记的释放动作数量
    pub fn len(&self) -> usize {
        self.actions.lock().len()
    }

    /// 账本是否为空
    pub fn is_empty(&self) -> bool {
        self.actions.lock().is_empty()
    }

    /// 逆序执行并清空所有释放动作
    ///
    /// 单个动作 panic 不会中断剩余动作的执行；失败会通过日志汇总上报。
    /// 每次只在锁内弹出一个动作，锁外执行，因此动作内部允许再次登记
    /// 或再次触发 `dispose`。
    pub fn dispose(&self) {
        let mut failures = 0usize;
        loop {
            let action = self.actions.lock().pop();
            let Some(action) = action else { break };
            if catch_unwind(AssertUnwindSafe(action)).is_err() {
                failures += 1;
                tracing::error!("[作用域] 释放动作执行失败，继续执行剩余动作");
            }
        }
        if failures > 0 {
            tracing::error!("[作用域] 共 {} 个释放动作执行失败", failures);
        }
    }
}

impl Disposable for Scope {
    fn dispose(&self) {
        Scope::dispose(self);
    }
}

/// 一次性释放守卫
///
/// 包装一个只能执行一次的释放动作。同一个守卫可以同时登记到 [`Scope`]
/// 并在别处提前释放（例如连接重绑时先解除旧订阅），不会重复执行。
pub struct DisposeOnce {
    action: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl DisposeOnce {
    /// 创建守卫
    pub fn new(action: impl FnOnce() + Send + 'static) -> Arc<Self> {
        Arc::new(Self {
            action: Mutex::new(Some(Box::new(action))),
        })
    }

    /// 动作是否已执行
    pub fn is_done(&self) -> bool {
        self.action.lock().is_none()
    }
}

impl Disposable for DisposeOnce {
    fn dispose(&self) {
        if let Some(action) = self.action.lock().take() {
            action();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(Arc<AtomicUsize>);

    impl Disposable for Counter {
        fn dispose(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_dispose_runs_in_reverse_order() {
        let scope = Scope::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let log = log.clone();
            scope.on_dispose(move || log.lock().push(i));
        }

        scope.dispose();
        assert_eq!(*log.lock(), vec![2, 1, 0]);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let scope = Scope::new();
        let count = Arc::new(AtomicUsize::new(0));

        scope.bind(Counter(count.clone()));
        scope.dispose();
        scope.dispose();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(scope.is_empty());
    }

    #[test]
    fn test_scope_usable_after_dispose() {
        let scope = Scope::new();
        let count = Arc::new(AtomicUsize::new(0));

        scope.bind(Counter(count.clone()));
        scope.dispose();

        scope.bind(Counter(count.clone()));
        scope.dispose();

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panicking_action_does_not_stop_remaining() {
        let scope = Scope::new();
        let count = Arc::new(AtomicUsize::new(0));

        scope.bind(Counter(count.clone()));
        scope.on_dispose(|| panic!("释放失败"));
        scope.bind(Counter(count.clone()));

        scope.dispose();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_registration_during_dispose_is_tolerated() {
        let scope = Arc::new(Scope::new());
        let count = Arc::new(AtomicUsize::new(0));

        let inner_scope = scope.clone();
        let inner_count = count.clone();
        scope.on_dispose(move || {
            inner_scope.bind(Counter(inner_count));
        });

        scope.dispose();
        // 销毁过程中登记的动作也会被执行
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(scope.is_empty());
    }

    #[test]
    fn test_dispose_once_runs_at_most_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        let guard = DisposeOnce::new(move || {
            inner.fetch_add(1, Ordering::SeqCst);
        });

        let scope = Scope::new();
        scope.bind(guard.clone());

        guard.dispose();
        assert!(guard.is_done());
        scope.dispose();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
