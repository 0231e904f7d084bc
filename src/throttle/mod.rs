//! 调用节流
//!
//! 将一个无参动作包装为限频版本：安静期内的首次调用立即执行，
//! 间隔内的后续调用合并为一次尾随执行（trailing-edge debounce）。
//!
//! 尾随执行的触发时刻以上一次成功执行为下限：间隔内每次调用都会取消
//! 并重排已挂起的尾随任务。节流器内部的定时状态由创建它的组件独占。

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::scope::Disposable;

/// 默认间隔：最小正调度单位（近似"下一个 tick"）
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1);

struct ThrottleState {
    last_run: Option<Instant>,
    pending: Option<JoinHandle<()>>,
    disposed: bool,
}

struct ThrottleInner {
    action: Box<dyn Fn() + Send + Sync>,
    interval: Duration,
    state: Mutex<ThrottleState>,
}

impl ThrottleInner {
    fn fire(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            state.last_run = Some(Instant::now());
            state.pending = None;
        }
        (self.action)();
    }
}

/// 节流器
///
/// 必须在 tokio 运行时内调用（尾随执行通过 `tokio::spawn` 调度）。
/// 克隆后共享同一份内部状态。
#[derive(Clone)]
pub struct Throttle {
    inner: Arc<ThrottleInner>,
}

impl Throttle {
    /// 以默认间隔创建节流器
    pub fn new(action: impl Fn() + Send + Sync + 'static) -> Self {
        Self::with_interval(DEFAULT_INTERVAL, action)
    }

    /// 以指定间隔创建节流器
    pub fn with_interval(interval: Duration, action: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(ThrottleInner {
                action: Box::new(action),
                interval: interval.max(DEFAULT_INTERVAL),
                state: Mutex::new(ThrottleState {
                    last_run: None,
                    pending: None,
                    disposed: false,
                }),
            }),
        }
    }

    /// 请求执行一次动作
    ///
    /// 距上次执行超过间隔且无挂起任务时立即执行；否则取消已挂起的
    /// 尾随任务并按剩余时间重新调度，突发调用因此合并为一次执行。
    pub fn call(&self) {
        let mut state = self.inner.state.lock();
        if state.disposed {
            return;
        }

        let now = Instant::now();
        let elapsed = state.last_run.map(|t| now.duration_since(t));
        let quiet = match elapsed {
            None => true,
            Some(e) => e >= self.inner.interval,
        };

        if quiet && state.pending.is_none() {
            state.last_run = Some(now);
            drop(state);
            (self.inner.action)();
            return;
        }

        // 尾随执行：以上次成功执行为基准计算剩余等待时间
        let remaining = match elapsed {
            Some(e) => self.inner.interval.saturating_sub(e).max(DEFAULT_INTERVAL),
            None => self.inner.interval,
        };
        if let Some(handle) = state.pending.take() {
            handle.abort();
        }
        let inner = Arc::clone(&self.inner);
        state.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            inner.fire();
        }));
    }

    /// 上次执行以来经过的时间
    pub fn elapsed(&self) -> Option<Duration> {
        self.inner.state.lock().last_run.map(|t| t.elapsed())
    }

    /// 是否有挂起的尾随任务
    pub fn has_pending(&self) -> bool {
        self.inner.state.lock().pending.is_some()
    }
}

impl Disposable for Throttle {
    /// 取消挂起的尾随任务并禁止后续执行
    fn dispose(&self) {
        let mut state = self.inner.state.lock();
        state.disposed = true;
        if let Some(handle) = state.pending.take() {
            handle.abort();
        }
    }
}
