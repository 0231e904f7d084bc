//! 终端自适应插件
//!
//! 观察宿主元素的像素尺寸，按单元格度量换算出最优几何尺寸并应用
//! 到终端。每次应用的几何变化都是一次候选的 resize 事件（由会话
//! 插件自己的几何转发钩子上报后端）。
//!
//! 状态机：未附着 → 等待挂载（终端尚无宿主元素时登记一次性挂载
//! 回调并在触发后重新进入激活流程）→ 已激活（立即适配一次，此后
//! 对观察到的尺寸变化做节流适配）。

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::RwLock;

use crate::scope::Scope;
use crate::terminal::{AddonError, Geometry, TerminalAddon, TerminalHandle};
use crate::throttle::Throttle;

/// 最小列数
pub const MIN_COLS: u16 = 2;
/// 最小行数
pub const MIN_ROWS: u16 = 1;
/// 默认适配节流间隔
pub const FIT_INTERVAL: Duration = Duration::from_millis(50);

/// 单元格像素度量
#[derive(Debug, Clone, Copy)]
pub struct CellMetrics {
    /// 单元格宽度（像素）
    pub width_px: f64,
    /// 单元格高度（像素）
    pub height_px: f64,
}

impl Default for CellMetrics {
    fn default() -> Self {
        Self {
            width_px: 9.0,
            height_px: 17.0,
        }
    }
}

/// 自适应插件
pub struct AutoFitAddon {
    cell: CellMetrics,
    interval: Duration,
    terminal: RwLock<Option<Weak<TerminalHandle>>>,
    scope: Scope,
}

impl AutoFitAddon {
    /// 以默认度量与节流间隔创建插件
    pub fn new() -> Arc<Self> {
        Self::with_metrics(CellMetrics::default(), FIT_INTERVAL)
    }

    /// 以指定度量与节流间隔创建插件
    pub fn with_metrics(cell: CellMetrics, interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            cell,
            interval,
            terminal: RwLock::new(None),
            scope: Scope::new(),
        })
    }

    /// 按像素盒换算最优几何尺寸
    pub fn proposal(&self, width_px: f64, height_px: f64) -> Geometry {
        let cols = (width_px / self.cell.width_px).floor();
        let rows = (height_px / self.cell.height_px).floor();
        Geometry::new(
            cols.clamp(MIN_COLS as f64, u16::MAX as f64) as u16,
            rows.clamp(MIN_ROWS as f64, u16::MAX as f64) as u16,
        )
    }

    /// 立即执行一次适配（基础适配能力，可手动调用）
    ///
    /// 终端已销毁或尚未挂载时为空操作。
    pub fn fit(&self) {
        let Some(terminal) = self.terminal.read().clone().and_then(|w| w.upgrade()) else {
            return;
        };
        let Some(host) = terminal.host() else {
            return;
        };
        let (width_px, height_px) = host.size();
        let proposal = self.proposal(width_px, height_px);
        if proposal != terminal.geometry() {
            tracing::debug!(
                "[自适应插件] 应用几何尺寸 {}x{}",
                proposal.cols,
                proposal.rows
            );
            terminal.resize(proposal.cols, proposal.rows);
        }
    }
}

impl TerminalAddon for AutoFitAddon {
    fn name(&self) -> &str {
        "fit"
    }

    fn activate(self: Arc<Self>, terminal: Arc<TerminalHandle>) -> Result<(), AddonError> {
        if !terminal.is_open() {
            // 终端尚未挂载：等待挂载事件后重新进入激活流程
            let addon = self.clone();
            let weak = Arc::downgrade(&terminal);
            let handle = terminal.on_open_once(move |_| {
                if let Some(terminal) = weak.upgrade() {
                    if let Err(e) = addon.clone().activate(terminal) {
                        tracing::warn!("[自适应插件] 挂载后激活失败: {}", e);
                    }
                }
            });
            self.scope.bind(handle);
            tracing::debug!("[自适应插件] 终端尚未挂载，延迟激活");
            return Ok(());
        }

        let host = terminal.host().ok_or(AddonError::TerminalDisposed)?;
        *self.terminal.write() = Some(Arc::downgrade(&terminal));

        // 激活时的立即适配与后续尺寸观察共用同一个节流器，
        // 保证一个间隔窗口内最多应用一次几何变化
        let weak_addon = Arc::downgrade(&self);
        let throttle = Throttle::with_interval(self.interval, move || {
            if let Some(addon) = weak_addon.upgrade() {
                addon.fit();
            }
        });
        throttle.call();

        let observer_throttle = throttle.clone();
        let observer = host.observe_size(move |_| observer_throttle.call());
        self.scope.bind(observer);
        self.scope.bind(throttle);

        tracing::debug!("[自适应插件] 已激活，开始观察宿主尺寸");
        Ok(())
    }

    /// 停止尺寸观察并释放全部资源（任意状态下可调用）
    fn dispose(&self) {
        self.scope.dispose();
        tracing::debug!("[自适应插件] 已销毁");
    }
}
