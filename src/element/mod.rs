//! 元素层
//!
//! 把终端能力组合成带挂载/卸载生命周期的元素：
//! - `host` - 宿主元素（尺寸可观察的挂载根）
//! - `terminal_element` - 终端元素（终端实例 + 插件集合）
//! - `panel` - 面板元素（顶层容器与属性传播）

pub mod host;
pub mod panel;
pub mod terminal_element;

#[cfg(test)]
mod tests;

// 重新导出常用类型
pub use host::HostElement;
pub use panel::{BootstrapFn, PanelElement};
pub use terminal_element::TerminalElement;
