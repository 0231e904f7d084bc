//! 终端核心模块
//!
//! 封装终端实例与插件装载机制，向上层元素提供统一的生命周期边界。
//!
//! ## 模块结构
//! - `addon` - 插件接口与错误类型
//! - `handle` - 终端实例封装
//! - `listeners` - 事件监听器注册表

pub mod addon;
pub mod handle;
pub mod listeners;


// 重新导出常用类型
pub use addon::{AddonError, TerminalAddon};
pub use handle::{Geometry, TerminalHandle, DEFAULT_COLS, DEFAULT_ROWS};
pub use listeners::ListenerHandle;
