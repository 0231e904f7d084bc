//! 终端插件实现
//!
//! 提供两个内置插件：
//! - `fit` - 自适应插件，保持终端几何尺寸与宿主元素匹配
//! - `session` - 会话插件，维护终端与后端会话的绑定
//!
//! 插件按配置顺序装载到终端，随终端销毁级联释放。

pub mod fit;
pub mod session;


// 重新导出常用类型
pub use fit::{AutoFitAddon, CellMetrics, FIT_INTERVAL, MIN_COLS, MIN_ROWS};
pub use session::{SessionAddon, SessionError};
