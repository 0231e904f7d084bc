//! 终端插件接口
//!
//! 以显式接口取代"带 activate/dispose 即可装载"的鸭子类型约定：
//! 插件集合是该接口之上的序列，按配置顺序装载。

use std::sync::Arc;

use thiserror::Error;

use super::handle::TerminalHandle;

/// 插件错误类型
#[derive(Debug, Error)]
pub enum AddonError {
    /// 插件已激活
    #[error("插件已激活，不支持重复激活")]
    AlreadyActivated,

    /// 终端已销毁
    #[error("终端已销毁，无法装载插件")]
    TerminalDisposed,
}

/// 终端插件
///
/// 插件由终端元素独占持有，注册到终端后随终端销毁级联释放；
/// 每个插件私有自己的作用域账本。
pub trait TerminalAddon: Send + Sync {
    /// 插件名称（用于日志）
    fn name(&self) -> &str;

    /// 绑定插件到终端实例
    fn activate(self: Arc<Self>, terminal: Arc<TerminalHandle>) -> Result<(), AddonError>;

    /// 释放插件持有的全部资源（要求幂等）
    fn dispose(&self);
}
