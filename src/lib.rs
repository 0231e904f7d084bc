//! TermCast - 终端到远程会话的桥接库
//!
//! 把一个终端实例桥接到远程后端会话：终端侧活动（输入、尺寸变化）
//! 经连接层转发给后端，后端推送的输出帧写回终端。库分为四层：
//!
//! - 基础设施：[`scope`]（释放账本）与 [`throttle`]（调用节流）
//! - 协议层：[`connection`]（消息协议与连接抽象）
//! - 终端层：[`terminal`]（终端实例）与 [`addons`]（自适应/会话插件）
//! - 元素层：[`element`]（挂载生命周期）与 [`mirror`]（属性传播）
//!
//! [`server`] 提供基于 PTY 的本地后端，经 `LocalConnection` 适配为
//! 连接对象后可直接驱动整条链路。

// 基础设施
pub mod scope;
pub mod throttle;

// 协议与后端
pub mod connection;
pub mod server;

// 终端与插件
pub mod addons;
pub mod terminal;

// 元素层
pub mod element;
pub mod mirror;

// 重新导出核心类型
pub use addons::{AutoFitAddon, SessionAddon};
pub use connection::{Connection, ConsoleMessage, HassContext, LocalConnection};
pub use element::{HostElement, PanelElement, TerminalElement};
pub use mirror::{AmbientMirror, AmbientSink, AmbientValue};
pub use scope::{Disposable, Scope};
pub use server::ConsoleSessionManager;
pub use terminal::{TerminalAddon, TerminalHandle};
pub use throttle::Throttle;
