//! 面板元素
//!
//! 顶层容器：等待外部引导前置条件完成后构建面板内容，并把两个
//! 环境属性（后端上下文、窄布局标志）经属性镜像传播到子元素。
//! 前置条件被建模为一个返回 future 的函数，只等待一次，与任何
//! 具体的宿主组件注册表无关。

use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::RwLock;

use super::host::HostElement;
use super::terminal_element::TerminalElement;
use crate::connection::HassContext;
use crate::mirror::{AmbientMirror, AmbientValue};

/// 面板内终端宿主的默认像素尺寸
const DEFAULT_HOST_SIZE: (f64, f64) = (800.0, 480.0);

/// 引导前置条件
pub type BootstrapFn = Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// 面板元素
pub struct PanelElement {
    bootstrap: BootstrapFn,
    mirror: AmbientMirror,
    children: RwLock<Vec<Arc<TerminalElement>>>,
}

impl PanelElement {
    /// 以引导前置条件创建面板
    pub fn new(bootstrap: impl Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static) -> Self {
        Self {
            bootstrap: Box::new(bootstrap),
            mirror: AmbientMirror::new(),
            children: RwLock::new(Vec::new()),
        }
    }

    /// 挂载回调
    ///
    /// 等待引导前置条件完成，构建面板内容（一个终端元素），挂载
    /// 子元素并将其接入属性镜像——新汇元素立即收到全部已知属性
    /// 的快照。
    pub async fn connected_callback(&self) -> anyhow::Result<()> {
        (self.bootstrap)().await;
        tracing::debug!("[面板] 引导前置条件已满足，构建面板内容");

        let host = HostElement::new(DEFAULT_HOST_SIZE.0, DEFAULT_HOST_SIZE.1);
        let child = TerminalElement::new(host);
        child.connected_callback().await?;

        self.children.write().push(child.clone());
        self.mirror.attach(child);
        Ok(())
    }

    /// 卸载回调：卸载全部子元素并清空镜像汇
    pub fn disconnected_callback(&self) {
        let children: Vec<Arc<TerminalElement>> = self.children.write().drain(..).collect();
        for child in children {
            child.disconnected_callback();
        }
        self.mirror.clear_sinks();
        tracing::debug!("[面板] 已卸载");
    }

    /// 设置后端上下文（经镜像传播到子元素）
    pub fn set_hass(&self, context: HassContext) {
        self.mirror.set(AmbientValue::Hass(context));
    }

    /// 设置窄布局标志（经镜像传播到子元素）
    pub fn set_narrow(&self, narrow: bool) {
        self.mirror.set(AmbientValue::Narrow(narrow));
    }

    /// 属性镜像
    pub fn mirror(&self) -> &AmbientMirror {
        &self.mirror
    }

    /// 当前子元素
    pub fn children(&self) -> Vec<Arc<TerminalElement>> {
        self.children.read().clone()
    }
}
