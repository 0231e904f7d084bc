//! 环境属性镜像
//!
//! 将面板上的命名属性（后端上下文、窄布局标志）镜像到一组动态增长
//! 的汇元素上。显式的发布/订阅实现：存储保存已设置的属性值，设置
//! 时通知当前全部汇元素；新接入的汇元素立即收到所有已知属性的完整
//! 快照，从未设置过的属性不会产生任何通知。

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::connection::HassContext;

/// 环境属性键（定义顺序即快照下发顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AmbientKey {
    /// 后端上下文
    Hass,
    /// 窄布局标志
    Narrow,
}

impl AmbientKey {
    /// 属性名称
    pub fn as_str(&self) -> &'static str {
        match self {
            AmbientKey::Hass => "hass",
            AmbientKey::Narrow => "narrow",
        }
    }
}

impl std::fmt::Display for AmbientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 环境属性值
#[derive(Clone)]
pub enum AmbientValue {
    /// 后端上下文
    Hass(HassContext),
    /// 窄布局标志
    Narrow(bool),
}

impl AmbientValue {
    /// 值对应的属性键
    pub fn key(&self) -> AmbientKey {
        match self {
            AmbientValue::Hass(_) => AmbientKey::Hass,
            AmbientValue::Narrow(_) => AmbientKey::Narrow,
        }
    }
}

impl std::fmt::Debug for AmbientValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AmbientValue::Hass(_) => f.write_str("AmbientValue::Hass"),
            AmbientValue::Narrow(v) => write!(f, "AmbientValue::Narrow({})", v),
        }
    }
}

/// 环境属性汇
///
/// 实现此 Trait 的元素可以接入镜像并接收属性更新。
pub trait AmbientSink: Send + Sync {
    /// 汇名称（用于日志与注销）
    fn name(&self) -> &str;

    /// 接收一个属性值（快照下发与后续更新使用同一入口）
    fn apply(&self, value: &AmbientValue);
}

/// 环境属性镜像
///
/// 管理属性存储与汇元素的注册、注销和通知。
#[derive(Default)]
pub struct AmbientMirror {
    values: RwLock<BTreeMap<AmbientKey, AmbientValue>>,
    sinks: RwLock<Vec<Arc<dyn AmbientSink>>>,
}

impl AmbientMirror {
    /// 创建空镜像
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置属性值并通知当前全部汇元素
    pub fn set(&self, value: AmbientValue) {
        let key = value.key();
        self.values.write().insert(key, value.clone());

        let sinks: Vec<Arc<dyn AmbientSink>> = self.sinks.read().clone();
        tracing::debug!("[属性镜像] 属性 {} 更新，通知 {} 个汇元素", key, sinks.len());
        for sink in sinks {
            sink.apply(&value);
        }
    }

    /// 读取属性当前值
    pub fn get(&self, key: AmbientKey) -> Option<AmbientValue> {
        self.values.read().get(&key).cloned()
    }

    /// 接入汇元素并立即下发全部已知属性的快照
    pub fn attach(&self, sink: Arc<dyn AmbientSink>) {
        tracing::debug!("[属性镜像] 接入汇元素: {}", sink.name());
        self.sinks.write().push(sink.clone());

        let snapshot: Vec<AmbientValue> = self.values.read().values().cloned().collect();
        for value in &snapshot {
            sink.apply(value);
        }
    }

    /// 按名称注销汇元素
    pub fn detach(&self, name: &str) {
        self.sinks.write().retain(|s| s.name() != name);
        tracing::debug!("[属性镜像] 注销汇元素: {}", name);
    }

    /// 注销全部汇元素
    pub fn clear_sinks(&self) {
        self.sinks.write().clear();
    }

    /// 当前汇元素数量
    pub fn sink_count(&self) -> usize {
        self.sinks.read().len()
    }
}
