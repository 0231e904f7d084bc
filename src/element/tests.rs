//! 元素层测试
//!
//! 覆盖挂载/卸载生命周期、属性注入时机与面板的引导/传播流程。
//! 泄漏核对以宿主观察者数量与测试连接的存活订阅数为准。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use super::*;
use crate::connection::mock::MockConnection;
use crate::connection::HassContext;
use crate::mirror::{AmbientKey, AmbientValue};

// ============================================================
// 终端元素测试
// ============================================================

#[tokio::test]
async fn test_mount_creates_terminal_with_addons() {
    let host = HostElement::new(450.0, 340.0);
    let element = TerminalElement::new(host);

    assert!(!element.is_mounted());
    element.connected_callback().await.unwrap();
    assert!(element.is_mounted());

    let terminal = element.terminal().unwrap();
    assert_eq!(terminal.addon_count(), 2);
    // 自适应插件在挂载时立即适配：450/9 = 50，340/17 = 20
    assert_eq!((terminal.cols(), terminal.rows()), (50, 20));
}

#[tokio::test]
async fn test_unmount_disposes_terminal_and_releases_observers() {
    let host = HostElement::new(450.0, 340.0);
    let element = TerminalElement::new(host.clone());

    element.connected_callback().await.unwrap();
    let terminal = element.terminal().unwrap();
    assert_eq!(host.observer_count(), 1);

    element.disconnected_callback();
    assert!(!element.is_mounted());
    assert_eq!(host.observer_count(), 0);
    assert_eq!(terminal.listener_count(), 0);
}

#[tokio::test]
async fn test_set_hass_while_mounted_connects_session() {
    let host = HostElement::new(450.0, 340.0);
    let element = TerminalElement::new(host);
    element.connected_callback().await.unwrap();

    let connection = MockConnection::new("c1");
    element.set_hass(HassContext::new(connection.clone()));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(connection.active_subscriptions(), 1);
    assert!(element.session().unwrap().has_subscription());
}

#[tokio::test]
async fn test_set_hass_before_mount_is_cached() {
    let host = HostElement::new(450.0, 340.0);
    let element = TerminalElement::new(host);

    let connection = MockConnection::new("c1");
    element.set_hass(HassContext::new(connection.clone()));
    assert_eq!(connection.active_subscriptions(), 0);

    // 挂载时使用缓存的上下文连接会话
    element.connected_callback().await.unwrap();
    assert_eq!(connection.active_subscriptions(), 1);
}

#[tokio::test]
async fn test_set_hass_while_mount_awaits_subscription_does_not_block() {
    let host = HostElement::new(450.0, 340.0);
    let element = TerminalElement::new(host);

    // 挂载时的会话连接在订阅建立中挂起
    let first = MockConnection::new("c1");
    let gate = first.gate_next_subscribe();
    element.set_hass(HassContext::new(first.clone()));

    let mounting = element.clone();
    let mount = tokio::spawn(async move { mounting.connected_callback().await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    // 挂起期间注入新上下文：单线程运行时下必须立即返回，
    // 不得在元素的属性锁上阻塞事件循环
    let second = MockConnection::new("c2");
    element.set_hass(HassContext::new(second.clone()));

    gate.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(1), mount)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // 后到的连接经串行重绑胜出
    assert_eq!(first.active_subscriptions(), 0);
    assert_eq!(second.active_subscriptions(), 1);
}

#[tokio::test]
async fn test_remount_creates_fresh_terminal() {
    let host = HostElement::new(450.0, 340.0);
    let element = TerminalElement::new(host);

    element.connected_callback().await.unwrap();
    let first = element.terminal().unwrap();
    let first_session_id = element.session().unwrap().session_id().to_string();

    element.disconnected_callback();
    element.connected_callback().await.unwrap();
    let second = element.terminal().unwrap();

    // 终端实例不跨挂载复用，会话标识随插件集合重建
    assert!(!Arc::ptr_eq(&first, &second));
    assert_ne!(
        element.session().unwrap().session_id(),
        first_session_id
    );
}

#[tokio::test]
async fn test_double_mount_disposes_previous_terminal() {
    let host = HostElement::new(450.0, 340.0);
    let element = TerminalElement::new(host.clone());

    element.connected_callback().await.unwrap();
    let first = element.terminal().unwrap();

    element.connected_callback().await.unwrap();
    assert!(!Arc::ptr_eq(&first, &element.terminal().unwrap()));
    // 上一次挂载的观察者已释放，只剩本次挂载的
    assert_eq!(host.observer_count(), 1);
    assert_eq!(first.listener_count(), 0);
}

#[tokio::test]
async fn test_repeated_mount_cycles_leak_nothing() {
    let host = HostElement::new(450.0, 340.0);
    let element = TerminalElement::new(host.clone());
    let connection = MockConnection::new("c1");
    element.set_hass(HassContext::new(connection.clone()));

    for _ in 0..10 {
        element.connected_callback().await.unwrap();
        element.disconnected_callback();
    }

    assert_eq!(host.observer_count(), 0);
    assert_eq!(connection.active_subscriptions(), 0);

    // 每轮恰好一次订阅与一次取消订阅
    let events = connection.events.lock();
    let subscribes = events.iter().filter(|e| e.starts_with("subscribe:")).count();
    let unsubscribes = events
        .iter()
        .filter(|e| e.starts_with("unsubscribe:"))
        .count();
    assert_eq!(subscribes, 10);
    assert_eq!(unsubscribes, 10);
}

#[tokio::test]
async fn test_narrow_flag() {
    let host = HostElement::new(450.0, 340.0);
    let element = TerminalElement::new(host);

    assert!(!element.narrow());
    element.set_narrow(true);
    assert!(element.narrow());
}

// ============================================================
// 面板元素测试
// ============================================================

fn gated_panel() -> (PanelElement, Arc<AtomicBool>) {
    let gate = Arc::new(AtomicBool::new(false));
    let gate_clone = gate.clone();
    let panel = PanelElement::new(move || {
        let gate = gate_clone.clone();
        async move {
            gate.store(true, Ordering::SeqCst);
        }
        .boxed()
    });
    (panel, gate)
}

#[tokio::test]
async fn test_panel_awaits_bootstrap_before_building() {
    let (panel, gate) = gated_panel();
    assert!(panel.children().is_empty());

    panel.connected_callback().await.unwrap();

    assert!(gate.load(Ordering::SeqCst));
    assert_eq!(panel.children().len(), 1);
    assert_eq!(panel.mirror().sink_count(), 1);
    assert!(panel.children()[0].is_mounted());
}

#[tokio::test]
async fn test_panel_properties_propagate_to_children() {
    let (panel, _gate) = gated_panel();
    panel.connected_callback().await.unwrap();

    let connection = MockConnection::new("c1");
    panel.set_hass(HassContext::new(connection.clone()));
    panel.set_narrow(true);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let child = &panel.children()[0];
    assert!(child.narrow());
    assert_eq!(connection.active_subscriptions(), 1);
}

#[tokio::test]
async fn test_panel_properties_set_before_mount_reach_late_children() {
    let (panel, _gate) = gated_panel();

    // 属性先于挂载到达：存入镜像，接入时以快照下发
    let connection = MockConnection::new("c1");
    panel.set_hass(HassContext::new(connection.clone()));
    panel.set_narrow(true);
    assert!(panel.mirror().get(AmbientKey::Hass).is_some());
    assert!(matches!(
        panel.mirror().get(AmbientKey::Narrow),
        Some(AmbientValue::Narrow(true))
    ));

    panel.connected_callback().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let child = &panel.children()[0];
    assert!(child.narrow());
    assert_eq!(connection.active_subscriptions(), 1);
}

#[tokio::test]
async fn test_panel_unmount_releases_everything() {
    let (panel, _gate) = gated_panel();
    panel.connected_callback().await.unwrap();

    let connection = MockConnection::new("c1");
    panel.set_hass(HassContext::new(connection.clone()));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(connection.active_subscriptions(), 1);

    panel.disconnected_callback();

    assert!(panel.children().is_empty());
    assert_eq!(panel.mirror().sink_count(), 0);
    assert_eq!(connection.active_subscriptions(), 0);
}
