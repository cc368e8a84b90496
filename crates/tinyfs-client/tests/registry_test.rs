//! End-to-end registry and health-supervision tests against real sockets.

mod common;

use std::time::Duration;

use tinyfs_client::{NodeRegistry, RegistryConfig, SupervisorConfig};
use tinyfs_common::transport::TransportConfig;
use tinyfs_common::{MessageId, Packet, TinyfsError};

use common::MockMaster;

/// Config tightened so recovery happens on a test timescale.
fn fast_config() -> RegistryConfig {
    RegistryConfig {
        transport: TransportConfig {
            connect_timeout: Duration::from_millis(500),
            ..TransportConfig::default()
        },
        supervisor: SupervisorConfig {
            sweep_interval: Duration::from_millis(100),
            retry_delay: Duration::from_millis(50),
        },
    }
}

/// Polls until the handle reports connected or the deadline passes.
async fn wait_connected(registry: &NodeRegistry, tag: &str, deadline: Duration) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if let Some(handle) = registry.get_node(tag).await {
            if handle.is_connected().await {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn sweep_repairs_node_that_never_connected() {
    let registry = NodeRegistry::with_config(fast_config());

    // Reserve an address with nothing listening on it yet.
    let placeholder = MockMaster::spawn().await;
    let addr = placeholder.stop();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let err = registry.add_node("a", &addr, None).await.unwrap_err();
    assert!(matches!(err, TinyfsError::ConnectFailure { .. }));
    assert!(!registry.get_node("a").await.unwrap().is_connected().await);

    // Bring a master up on that address; the periodic sweep is the only
    // path that can repair a handle that never produced a down event.
    let _master = MockMaster::spawn_at(&addr).await;
    assert!(
        wait_connected(&registry, "a", Duration::from_secs(5)).await,
        "sweep should reconnect the handle"
    );

    let handle = registry.get_node("a").await.unwrap();
    assert_eq!(handle.tag(), "a");
    assert_eq!(handle.address(), addr);
    registry.shutdown();
}

#[tokio::test]
async fn down_event_triggers_reactive_reconnect() {
    let registry = NodeRegistry::with_config(fast_config());

    let master = MockMaster::spawn().await;
    let addr = master.addr().to_string();
    registry.add_node("a", &addr, None).await.unwrap();

    let handle = registry.get_node("a").await.unwrap();
    assert!(handle.is_connected().await);

    // Kill the master; the next send fails and reports the address down.
    let addr = master.stop();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let request = Packet::request(MessageId::ListFiles, b"{}".to_vec());
    assert!(handle.send(&request).await.is_err());

    // Resurrect the master; the reactive retry task reconnects.
    let _master = MockMaster::spawn_at(&addr).await;
    assert!(
        wait_connected(&registry, "a", Duration::from_secs(5)).await,
        "reactive path should reconnect the handle"
    );

    // Identity preserved, traffic flows again.
    let handle = registry.get_node("a").await.unwrap();
    assert_eq!(handle.address(), addr);
    let reply = handle.send(&request).await.unwrap();
    assert!(reply.is_ok());
    registry.shutdown();
}

#[tokio::test]
async fn second_failure_episode_recovers_too() {
    // The once-per-connection down latch must reset with each replacement
    // connection, or the second outage would never be repaired reactively.
    let registry = NodeRegistry::with_config(fast_config());

    let master = MockMaster::spawn().await;
    let addr = master.addr().to_string();
    registry.add_node("a", &addr, None).await.unwrap();
    let handle = registry.get_node("a").await.unwrap();
    let request = Packet::request(MessageId::ListFiles, b"{}".to_vec());

    let mut master = Some(master);
    for _ in 0..2 {
        let addr = master.take().unwrap().stop();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(handle.send(&request).await.is_err());

        master = Some(MockMaster::spawn_at(&addr).await);
        assert!(
            wait_connected(&registry, "a", Duration::from_secs(5)).await,
            "each outage should be repaired"
        );
    }
    registry.shutdown();
}

#[tokio::test]
async fn down_event_for_unknown_address_is_ignored() {
    let registry = NodeRegistry::with_config(fast_config());

    // A master that accepts but never replies, so a send parks on the
    // reply read until the server side drops the connection.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let holder = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    registry.add_node("a", &addr, None).await.unwrap();
    let handle = registry.get_node("a").await.unwrap();

    // Park a send in flight, remove the node, THEN break the connection.
    // The failing send reports the address down, but by that point nothing
    // is registered for it, so the supervisor must treat the event as a
    // no-op and leave the registry untouched.
    let in_flight = tokio::spawn(async move {
        let request = Packet::request(MessageId::ListFiles, b"{}".to_vec());
        handle.send(&request).await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    registry.del_node("a").await.unwrap();
    holder.abort();

    assert!(in_flight.await.unwrap().is_err());
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(registry.len().await, 0);
    registry.shutdown();
}

#[tokio::test]
async fn send_through_picked_node_round_trips() {
    let registry = NodeRegistry::with_config(fast_config());

    let master = MockMaster::spawn().await;
    registry.add_node("a", master.addr(), None).await.unwrap();

    let node = registry.pick_node().await.unwrap();
    let request = Packet::request(MessageId::ListFiles, b"{\"page\":1,\"pageSize\":10}".to_vec());
    let reply = node.send(&request).await.unwrap();
    assert!(reply.is_ok());
    assert_eq!(reply.message_id, MessageId::ListFiles);
    assert!(!reply.data.is_empty());
    registry.shutdown();
}

#[tokio::test]
async fn pick_distributes_over_all_registered_nodes() {
    let registry = NodeRegistry::with_config(fast_config());

    let masters = [
        MockMaster::spawn().await,
        MockMaster::spawn().await,
        MockMaster::spawn().await,
    ];
    for (i, master) in masters.iter().enumerate() {
        registry
            .add_node(&format!("n{}", i), master.addr(), None)
            .await
            .unwrap();
    }

    let mut seen = std::collections::HashSet::new();
    for _ in 0..200 {
        seen.insert(registry.pick_node().await.unwrap().tag().to_string());
    }
    // Uniform random over 3 nodes: 200 draws miss one with prob ~1e-35.
    assert_eq!(seen.len(), 3);
    registry.shutdown();
}

#[tokio::test]
async fn shutdown_stops_repairing() {
    let registry = NodeRegistry::with_config(fast_config());

    let placeholder = MockMaster::spawn().await;
    let addr = placeholder.stop();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let _ = registry.add_node("a", &addr, None).await;
    registry.shutdown();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // A master comes up after shutdown; nothing may repair the handle now.
    let _master = MockMaster::spawn_at(&addr).await;
    assert!(
        !wait_connected(&registry, "a", Duration::from_millis(500)).await,
        "no reconnects after shutdown"
    );
}
