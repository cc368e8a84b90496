use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use tinyfs_common::transport::TcpTransport;

use crate::node::NodeHandle;
use crate::registry::Arena;

/// Health supervision configuration.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Cadence of the periodic repair sweep
    pub sweep_interval: Duration,
    /// Pause between attempts of a reactive reconnect task
    pub retry_delay: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(5),
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// Control messages consumed by the supervisor loop.
pub(crate) enum Control {
    /// A node was removed; abort its in-flight reconnect, if any.
    NodeRemoved { tag: String },
    /// A reconnect task finished successfully.
    ReconnectDone { tag: String },
    /// Stop the loop and abort all in-flight reconnects.
    Shutdown,
}

/// Background repairer of failed node connections.
///
/// One supervisor task per registry, started at registry construction. It
/// multiplexes three inputs:
///
/// - **Down events** from the transport (reactive path): resolve the handle
///   by address, tear down the broken connection, and hand the endpoint to
///   a dedicated retry task that reconnects with a fixed delay until it
///   succeeds. At most one retry task runs per tag; a second down event
///   for the same endpoint while a retry is in flight is dropped, so two
///   tasks can never race to install connections on one handle.
/// - **A sweep timer** (periodic path): any handle that is disconnected and
///   has no retry task in flight gets a single reconnect attempt. This
///   repairs handles whose very first connect failed at add time, which
///   never produces a down event.
/// - **Control messages**: node removal (abort that retry), reconnect
///   completion (forget the task), shutdown (abort everything and exit).
///
/// The supervisor never removes handles and never blocks request senders;
/// all repair work happens on its own task or on spawned retry tasks.
pub(crate) struct Supervisor {
    arena: Arc<RwLock<Arena>>,
    transport: TcpTransport,
    config: SupervisorConfig,
    ctrl_tx: mpsc::UnboundedSender<Control>,
    /// In-flight reconnect tasks by tag
    retries: HashMap<String, tokio::task::JoinHandle<()>>,
}

impl Supervisor {
    pub(crate) fn new(
        arena: Arc<RwLock<Arena>>,
        transport: TcpTransport,
        config: SupervisorConfig,
        ctrl_tx: mpsc::UnboundedSender<Control>,
    ) -> Self {
        Self {
            arena,
            transport,
            config,
            ctrl_tx,
            retries: HashMap::new(),
        }
    }

    /// Starts the supervisor task.
    pub(crate) fn spawn(
        self,
        down_rx: mpsc::UnboundedReceiver<String>,
        ctrl_rx: mpsc::UnboundedReceiver<Control>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run(down_rx, ctrl_rx).await;
        })
    }

    async fn run(
        mut self,
        mut down_rx: mpsc::UnboundedReceiver<String>,
        mut ctrl_rx: mpsc::UnboundedReceiver<Control>,
    ) {
        let mut sweep = tokio::time::interval(self.config.sweep_interval);
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so a freshly built
        // registry doesn't sweep before anything is registered.
        sweep.tick().await;

        loop {
            tokio::select! {
                Some(address) = down_rx.recv() => {
                    self.on_node_down(&address).await;
                }
                Some(msg) = ctrl_rx.recv() => {
                    match msg {
                        Control::NodeRemoved { tag } => {
                            if let Some(task) = self.retries.remove(&tag) {
                                task.abort();
                                debug!(tag = %tag, "aborted reconnect for removed node");
                            }
                        }
                        Control::ReconnectDone { tag } => {
                            self.retries.remove(&tag);
                        }
                        Control::Shutdown => break,
                    }
                }
                _ = sweep.tick() => {
                    self.sweep().await;
                }
                else => break,
            }
        }

        for (tag, task) in self.retries.drain() {
            task.abort();
            debug!(tag = %tag, "aborted reconnect at shutdown");
        }
        info!("health supervisor stopped");
    }

    /// Reactive path: a connection reported itself down.
    async fn on_node_down(&mut self, address: &str) {
        let handle = { self.arena.read().await.by_address(address) };
        let Some(handle) = handle else {
            // The node was removed before the event arrived, or the event
            // refers to an endpoint we never knew. Nothing to repair.
            debug!(address, "down event for unknown address, ignoring");
            return;
        };

        let tag = handle.tag().to_string();
        if self
            .retries
            .get(&tag)
            .is_some_and(|task| !task.is_finished())
        {
            debug!(tag = %tag, address, "reconnect already in flight, dropping duplicate down event");
            return;
        }

        if let Some(broken) = handle.take_conn().await {
            broken.close().await;
        }
        warn!(tag = %tag, address, "node connection down, starting reconnect");

        let task = tokio::spawn(retry_loop(
            handle,
            self.transport.clone(),
            self.config.retry_delay,
            self.ctrl_tx.clone(),
        ));
        self.retries.insert(tag, task);
    }

    /// Periodic path: one reconnect attempt for every disconnected handle
    /// that no retry task is already working on.
    async fn sweep(&mut self) {
        self.retries.retain(|_, task| !task.is_finished());

        let handles = { self.arena.read().await.snapshot() };
        let mut attempts = Vec::new();
        for handle in handles {
            if self.retries.contains_key(handle.tag()) {
                continue;
            }
            if handle.is_connected().await {
                continue;
            }
            let transport = self.transport.clone();
            attempts.push(async move {
                match transport
                    .connect(handle.address(), handle.max_payload_size())
                    .await
                {
                    Ok(conn) => {
                        handle.install_conn(conn).await;
                        info!(tag = handle.tag(), address = handle.address(), "sweep reconnected node");
                    }
                    Err(e) => {
                        debug!(tag = handle.tag(), address = handle.address(), error = %e, "sweep reconnect failed");
                    }
                }
            });
        }
        futures::future::join_all(attempts).await;
    }
}

/// Reconnect loop for one downed endpoint. Retries forever with a fixed
/// delay; the supervisor aborts it on node removal or shutdown.
async fn retry_loop(
    handle: Arc<NodeHandle>,
    transport: TcpTransport,
    delay: Duration,
    ctrl_tx: mpsc::UnboundedSender<Control>,
) {
    loop {
        match transport
            .connect(handle.address(), handle.max_payload_size())
            .await
        {
            Ok(conn) => {
                handle.install_conn(conn).await;
                info!(tag = handle.tag(), address = handle.address(), "reconnected node");
                let _ = ctrl_tx.send(Control::ReconnectDone {
                    tag: handle.tag().to_string(),
                });
                return;
            }
            Err(e) => {
                warn!(tag = handle.tag(), address = handle.address(), error = %e, "reconnect attempt failed");
                tokio::time::sleep(delay).await;
            }
        }
    }
}
