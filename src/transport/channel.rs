//! In-process channel transport
//!
//! Reference `Transport` adapter: an in-process hub built from
//! `tokio::sync::mpsc` per-socket channels and a `dashmap`-backed room
//! registry, with `tokio::sync::oneshot` for ack correlation. Stands in for
//! a real websocket/socket.io transport in the demo binary and the
//! integration tests (same pattern this codebase uses for its lock-free
//! binding table, applied to sockets and rooms instead).

use super::{Inbound, SocketId, Transport};
use crate::change::Change;
use crate::protocol::ServerMessage;
use crate::revision::RevisionLabel;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

pub struct ChannelTransport {
    rooms: DashMap<String, Vec<SocketId>>,
    sockets: DashMap<SocketId, mpsc::UnboundedSender<ServerMessage>>,
    inbound: mpsc::UnboundedSender<Inbound>,
    next_socket_id: AtomicU64,
}

impl ChannelTransport {
    /// Construct a hub and the receiver the server replicator polls for
    /// inbound client messages.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Inbound>) {
        let (inbound, inbound_rx) = mpsc::unbounded_channel();
        let hub = Arc::new(Self {
            rooms: DashMap::new(),
            sockets: DashMap::new(),
            inbound,
            next_socket_id: AtomicU64::new(0),
        });
        (hub, inbound_rx)
    }

    /// Register a new client socket, returning its id and the receiver of
    /// server-originated messages addressed to it (directly or via a room
    /// it has joined).
    pub fn connect(&self) -> (SocketId, mpsc::UnboundedReceiver<ServerMessage>) {
        let id = self.next_socket_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.sockets.insert(id, tx);
        (id, rx)
    }

    /// Tear down a socket: removed from every room it had joined, and its
    /// sender dropped so its receiver observes a clean close.
    pub fn disconnect(&self, socket: SocketId) {
        self.sockets.remove(&socket);
        for mut room in self.rooms.iter_mut() {
            room.retain(|s| *s != socket);
        }
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn join_room(&self, socket: SocketId, room: &str) {
        let mut members = self.rooms.entry(room.to_string()).or_default();
        if !members.contains(&socket) {
            members.push(socket);
        }
    }

    async fn multicast(&self, room: &str, msg: ServerMessage) {
        let Some(members) = self.rooms.get(room) else {
            return;
        };
        for socket in members.iter() {
            if let Some(tx) = self.sockets.get(socket) {
                let _ = tx.send(msg.clone());
            }
        }
    }

    async fn send_to(&self, socket: SocketId, msg: ServerMessage) {
        if let Some(tx) = self.sockets.get(&socket) {
            let _ = tx.send(msg);
        }
    }

    async fn register(&self, socket: SocketId, name: String) -> anyhow::Result<()> {
        let (ack, ack_rx) = oneshot::channel();
        self.inbound.send(Inbound::Register { socket, name, ack })?;
        ack_rx.await.map_err(|_| anyhow::anyhow!("transport closed before ack"))
    }

    async fn get(&self, socket: SocketId, name: String) -> anyhow::Result<(Vec<RevisionLabel>, Value)> {
        let (ack, ack_rx) = oneshot::channel();
        self.inbound.send(Inbound::Get { socket, name, ack })?;
        ack_rx.await.map_err(|_| anyhow::anyhow!("transport closed before ack"))
    }

    async fn set(
        &self,
        socket: SocketId,
        name: String,
        revision_history: Vec<RevisionLabel>,
        value: Value,
    ) -> anyhow::Result<bool> {
        let (ack, ack_rx) = oneshot::channel();
        self.inbound.send(Inbound::Set {
            socket,
            name,
            revision_history,
            value,
            ack,
        })?;
        ack_rx.await.map_err(|_| anyhow::anyhow!("transport closed before ack"))
    }

    async fn changed(
        &self,
        socket: SocketId,
        name: String,
        revision_history: Vec<RevisionLabel>,
        changes: Vec<Change>,
    ) -> anyhow::Result<bool> {
        let (ack, ack_rx) = oneshot::channel();
        self.inbound.send(Inbound::Changed {
            socket,
            name,
            revision_history,
            changes,
            ack,
        })?;
        ack_rx.await.map_err(|_| anyhow::anyhow!("transport closed before ack"))
    }
}
