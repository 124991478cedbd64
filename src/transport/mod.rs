//! Transport port
//!
//! The spec treats the message channel as an external collaborator, but
//! still pins down its exact shape (room-multicast, per-socket FIFO
//! ordering, optional ack). This trait is that shape made concrete enough
//! to code against; [`channel::ChannelTransport`] is the in-process
//! reference adapter used by the demo binary and the integration tests. A
//! websocket/socket.io-shaped adapter can implement the same trait without
//! `server.rs` or `client.rs` changing.

pub mod channel;

use crate::change::Change;
use crate::revision::RevisionLabel;
use async_trait::async_trait;
use serde_json::Value;

/// Opaque identifier for one connected client socket.
pub type SocketId = u64;

/// Everything both replicator halves need from the channel: room
/// management and multicast for the server side, request/ack send for the
/// client side. A single trait because both sides of this protocol share
/// one duplex channel abstraction (§6).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Join `socket` to `room`, idempotently.
    async fn join_room(&self, socket: SocketId, room: &str);

    /// Multicast a server-originated message to every socket in `room`,
    /// including the originator. No ack is awaited (§4.6 step 5).
    async fn multicast(&self, room: &str, msg: crate::protocol::ServerMessage);

    /// Deliver a message directly to one socket, bypassing room membership.
    async fn send_to(&self, socket: SocketId, msg: crate::protocol::ServerMessage);

    /// `replicantRegister(name)`, ack `()`.
    async fn register(&self, socket: SocketId, name: String) -> anyhow::Result<()>;

    /// `replicantGet(name)`, ack `(revisionHistory, value)`.
    async fn get(&self, socket: SocketId, name: String) -> anyhow::Result<(Vec<RevisionLabel>, Value)>;

    /// `replicantSet(name, revisionHistory, value)`, ack `success`.
    async fn set(
        &self,
        socket: SocketId,
        name: String,
        revision_history: Vec<RevisionLabel>,
        value: Value,
    ) -> anyhow::Result<bool>;

    /// `replicantChanged(name, revisionHistory, changes)`, ack `success`.
    async fn changed(
        &self,
        socket: SocketId,
        name: String,
        revision_history: Vec<RevisionLabel>,
        changes: Vec<Change>,
    ) -> anyhow::Result<bool>;
}

/// One inbound client message, paired with the socket it arrived on and
/// (where the wire table calls for one) the channel to deliver its ack
/// reply through. The server replicator's main loop consumes a stream of
/// these.
#[derive(Debug)]
pub enum Inbound {
    Register {
        socket: SocketId,
        name: String,
        ack: tokio::sync::oneshot::Sender<()>,
    },
    Get {
        socket: SocketId,
        name: String,
        ack: tokio::sync::oneshot::Sender<(Vec<RevisionLabel>, Value)>,
    },
    Set {
        socket: SocketId,
        name: String,
        revision_history: Vec<RevisionLabel>,
        value: Value,
        ack: tokio::sync::oneshot::Sender<bool>,
    },
    Changed {
        socket: SocketId,
        name: String,
        revision_history: Vec<RevisionLabel>,
        changes: Vec<Change>,
        ack: tokio::sync::oneshot::Sender<bool>,
    },
}
