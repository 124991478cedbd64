//! Server Replicator
//!
//! Owns the authoritative replicant per name and arbitrates every inbound
//! edit against its revision chain. Mirrors this codebase's lock-free
//! top-level map pattern: a `DashMap` of names to individually-locked
//! replicants, so unrelated names never contend.

use crate::change::Change;
use crate::config::ReplicantConfig;
use crate::protocol::ServerMessage;
use crate::replicant::Replicant;
use crate::transport::{Inbound, SocketId, Transport};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The authoritative half of the protocol: one [`Replicant`] per name,
/// shared across all connected clients.
pub struct ServerReplicator {
    config: ReplicantConfig,
    replicants: DashMap<String, Arc<RwLock<Replicant>>>,
    transport: Arc<dyn Transport>,
}

impl ServerReplicator {
    pub fn new(config: ReplicantConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            replicants: DashMap::new(),
            transport,
        }
    }

    fn room(&self, name: &str) -> String {
        format!("{}{name}", self.config.server_room_prefix)
    }

    fn entry(&self, name: &str) -> Arc<RwLock<Replicant>> {
        let cap = self.config.history_cap;
        self.replicants
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(Replicant::new(name, cap))))
            .clone()
    }

    /// Drive the server side of the protocol: pull inbound client messages
    /// off `rx` until the transport closes it.
    pub async fn run(self: Arc<Self>, mut rx: tokio::sync::mpsc::UnboundedReceiver<Inbound>) {
        while let Some(msg) = rx.recv().await {
            self.handle(msg).await;
        }
    }

    async fn handle(&self, msg: Inbound) {
        match msg {
            Inbound::Register { socket, name, ack } => {
                self.handle_register(socket, name, ack).await;
            }
            Inbound::Get { socket, name, ack } => {
                self.handle_get(socket, name, ack).await;
            }
            Inbound::Set {
                socket,
                name,
                revision_history,
                value,
                ack,
            } => {
                self.handle_set(socket, name, revision_history, value, ack).await;
            }
            Inbound::Changed {
                socket,
                name,
                revision_history,
                changes,
                ack,
            } => {
                self.handle_changed(socket, name, revision_history, changes, ack)
                    .await;
            }
        }
    }

    /// `replicantRegister(name)`: lookup-or-create, join the room, ack.
    async fn handle_register(&self, socket: SocketId, name: String, ack: tokio::sync::oneshot::Sender<()>) {
        let _replicant = self.entry(&name);
        self.transport.join_room(socket, &self.room(&name)).await;
        tracing::debug!(%name, socket, "replicant registered");
        let _ = ack.send(());
    }

    /// `replicantGet(name)`: reply with the current authoritative state.
    async fn handle_get(
        &self,
        _socket: SocketId,
        name: String,
        ack: tokio::sync::oneshot::Sender<(Vec<crate::revision::RevisionLabel>, Value)>,
    ) {
        let replicant = self.entry(&name);
        let guard = replicant.read().await;
        let reply = (guard.history().to_vec_most_recent_first(), guard.value().clone());
        let _ = ack.send(reply);
    }

    /// `replicantSet(name, clientHistory, newValue)`: accept iff the
    /// client's claimed history contains our current revision anywhere.
    async fn handle_set(
        &self,
        socket: SocketId,
        name: String,
        client_history: Vec<crate::revision::RevisionLabel>,
        new_value: Value,
        ack: tokio::sync::oneshot::Sender<bool>,
    ) {
        let replicant = self.entry(&name);
        let mut guard = replicant.write().await;

        let current = guard.revision();
        if !client_history.contains(&current) {
            tracing::warn!(
                %name, socket,
                "rejected replicantSet: server revision not present in client history"
            );
            let _ = ack.send(false);
            return;
        }

        let base_history: Vec<_> = client_history.into_iter().skip(1).collect();
        let _ = ack.send(true);
        self.push_set(&mut guard, &name, new_value, base_history).await;
    }

    /// `replicantChanged(name, clientHistory, changes)`: accept iff the
    /// client's claimed parent (`clientHistory[1]`) matches our current
    /// revision.
    async fn handle_changed(
        &self,
        socket: SocketId,
        name: String,
        client_history: Vec<crate::revision::RevisionLabel>,
        changes: Vec<Change>,
        ack: tokio::sync::oneshot::Sender<bool>,
    ) {
        let replicant = self.entry(&name);
        let mut guard = replicant.write().await;

        let current = guard.revision();
        let claimed_parent = client_history.get(1).copied();
        if claimed_parent != Some(current) {
            tracing::warn!(
                %name, socket,
                claimed = ?claimed_parent, current = %current,
                "rejected replicantChanged: stale parent revision"
            );
            let _ = ack.send(false);
            return;
        }

        let _ = ack.send(true);
        self.push_changes(&mut guard, &name, changes).await;
    }

    /// §4.6 `pushChanges` when the caller supplies the full new value
    /// (the `replicantSet` accept path): rebuild history from the client's
    /// claimed history with its own unconfirmed head dropped, then advance
    /// one step, then multicast `replicantSet`.
    async fn push_set(
        &self,
        guard: &mut tokio::sync::RwLockWriteGuard<'_, Replicant>,
        name: &str,
        new_value: Value,
        base_history: Vec<crate::revision::RevisionLabel>,
    ) {
        guard.accept_set_and_advance(new_value.clone(), base_history, self.config.history_cap);
        self.transport
            .multicast(
                &self.room(name),
                ServerMessage::ReplicantSet {
                    name: name.to_string(),
                    revision_history: guard.history().to_vec_most_recent_first(),
                    value: new_value,
                },
            )
            .await;
        tracing::info!(name, "accepted replicantSet, multicast to room");
    }

    /// §4.6 `pushChanges` when the caller supplies an incremental
    /// change-list (the `replicantChanged` accept path).
    async fn push_changes(
        &self,
        guard: &mut tokio::sync::RwLockWriteGuard<'_, Replicant>,
        name: &str,
        changes: Vec<Change>,
    ) {
        guard.accept_changes(&changes);
        self.transport
            .multicast(
                &self.room(name),
                ServerMessage::ReplicantChanged {
                    name: name.to_string(),
                    revision_history: guard.history().to_vec_most_recent_first(),
                    changes,
                },
            )
            .await;
        tracing::info!(name, "accepted replicantChanged, multicast to room");
    }
}
