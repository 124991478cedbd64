//! Client Replicator
//!
//! Owns a mirror [`Replicant`] per name. Registers with the server on first
//! reference, mirrors server-driven broadcasts, and forwards local edits —
//! the client half of §4.7.

use crate::config::ReplicantConfig;
use crate::protocol::ServerMessage;
use crate::replicant::Replicant;
use crate::revision::{RevisionHistory, RevisionLabel};
use crate::transport::{SocketId, Transport};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex, RwLock};

/// A client-side mirror of one named replicant, plus its readiness signal
/// (§4.7: "until ready, local reads return undefined").
pub struct ReplicantHandle {
    inner: RwLock<Replicant>,
    ready_tx: watch::Sender<bool>,
}

impl ReplicantHandle {
    fn new(name: &str, history_cap: usize) -> Self {
        let (ready_tx, _) = watch::channel(false);
        Self {
            inner: RwLock::new(Replicant::new(name, history_cap)),
            ready_tx,
        }
    }

    pub fn is_ready(&self) -> bool {
        *self.ready_tx.borrow()
    }

    /// Wait for the one-shot `ready` notification (§4.7).
    pub async fn wait_ready(&self) {
        if self.is_ready() {
            return;
        }
        let mut rx = self.ready_tx.subscribe();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// `None` before `ready` fires; `Some` afterwards (§4.7).
    pub async fn value(&self) -> Option<Value> {
        if !self.is_ready() {
            return None;
        }
        Some(self.inner.read().await.value().clone())
    }

    pub async fn revision(&self) -> RevisionLabel {
        self.inner.read().await.revision()
    }

    pub async fn history(&self) -> RevisionHistory {
        self.inner.read().await.history().clone()
    }
}

/// Holds one [`ReplicantHandle`] per name, registered against a single
/// socket on a shared [`Transport`].
pub struct ClientReplicator {
    config: ReplicantConfig,
    transport: Arc<dyn Transport>,
    socket: SocketId,
    replicants: DashMap<String, Arc<ReplicantHandle>>,
    /// Serializes the check-then-register sequence in [`Self::get_replicant`]
    /// so two concurrent callers asking for the same unseen name don't both
    /// fire `replicantRegister`. The protocol itself is otherwise lock-free
    /// per replicant (§5 assumes a single-threaded event loop; this stands
    /// in for that on a multi-threaded executor).
    register_lock: Mutex<()>,
}

impl ClientReplicator {
    pub fn new(config: ReplicantConfig, transport: Arc<dyn Transport>, socket: SocketId) -> Self {
        Self {
            config,
            transport,
            socket,
            replicants: DashMap::new(),
            register_lock: Mutex::new(()),
        }
    }

    /// Drive the client side of the protocol: pull server-originated
    /// broadcasts off `rx` until the transport closes it.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<ServerMessage>) {
        while let Some(msg) = rx.recv().await {
            self.handle_inbound(msg).await;
        }
    }

    /// Look up (or lazily create and register) the replicant named `name`.
    /// Registration happens at most once per name: it emits
    /// `replicantRegister`, awaits ack, calls [`Self::synchronize`], then
    /// marks the handle ready (§4.7 Registration).
    pub async fn get_replicant(&self, name: &str) -> Arc<ReplicantHandle> {
        if let Some(existing) = self.replicants.get(name) {
            return existing.clone();
        }
        let _guard = self.register_lock.lock().await;
        if let Some(existing) = self.replicants.get(name) {
            return existing.clone();
        }

        let handle = Arc::new(ReplicantHandle::new(name, self.config.history_cap));
        self.replicants.insert(name.to_string(), handle.clone());

        if let Err(err) = self.transport.register(self.socket, name.to_string()).await {
            tracing::warn!(name, error = %err, "replicantRegister failed; replicant will never become ready");
            return handle;
        }
        if let Err(err) = self.synchronize(name).await {
            tracing::warn!(name, error = %err, "initial synchronize failed; replicant will never become ready");
            return handle;
        }
        let _ = handle.ready_tx.send(true);
        handle
    }

    /// `replicantGet(name)` and adopt the reply wholesale, under suppression
    /// (§4.7 `synchronize()`). Re-reads live state rather than assuming
    /// nothing else touched the handle while the request was in flight
    /// (§5 Suspension points).
    pub async fn synchronize(&self, name: &str) -> anyhow::Result<()> {
        let handle = match self.replicants.get(name) {
            Some(h) => h.clone(),
            None => return Ok(()),
        };
        let (server_history, value) = self.transport.get(self.socket, name.to_string()).await?;
        let sequence_number = server_history.len() as u64;
        let history = RevisionHistory::from_vec_most_recent_first(server_history, self.config.history_cap);
        let mut r = handle.inner.write().await;
        r.accept_set(value, sequence_number, history);
        Ok(())
    }

    /// Re-synchronize every replicant this client has ever registered.
    /// Called by the composition root on reconnect (§5 Cancellation).
    pub async fn resync_all(&self) {
        let names: Vec<String> = self.replicants.iter().map(|e| e.key().clone()).collect();
        for name in names {
            if let Err(err) = self.synchronize(&name).await {
                tracing::warn!(name, error = %err, "resync failed");
            }
        }
    }

    /// Local write path via nested mutation (§4.7): mutate a clone of the
    /// current value, diff it into a change-list, and push the incremental
    /// `replicantChanged` path. A no-op edit (diff is empty) is dropped
    /// without touching the wire.
    pub async fn edit<F>(&self, name: &str, f: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut Value) + Send,
    {
        let handle = self.get_replicant(name).await;
        let (new_value, changes) = {
            let r = handle.inner.read().await;
            r.edit(f)
        };
        if changes.is_empty() {
            return Ok(());
        }
        self.push_changes(name, &handle, new_value, Some(changes)).await
    }

    /// Local write path via whole-value replacement (§4.7): no diff is
    /// computed, so this always takes the heavy `replicantSet` path.
    pub async fn set(&self, name: &str, new_value: Value) -> anyhow::Result<()> {
        let handle = self.get_replicant(name).await;
        self.push_changes(name, &handle, new_value, None).await
    }

    /// §4.7 `pushChanges`. Advances sequence number and history *before*
    /// sending (the revision label is computed against the value already
    /// installed), then sends the appropriate message and handles the
    /// ack-negative fallback chain.
    async fn push_changes(
        &self,
        name: &str,
        handle: &Arc<ReplicantHandle>,
        new_value: Value,
        changes: Option<Vec<crate::change::Change>>,
    ) -> anyhow::Result<()> {
        let revision_history = {
            let mut r = handle.inner.write().await;
            r.advance_local(new_value.clone());
            r.history().to_vec_most_recent_first()
        };

        match changes {
            Some(changes) => {
                let accepted = self
                    .transport
                    .changed(self.socket, name.to_string(), revision_history.clone(), changes)
                    .await?;
                if !accepted {
                    tracing::debug!(name, "replicantChanged rejected, falling back to replicantSet");
                    let accepted = self
                        .transport
                        .set(self.socket, name.to_string(), revision_history, new_value)
                        .await?;
                    if !accepted {
                        tracing::debug!(name, "replicantSet fallback also rejected, resynchronizing");
                        self.synchronize(name).await?;
                    }
                }
            }
            None => {
                let accepted = self
                    .transport
                    .set(self.socket, name.to_string(), revision_history, new_value)
                    .await?;
                if !accepted {
                    tracing::debug!(name, "replicantSet rejected, resynchronizing");
                    self.synchronize(name).await?;
                }
            }
        }
        Ok(())
    }

    async fn handle_inbound(&self, msg: ServerMessage) {
        let name = msg.name().to_string();
        let Some(handle) = self.replicants.get(&name).map(|e| e.clone()) else {
            tracing::debug!(name, "inbound broadcast for unregistered replicant, ignoring");
            return;
        };

        match msg {
            ServerMessage::ReplicantSet {
                revision_history,
                value,
                ..
            } => {
                // No comparison with local state (§4.7): the heavy path is
                // always adopted wholesale.
                let sequence_number = revision_history.len() as u64;
                let history =
                    RevisionHistory::from_vec_most_recent_first(revision_history, self.config.history_cap);
                let mut r = handle.inner.write().await;
                r.accept_set(value, sequence_number, history);
            }
            ServerMessage::ReplicantChanged {
                revision_history,
                changes,
                ..
            } => {
                self.handle_changed_broadcast(&name, &handle, revision_history, changes)
                    .await;
            }
        }
    }

    /// §4.7 inbound `replicantChanged` handler, with the §9 echo
    /// short-circuit: if the broadcast's current label already matches what
    /// this client holds, it is this client's own edit coming back around
    /// the room and is dropped as a no-op rather than re-applied.
    async fn handle_changed_broadcast(
        &self,
        name: &str,
        handle: &Arc<ReplicantHandle>,
        server_history: Vec<RevisionLabel>,
        changes: Vec<crate::change::Change>,
    ) {
        let local_revision = handle.inner.read().await.revision();

        if server_history.first() == Some(&local_revision) {
            tracing::debug!(name, "echo of own edit, already applied locally");
            return;
        }

        if server_history.get(1) == Some(&local_revision) {
            let mut r = handle.inner.write().await;
            r.accept_changed_from_server(&changes, server_history, self.config.history_cap);
            return;
        }

        tracing::info!(name, "divergent parent revision in broadcast, resynchronizing");
        if let Err(err) = self.synchronize(name).await {
            tracing::warn!(name, error = %err, "resynchronize after divergence failed");
        }
    }
}
