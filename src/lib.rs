//! Named replicated values shared between a central server and its clients.
//!
//! See `SPEC_FULL.md` for the full module breakdown. The short version: a
//! [`Replicant`] is a named, structured value with a content-hashed revision
//! chain (`revision`); [`ServerReplicator`] owns the authoritative copy of
//! each one and arbitrates every inbound edit against that chain;
//! [`ClientReplicator`] owns a mirror and re-synchronizes on divergence.

pub mod change;
pub mod client;
pub mod codec;
pub mod config;
pub mod diff;
pub mod error;
pub mod path;
pub mod protocol;
pub mod replicant;
pub mod revision;
pub mod server;
pub mod transport;

pub use change::Change;
pub use client::{ClientReplicator, ReplicantHandle};
pub use config::{load_config, ReplicantConfig};
pub use error::{ReplicantError, Result};
pub use replicant::Replicant;
pub use revision::{revision_label, RevisionHistory, RevisionLabel};
pub use server::ServerReplicator;
pub use transport::{SocketId, Transport};
