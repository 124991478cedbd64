//! Crate-boundary error types (§7 Error Handling Design).
//!
//! Construction errors are raised synchronously as programmer errors (a
//! missing transport handle). Protocol divergence, ack-negatives, and
//! observer-attach failures are *not* represented here — per §7 they are
//! silently recovered inside the protocol machinery and never surface to
//! the application beyond the `ready` signal.

use thiserror::Error;

/// Errors that can occur constructing or driving the replicant core.
#[derive(Debug, Error)]
pub enum ReplicantError {
    /// Raised synchronously at construction when no transport handle was
    /// supplied — a programmer error, not a runtime condition (§7).
    #[error("replicant core constructed without a transport handle")]
    MissingTransport,

    /// The transport closed (ack channel dropped) before a reply arrived.
    #[error("transport closed before {0} could be acknowledged")]
    TransportClosed(&'static str),

    /// Configuration failed validation (see [`crate::config::ConfigError`]).
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

pub type Result<T> = std::result::Result<T, ReplicantError>;
