//! Replicant Configuration
//!
//! Configuration for the replicant protocol (§6): the transport namespace and
//! the room-prefix each side uses to derive a per-replicant broadcast room
//! name, plus the revision-history cap (§9).

/// Configuration for a [`crate::server::ServerReplicator`] /
/// [`crate::client::ClientReplicator`] pair.
#[derive(Debug, Clone)]
pub struct ReplicantConfig {
    /// Sub-channel to select on the transport, if it supports one (§6, §9).
    /// `None` means "use the default channel" — the source's
    /// `io.namespace(options.namespace)` call is modeled as a no-op here
    /// when this is `None`, matching the "likely typo" reading in §9.
    pub namespace: Option<String>,

    /// Prefix concatenated with a replicant name to form the server's
    /// broadcast room identifier (§6). Default `"replicants/"`.
    pub server_room_prefix: String,

    /// Prefix the client-side constructor would use for the same purpose.
    /// The client never actually joins or addresses a room — rooms are a
    /// server-side concept — so this field is inert data, kept only
    /// because the source carries it (§9's documented default divergence).
    /// Default `"replicant-"`.
    pub client_room_prefix: String,

    /// Maximum number of labels retained per [`crate::revision::RevisionHistory`]
    /// before the tail is trimmed (§3, §9). Positions 0 and 1 are always
    /// exempt regardless of this value.
    pub history_cap: usize,
}

impl Default for ReplicantConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            server_room_prefix: "replicants/".to_string(),
            client_room_prefix: "replicant-".to_string(),
            history_cap: crate::revision::DEFAULT_HISTORY_CAP,
        }
    }
}

impl ReplicantConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn server_room_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.server_room_prefix = prefix.into();
        self
    }

    pub fn client_room_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.client_room_prefix = prefix.into();
        self
    }

    pub fn history_cap(mut self, cap: usize) -> Self {
        self.history_cap = cap;
        self
    }

    /// Validate the configuration. A room prefix must not itself contain the
    /// separator a replicant name would be concatenated onto incorrectly —
    /// in practice this only rules out an empty prefix colliding with an
    /// empty name, but it gives callers a place to catch config typos before
    /// wiring up a server.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_room_prefix.is_empty() {
            return Err(ConfigError::EmptyServerRoomPrefix);
        }
        if self.history_cap < 2 {
            return Err(ConfigError::HistoryCapTooSmall(self.history_cap));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("server_room_prefix must not be empty")]
    EmptyServerRoomPrefix,
    #[error("history_cap must be at least 2 (positions 0 and 1 are load-bearing), got {0}")]
    HistoryCapTooSmall(usize),
}

/// Load a [`ReplicantConfig`] from the environment, falling back to the
/// defaults above for anything unset or unparsable. Mirrors this codebase's
/// existing `std::env::var(...).unwrap_or_else(...)` loader shape rather
/// than reaching for a config-parsing crate.
pub fn load_config() -> anyhow::Result<ReplicantConfig> {
    let namespace = std::env::var("REPLICANT_NAMESPACE").ok().filter(|s| !s.is_empty());

    let server_room_prefix = std::env::var("REPLICANT_SERVER_ROOM_PREFIX")
        .unwrap_or_else(|_| "replicants/".to_string());

    let client_room_prefix = std::env::var("REPLICANT_CLIENT_ROOM_PREFIX")
        .unwrap_or_else(|_| "replicant-".to_string());

    let history_cap = std::env::var("REPLICANT_HISTORY_CAP")
        .unwrap_or_else(|_| crate::revision::DEFAULT_HISTORY_CAP.to_string())
        .parse()
        .unwrap_or(crate::revision::DEFAULT_HISTORY_CAP);

    let config = ReplicantConfig {
        namespace,
        server_room_prefix,
        client_room_prefix,
        history_cap,
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let cfg = ReplicantConfig::default();
        assert_eq!(cfg.namespace, None);
        assert_eq!(cfg.server_room_prefix, "replicants/");
        assert_eq!(cfg.client_room_prefix, "replicant-");
        assert_eq!(cfg.history_cap, crate::revision::DEFAULT_HISTORY_CAP);
    }

    #[test]
    fn builder_pattern_overrides_defaults() {
        let cfg = ReplicantConfig::new()
            .namespace("/game")
            .server_room_prefix("room-")
            .history_cap(50);
        assert_eq!(cfg.namespace, Some("/game".to_string()));
        assert_eq!(cfg.server_room_prefix, "room-");
        assert_eq!(cfg.history_cap, 50);
    }

    #[test]
    fn validate_rejects_empty_server_room_prefix() {
        let cfg = ReplicantConfig::new().server_room_prefix("");
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyServerRoomPrefix));
    }

    #[test]
    fn validate_rejects_history_cap_below_two() {
        let cfg = ReplicantConfig::new().history_cap(1);
        assert_eq!(cfg.validate(), Err(ConfigError::HistoryCapTooSmall(1)));
    }

    #[test]
    fn validate_ok_for_defaults() {
        assert!(ReplicantConfig::default().validate().is_ok());
    }

    #[test]
    fn load_config_defaults_when_env_unset() {
        std::env::remove_var("REPLICANT_NAMESPACE");
        std::env::remove_var("REPLICANT_SERVER_ROOM_PREFIX");
        std::env::remove_var("REPLICANT_CLIENT_ROOM_PREFIX");
        std::env::remove_var("REPLICANT_HISTORY_CAP");
        let cfg = load_config().unwrap();
        assert_eq!(cfg.server_room_prefix, "replicants/");
        assert_eq!(cfg.history_cap, crate::revision::DEFAULT_HISTORY_CAP);
    }

    #[test]
    fn load_config_reads_namespace_from_env() {
        std::env::set_var("REPLICANT_NAMESPACE", "/game");
        let cfg = load_config().unwrap();
        assert_eq!(cfg.namespace, Some("/game".to_string()));
        std::env::remove_var("REPLICANT_NAMESPACE");
    }

    #[test]
    fn load_config_parse_error_on_history_cap_uses_default() {
        std::env::set_var("REPLICANT_HISTORY_CAP", "not_a_number");
        let cfg = load_config().unwrap();
        assert_eq!(cfg.history_cap, crate::revision::DEFAULT_HISTORY_CAP);
        std::env::remove_var("REPLICANT_HISTORY_CAP");
    }
}
