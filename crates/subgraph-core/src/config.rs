#![forbid(unsafe_code)]

//! Container configuration.

use std::env;

/// Configuration for a container's subscription graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphConfig {
    /// Panic when `try_get_local` is handed a proxy id instead of reporting
    /// it absent. `get_or_create_local` rejects proxies either way.
    /// Default: on in debug builds, off in release builds.
    pub identity_checks: bool,

    /// Populate the host-keyed secondary index on every add.
    /// Default: true.
    pub track_hosts: bool,

    /// Label carried in the container context for logs and sinks.
    /// Default: none.
    pub label: Option<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            identity_checks: cfg!(debug_assertions),
            track_hosts: true,
            label: None,
        }
    }
}

fn parse_flag(val: &str) -> Option<bool> {
    if val == "1" || val.eq_ignore_ascii_case("true") {
        Some(true)
    } else if val == "0" || val.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

impl GraphConfig {
    /// Defaults with environment overrides applied.
    ///
    /// Reads `SUBGRAPH_IDENTITY_CHECKS`, `SUBGRAPH_TRACK_HOSTS` and
    /// `SUBGRAPH_CONTAINER_LABEL`. Unparseable values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|name| env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    #[must_use]
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(val) = lookup("SUBGRAPH_IDENTITY_CHECKS")
            && let Some(flag) = parse_flag(&val)
        {
            self.identity_checks = flag;
        }
        if let Some(val) = lookup("SUBGRAPH_TRACK_HOSTS")
            && let Some(flag) = parse_flag(&val)
        {
            self.track_hosts = flag;
        }
        if let Some(val) = lookup("SUBGRAPH_CONTAINER_LABEL")
            && !val.is_empty()
        {
            self.label = Some(val);
        }
        self
    }

    #[must_use]
    pub fn with_identity_checks(mut self, enabled: bool) -> Self {
        self.identity_checks = enabled;
        self
    }

    #[must_use]
    pub fn with_track_hosts(mut self, enabled: bool) -> Self {
        self.track_hosts = enabled;
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
