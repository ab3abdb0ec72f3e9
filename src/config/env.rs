//! Environment inputs, read once at startup.
//!
//! | Variable       | Default                | Effect                                   |
//! |----------------|------------------------|------------------------------------------|
//! | `PORT`         | `3000`                 | public listen port of the edge topology  |
//! | `USER`         | `ngvpn:edge@`          | credential prefix of every edge node     |
//! | `WSPATH`       | `ngvpn-edge-ws`        | relay base path                          |
//! | `MWSPATH`      | `ngvpn-edge-mws`       | multiplexed relay sub-path               |
//! | `WSSOCKSPATH`  | `ngvpn-edge-ws-socks`  | WebSocket SOCKS sub-path                 |
//! | `MWSSOCKSPATH` | `ngvpn-edge-mws-socks` | multiplexed WebSocket SOCKS sub-path     |
//! | `LOG`          | unset                  | enables logging in edge mode             |
//! | `PROFILING`    | unset                  | enables the diagnostic endpoint          |
//! | `FREEMEM`      | unset                  | memory reclamation interval (seconds)    |
//!
//! Empty values count as unset.

pub const DEFAULT_PORT: &str = "3000";
pub const DEFAULT_CREDENTIALS: &str = "ngvpn:edge@";
pub const DEFAULT_WS_PATH: &str = "ngvpn-edge-ws";
pub const DEFAULT_MWS_PATH: &str = "ngvpn-edge-mws";
pub const DEFAULT_WS_SOCKS_PATH: &str = "ngvpn-edge-ws-socks";
pub const DEFAULT_MWS_SOCKS_PATH: &str = "ngvpn-edge-mws-socks";

/// Snapshot of every environment variable the process consults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeEnv {
    pub port: String,
    pub credentials: String,
    pub ws_path: String,
    pub mws_path: String,
    pub ws_socks_path: String,
    pub mws_socks_path: String,
    pub log_enabled: bool,
    pub profiling: bool,
    pub free_mem: Option<String>,
}

impl Default for EdgeEnv {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl EdgeEnv {
    /// Read the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary lookup, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let or_default = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        Self {
            port: or_default("PORT", DEFAULT_PORT),
            credentials: or_default("USER", DEFAULT_CREDENTIALS),
            ws_path: or_default("WSPATH", DEFAULT_WS_PATH),
            mws_path: or_default("MWSPATH", DEFAULT_MWS_PATH),
            ws_socks_path: or_default("WSSOCKSPATH", DEFAULT_WS_SOCKS_PATH),
            mws_socks_path: or_default("MWSSOCKSPATH", DEFAULT_MWS_SOCKS_PATH),
            log_enabled: var("LOG").is_some(),
            profiling: var("PROFILING").is_some(),
            free_mem: var("FREEMEM"),
        }
    }

    /// Credentials as a `user:pass@` prefix, ready to splice before a host.
    pub fn credential_prefix(&self) -> String {
        if self.credentials.ends_with('@') {
            self.credentials.clone()
        } else {
            format!("{}@", self.credentials)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> EdgeEnv {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EdgeEnv::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let env = EdgeEnv::default();
        assert_eq!(env.port, "3000");
        assert_eq!(env.credentials, "ngvpn:edge@");
        assert_eq!(env.ws_path, "ngvpn-edge-ws");
        assert_eq!(env.mws_path, "ngvpn-edge-mws");
        assert_eq!(env.ws_socks_path, "ngvpn-edge-ws-socks");
        assert_eq!(env.mws_socks_path, "ngvpn-edge-mws-socks");
        assert!(!env.log_enabled);
        assert!(!env.profiling);
        assert!(env.free_mem.is_none());
    }

    #[test]
    fn test_overrides() {
        let env = env_of(&[
            ("PORT", "8443"),
            ("USER", "alice:pw@"),
            ("WSPATH", "a"),
            ("LOG", "1"),
            ("FREEMEM", "30"),
        ]);
        assert_eq!(env.port, "8443");
        assert_eq!(env.credentials, "alice:pw@");
        assert_eq!(env.ws_path, "a");
        assert_eq!(env.mws_path, DEFAULT_MWS_PATH);
        assert!(env.log_enabled);
        assert_eq!(env.free_mem.as_deref(), Some("30"));
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let env = env_of(&[("PORT", ""), ("LOG", ""), ("PROFILING", "")]);
        assert_eq!(env.port, DEFAULT_PORT);
        assert!(!env.log_enabled);
        assert!(!env.profiling);
    }

    #[test]
    fn test_credential_prefix_gets_separator() {
        assert_eq!(EdgeEnv::default().credential_prefix(), "ngvpn:edge@");
        assert_eq!(env_of(&[("USER", "bob:pw")]).credential_prefix(), "bob:pw@");
    }
}
