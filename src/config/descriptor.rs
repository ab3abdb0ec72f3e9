//! Endpoint descriptor parsing.
//!
//! # Grammar
//! ```text
//! scheme://[user[:pass]@]host:port[/][?key=value&...]
//!
//! Multiplexed serve node:
//! scheme://...?path=/base&reverseproxy=/sub-1@http://host1:port1/inner,/sub-2@http://...
//! ```
//!
//! # Design Decisions
//! - Parsing is pure; the same input always yields an equal descriptor
//! - `Display` re-serializes to a string that parses back to an equal value
//! - Schemes are only checked for syntax here; whether a scheme can be served
//!   is decided by the router generator
//! - An empty host means "all interfaces" (`relay+ws://user:pass@:3000`)

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

use thiserror::Error;
use url::{form_urlencoded, Url};

/// Query key carrying the multiplexed reverse-proxy target list.
pub const REVERSE_PROXY_KEY: &str = "reverseproxy";

/// Query key carrying the base path of a WebSocket-style listener.
pub const PATH_KEY: &str = "path";

/// Bad textual endpoint syntax.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("malformed descriptor {input:?}: expected `scheme://host:port`")]
    MissingScheme { input: String },

    #[error("malformed descriptor {input:?}: invalid scheme {scheme:?}")]
    InvalidScheme { input: String, scheme: String },

    #[error("malformed descriptor {input:?}: invalid authority {authority:?}: {reason}")]
    InvalidAuthority {
        input: String,
        authority: String,
        reason: &'static str,
    },

    #[error("malformed descriptor {input:?}: unexpected path {path:?} (use the `path` query parameter)")]
    UnexpectedPath { input: String, path: String },

    #[error("malformed descriptor {input:?}: invalid query string: {reason}")]
    InvalidQuery { input: String, reason: String },

    #[error("malformed descriptor {input:?}: invalid reverse-proxy entry {entry:?}: {reason}")]
    InvalidReverseProxy {
        input: String,
        entry: String,
        reason: String,
    },
}

/// `user[:pass]` credentials embedded in a descriptor.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credentials {
    username: String,
    password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: Option<String>) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        Some(match raw.split_once(':') {
            Some((user, pass)) => Self::new(user, Some(pass.to_string())),
            None => Self::new(raw, None),
        })
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.password {
            Some(password) => write!(f, "{}:{}", self.username, password),
            None => f.write_str(&self.username),
        }
    }
}

// Keeps passwords out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// One `/sub-path@URL` entry of a multiplexed serve node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyTarget {
    path: String,
    url: Url,
}

impl ProxyTarget {
    /// Externally visible sub-path, always starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Internal backend the sub-path is relayed to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn parse(entry: &str) -> Result<Self, String> {
        let (path, target) = entry
            .split_once('@')
            .ok_or_else(|| "expected `/sub-path@URL`".to_string())?;

        if !path.starts_with('/') {
            return Err(format!("sub-path {path:?} must start with '/'"));
        }

        let url = Url::parse(target).map_err(|e| format!("invalid target URL {target:?}: {e}"))?;
        match url.scheme() {
            "http" | "https" | "ws" | "wss" => {}
            other => return Err(format!("unsupported target scheme {other:?}")),
        }
        if url.host_str().is_none() {
            return Err(format!("target URL {target:?} has no host"));
        }

        Ok(Self {
            path: path.to_string(),
            url,
        })
    }
}

impl fmt::Display for ProxyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.path, self.url)
    }
}

/// A parsed endpoint: where to listen, or a hop to forward through.
///
/// Immutable once parsed. Query parameters are kept in key order; when a key
/// repeats, the first occurrence wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDescriptor {
    scheme: String,
    host: String,
    port: u16,
    credentials: Option<Credentials>,
    query: BTreeMap<String, String>,
    targets: Vec<ProxyTarget>,
}

impl NodeDescriptor {
    /// Parse one textual endpoint specification.
    pub fn parse(input: &str) -> Result<Self, DescriptorError> {
        let trimmed = input.trim();
        let (scheme, rest) = trimmed
            .split_once("://")
            .ok_or_else(|| DescriptorError::MissingScheme {
                input: input.to_string(),
            })?;

        let scheme = parse_scheme(input, scheme)?;

        let (before_query, raw_query) = match rest.split_once('?') {
            Some((head, query)) => (head, Some(query)),
            None => (rest, None),
        };

        let (authority, path) = match before_query.find('/') {
            Some(idx) => before_query.split_at(idx),
            None => (before_query, ""),
        };
        if !path.is_empty() && path != "/" {
            return Err(DescriptorError::UnexpectedPath {
                input: input.to_string(),
                path: path.to_string(),
            });
        }

        let (credentials, host_port) = match authority.rsplit_once('@') {
            Some((userinfo, host_port)) => (Credentials::parse(userinfo), host_port),
            None => (None, authority),
        };
        let (host, port) = parse_host_port(input, host_port)?;

        let query = match raw_query {
            Some(raw) => parse_query(input, raw)?,
            None => BTreeMap::new(),
        };
        let targets = parse_targets(input, &query)?;

        Ok(Self {
            scheme,
            host,
            port,
            credentials,
            query,
            targets,
        })
    }

    /// Lower-cased scheme as written, e.g. `relay+ws`.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host part; empty means all interfaces.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    /// Look up a single query parameter.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Base path of the listener (`?path=`), if any.
    pub fn path(&self) -> Option<&str> {
        self.get(PATH_KEY)
    }

    /// Reverse-proxy targets of a multiplexed serve node; empty otherwise.
    pub fn targets(&self) -> &[ProxyTarget] {
        &self.targets
    }

    pub fn is_multiplexed(&self) -> bool {
        !self.targets.is_empty()
    }

    /// `host:port` suitable for binding. An empty host binds all interfaces.
    pub fn bind_addr(&self) -> String {
        if self.host.is_empty() {
            format!("0.0.0.0:{}", self.port)
        } else {
            self.authority()
        }
    }

    /// `host:port` suitable for dialing. An empty host dials loopback.
    pub fn connect_addr(&self) -> String {
        if self.host.is_empty() {
            format!("127.0.0.1:{}", self.port)
        } else {
            self.authority()
        }
    }

    /// `host:port` exactly as configured, IPv6 hosts bracketed.
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for NodeDescriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for NodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://", self.scheme)?;
        if let Some(credentials) = &self.credentials {
            write!(f, "{credentials}@")?;
        }
        f.write_str(&self.authority())?;
        if !self.query.is_empty() {
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.query.iter())
                .finish();
            write!(f, "?{encoded}")?;
        }
        Ok(())
    }
}

fn parse_scheme(input: &str, raw: &str) -> Result<String, DescriptorError> {
    let invalid = || DescriptorError::InvalidScheme {
        input: input.to_string(),
        scheme: raw.to_string(),
    };

    let mut chars = raw.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return Err(invalid()),
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return Err(invalid());
    }
    if raw.split('+').any(str::is_empty) {
        return Err(invalid());
    }

    Ok(raw.to_ascii_lowercase())
}

fn parse_host_port(input: &str, authority: &str) -> Result<(String, u16), DescriptorError> {
    let invalid = |reason: &'static str| DescriptorError::InvalidAuthority {
        input: input.to_string(),
        authority: authority.to_string(),
        reason,
    };

    let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
        let (host, after) = bracketed
            .split_once(']')
            .ok_or_else(|| invalid("unterminated IPv6 literal"))?;
        host.parse::<Ipv6Addr>()
            .map_err(|_| invalid("invalid IPv6 literal"))?;
        let port = after
            .strip_prefix(':')
            .ok_or_else(|| invalid("missing port"))?;
        (host, port)
    } else {
        let (host, port) = authority
            .rsplit_once(':')
            .ok_or_else(|| invalid("missing port"))?;
        if host.contains(':') {
            return Err(invalid("IPv6 hosts must be bracketed"));
        }
        if !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
        {
            return Err(invalid("invalid host"));
        }
        (host, port)
    };

    let port = port.parse::<u16>().map_err(|_| invalid("invalid port"))?;
    Ok((host.to_string(), port))
}

fn parse_query(input: &str, raw: &str) -> Result<BTreeMap<String, String>, DescriptorError> {
    let mut query = BTreeMap::new();
    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        if key.is_empty() {
            return Err(DescriptorError::InvalidQuery {
                input: input.to_string(),
                reason: format!("empty key in {raw:?}"),
            });
        }
        query
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
    Ok(query)
}

fn parse_targets(
    input: &str,
    query: &BTreeMap<String, String>,
) -> Result<Vec<ProxyTarget>, DescriptorError> {
    let Some(list) = query.get(REVERSE_PROXY_KEY) else {
        return Ok(Vec::new());
    };

    let invalid = |entry: &str, reason: String| DescriptorError::InvalidReverseProxy {
        input: input.to_string(),
        entry: entry.to_string(),
        reason,
    };

    let targets = list
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| ProxyTarget::parse(entry).map_err(|reason| invalid(entry, reason)))
        .collect::<Result<Vec<_>, _>>()?;

    if targets.is_empty() {
        return Err(invalid(list, "empty target list".to_string()));
    }
    Ok(targets)
}
