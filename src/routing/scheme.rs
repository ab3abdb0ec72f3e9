//! Scheme resolution: `protocol+transport`.
//!
//! # Rules
//! - `a+b` is protocol `a` over transport `b`
//! - a lone transport name (`ws`, `mws`, `wss`, `mwss`, `tls`, `mtls`, `h2`,
//!   `h2c`, `quic`, `kcp`, `ssh`) is the auto-detecting protocol over it
//! - a lone protocol name is that protocol over plain TCP
//! - `https` is `http+tls`; `socks` is `socks5`
//! - anything else is unknown and cannot be served

use std::fmt;

/// Application protocol spoken on a listener or hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Detects HTTP or SOCKS per connection.
    Auto,
    Http,
    Http2,
    Socks4,
    Socks4a,
    Socks5,
    Shadowsocks,
    Sni,
    Relay,
    TcpForward,
    UdpForward,
    RemoteTcpForward,
    RemoteUdpForward,
    Redirect,
    Dns,
}

impl Protocol {
    pub fn from_name(name: &str) -> Option<Self> {
        let protocol = match name {
            "auto" => Self::Auto,
            "http" => Self::Http,
            "http2" => Self::Http2,
            "socks4" => Self::Socks4,
            "socks4a" => Self::Socks4a,
            "socks" | "socks5" => Self::Socks5,
            "ss" => Self::Shadowsocks,
            "sni" => Self::Sni,
            "relay" => Self::Relay,
            "tcp" | "forward" => Self::TcpForward,
            "udp" => Self::UdpForward,
            "rtcp" => Self::RemoteTcpForward,
            "rudp" => Self::RemoteUdpForward,
            "red" | "redirect" => Self::Redirect,
            "dns" => Self::Dns,
            _ => return None,
        };
        Some(protocol)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Http => "http",
            Self::Http2 => "http2",
            Self::Socks4 => "socks4",
            Self::Socks4a => "socks4a",
            Self::Socks5 => "socks5",
            Self::Shadowsocks => "ss",
            Self::Sni => "sni",
            Self::Relay => "relay",
            Self::TcpForward => "tcp",
            Self::UdpForward => "udp",
            Self::RemoteTcpForward => "rtcp",
            Self::RemoteUdpForward => "rudp",
            Self::Redirect => "redirect",
            Self::Dns => "dns",
        }
    }
}

/// Transport carrying the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Tcp,
    Tls,
    Mtls,
    Ws,
    Mws,
    Wss,
    Mwss,
    H2,
    H2c,
    Quic,
    Kcp,
    Ssh,
}

impl TransportKind {
    pub fn from_name(name: &str) -> Option<Self> {
        let transport = match name {
            "tcp" => Self::Tcp,
            "tls" => Self::Tls,
            "mtls" => Self::Mtls,
            "ws" => Self::Ws,
            "mws" => Self::Mws,
            "wss" => Self::Wss,
            "mwss" => Self::Mwss,
            "h2" => Self::H2,
            "h2c" => Self::H2c,
            "quic" => Self::Quic,
            "kcp" => Self::Kcp,
            "ssh" => Self::Ssh,
            _ => return None,
        };
        Some(transport)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Tls => "tls",
            Self::Mtls => "mtls",
            Self::Ws => "ws",
            Self::Mws => "mws",
            Self::Wss => "wss",
            Self::Mwss => "mwss",
            Self::H2 => "h2",
            Self::H2c => "h2c",
            Self::Quic => "quic",
            Self::Kcp => "kcp",
            Self::Ssh => "ssh",
        }
    }

    /// Server side terminates TLS with the process identity.
    pub fn requires_tls(self) -> bool {
        matches!(
            self,
            Self::Tls | Self::Mtls | Self::Wss | Self::Mwss | Self::H2 | Self::Quic
        )
    }

    /// Runs over UDP rather than a TCP listener.
    pub fn is_datagram(self) -> bool {
        matches!(self, Self::Quic | Self::Kcp)
    }
}

/// Resolved `protocol+transport` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scheme {
    pub protocol: Protocol,
    pub transport: TransportKind,
}

impl Scheme {
    /// Resolve a descriptor scheme; `None` when it names nothing servable.
    pub fn resolve(raw: &str) -> Option<Self> {
        if let Some((protocol, transport)) = raw.split_once('+') {
            return Some(Self {
                protocol: Protocol::from_name(protocol)?,
                transport: TransportKind::from_name(transport)?,
            });
        }

        if raw == "https" {
            return Some(Self {
                protocol: Protocol::Http,
                transport: TransportKind::Tls,
            });
        }

        // "tcp" alone is the port-forward protocol, not a bare transport.
        if let Some(transport) =
            TransportKind::from_name(raw).filter(|t| *t != TransportKind::Tcp)
        {
            return Some(Self {
                protocol: Protocol::Auto,
                transport,
            });
        }

        Protocol::from_name(raw).map(|protocol| Self {
            protocol,
            transport: TransportKind::Tcp,
        })
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.protocol.as_str(), self.transport.as_str())
    }
}
