//! Peer endpoint validation.
//!
//! The only accepted shape is `ws://<a.b.c.d>:<port>/ws`. Anything else is
//! rejected with [`ClipSyncError::InvalidAddress`] before a socket is ever
//! opened.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ClipSyncError;

/// Fixed path the desktop peer serves its socket on.
pub const PEER_PATH: &str = "/ws";

static ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ws://(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3}):(\d{1,5})/ws$")
        .expect("address pattern is a valid regex")
});

/// A validated, immutable peer endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerAddress {
    ip: Ipv4Addr,
    port: u16,
}

impl PeerAddress {
    /// Parse and validate a `ws://<ipv4>:<port>/ws` string.
    pub fn parse(input: &str) -> Result<Self, ClipSyncError> {
        let invalid = || ClipSyncError::InvalidAddress(input.to_string());

        let caps = ADDRESS_PATTERN.captures(input).ok_or_else(invalid)?;

        let mut octets = [0u8; 4];
        for (i, octet) in octets.iter_mut().enumerate() {
            *octet = caps[i + 1].parse::<u8>().map_err(|_| invalid())?;
        }

        let port = caps[5].parse::<u16>().map_err(|_| invalid())?;
        if port == 0 {
            return Err(invalid());
        }

        Ok(Self {
            ip: Ipv4Addr::from(octets),
            port,
        })
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn socket_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.ip, self.port)
    }

    /// Canonical URL handed to the WebSocket client.
    pub fn url(&self) -> String {
        format!("ws://{}:{}{}", self.ip, self.port, PEER_PATH)
    }
}

impl std::fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url())
    }
}

impl std::str::FromStr for PeerAddress {
    type Err = ClipSyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// `true` when `input` is an acceptable peer address.
pub fn is_valid_address(input: &str) -> bool {
    PeerAddress::parse(input).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dotted_quad_with_port() {
        for addr in [
            "ws://192.168.1.20:8080/ws",
            "ws://0.0.0.0:1/ws",
            "ws://255.255.255.255:65535/ws",
            "ws://10.0.0.7:80/ws",
        ] {
            assert!(is_valid_address(addr), "{addr} should be valid");
        }
    }

    #[test]
    fn rejects_pattern_violations() {
        for addr in [
            "",
            "http://192.168.1.20:8080/ws",
            "wss://192.168.1.20:8080/ws",
            "ws://192.168.1.x:8080/ws",
            "ws://192.168.1:8080/ws",
            "ws://192.168.1.20:8080",
            "ws://192.168.1.20:8080/",
            "ws://192.168.1.20/ws",
            "ws://192.168.1.20:8080/ws/extra",
            "ws://localhost:8080/ws",
            " ws://192.168.1.20:8080/ws",
        ] {
            assert!(!is_valid_address(addr), "{addr:?} should be invalid");
        }
    }

    #[test]
    fn rejects_out_of_range_numbers() {
        assert!(!is_valid_address("ws://256.1.1.1:8080/ws"));
        assert!(!is_valid_address("ws://1.1.1.1:65536/ws"));
        assert!(!is_valid_address("ws://1.1.1.1:0/ws"));
    }

    #[test]
    fn parse_exposes_parts_and_round_trips_url() {
        let addr = PeerAddress::parse("ws://192.168.255.229:8080/ws").unwrap();
        assert_eq!(addr.ip(), Ipv4Addr::new(192, 168, 255, 229));
        assert_eq!(addr.port(), 8080);
        assert_eq!(addr.url(), "ws://192.168.255.229:8080/ws");
        assert_eq!(addr.to_string(), addr.url());
    }

    #[test]
    fn invalid_address_error_carries_input() {
        let err = PeerAddress::parse("ws://nope").unwrap_err();
        assert!(matches!(err, ClipSyncError::InvalidAddress(ref s) if s == "ws://nope"));
    }

    #[test]
    fn from_str_matches_parse() {
        let addr: PeerAddress = "ws://127.0.0.1:9000/ws".parse().unwrap();
        assert_eq!(addr.socket_addr().to_string(), "127.0.0.1:9000");
    }
}
