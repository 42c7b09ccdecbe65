use super::error::TrackerError;
use crate::bencode::decode;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

/// Size of one entry in a compact IPv4 peer list.
pub const COMPACT_PEER_LEN: usize = 6;

/// An IPv4 peer address from a compact tracker response.
///
/// Both the address and the port are stored in network byte order on the
/// wire: 4 bytes of IP followed by 2 bytes of port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerAddress {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl PeerAddress {
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self { ip, port }
    }

    /// Parses one 6-byte compact record.
    pub fn from_compact(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < COMPACT_PEER_LEN {
            return None;
        }
        let ip = Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]);
        let port = u16::from_be_bytes([bytes[4], bytes[5]]);
        Some(Self { ip, port })
    }

    pub fn to_compact(&self) -> [u8; COMPACT_PEER_LEN] {
        let mut out = [0u8; COMPACT_PEER_LEN];
        out[..4].copy_from_slice(&self.ip.octets());
        out[4..].copy_from_slice(&self.port.to_be_bytes());
        out
    }

    pub fn to_socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.ip, self.port))
    }
}

impl From<SocketAddrV4> for PeerAddress {
    fn from(addr: SocketAddrV4) -> Self {
        Self::new(*addr.ip(), addr.port())
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// Splits a compact peer list into addresses.
///
/// The list must be a whole number of 6-byte records.
pub fn parse_compact_peers(data: &[u8]) -> Result<Vec<PeerAddress>, TrackerError> {
    if data.len() % COMPACT_PEER_LEN != 0 {
        return Err(TrackerError::InvalidResponse(format!(
            "compact peer list of {} bytes is not a multiple of {}",
            data.len(),
            COMPACT_PEER_LEN
        )));
    }

    Ok(data
        .chunks_exact(COMPACT_PEER_LEN)
        .filter_map(PeerAddress::from_compact)
        .collect())
}

/// A parsed tracker announce response.
#[derive(Debug, Clone)]
pub struct AnnounceResponse {
    /// Seconds the tracker asks us to wait before re-announcing.
    pub interval: Option<u32>,
    pub min_interval: Option<u32>,
    pub complete: Option<u32>,
    pub incomplete: Option<u32>,
    pub peers: Vec<PeerAddress>,
    pub warning_message: Option<String>,
}

impl AnnounceResponse {
    /// Parses a bencoded tracker response body.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::Failure`] if the tracker sent a `failure reason`
    /// - [`TrackerError::MissingField`] if `peers` is absent
    /// - [`TrackerError::InvalidResponse`] if the body is not a dictionary or
    ///   `peers` is not a compact string of 6-byte records
    ///
    /// # Examples
    ///
    /// ```
    /// use seedling::tracker::AnnounceResponse;
    ///
    /// let body = b"d8:intervali60e5:peers6:\x7f\x00\x00\x01\x1a\xe1e";
    /// let response = AnnounceResponse::from_bytes(body).unwrap();
    /// assert_eq!(response.interval, Some(60));
    /// assert_eq!(response.peers[0].to_string(), "127.0.0.1:6881");
    /// ```
    pub fn from_bytes(body: &[u8]) -> Result<Self, TrackerError> {
        let value = decode(body)?;
        let dict = value
            .as_dict()
            .ok_or_else(|| TrackerError::InvalidResponse("expected dict".into()))?;

        if let Some(failure) = dict.get(b"failure reason") {
            return Err(TrackerError::Failure(
                failure.to_text().unwrap_or_default(),
            ));
        }

        let peers = dict
            .get(b"peers")
            .ok_or(TrackerError::MissingField("peers"))?
            .as_bytes()
            .ok_or_else(|| TrackerError::InvalidResponse("peers is not a compact string".into()))?;

        let field_u32 = |key: &[u8]| {
            dict.get(key)
                .and_then(|v| v.as_integer())
                .and_then(|v| u32::try_from(v).ok())
        };

        Ok(Self {
            interval: field_u32(b"interval"),
            min_interval: field_u32(b"min interval"),
            complete: field_u32(b"complete"),
            incomplete: field_u32(b"incomplete"),
            peers: parse_compact_peers(peers)?,
            warning_message: dict
                .get(b"warning message")
                .and_then(|v| v.to_text().ok()),
        })
    }
}
