use super::error::PeerError;
use crate::constants::{HANDSHAKE_LEN, PROTOCOL};
use bytes::{Buf, BufMut, Bytes, BytesMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageId {
    Choke = 0,
    Unchoke = 1,
    Interested = 2,
    NotInterested = 3,
    Have = 4,
    Bitfield = 5,
    Request = 6,
    Piece = 7,
    Cancel = 8,
    Port = 9,
}

impl TryFrom<u8> for MessageId {
    type Error = PeerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageId::Choke),
            1 => Ok(MessageId::Unchoke),
            2 => Ok(MessageId::Interested),
            3 => Ok(MessageId::NotInterested),
            4 => Ok(MessageId::Have),
            5 => Ok(MessageId::Bitfield),
            6 => Ok(MessageId::Request),
            7 => Ok(MessageId::Piece),
            8 => Ok(MessageId::Cancel),
            9 => Ok(MessageId::Port),
            _ => Err(PeerError::InvalidMessage(format!("unknown message id {}", value))),
        }
    }
}

/// The 68-byte message that opens every peer connection.
///
/// Layout: `<19><"BitTorrent protocol"><8 reserved><20 info hash><20 peer id>`.
#[derive(Debug, Clone)]
pub struct Handshake {
    pub protocol: [u8; 19],
    pub reserved: [u8; 8],
    pub info_hash: [u8; 20],
    pub peer_id: [u8; 20],
    pstrlen: u8,
}

impl Handshake {
    /// Creates a handshake with all reserved bits clear.
    pub fn new(info_hash: [u8; 20], peer_id: [u8; 20]) -> Self {
        Self {
            protocol: *PROTOCOL,
            reserved: [0u8; 8],
            info_hash,
            peer_id,
            pstrlen: PROTOCOL.len() as u8,
        }
    }

    /// Returns true if the length byte and protocol string are the standard ones.
    pub fn has_standard_protocol(&self) -> bool {
        self.pstrlen as usize == PROTOCOL.len() && &self.protocol == PROTOCOL
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HANDSHAKE_LEN);
        buf.put_u8(self.pstrlen);
        buf.put_slice(&self.protocol);
        buf.put_slice(&self.reserved);
        buf.put_slice(&self.info_hash);
        buf.put_slice(&self.peer_id);
        buf.freeze()
    }

    /// Splits 68 bytes into handshake fields.
    ///
    /// Only the length is checked here; whether the protocol string and info
    /// hash are acceptable is the session's decision.
    pub fn decode(data: &[u8]) -> Result<Self, PeerError> {
        if data.len() < HANDSHAKE_LEN {
            return Err(PeerError::InvalidHandshake);
        }

        let mut protocol = [0u8; 19];
        protocol.copy_from_slice(&data[1..20]);

        let mut reserved = [0u8; 8];
        reserved.copy_from_slice(&data[20..28]);

        let mut info_hash = [0u8; 20];
        info_hash.copy_from_slice(&data[28..48]);

        let mut peer_id = [0u8; 20];
        peer_id.copy_from_slice(&data[48..68]);

        Ok(Self {
            protocol,
            reserved,
            info_hash,
            peer_id,
            pstrlen: data[0],
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    KeepAlive,
    Choke,
    Unchoke,
    Interested,
    NotInterested,
    Have { piece: u32 },
    Bitfield(Bytes),
    Request { index: u32, begin: u32, length: u32 },
    Piece { index: u32, begin: u32, data: Bytes },
    Cancel { index: u32, begin: u32, length: u32 },
    Port(u16),
}

impl Message {
    /// Returns the id of this message, or `None` for a keep-alive.
    pub fn id(&self) -> Option<MessageId> {
        match self {
            Message::KeepAlive => None,
            Message::Choke => Some(MessageId::Choke),
            Message::Unchoke => Some(MessageId::Unchoke),
            Message::Interested => Some(MessageId::Interested),
            Message::NotInterested => Some(MessageId::NotInterested),
            Message::Have { .. } => Some(MessageId::Have),
            Message::Bitfield(_) => Some(MessageId::Bitfield),
            Message::Request { .. } => Some(MessageId::Request),
            Message::Piece { .. } => Some(MessageId::Piece),
            Message::Cancel { .. } => Some(MessageId::Cancel),
            Message::Port(_) => Some(MessageId::Port),
        }
    }

    /// Encodes the message as a frame, length prefix included.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();

        match self {
            Message::KeepAlive => {
                buf.put_u32(0);
            }
            Message::Choke | Message::Unchoke | Message::Interested | Message::NotInterested => {
                buf.put_u32(1);
                buf.put_u8(self.id().map_or(0, |id| id as u8));
            }
            Message::Have { piece } => {
                buf.put_u32(5);
                buf.put_u8(MessageId::Have as u8);
                buf.put_u32(*piece);
            }
            Message::Bitfield(bits) => {
                buf.put_u32(1 + bits.len() as u32);
                buf.put_u8(MessageId::Bitfield as u8);
                buf.put_slice(bits);
            }
            Message::Request {
                index,
                begin,
                length,
            } => {
                buf.put_u32(13);
                buf.put_u8(MessageId::Request as u8);
                buf.put_u32(*index);
                buf.put_u32(*begin);
                buf.put_u32(*length);
            }
            Message::Piece { index, begin, data } => {
                buf.put_u32(9 + data.len() as u32);
                buf.put_u8(MessageId::Piece as u8);
                buf.put_u32(*index);
                buf.put_u32(*begin);
                buf.put_slice(data);
            }
            Message::Cancel {
                index,
                begin,
                length,
            } => {
                buf.put_u32(13);
                buf.put_u8(MessageId::Cancel as u8);
                buf.put_u32(*index);
                buf.put_u32(*begin);
                buf.put_u32(*length);
            }
            Message::Port(port) => {
                buf.put_u32(3);
                buf.put_u8(MessageId::Port as u8);
                buf.put_u16(*port);
            }
        }

        buf.freeze()
    }

    /// Decodes a complete frame, length prefix included.
    pub fn decode(mut data: Bytes) -> Result<Self, PeerError> {
        if data.len() < 4 {
            return Err(PeerError::InvalidMessage("too short".into()));
        }

        let length = data.get_u32() as usize;

        if length == 0 {
            return Ok(Message::KeepAlive);
        }

        if data.remaining() < length {
            return Err(PeerError::InvalidMessage("incomplete message".into()));
        }

        Self::decode_body(data.split_to(length))
    }

    /// Decodes the bytes after the length prefix: the id byte and its payload.
    ///
    /// Every fixed-size field is bounds-checked, and fixed-size messages must
    /// carry exactly their declared payload.
    pub fn decode_body(mut data: Bytes) -> Result<Self, PeerError> {
        if data.is_empty() {
            return Ok(Message::KeepAlive);
        }

        let id = MessageId::try_from(data.get_u8())?;

        match id {
            MessageId::Choke => expect_len(&data, 0, "choke").map(|_| Message::Choke),
            MessageId::Unchoke => expect_len(&data, 0, "unchoke").map(|_| Message::Unchoke),
            MessageId::Interested => expect_len(&data, 0, "interested").map(|_| Message::Interested),
            MessageId::NotInterested => {
                expect_len(&data, 0, "not interested").map(|_| Message::NotInterested)
            }
            MessageId::Have => {
                expect_len(&data, 4, "have")?;
                Ok(Message::Have {
                    piece: data.get_u32(),
                })
            }
            MessageId::Bitfield => Ok(Message::Bitfield(data)),
            MessageId::Request => {
                expect_len(&data, 12, "request")?;
                Ok(Message::Request {
                    index: data.get_u32(),
                    begin: data.get_u32(),
                    length: data.get_u32(),
                })
            }
            MessageId::Piece => {
                if data.remaining() < 8 {
                    return Err(PeerError::InvalidMessage("piece too short".into()));
                }
                let index = data.get_u32();
                let begin = data.get_u32();
                Ok(Message::Piece { index, begin, data })
            }
            MessageId::Cancel => {
                expect_len(&data, 12, "cancel")?;
                Ok(Message::Cancel {
                    index: data.get_u32(),
                    begin: data.get_u32(),
                    length: data.get_u32(),
                })
            }
            MessageId::Port => {
                expect_len(&data, 2, "port")?;
                Ok(Message::Port(data.get_u16()))
            }
        }
    }
}

fn expect_len(data: &Bytes, len: usize, name: &str) -> Result<(), PeerError> {
    if data.remaining() == len {
        Ok(())
    } else {
        Err(PeerError::InvalidMessage(format!(
            "{} payload is {} bytes, expected {}",
            name,
            data.remaining(),
            len
        )))
    }
}
