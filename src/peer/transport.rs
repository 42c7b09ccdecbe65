use super::error::PeerError;
use super::message::{Handshake, Message};
use crate::constants::HANDSHAKE_LEN;
use bytes::{Buf, BytesMut};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Length-prefixed framing over a byte stream.
///
/// Any `AsyncRead + AsyncWrite` stream works, which lets the protocol run
/// over an in-memory pipe as easily as over a [`TcpStream`]. Every read and
/// write is bounded by its timeout.
pub struct PeerTransport<S = TcpStream> {
    stream: S,
    read_buf: BytesMut,
    read_timeout: Duration,
    write_timeout: Duration,
    max_message_size: usize,
}

impl<S: AsyncRead + AsyncWrite + Unpin> PeerTransport<S> {
    pub fn new(
        stream: S,
        read_timeout: Duration,
        write_timeout: Duration,
        max_message_size: usize,
    ) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(32 * 1024),
            read_timeout,
            write_timeout,
            max_message_size,
        }
    }

    pub async fn send_handshake(&mut self, handshake: &Handshake) -> Result<(), PeerError> {
        let data = handshake.encode();
        self.write_all(&data).await
    }

    /// Reads exactly 68 bytes, however many reads it takes.
    pub async fn receive_handshake(&mut self) -> Result<Handshake, PeerError> {
        self.fill(HANDSHAKE_LEN).await?;
        let data = self.read_buf.split_to(HANDSHAKE_LEN);
        Handshake::decode(&data)
    }

    pub async fn send_message(&mut self, message: &Message) -> Result<(), PeerError> {
        let data = message.encode();
        self.write_all(&data).await
    }

    /// Reads the next frame, including keep-alives.
    pub async fn receive_frame(&mut self) -> Result<Message, PeerError> {
        self.fill(4).await?;

        let length = u32::from_be_bytes([
            self.read_buf[0],
            self.read_buf[1],
            self.read_buf[2],
            self.read_buf[3],
        ]) as usize;

        if length > self.max_message_size {
            return Err(PeerError::MessageTooLarge(length));
        }

        self.fill(4 + length).await?;

        self.read_buf.advance(4);
        let body = self.read_buf.split_to(length).freeze();
        Message::decode_body(body)
    }

    /// Reads the next frame that is not a keep-alive.
    pub async fn receive_message(&mut self) -> Result<Message, PeerError> {
        loop {
            match self.receive_frame().await? {
                Message::KeepAlive => tracing::trace!("keep-alive"),
                message => return Ok(message),
            }
        }
    }

    pub async fn shutdown(&mut self) -> Result<(), PeerError> {
        with_timeout(self.write_timeout, self.stream.shutdown()).await
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<(), PeerError> {
        with_timeout(self.write_timeout, self.stream.write_all(data)).await?;
        with_timeout(self.write_timeout, self.stream.flush()).await
    }

    async fn fill(&mut self, len: usize) -> Result<(), PeerError> {
        while self.read_buf.len() < len {
            self.read_buf.reserve(len - self.read_buf.len());
            let n = with_timeout(self.read_timeout, self.stream.read_buf(&mut self.read_buf)).await?;

            if n == 0 {
                return Err(PeerError::ConnectionClosed);
            }
        }
        Ok(())
    }
}

async fn with_timeout<T>(
    limit: Duration,
    fut: impl Future<Output = std::io::Result<T>>,
) -> Result<T, PeerError> {
    match timeout(limit, fut).await {
        Ok(result) => result.map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::BrokenPipe => PeerError::ConnectionClosed,
            _ => PeerError::Io(e),
        }),
        Err(_) => Err(PeerError::Timeout),
    }
}
