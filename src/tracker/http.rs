use super::error::TrackerError;
use super::response::AnnounceResponse;
use crate::metainfo::InfoHash;
use crate::peer::PeerId;
use reqwest::Client;
use std::time::Duration;

/// Query parameters of an HTTP announce.
#[derive(Debug, Clone)]
pub struct AnnounceRequest {
    pub info_hash: InfoHash,
    pub peer_id: PeerId,
    pub port: u16,
    pub uploaded: u64,
    pub downloaded: u64,
    pub left: u64,
}

impl AnnounceRequest {
    /// Builds a request for a fresh download of `left` bytes.
    pub fn new(info_hash: InfoHash, peer_id: PeerId, port: u16, left: u64) -> Self {
        Self {
            info_hash,
            peer_id,
            port,
            uploaded: 0,
            downloaded: 0,
            left,
        }
    }

    /// Appends the query string to a tracker's announce URL.
    ///
    /// Always asks for a compact peer list.
    pub fn to_url(&self, announce: &str) -> String {
        let separator = if announce.contains('?') { '&' } else { '?' };
        format!(
            "{}{}info_hash={}&peer_id={}&port={}&uploaded={}&downloaded={}&left={}&compact=1",
            announce,
            separator,
            url_encode(self.info_hash.as_bytes()),
            url_encode(self.peer_id.as_bytes()),
            self.port,
            self.uploaded,
            self.downloaded,
            self.left
        )
    }
}

/// An HTTP tracker client.
///
/// Performs the GET and hands the response body to
/// [`AnnounceResponse::from_bytes`]; nothing else about the exchange is
/// interpreted here.
pub struct HttpTracker {
    client: Client,
    url: String,
}

impl HttpTracker {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, TrackerError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(TrackerError::InvalidUrl(url.to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TrackerError::Http)?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub async fn announce(
        &self,
        request: &AnnounceRequest,
    ) -> Result<AnnounceResponse, TrackerError> {
        let url = request.to_url(&self.url);
        tracing::debug!(tracker = %self.url, info_hash = %request.info_hash, "announcing");

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let body = response.bytes().await?;

        let announce = AnnounceResponse::from_bytes(&body)?;
        tracing::debug!(peers = announce.peers.len(), interval = ?announce.interval, "tracker responded");

        if let Some(ref warning) = announce.warning_message {
            tracing::warn!(tracker = %self.url, "tracker warning: {}", warning);
        }

        Ok(announce)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

pub(crate) fn url_encode(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.' || b == b'~' {
                format!("{}", b as char)
            } else {
                format!("%{:02X}", b)
            }
        })
        .collect()
}
