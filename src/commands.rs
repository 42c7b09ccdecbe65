//! CLI command implementations

use std::fmt::Write as _;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use seedling::bencode;
use seedling::config::ClientConfig;
use seedling::download::Downloader;
use seedling::metainfo::TorrentInfo;
use seedling::peer::PeerSession;
use seedling::tracker::{AnnounceRequest, HttpTracker};

/// Connection tuning shared by every command
#[derive(Args)]
pub struct NetworkArgs {
    /// Seconds to wait for a peer to answer before giving up
    #[arg(long, global = true, default_value = "30")]
    read_timeout: u64,

    /// Seconds to wait for a send to a peer to complete
    #[arg(long, global = true, default_value = "30")]
    write_timeout: u64,

    /// Seconds to wait for a TCP connection to a peer
    #[arg(long, global = true, default_value = "3")]
    connect_timeout: u64,

    /// Accept handshakes with a non-standard protocol string or another info hash
    #[arg(long, global = true)]
    lenient_handshake: bool,

    /// Sessions to try per piece before giving up
    #[arg(long, global = true, default_value = "3")]
    attempts: usize,
}

impl NetworkArgs {
    pub fn to_config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_read_timeout(Duration::from_secs(self.read_timeout))
            .with_write_timeout(Duration::from_secs(self.write_timeout))
            .with_connect_timeout(Duration::from_secs(self.connect_timeout))
            .with_strict_handshake(!self.lenient_handshake)
            .with_max_piece_attempts(self.attempts)
    }
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Decode a bencoded value and print it as JSON
    Decode {
        /// Bencoded text, e.g. "l4:spami42ee"
        value: String,
    },
    /// Show the metadata of a torrent file
    Info {
        /// Path to the torrent file
        torrent: PathBuf,
    },
    /// Ask the tracker for peers
    Peers {
        /// Path to the torrent file
        torrent: PathBuf,
    },
    /// Handshake with a peer and print its peer ID
    Handshake {
        /// Path to the torrent file
        torrent: PathBuf,
        /// Peer address as ip:port
        peer: SocketAddr,
    },
    /// Download and verify a single piece
    #[command(name = "download_piece")]
    DownloadPiece {
        /// Where to write the piece
        #[arg(short, long)]
        output: PathBuf,
        /// Path to the torrent file
        torrent: PathBuf,
        /// Zero-based piece index
        index: usize,
    },
    /// Download the whole torrent
    Download {
        /// Where to write the file
        #[arg(short, long)]
        output: PathBuf,
        /// Path to the torrent file
        torrent: PathBuf,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns the first fatal error of the command, with context
pub async fn handle_command(command: Commands, config: ClientConfig) -> Result<()> {
    match command {
        Commands::Decode { value } => {
            println!("{}", decode_report(value.as_bytes())?);
            Ok(())
        }
        Commands::Info { torrent } => {
            let info = load_torrent(&torrent).await?;
            print!("{}", info_report(&info));
            Ok(())
        }
        Commands::Peers { torrent } => {
            let info = load_torrent(&torrent).await?;
            for peer in fetch_peers(&info, &config).await? {
                println!("{}", peer);
            }
            Ok(())
        }
        Commands::Handshake { torrent, peer } => handshake(&torrent, peer, &config).await,
        Commands::DownloadPiece {
            output,
            torrent,
            index,
        } => download_piece(&torrent, index, &output, config).await,
        Commands::Download { output, torrent } => download(&torrent, &output, config).await,
    }
}

/// Renders a bencoded value as JSON.
pub fn decode_report(data: &[u8]) -> Result<String> {
    let value = bencode::decode(data).context("invalid bencode")?;
    Ok(bencode::to_json(&value))
}

/// Renders torrent metadata in the `Key: value` format.
pub fn info_report(info: &TorrentInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Tracker URL: {}", info.announce);
    let _ = writeln!(out, "Length: {}", info.length);
    let _ = writeln!(out, "Info Hash: {}", info.info_hash);
    let _ = writeln!(out, "Piece Length: {}", info.piece_length);
    let _ = writeln!(out, "Piece Hashes:");
    for hash in &info.piece_hashes {
        let _ = writeln!(out, "{}", hex::encode(hash));
    }
    out
}

async fn load_torrent(path: &Path) -> Result<TorrentInfo> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    TorrentInfo::from_bytes(&data).with_context(|| format!("invalid torrent {}", path.display()))
}

async fn fetch_peers(info: &TorrentInfo, config: &ClientConfig) -> Result<Vec<SocketAddr>> {
    let tracker = HttpTracker::new(&info.announce, config.tracker_timeout)?;
    let request = AnnounceRequest::new(
        info.info_hash,
        config.peer_id,
        config.listen_port,
        info.length,
    );

    let response = tracker
        .announce(&request)
        .await
        .with_context(|| format!("announce to {} failed", info.announce))?;

    Ok(response
        .peers
        .iter()
        .map(|peer| peer.to_socket_addr())
        .collect())
}

async fn handshake(torrent: &Path, peer: SocketAddr, config: &ClientConfig) -> Result<()> {
    let info = load_torrent(torrent).await?;

    let mut session = PeerSession::connect(peer, config).await?;
    let peer_id = session
        .handshake(&info.info_hash, &config.peer_id)
        .await
        .with_context(|| format!("handshake with {} failed", peer))?;
    session.close().await;

    println!("Peer ID: {}", peer_id.to_hex());
    Ok(())
}

async fn download_piece(
    torrent: &Path,
    index: usize,
    output: &Path,
    config: ClientConfig,
) -> Result<()> {
    let info = load_torrent(torrent).await?;
    if index >= info.piece_count() {
        bail!(
            "piece {} out of range, torrent has {} pieces",
            index,
            info.piece_count()
        );
    }

    let peers = fetch_peers(&info, &config).await?;
    let mut downloader = Downloader::new(info, config, peers);
    let piece = downloader.download_piece(index).await;
    downloader.finish().await;

    write_output(output, &piece?).await?;
    println!("{}", output.display());
    Ok(())
}

async fn download(torrent: &Path, output: &Path, config: ClientConfig) -> Result<()> {
    let info = load_torrent(torrent).await?;
    let peers = fetch_peers(&info, &config).await?;

    let mut downloader = Downloader::new(info, config, peers);
    let payload = downloader.download_all().await;
    downloader.finish().await;

    write_output(output, &payload?).await?;
    println!("{}", output.display());
    Ok(())
}

async fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    tokio::fs::write(path, data)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn torrent_file() -> tempfile::NamedTempFile {
        let mut data = b"d8:announce18:http://tracker/ann4:infod6:lengthi10e4:name4:demo\
            12:piece lengthi4e6:pieces60:"
            .to_vec();
        data.extend_from_slice(&[0xab; 20]);
        data.extend_from_slice(&[0xcd; 20]);
        data.extend_from_slice(&[0xef; 20]);
        data.extend_from_slice(b"ee");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();
        file
    }

    #[test]
    fn test_network_args_to_config() {
        let args = NetworkArgs {
            read_timeout: 5,
            write_timeout: 7,
            connect_timeout: 2,
            lenient_handshake: true,
            attempts: 0,
        };
        let config = args.to_config();

        assert_eq!(config.read_timeout, Duration::from_secs(5));
        assert_eq!(config.write_timeout, Duration::from_secs(7));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert!(!config.strict_handshake);
        assert_eq!(config.max_piece_attempts, 1);
    }

    #[test]
    fn test_decode_report() {
        assert_eq!(decode_report(b"5:hello").unwrap(), "\"hello\"");
        assert_eq!(decode_report(b"i52e").unwrap(), "52");
        assert_eq!(
            decode_report(b"d3:foo3:bar5:helloi52ee").unwrap(),
            r#"{"foo":"bar","hello":52}"#
        );
        assert!(decode_report(b"5:hi").is_err());
    }

    #[tokio::test]
    async fn test_info_report() {
        let file = torrent_file();
        let info = load_torrent(file.path()).await.unwrap();
        let report = info_report(&info);

        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "Tracker URL: http://tracker/ann");
        assert_eq!(lines[1], "Length: 10");
        assert_eq!(lines[2], format!("Info Hash: {}", info.info_hash.to_hex()));
        assert_eq!(lines[3], "Piece Length: 4");
        assert_eq!(lines[4], "Piece Hashes:");
        assert_eq!(lines[5], "ab".repeat(20));
        assert_eq!(lines[7], "ef".repeat(20));
        assert_eq!(lines.len(), 8);
    }

    #[tokio::test]
    async fn test_load_missing_torrent() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_torrent(&dir.path().join("missing.torrent"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[tokio::test]
    async fn test_write_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("piece-0");
        write_output(&path, b"piece bytes").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"piece bytes");
    }
}
