//! seedling - command-line interface
//!
//! Inspects torrent files, talks to trackers and peers, and downloads pieces.

mod commands;

use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "seedling")]
#[command(about = "A minimal sequential BitTorrent client", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(flatten)]
    network: commands::NetworkArgs,

    #[command(subcommand)]
    command: commands::Commands,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.network.to_config();
    commands::handle_command(cli.command, config).await
}
