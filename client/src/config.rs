//! Command-line configuration

use crate::sync::LocalProfile;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    pub server: String,

    /// Display name shown to other players
    #[arg(short = 'n', long, default_value = "player")]
    pub name: String,

    /// Player color (name or #rrggbb)
    #[arg(short = 'c', long, default_value = "green")]
    pub color: String,

    /// Seed for spawn selection, random if omitted
    #[arg(long)]
    pub seed: Option<u64>,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    pub fake_ping: u64,

    /// Window width
    #[arg(short = 'w', long, default_value = "800")]
    pub width: usize,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "600")]
    pub height: usize,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_addr: String,
    pub profile: LocalProfile,
    pub seed: Option<u64>,
    pub fake_ping_ms: u64,
    pub width: usize,
    pub height: usize,
}

impl From<Args> for ClientConfig {
    fn from(args: Args) -> Self {
        Self {
            server_addr: args.server,
            profile: LocalProfile {
                name: args.name,
                color: args.color,
            },
            seed: args.seed,
            fake_ping_ms: args.fake_ping,
            width: args.width,
            height: args.height,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from(Args::parse_from(["client"]))
    }
}
