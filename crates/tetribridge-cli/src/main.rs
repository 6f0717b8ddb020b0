use std::path::PathBuf;

use clap::Parser;

mod serve;

/// Bridge between a running emulator and the placement decision engine.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the policy checkpoint (JSON)
    model: PathBuf,
    /// Address to listen on for emulator connections
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,
    /// Port to listen on
    #[arg(short, long, default_value_t = 3456)]
    port: u16,
    /// host:port of the lookahead oracle service
    #[arg(short = 's', long)]
    oracle: Option<String>,
}

fn main() -> anyhow::Result<()> {
    serve::run(&Args::parse())
}
