//! ## pulse-cli
//! **Command-line driver for procedure counter replays**
//!
//! `pulse run` replays a recorded day at wall-clock pace, `pulse sweep`
//! fast-forwards it deterministically and `pulse dates` lists what can be
//! replayed.

use clap::Parser;

mod commands;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    commands::run_command(cli).await
}
