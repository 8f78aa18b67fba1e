//! hotdev development server.
//!
//! # Architecture Overview
//!
//! ```text
//!   editor saves file
//!          │
//!          ▼
//!   ┌─────────────┐   source    ┌──────────┐  BuildEvent   ┌──────────────┐
//!   │   watcher   │────────────▶│ compiler │──────────────▶│ orchestrator │
//!   │  (notify)   │             └──────────┘               │ (RestartGate)│
//!   └─────────────┘   other     ┌──────────┐               └──────┬───────┘
//!          └──────────────────▶│  assets  │                      │
//!                               └──────────┘                      ▼
//!                       stop listener → invalidate modules → regenerate service
//!                               → rebuild routes → start listener
//!                                                                 │
//!   browser ◀──── resource routes, /rpc/<F>/<m>, /__dev/events ◀──┘
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use hotdev::lifecycle::{self, StartOptions};
use hotdev::reload::OverlapPolicy;

#[derive(Parser)]
#[command(name = "hotdev")]
#[command(about = "Development server with hot reload", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, serve, and reload on change
    Start {
        /// Configuration file
        #[arg(short, long, default_value = "hotdev.toml")]
        config: PathBuf,

        /// Port to listen on (overrides server.bind_address)
        #[arg(short, long)]
        port: Option<u16>,

        /// What to do with builds finishing during a reload: drop or queue
        #[arg(long)]
        policy: Option<OverlapPolicy>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            config,
            port,
            policy,
        } => {
            lifecycle::run(&config, StartOptions { port, policy }).await?;
        }
    }

    Ok(())
}
