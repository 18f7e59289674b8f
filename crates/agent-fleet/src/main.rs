use anyhow::Result;
use clap::Parser;

mod cli;
mod memory_cmds;
mod quota_cmds;

use cli::{Cli, Commands, MemoryCommands, QuotaCommands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (output to stderr, initialize only once)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Quota { cmd } => match cmd {
            QuotaCommands::Scan {
                json,
                threshold,
                no_usage,
            } => quota_cmds::scan(json, threshold, no_usage).await,
        },
        Commands::Memory { cmd } => match cmd {
            MemoryCommands::Unify {
                dry_run,
                json,
                accounts_root,
                shared_root,
            } => memory_cmds::unify(dry_run, json, accounts_root, shared_root),
            MemoryCommands::Link {
                config_dir,
                accounts_root,
                shared_root,
            } => memory_cmds::link(&config_dir, accounts_root, shared_root),
        },
    }
}
