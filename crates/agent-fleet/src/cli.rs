use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fleet")]
#[command(about = "Quota-aware continuity tooling for pooled agent accounts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rate-limit and usage scanning
    Quota {
        #[command(subcommand)]
        cmd: QuotaCommands,
    },

    /// Cross-account memory consolidation
    Memory {
        #[command(subcommand)]
        cmd: MemoryCommands,
    },
}

#[derive(Subcommand)]
pub enum QuotaCommands {
    /// Scan all fleet tmux sessions for rate-limit indicators
    Scan {
        /// Emit results as JSON
        #[arg(long)]
        json: bool,

        /// Utilization percentage treated as near-limit (default 80)
        #[arg(long)]
        threshold: Option<f64>,

        /// Skip usage-API enrichment
        #[arg(long)]
        no_usage: bool,
    },
}

#[derive(Subcommand)]
pub enum MemoryCommands {
    /// Merge per-account project memory dirs into the shared canonical
    /// location and symlink every account to it
    Unify {
        /// Report what would change without touching the filesystem
        #[arg(long)]
        dry_run: bool,

        /// Emit results as JSON
        #[arg(long)]
        json: bool,

        /// Accounts root (default ~/.claude-accounts)
        #[arg(long)]
        accounts_root: Option<PathBuf>,

        /// Shared memory root (default ~/.claude/shared-memory)
        #[arg(long)]
        shared_root: Option<PathBuf>,
    },

    /// Post-rotation: unify only the projects of the account owning the
    /// given config dir
    Link {
        /// The rotated session's config directory
        config_dir: PathBuf,

        /// Accounts root (default ~/.claude-accounts)
        #[arg(long)]
        accounts_root: Option<PathBuf>,

        /// Shared memory root (default ~/.claude/shared-memory)
        #[arg(long)]
        shared_root: Option<PathBuf>,
    },
}
