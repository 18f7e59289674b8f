use std::process::Command;

use anyhow::{Context, Result, bail};
use tracing::debug;

/// Tmux operations the quota scanner depends on.
pub trait TmuxClient {
    /// Names of all live tmux sessions.
    fn list_sessions(&self) -> Result<Vec<String>>;
    /// The last `lines` lines of a session's active pane.
    fn capture_pane(&self, session: &str, lines: usize) -> Result<String>;
    /// A session-scoped environment variable's value. Err when unset.
    fn get_environment(&self, session: &str, key: &str) -> Result<String>;
}

/// Real driver shelling out to the `tmux` binary.
#[derive(Debug, Clone, Default)]
pub struct TmuxDriver;

impl TmuxDriver {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        debug!(?args, "tmux");
        let output = Command::new("tmux")
            .args(args)
            .output()
            .context("Failed to run tmux")?;
        if !output.status.success() {
            bail!(
                "tmux {} failed: {}",
                args.first().copied().unwrap_or(""),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl TmuxClient for TmuxDriver {
    fn list_sessions(&self) -> Result<Vec<String>> {
        let out = self.run(&["list-sessions", "-F", "#{session_name}"])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToOwned::to_owned)
            .collect())
    }

    fn capture_pane(&self, session: &str, lines: usize) -> Result<String> {
        let start = format!("-{lines}");
        self.run(&["capture-pane", "-p", "-t", session, "-S", &start])
    }

    fn get_environment(&self, session: &str, key: &str) -> Result<String> {
        let out = self.run(&["show-environment", "-t", session, key])?;
        let line = out.trim();
        // Unset variables print as "-KEY".
        if line.starts_with('-') {
            bail!("{key} not set in session {session}");
        }
        match line.split_once('=') {
            Some((_, value)) => Ok(value.to_string()),
            None => bail!("{key} not set in session {session}"),
        }
    }
}
