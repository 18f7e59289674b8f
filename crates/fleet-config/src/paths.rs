use std::path::PathBuf;

/// XDG app name for the fleet's own configuration.
pub const APP_NAME: &str = "agent-fleet";

/// Expand a leading `~/` to the user's home directory.
///
/// Paths in `accounts.toml` may be written as `~/.claude-accounts/work` while
/// tmux reports the already-expanded form; resolvers compare both.
pub fn expand_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(rest).to_string_lossy().into_owned();
        }
    }
    path.to_string()
}

/// The user's home directory, if one can be determined.
pub fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// Default Claude Code config dir for sessions without `CLAUDE_CONFIG_DIR`.
pub fn default_claude_config_dir() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".claude"))
}

/// Default root under which pooled account config dirs live.
pub fn default_accounts_root() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".claude-accounts"))
}

/// Default root for canonical shared per-project memory directories.
pub fn default_shared_memory_root() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".claude").join("shared-memory"))
}

/// Location of `accounts.toml`.
pub fn accounts_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().join("accounts.toml"))
}
