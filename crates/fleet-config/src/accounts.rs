//! Registered credentialed accounts (`accounts.toml`).
//!
//! Each account is a logical credential identity with its own Claude config
//! directory. Read-only input to the quota scanner and memory unifier; this
//! crate never writes credentials anywhere.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::paths;

/// One pooled account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    /// Config directory the account's sessions run with (may use `~/`).
    pub config_dir: String,
    /// Explicit organization UUID. When absent the scanner probes the
    /// account's `.claude.json` instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    /// Explicit usage-API session cookie. When absent the scanner asks the
    /// platform credential store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_cookie: Option<String>,
}

/// The full account pool, keyed by handle (e.g. `work`, `dev1`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountsConfig {
    #[serde(default)]
    pub accounts: HashMap<String, Account>,
}

impl AccountsConfig {
    /// Load from the default XDG location. A missing file is an empty pool,
    /// not an error; a malformed file is.
    pub fn load() -> Result<Self> {
        let path = match paths::accounts_config_path() {
            Some(p) => p,
            None => return Ok(Self::default()),
        };
        Self::load_from(&path)
    }

    /// Load from an explicit path (missing file loads as default).
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read accounts config: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse accounts config: {}", path.display()))?;
        Ok(config)
    }

    pub fn get(&self, handle: &str) -> Option<&Account> {
        self.accounts.get(handle)
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.accounts.contains_key(handle)
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Find the handle whose config dir matches `config_dir`, comparing both
    /// the raw configured value and its home-expanded form.
    pub fn handle_for_config_dir(&self, config_dir: &str) -> Option<&str> {
        self.accounts
            .iter()
            .find(|(_, acct)| {
                acct.config_dir == config_dir
                    || paths::expand_home(&acct.config_dir) == config_dir
            })
            .map(|(handle, _)| handle.as_str())
    }
}
