//! Account pool configuration (`~/.config/agent-fleet/accounts.toml`) and
//! path helpers shared across the workspace.

pub mod accounts;
pub mod paths;

pub use accounts::{Account, AccountsConfig};
