//! Rate-limit detection for fleet sessions.
//!
//! Scans tmux pane content for hard rate-limit and near-limit signatures,
//! resolves which pooled account each session is running on, and optionally
//! enriches results with utilization data from the Claude usage API.

pub mod credentials;
pub mod patterns;
pub mod scan;
pub mod usage;

pub use credentials::{CredentialStore, KeyringCredentialStore, keychain_service_name, read_org_id};
pub use patterns::{LimitSignal, PatternClassifier};
pub use scan::{ScanResult, Scanner};
pub use usage::{HttpUsageClient, UsageChecker, UsageInfo, UsageWindow};
