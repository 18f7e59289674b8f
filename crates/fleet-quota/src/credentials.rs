//! Credential derivation for usage enrichment.
//!
//! Neither input format is ours: `.claude.json` is an unstructured document
//! we probe for a few known key names, and the session token lives in the
//! platform credential store under a per-account service name. Both are
//! modeled as best-effort reads.

use std::path::Path;

use anyhow::Result;
use serde_json::Value;
use tracing::trace;

/// Key names under which the organization UUID has been observed inside
/// `oauthAccount`. Ordered; first non-empty wins.
const ORG_ID_KEYS: &[&str] = &["organizationUuid", "orgId", "organization_id", "orgUuid"];

/// Extract the organization UUID from `<config_dir>/.claude.json`.
/// Returns `None` if the file is missing, unparseable, or has no org field.
pub fn read_org_id(config_dir: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(config_dir.join(".claude.json")).ok()?;
    let doc: Value = serde_json::from_str(&raw).ok()?;
    let oauth = doc.get("oauthAccount")?;

    for key in ORG_ID_KEYS {
        if let Some(value) = oauth.get(key).and_then(Value::as_str) {
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Deterministic credential-store service name for an account, derived from
/// its config directory. Rotation tooling stores each account's session
/// token under this name.
pub fn keychain_service_name(config_dir: &str) -> String {
    let name = Path::new(config_dir)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| config_dir.to_string());
    format!("Claude Code-credentials-{name}")
}

/// Read-only view of the platform credential store. Injected so tests can
/// substitute a fake; the process never holds keychain state globally.
pub trait CredentialStore: Send + Sync {
    /// The stored token for `service`, or `None` when no entry exists.
    fn read_token(&self, service: &str) -> Result<Option<String>>;
}

/// Real store backed by the OS keychain via the `keyring` crate.
#[derive(Debug, Clone, Default)]
pub struct KeyringCredentialStore;

impl CredentialStore for KeyringCredentialStore {
    fn read_token(&self, service: &str) -> Result<Option<String>> {
        trace!(service, "keychain read");
        let entry = keyring::Entry::new(service, "session-key")?;
        match entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
