//! Fleet-wide session scanning.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use fleet_config::paths::{default_claude_config_dir, expand_home};
use fleet_config::AccountsConfig;
use fleet_core::FleetError;
use fleet_tmux::{PrefixRegistry, TmuxClient};

use crate::credentials::{keychain_service_name, read_org_id, CredentialStore};
use crate::patterns::{LimitSignal, PatternClassifier, SCAN_LINES};
use crate::usage::{UsageChecker, UsageInfo};

/// Env var naming the session's Claude config directory.
pub const CONFIG_DIR_ENV: &str = "CLAUDE_CONFIG_DIR";

/// Env var recording which account's credentials are actually active after a
/// keychain-swap rotation. Takes precedence over the config-dir mapping,
/// which still points at the pre-rotation account.
pub const ACTIVE_ACCOUNT_ENV: &str = "FLEET_ACTIVE_ACCOUNT";

/// Utilization percentage above which a session counts as near-limit.
pub const DEFAULT_USAGE_THRESHOLD: f64 = 80.0;

/// Result of scanning a single tmux session. Constructed fresh per pass and
/// never mutated afterwards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResult {
    /// tmux session name.
    pub session: String,
    /// Resolved account handle; empty when the session runs outside the pool.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub account_handle: String,
    /// Config dir, captured even when the account is unknown (rotation
    /// planning needs it).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub config_dir: String,
    /// Hard rate-limit detected.
    pub rate_limited: bool,
    /// Approaching-limit signal detected. Mutually exclusive with
    /// `rate_limited`; hard limit wins.
    pub near_limit: bool,
    /// The line that matched (hard or warning).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_line: Option<String>,
    /// Parsed reset time, when the matched line carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resets_at: Option<String>,
    /// Usage API snapshot, when enrichment could resolve credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageInfo>,
}

/// Detects rate-limited and near-limit sessions by examining tmux pane
/// content and, when credentials allow, the Claude usage API.
pub struct Scanner {
    tmux: Box<dyn TmuxClient>,
    registry: PrefixRegistry,
    classifier: PatternClassifier,
    accounts: Option<AccountsConfig>,
    usage_checker: Option<Box<dyn UsageChecker>>,
    credentials: Option<Box<dyn CredentialStore>>,
    usage_threshold: f64,
}

impl Scanner {
    /// Build a scanner. Empty `patterns` selects the default hard-limit set.
    /// Pattern compilation failures surface here, not at scan time.
    pub fn new(
        tmux: Box<dyn TmuxClient>,
        registry: PrefixRegistry,
        patterns: &[String],
        accounts: Option<AccountsConfig>,
    ) -> Result<Self, FleetError> {
        Ok(Self {
            tmux,
            registry,
            classifier: PatternClassifier::new(patterns)?,
            accounts,
            usage_checker: None,
            credentials: None,
            usage_threshold: DEFAULT_USAGE_THRESHOLD,
        })
    }

    /// Enable near-limit detection from pane content. Empty input selects
    /// the default warning set.
    pub fn with_warning_patterns(&mut self, patterns: &[String]) -> Result<(), FleetError> {
        self.classifier.set_warning_patterns(patterns)
    }

    /// Enable usage-API enrichment. A `threshold` of 0 keeps the default.
    pub fn with_usage_checker(
        &mut self,
        checker: Box<dyn UsageChecker>,
        credentials: Box<dyn CredentialStore>,
        threshold: f64,
    ) {
        self.usage_checker = Some(checker);
        self.credentials = Some(credentials);
        if threshold > 0.0 {
            self.usage_threshold = threshold;
        }
    }

    /// Scan every fleet session for rate-limit and near-limit indicators.
    ///
    /// Failure to list sessions is fatal; a single dead session is not (it
    /// simply reports no limit signal). After the pattern pass, results are
    /// enriched with usage data when a checker and account pool are present.
    pub async fn scan_all(&self) -> Result<Vec<ScanResult>> {
        let sessions = self
            .tmux
            .list_sessions()
            .map_err(|e| FleetError::ListSessions(e.to_string()))?;

        let mut results: Vec<ScanResult> = sessions
            .iter()
            .filter(|name| self.registry.is_known_session(name))
            .map(|name| self.scan_session(name))
            .collect();

        if self.usage_checker.is_some() && self.accounts.is_some() {
            self.enrich_with_usage(&mut results).await;
        }

        Ok(results)
    }

    fn scan_session(&self, session: &str) -> ScanResult {
        let mut result = ScanResult {
            session: session.to_string(),
            ..Default::default()
        };

        // Capture the config dir even if the account can't be resolved;
        // falls back to ~/.claude when the env var isn't set.
        result.config_dir = match self.tmux.get_environment(session, CONFIG_DIR_ENV) {
            Ok(dir) => dir.trim().to_string(),
            Err(_) => default_claude_config_dir()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };

        result.account_handle = self.resolve_account_handle(session);

        let content = match self.tmux.capture_pane(session, SCAN_LINES) {
            Ok(content) => content,
            // Can't capture, session might be dead. Not rate-limited.
            Err(_) => return result,
        };

        match self.classifier.classify(&content) {
            LimitSignal::HardLimited { line, resets_at } => {
                result.rate_limited = true;
                result.matched_line = Some(line);
                result.resets_at = resets_at;
            }
            LimitSignal::NearLimit { line } => {
                result.near_limit = true;
                result.matched_line = Some(line);
            }
            LimitSignal::Clear => {}
        }

        result
    }

    /// Map a session back to an account handle: the rotation override env
    /// var wins when it names a registered account, otherwise the config dir
    /// is matched against the pool. Empty means "outside the pool".
    fn resolve_account_handle(&self, session: &str) -> String {
        let accounts = match &self.accounts {
            Some(accounts) => accounts,
            None => return String::new(),
        };

        if let Ok(override_handle) = self.tmux.get_environment(session, ACTIVE_ACCOUNT_ENV) {
            let override_handle = override_handle.trim();
            if !override_handle.is_empty() && accounts.contains(override_handle) {
                return override_handle.to_string();
            }
        }

        let config_dir = match self.tmux.get_environment(session, CONFIG_DIR_ENV) {
            Ok(dir) => dir.trim().to_string(),
            // No CLAUDE_CONFIG_DIR = default, unpooled config.
            Err(_) => return String::new(),
        };

        accounts
            .handle_for_config_dir(&config_dir)
            .map(ToOwned::to_owned)
            .unwrap_or_default()
    }

    /// Query the usage API once per distinct account and fold the snapshots
    /// back into the results. Entirely best-effort: missing credentials and
    /// API failures only reduce enrichment coverage, never fail the scan.
    async fn enrich_with_usage(&self, results: &mut [ScanResult]) {
        let accounts = self.accounts.as_ref().expect("checked by caller");
        let checker = self.usage_checker.as_ref().expect("checked by caller");

        struct Creds {
            org_id: String,
            cookie: String,
        }

        let mut account_creds: HashMap<String, Creds> = HashMap::new();
        for result in results.iter() {
            let handle = &result.account_handle;
            if handle.is_empty() || account_creds.contains_key(handle) {
                continue;
            }
            let acct = match accounts.get(handle) {
                Some(acct) => acct,
                None => continue,
            };
            let config_dir = expand_home(&acct.config_dir);

            // Org ID: explicit config, else extracted from .claude.json.
            let org_id = acct
                .org_id
                .clone()
                .filter(|id| !id.is_empty())
                .or_else(|| read_org_id(Path::new(&config_dir)));
            let Some(org_id) = org_id else {
                debug!(account = %handle, "no org id, skipping usage enrichment");
                continue;
            };

            // Session cookie: explicit config, else credential store.
            let cookie = acct
                .session_cookie
                .clone()
                .filter(|c| !c.is_empty())
                .or_else(|| {
                    let store = self.credentials.as_ref()?;
                    let service = keychain_service_name(&config_dir);
                    store.read_token(&service).ok().flatten()
                });
            let Some(cookie) = cookie else {
                debug!(account = %handle, "no session cookie, skipping usage enrichment");
                continue;
            };

            account_creds.insert(handle.clone(), Creds { org_id, cookie });
        }

        // One API call per account, never one per session.
        let mut account_usage: HashMap<String, UsageInfo> = HashMap::new();
        for (handle, creds) in &account_creds {
            match checker.fetch_usage(&creds.org_id, &creds.cookie).await {
                Ok(usage) => {
                    account_usage.insert(handle.clone(), usage);
                }
                Err(err) => {
                    debug!(account = %handle, error = %err, "usage API fetch failed, skipping");
                }
            }
        }

        for result in results.iter_mut() {
            let Some(usage) = account_usage.get(&result.account_handle) else {
                continue;
            };
            result.usage = Some(usage.clone());

            if !result.rate_limited
                && !result.near_limit
                && usage.max_utilization() >= self.usage_threshold
            {
                result.near_limit = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::UsageWindow;
    use anyhow::{anyhow, bail};
    use async_trait::async_trait;
    use fleet_config::Account;

    fn test_registry() -> PrefixRegistry {
        let mut r = PrefixRegistry::new();
        r.register("hq", "town");
        r.register("gt", "gastown");
        r.register("bd", "beads");
        r
    }

    #[derive(Default)]
    struct MockTmux {
        sessions: Vec<String>,
        sessions_err: Option<String>,
        pane_content: HashMap<String, String>,
        env_vars: HashMap<String, HashMap<String, String>>,
    }

    impl TmuxClient for MockTmux {
        fn list_sessions(&self) -> Result<Vec<String>> {
            if let Some(err) = &self.sessions_err {
                bail!("{err}");
            }
            Ok(self.sessions.clone())
        }

        fn capture_pane(&self, session: &str, _lines: usize) -> Result<String> {
            self.pane_content
                .get(session)
                .cloned()
                .ok_or_else(|| anyhow!("session {session} not found"))
        }

        fn get_environment(&self, session: &str, key: &str) -> Result<String> {
            self.env_vars
                .get(session)
                .and_then(|env| env.get(key))
                .cloned()
                .ok_or_else(|| anyhow!("{key} not set in session {session}"))
        }
    }

    struct MockUsageChecker {
        usage: HashMap<String, UsageInfo>,
        err: Option<String>,
    }

    #[async_trait]
    impl UsageChecker for MockUsageChecker {
        async fn fetch_usage(&self, org_id: &str, _cookie: &str) -> Result<UsageInfo> {
            if let Some(err) = &self.err {
                bail!("{err}");
            }
            self.usage
                .get(org_id)
                .cloned()
                .ok_or_else(|| anyhow!("no usage for org {org_id}"))
        }
    }

    struct EmptyCredentialStore;

    impl CredentialStore for EmptyCredentialStore {
        fn read_token(&self, _service: &str) -> Result<Option<String>> {
            Ok(None)
        }
    }

    fn accounts_two() -> AccountsConfig {
        let mut config = AccountsConfig::default();
        config.accounts.insert(
            "work".into(),
            Account {
                config_dir: "/home/user/.claude-accounts/work".into(),
                ..Default::default()
            },
        );
        config.accounts.insert(
            "personal".into(),
            Account {
                config_dir: "/home/user/.claude-accounts/personal".into(),
                ..Default::default()
            },
        );
        config
    }

    fn env_for(session: &str, config_dir: &str) -> (String, HashMap<String, String>) {
        let mut env = HashMap::new();
        env.insert(CONFIG_DIR_ENV.to_string(), config_dir.to_string());
        (session.to_string(), env)
    }

    #[tokio::test]
    async fn test_scan_all_no_sessions() {
        let scanner = Scanner::new(
            Box::new(MockTmux::default()),
            test_registry(),
            &[],
            None,
        )
        .unwrap();
        let results = scanner.scan_all().await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_scan_all_detects_rate_limited() {
        let tmux = MockTmux {
            sessions: vec![
                "hq-mayor".into(),
                "gt-crew-bear".into(),
                "some-other".into(),
            ],
            pane_content: HashMap::from([
                (
                    "hq-mayor".to_string(),
                    "You've hit your limit · resets 7pm (America/Los_Angeles)".to_string(),
                ),
                (
                    "gt-crew-bear".to_string(),
                    "Working on implementing quota scan...\nAll tests passed.".to_string(),
                ),
            ]),
            env_vars: HashMap::from([
                env_for("hq-mayor", "/home/user/.claude-accounts/work"),
                env_for("gt-crew-bear", "/home/user/.claude-accounts/personal"),
            ]),
            ..Default::default()
        };

        let scanner = Scanner::new(Box::new(tmux), test_registry(), &[], Some(accounts_two()))
            .unwrap();
        let results = scanner.scan_all().await.unwrap();

        // "some-other" is not a registered prefix.
        assert_eq!(results.len(), 2);
        let mayor = results.iter().find(|r| r.session == "hq-mayor").unwrap();
        assert!(mayor.rate_limited);
        assert_eq!(mayor.account_handle, "work");
        assert_eq!(
            mayor.resets_at.as_deref(),
            Some("7pm (America/Los_Angeles)")
        );

        let crew = results.iter().find(|r| r.session == "gt-crew-bear").unwrap();
        assert!(!crew.rate_limited);
        assert_eq!(crew.account_handle, "personal");
    }

    #[tokio::test]
    async fn test_scan_all_list_sessions_error_is_fatal() {
        let tmux = MockTmux {
            sessions_err: Some("tmux server not running".into()),
            ..Default::default()
        };
        let scanner = Scanner::new(Box::new(tmux), test_registry(), &[], None).unwrap();
        assert!(scanner.scan_all().await.is_err());
    }

    #[tokio::test]
    async fn test_scan_all_capture_error_degrades_gracefully() {
        let tmux = MockTmux {
            sessions: vec!["gt-crew-dead".into()],
            ..Default::default()
        };
        let scanner = Scanner::new(Box::new(tmux), test_registry(), &[], None).unwrap();
        let results = scanner.scan_all().await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(!results[0].rate_limited);
        assert!(!results[0].near_limit);
    }

    #[tokio::test]
    async fn test_scan_all_custom_patterns() {
        let tmux = MockTmux {
            sessions: vec!["gt-crew-test".into()],
            pane_content: HashMap::from([(
                "gt-crew-test".to_string(),
                "CUSTOM_RATE_LIMIT_DETECTED".to_string(),
            )]),
            ..Default::default()
        };
        let scanner = Scanner::new(
            Box::new(tmux),
            test_registry(),
            &["CUSTOM_RATE_LIMIT".to_string()],
            None,
        )
        .unwrap();
        let results = scanner.scan_all().await.unwrap();
        assert!(results[0].rate_limited);
    }

    #[test]
    fn test_invalid_pattern_is_construction_error() {
        let result = Scanner::new(
            Box::new(MockTmux::default()),
            test_registry(),
            &["[invalid".to_string()],
            None,
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_config_dir_falls_back_to_default() {
        let tmux = MockTmux {
            sessions: vec!["gt-crew-test".into()],
            pane_content: HashMap::from([("gt-crew-test".to_string(), "working".to_string())]),
            ..Default::default()
        };
        let scanner = Scanner::new(Box::new(tmux), test_registry(), &[], None).unwrap();
        let results = scanner.scan_all().await.unwrap();
        assert!(results[0].config_dir.ends_with(".claude"));
        assert!(results[0].account_handle.is_empty());
    }

    #[tokio::test]
    async fn test_account_resolution_tilde_expansion() {
        let expanded = fleet_config::paths::expand_home("~/.claude-accounts/work");
        let tmux = MockTmux {
            sessions: vec!["gt-crew-test".into()],
            pane_content: HashMap::from([("gt-crew-test".to_string(), "working...".to_string())]),
            env_vars: HashMap::from([env_for("gt-crew-test", &expanded)]),
            ..Default::default()
        };
        let mut config = AccountsConfig::default();
        config.accounts.insert(
            "work".into(),
            Account {
                config_dir: "~/.claude-accounts/work".into(),
                ..Default::default()
            },
        );
        let scanner = Scanner::new(Box::new(tmux), test_registry(), &[], Some(config)).unwrap();
        let results = scanner.scan_all().await.unwrap();
        assert_eq!(results[0].account_handle, "work");
    }

    #[tokio::test]
    async fn test_rotation_override_wins_over_config_dir() {
        let mut env = HashMap::new();
        env.insert(
            CONFIG_DIR_ENV.to_string(),
            "/home/user/.claude-accounts/work".to_string(),
        );
        env.insert(ACTIVE_ACCOUNT_ENV.to_string(), "personal".to_string());

        let tmux = MockTmux {
            sessions: vec!["gt-crew-test".into()],
            pane_content: HashMap::from([("gt-crew-test".to_string(), "working".to_string())]),
            env_vars: HashMap::from([("gt-crew-test".to_string(), env)]),
            ..Default::default()
        };
        let scanner = Scanner::new(Box::new(tmux), test_registry(), &[], Some(accounts_two()))
            .unwrap();
        let results = scanner.scan_all().await.unwrap();
        // Keychain swap happened: the override names the live account even
        // though the config dir still maps to "work".
        assert_eq!(results[0].account_handle, "personal");
    }

    #[tokio::test]
    async fn test_rotation_override_unknown_account_ignored() {
        let mut env = HashMap::new();
        env.insert(
            CONFIG_DIR_ENV.to_string(),
            "/home/user/.claude-accounts/work".to_string(),
        );
        env.insert(ACTIVE_ACCOUNT_ENV.to_string(), "stranger".to_string());

        let tmux = MockTmux {
            sessions: vec!["gt-crew-test".into()],
            pane_content: HashMap::from([("gt-crew-test".to_string(), "working".to_string())]),
            env_vars: HashMap::from([("gt-crew-test".to_string(), env)]),
            ..Default::default()
        };
        let scanner = Scanner::new(Box::new(tmux), test_registry(), &[], Some(accounts_two()))
            .unwrap();
        let results = scanner.scan_all().await.unwrap();
        assert_eq!(results[0].account_handle, "work");
    }

    #[tokio::test]
    async fn test_near_limit_from_warning_patterns() {
        let tmux = MockTmux {
            sessions: vec!["gt-crew-bear".into(), "gt-crew-wolf".into()],
            pane_content: HashMap::from([
                (
                    "gt-crew-bear".to_string(),
                    "Working normally...\n85% of your daily usage consumed".to_string(),
                ),
                ("gt-crew-wolf".to_string(), "Working normally...".to_string()),
            ]),
            ..Default::default()
        };
        let mut scanner =
            Scanner::new(Box::new(tmux), test_registry(), &[], None).unwrap();
        scanner.with_warning_patterns(&[]).unwrap();

        let results = scanner.scan_all().await.unwrap();
        let bear = results.iter().find(|r| r.session == "gt-crew-bear").unwrap();
        assert!(!bear.rate_limited);
        assert!(bear.near_limit);
        assert!(bear.matched_line.is_some());

        let wolf = results.iter().find(|r| r.session == "gt-crew-wolf").unwrap();
        assert!(!wolf.rate_limited);
        assert!(!wolf.near_limit);
    }

    #[tokio::test]
    async fn test_hard_limit_takes_precedence_over_near() {
        let tmux = MockTmux {
            sessions: vec!["gt-crew-bear".into()],
            pane_content: HashMap::from([(
                "gt-crew-bear".to_string(),
                "85% of your daily usage consumed\nYou've hit your limit · resets 7pm"
                    .to_string(),
            )]),
            ..Default::default()
        };
        let mut scanner =
            Scanner::new(Box::new(tmux), test_registry(), &[], None).unwrap();
        scanner.with_warning_patterns(&[]).unwrap();

        let results = scanner.scan_all().await.unwrap();
        assert!(results[0].rate_limited);
        assert!(!results[0].near_limit);
    }

    fn usage_accounts() -> AccountsConfig {
        let mut config = AccountsConfig::default();
        config.accounts.insert(
            "work".into(),
            Account {
                config_dir: "/home/user/.claude-accounts/work".into(),
                org_id: Some("org-work".into()),
                session_cookie: Some("cookie-work".into()),
            },
        );
        config.accounts.insert(
            "personal".into(),
            Account {
                config_dir: "/home/user/.claude-accounts/personal".into(),
                org_id: Some("org-personal".into()),
                session_cookie: Some("cookie-personal".into()),
            },
        );
        config
    }

    fn usage_tmux() -> MockTmux {
        MockTmux {
            sessions: vec!["gt-crew-bear".into(), "gt-crew-wolf".into()],
            pane_content: HashMap::from([
                ("gt-crew-bear".to_string(), "Working normally...".to_string()),
                ("gt-crew-wolf".to_string(), "Working normally...".to_string()),
            ]),
            env_vars: HashMap::from([
                env_for("gt-crew-bear", "/home/user/.claude-accounts/work"),
                env_for("gt-crew-wolf", "/home/user/.claude-accounts/personal"),
            ]),
            ..Default::default()
        }
    }

    fn window(utilization: f64) -> Option<UsageWindow> {
        Some(UsageWindow {
            utilization,
            resets_at: None,
        })
    }

    #[tokio::test]
    async fn test_usage_enrichment_promotes_above_threshold() {
        let checker = MockUsageChecker {
            usage: HashMap::from([
                (
                    "org-work".to_string(),
                    UsageInfo {
                        five_hour: window(85.0),
                        seven_day: window(45.0),
                    },
                ),
                (
                    "org-personal".to_string(),
                    UsageInfo {
                        five_hour: window(30.0),
                        seven_day: window(20.0),
                    },
                ),
            ]),
            err: None,
        };

        let mut scanner = Scanner::new(
            Box::new(usage_tmux()),
            test_registry(),
            &[],
            Some(usage_accounts()),
        )
        .unwrap();
        scanner.with_usage_checker(Box::new(checker), Box::new(EmptyCredentialStore), 80.0);

        let results = scanner.scan_all().await.unwrap();
        let bear = results.iter().find(|r| r.session == "gt-crew-bear").unwrap();
        assert!(bear.near_limit, "85% exceeds the 80% threshold");
        assert_eq!(
            bear.usage.as_ref().unwrap().five_hour.as_ref().unwrap().utilization,
            85.0
        );

        let wolf = results.iter().find(|r| r.session == "gt-crew-wolf").unwrap();
        assert!(!wolf.near_limit, "30% is below the threshold");
        assert!(wolf.usage.is_some(), "usage attached even below threshold");
    }

    #[tokio::test]
    async fn test_usage_api_failure_degrades_gracefully() {
        let checker = MockUsageChecker {
            usage: HashMap::new(),
            err: Some("network timeout".into()),
        };
        let mut scanner = Scanner::new(
            Box::new(usage_tmux()),
            test_registry(),
            &[],
            Some(usage_accounts()),
        )
        .unwrap();
        scanner.with_usage_checker(Box::new(checker), Box::new(EmptyCredentialStore), 80.0);

        let results = scanner.scan_all().await.unwrap();
        for result in &results {
            assert!(!result.near_limit);
            assert!(result.usage.is_none());
        }
    }

    #[tokio::test]
    async fn test_usage_enrichment_skips_accounts_missing_credentials() {
        let mut config = AccountsConfig::default();
        config.accounts.insert(
            "work".into(),
            Account {
                config_dir: "/nonexistent/.claude-accounts/work".into(),
                org_id: None,
                session_cookie: None,
            },
        );
        let tmux = MockTmux {
            sessions: vec!["gt-crew-bear".into()],
            pane_content: HashMap::from([(
                "gt-crew-bear".to_string(),
                "Working normally...".to_string(),
            )]),
            env_vars: HashMap::from([env_for(
                "gt-crew-bear",
                "/nonexistent/.claude-accounts/work",
            )]),
            ..Default::default()
        };
        let checker = MockUsageChecker {
            usage: HashMap::from([(
                "org-work".to_string(),
                UsageInfo {
                    five_hour: window(99.0),
                    seven_day: None,
                },
            )]),
            err: None,
        };

        let mut scanner =
            Scanner::new(Box::new(tmux), test_registry(), &[], Some(config)).unwrap();
        scanner.with_usage_checker(Box::new(checker), Box::new(EmptyCredentialStore), 80.0);

        let results = scanner.scan_all().await.unwrap();
        // No org id and no cookie resolvable: account skipped silently.
        assert!(results[0].usage.is_none());
        assert!(!results[0].near_limit);
    }

    #[tokio::test]
    async fn test_usage_promotion_never_overrides_hard_limit() {
        let tmux = MockTmux {
            sessions: vec!["gt-crew-bear".into()],
            pane_content: HashMap::from([(
                "gt-crew-bear".to_string(),
                "You've hit your limit · resets 7pm".to_string(),
            )]),
            env_vars: HashMap::from([env_for(
                "gt-crew-bear",
                "/home/user/.claude-accounts/work",
            )]),
            ..Default::default()
        };
        let checker = MockUsageChecker {
            usage: HashMap::from([(
                "org-work".to_string(),
                UsageInfo {
                    five_hour: window(99.0),
                    seven_day: None,
                },
            )]),
            err: None,
        };

        let mut scanner = Scanner::new(
            Box::new(tmux),
            test_registry(),
            &[],
            Some(usage_accounts()),
        )
        .unwrap();
        scanner.with_usage_checker(Box::new(checker), Box::new(EmptyCredentialStore), 80.0);

        let results = scanner.scan_all().await.unwrap();
        assert!(results[0].rate_limited);
        assert!(
            !results[0].near_limit,
            "hard limit and near limit are mutually exclusive"
        );
        assert!(results[0].usage.is_some());
    }
}
