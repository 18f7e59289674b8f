use anyhow::Result;

use fleet_config::AccountsConfig;
use fleet_quota::{HttpUsageClient, KeyringCredentialStore, ScanResult, Scanner};
use fleet_tmux::{PrefixRegistry, TmuxDriver};

/// Session-name prefixes the fleet claims. `hq` is town-level services;
/// the rest are rig prefixes.
fn default_registry() -> PrefixRegistry {
    let mut registry = PrefixRegistry::new();
    registry.register("hq", "town");
    registry.register("gt", "gastown");
    registry.register("bd", "beads");
    registry
}

pub async fn scan(json: bool, threshold: Option<f64>, no_usage: bool) -> Result<()> {
    let accounts = AccountsConfig::load()?;
    let accounts = (!accounts.is_empty()).then_some(accounts);

    let mut scanner = Scanner::new(
        Box::new(TmuxDriver::new()),
        default_registry(),
        &[],
        accounts,
    )?;
    scanner.with_warning_patterns(&[])?;
    if !no_usage {
        scanner.with_usage_checker(
            Box::new(HttpUsageClient::new()?),
            Box::new(KeyringCredentialStore),
            threshold.unwrap_or(0.0),
        );
    }

    let results = scanner.scan_all().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No fleet sessions found.");
        return Ok(());
    }
    for result in &results {
        println!("{}", format_result(result));
    }
    Ok(())
}

fn format_result(result: &ScanResult) -> String {
    let state = if result.rate_limited {
        "RATE-LIMITED"
    } else if result.near_limit {
        "NEAR-LIMIT"
    } else {
        "ok"
    };
    let mut line = format!("{:20} {:12}", result.session, state);
    if !result.account_handle.is_empty() {
        line.push_str(&format!("  account={}", result.account_handle));
    }
    if let Some(resets) = &result.resets_at {
        line.push_str(&format!("  resets {resets}"));
    }
    if let Some(usage) = &result.usage {
        line.push_str(&format!("  usage {:.0}%", usage.max_utilization()));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_quota::{UsageInfo, UsageWindow};

    #[test]
    fn test_format_result_rate_limited() {
        let result = ScanResult {
            session: "gt-crew-bear".into(),
            account_handle: "work".into(),
            rate_limited: true,
            resets_at: Some("7pm (America/Los_Angeles)".into()),
            ..Default::default()
        };
        let line = format_result(&result);
        assert!(line.contains("RATE-LIMITED"));
        assert!(line.contains("account=work"));
        assert!(line.contains("resets 7pm"));
    }

    #[test]
    fn test_format_result_healthy_with_usage() {
        let result = ScanResult {
            session: "gt-crew-wolf".into(),
            usage: Some(UsageInfo {
                five_hour: Some(UsageWindow {
                    utilization: 42.0,
                    resets_at: None,
                }),
                seven_day: None,
            }),
            ..Default::default()
        };
        let line = format_result(&result);
        assert!(line.contains("ok"));
        assert!(line.contains("usage 42%"));
    }
}
