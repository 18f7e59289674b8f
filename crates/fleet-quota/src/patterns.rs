//! Hard-limit and near-limit signature matching over captured pane content.

use std::sync::LazyLock;

use regex::Regex;

use fleet_core::FleetError;

/// Hard rate-limit signatures. Ordered; the first matching line wins.
///
/// Covers the banner message, the interactive `/rate-limit-options` TUI
/// prompt (visible after the banner has scrolled off), and mid-stream API
/// errors.
pub const DEFAULT_RATE_LIMIT_PATTERNS: &[&str] = &[
    r"hit your limit",
    r"/rate-limit-options",
    r"stop and wait for limit to reset",
    r"api error: .*rate limit",
    r"rate limit exceeded",
    r"usage limit reached",
];

/// Approaching-quota signatures. Only two-or-more-digit percentages count;
/// single digits are background noise.
pub const DEFAULT_NEAR_LIMIT_PATTERNS: &[&str] = &[
    r"\d{2,3}% of your .*usage",
    r"\d{2,3}% of your .*limit",
    r"approaching your (rate )?limit",
    r"nearing your limit",
    r"close to your (rate )?limit",
    r"almost reached your (rate )?limit",
    r"\d+ messages? remaining",
    r"\d+ requests? left",
    r"usage .*at \d{2,3}%",
];

/// Pane lines captured per session.
///
/// A generous window is taken but only the bottom [`CHECK_LINES`] are
/// matched: once a limit is resolved (re-auth, agent resumes), new output
/// pushes the stale message above the checked tail, so it stops being
/// reported as active.
pub const SCAN_LINES: usize = 30;

/// Trailing lines actually checked. 20 balances detection reliability
/// (10 was too small, messages scrolled out while agents kept working)
/// against picking up stale messages lingering higher in scrollback.
pub const CHECK_LINES: usize = 20;

static RESET_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bresets\s+(.+)").unwrap());

/// Outcome of classifying one session's pane tail.
#[derive(Debug, Clone, PartialEq)]
pub enum LimitSignal {
    /// A hard rate-limit signature matched.
    HardLimited {
        line: String,
        resets_at: Option<String>,
    },
    /// No hard signature, but an approaching-quota signature matched.
    NearLimit { line: String },
    /// Nothing matched.
    Clear,
}

/// Compiled, ordered hard-limit and near-limit signature sets.
#[derive(Debug)]
pub struct PatternClassifier {
    hard: Vec<Regex>,
    near: Vec<Regex>,
}

impl PatternClassifier {
    /// Compile hard-limit patterns. Empty input selects the defaults.
    /// Any compile failure is fatal here, never deferred to scan time.
    pub fn new(patterns: &[String]) -> Result<Self, FleetError> {
        let hard = if patterns.is_empty() {
            compile(DEFAULT_RATE_LIMIT_PATTERNS.iter().map(|p| p.to_string()))?
        } else {
            compile(patterns.iter().cloned())?
        };
        Ok(Self {
            hard,
            near: Vec::new(),
        })
    }

    /// Enable near-limit detection. Empty input selects the defaults.
    pub fn set_warning_patterns(&mut self, patterns: &[String]) -> Result<(), FleetError> {
        self.near = if patterns.is_empty() {
            compile(DEFAULT_NEAR_LIMIT_PATTERNS.iter().map(|p| p.to_string()))?
        } else {
            compile(patterns.iter().cloned())?
        };
        Ok(())
    }

    pub fn has_warning_patterns(&self) -> bool {
        !self.near.is_empty()
    }

    /// Classify captured pane content, checking only the bottom
    /// [`CHECK_LINES`] non-blank lines. Hard signatures are evaluated first
    /// across the whole tail; near signatures only when none matched.
    pub fn classify(&self, content: &str) -> LimitSignal {
        let all_lines: Vec<&str> = content.lines().collect();
        let start = all_lines.len().saturating_sub(CHECK_LINES);
        let tail: Vec<&str> = all_lines[start..]
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect();

        for line in &tail {
            for re in &self.hard {
                if re.is_match(line) {
                    return LimitSignal::HardLimited {
                        line: line.to_string(),
                        resets_at: parse_reset_time(line),
                    };
                }
            }
        }

        for line in &tail {
            for re in &self.near {
                if re.is_match(line) {
                    return LimitSignal::NearLimit {
                        line: line.to_string(),
                    };
                }
            }
        }

        LimitSignal::Clear
    }
}

fn compile(patterns: impl Iterator<Item = String>) -> Result<Vec<Regex>, FleetError> {
    patterns
        .map(|p| {
            Regex::new(&format!("(?i){p}")).map_err(|source| FleetError::InvalidPattern {
                pattern: p,
                source,
            })
        })
        .collect()
}

/// Extract the reset time from a rate-limit message.
///
/// "You've hit your limit · resets 7pm (America/Los_Angeles)"
///   -> "7pm (America/Los_Angeles)"
pub fn parse_reset_time(line: &str) -> Option<String> {
    RESET_TIME
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}
