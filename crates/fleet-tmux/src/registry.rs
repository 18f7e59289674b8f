use std::collections::HashMap;

/// Lookup table of session-name prefixes the fleet recognizes as its own.
///
/// Passed explicitly to scanners rather than held in mutable global state so
/// each run is independently configurable and testable.
#[derive(Debug, Clone, Default)]
pub struct PrefixRegistry {
    /// prefix -> owner label (e.g. "gt" -> "gastown"), informational only.
    prefixes: HashMap<String, String>,
}

impl PrefixRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a prefix. `register("gt", ..)` recognizes `gt` itself and any
    /// `gt-*` session name.
    pub fn register(&mut self, prefix: impl Into<String>, owner: impl Into<String>) {
        self.prefixes.insert(prefix.into(), owner.into());
    }

    /// Whether a session name belongs to the fleet: an exact prefix match,
    /// or `<prefix>-` followed by anything. Prefixes may themselves contain
    /// dashes.
    pub fn is_known_session(&self, session: &str) -> bool {
        self.prefixes.keys().any(|prefix| {
            session == prefix
                || (session.len() > prefix.len()
                    && session.starts_with(prefix.as_str())
                    && session.as_bytes()[prefix.len()] == b'-')
        })
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_registry() -> PrefixRegistry {
        let mut r = PrefixRegistry::new();
        r.register("hq", "town");
        r.register("gt", "gastown");
        r.register("bd", "beads");
        r
    }

    #[test]
    fn test_known_prefixes() {
        let r = test_registry();
        assert!(r.is_known_session("hq-mayor"));
        assert!(r.is_known_session("gt-crew-bear"));
        assert!(r.is_known_session("bd-refinery"));
    }

    #[test]
    fn test_unknown_sessions() {
        let r = test_registry();
        assert!(!r.is_known_session("my-app"));
        assert!(!r.is_known_session("dev-server"));
        assert!(!r.is_known_session("myapp"));
        assert!(!r.is_known_session("devserver"));
    }

    #[test]
    fn test_bare_prefix_is_known() {
        let r = test_registry();
        assert!(r.is_known_session("hq"));
        assert!(!r.is_known_session("xy"));
    }

    #[test]
    fn test_dashed_prefix_matches() {
        let mut r = PrefixRegistry::new();
        r.register("my-app", "myapp");
        assert!(r.is_known_session("my-app"));
        assert!(r.is_known_session("my-app-worker"));
        // Prefix must be followed by a dash, not merely be a substring.
        assert!(!r.is_known_session("my-application"));
        assert!(!r.is_known_session("my"));
    }
}
