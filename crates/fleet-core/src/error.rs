#[derive(thiserror::Error, Debug)]
pub enum FleetError {
    #[error("Invalid rate-limit pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to list tmux sessions: {0}")]
    ListSessions(String),

    #[error("Accounts root '{0}' is not readable")]
    AccountsRootUnreadable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_list_sessions() {
        let err = FleetError::ListSessions("tmux server not running".into());
        assert_eq!(
            err.to_string(),
            "Failed to list tmux sessions: tmux server not running"
        );
    }

    #[test]
    fn test_display_accounts_root_unreadable() {
        let err = FleetError::AccountsRootUnreadable("/tmp/nope".into());
        assert_eq!(err.to_string(), "Accounts root '/tmp/nope' is not readable");
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FleetError>();
    }
}
