//! Account eligibility for synchronization.

use crate::entities::account;

/// An account is synced only when it is connected, holds a usable long-lived
/// credential, and has granted `required_scope`.
pub fn is_eligible(account: &account::Model, required_scope: &str) -> bool {
    account.is_connected
        && account
            .refresh_token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty())
        && account.has_scope(required_scope)
}

/// Keep only eligible accounts.
pub fn eligible_accounts(accounts: Vec<account::Model>, required_scope: &str) -> Vec<account::Model> {
    accounts
        .into_iter()
        .filter(|account| is_eligible(account, required_scope))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const SCOPE: &str = "https://www.googleapis.com/auth/tasks";

    fn account(connected: bool, token: Option<&str>, scopes: &str) -> account::Model {
        account::Model {
            uuid: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            refresh_token: token.map(str::to_string),
            granted_scopes: scopes.to_string(),
            is_connected: connected,
            import_watermark: None,
            last_synced_at: None,
            last_sync_error: None,
        }
    }

    #[test]
    fn test_requires_all_three_conditions() {
        assert!(is_eligible(&account(true, Some("rt"), &format!("openid {SCOPE}")), SCOPE));
        assert!(!is_eligible(&account(false, Some("rt"), SCOPE), SCOPE));
        assert!(!is_eligible(&account(true, None, SCOPE), SCOPE));
        assert!(!is_eligible(&account(true, Some("  "), SCOPE), SCOPE));
        assert!(!is_eligible(&account(true, Some("rt"), "openid email"), SCOPE));
    }

    #[test]
    fn test_scope_match_is_exact() {
        let readonly = format!("{SCOPE}.readonly");
        assert!(!is_eligible(&account(true, Some("rt"), &readonly), SCOPE));
    }
}
