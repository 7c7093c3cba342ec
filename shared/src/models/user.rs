//! User model (organizer / buyer)

use serde::{Deserialize, Serialize};

use super::order::ProviderKind;

/// User entity
///
/// Organizers carry payout identifiers per provider; buyers usually carry
/// none. A paid event cannot be sold until its organizer holds the payout
/// identifier for the provider the event routes to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Local provider payout identifier (subaccount code)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subaccount_code: Option<String>,
    /// International provider payout identifier (connected account id)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_account_id: Option<String>,
    pub created_at: i64,
}

impl User {
    /// Payout identifier for the given provider, if configured
    pub fn payout_account(&self, provider: ProviderKind) -> Option<&str> {
        match provider {
            ProviderKind::Paystack => self.subaccount_code.as_deref(),
            ProviderKind::Stripe => self.stripe_account_id.as_deref(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Create user payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreate {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub subaccount_code: Option<String>,
    pub stripe_account_id: Option<String>,
}

/// Update payout identifiers payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutUpdate {
    pub subaccount_code: Option<String>,
    pub stripe_account_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn organizer() -> User {
        User {
            id: "usr-1".to_string(),
            email: "org@example.com".to_string(),
            first_name: "Ngozi".to_string(),
            last_name: "Eze".to_string(),
            subaccount_code: Some("ACCT_abc123".to_string()),
            stripe_account_id: None,
            created_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_payout_account() {
        let user = organizer();
        assert_eq!(
            user.payout_account(ProviderKind::Paystack),
            Some("ACCT_abc123")
        );
        assert_eq!(user.payout_account(ProviderKind::Stripe), None);
    }

    #[test]
    fn test_full_name() {
        assert_eq!(organizer().full_name(), "Ngozi Eze");
    }
}
