//! Order model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which payment provider a charge is routed through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local aggregator (bank transfer, USSD, local cards)
    Paystack,
    /// International cards and wallets
    Stripe,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Paystack => "paystack",
            Self::Stripe => "stripe",
        }
    }
}

/// How the buyer paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Paystack,
    Card,
    Wallet,
    /// Free events carry no charge
    None,
}

impl PaymentMethod {
    /// Parse from database string value (lowercase)
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "paystack" => Some(Self::Paystack),
            "card" => Some(Self::Card),
            "wallet" => Some(Self::Wallet),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    /// Database string representation (lowercase)
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Paystack => "paystack",
            Self::Card => "card",
            Self::Wallet => "wallet",
            Self::None => "none",
        }
    }

    /// Provider this method settles through, if any
    pub fn provider(&self) -> Option<ProviderKind> {
        match self {
            Self::Paystack => Some(ProviderKind::Paystack),
            Self::Card | Self::Wallet => Some(ProviderKind::Stripe),
            Self::None => Option::None,
        }
    }
}

/// Order payment lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
}

impl PaymentStatus {
    /// Parse from database string value (lowercase)
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Database string representation (lowercase)
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }
}

/// Denormalized ticket line captured at purchase time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
}

/// Order entity
///
/// `reference` is the provider transaction reference (or checkout-session id)
/// and is unique across all orders; an order is created exactly once per
/// reference and only updated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub event_id: String,
    /// None = guest checkout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_id: Option<String>,
    pub buyer_email: String,
    pub first_name: String,
    pub last_name: String,
    /// Decimal rendered as string, major units
    pub total_amount: String,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub quantity: u32,
    pub price_categories: Vec<OrderLine>,
    pub reference: String,
    pub payment_status: PaymentStatus,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_db_roundtrip() {
        for m in [
            PaymentMethod::Paystack,
            PaymentMethod::Card,
            PaymentMethod::Wallet,
            PaymentMethod::None,
        ] {
            assert_eq!(PaymentMethod::from_db(m.as_db()), Some(m));
        }
        assert_eq!(PaymentMethod::from_db("cash"), Option::None);
    }

    #[test]
    fn test_payment_method_provider() {
        assert_eq!(
            PaymentMethod::Paystack.provider(),
            Some(ProviderKind::Paystack)
        );
        assert_eq!(PaymentMethod::Card.provider(), Some(ProviderKind::Stripe));
        assert_eq!(PaymentMethod::Wallet.provider(), Some(ProviderKind::Stripe));
        assert_eq!(PaymentMethod::None.provider(), Option::None);
    }

    #[test]
    fn test_payment_status_db_roundtrip() {
        assert_eq!(
            PaymentStatus::from_db("pending"),
            Some(PaymentStatus::Pending)
        );
        assert_eq!(
            PaymentStatus::from_db("completed"),
            Some(PaymentStatus::Completed)
        );
        assert_eq!(PaymentStatus::from_db("refunded"), None);
    }

    #[test]
    fn test_order_json_field_names() {
        let order = Order {
            id: "ord-1".to_string(),
            event_id: "evt-1".to_string(),
            buyer_id: None,
            buyer_email: "buyer@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Obi".to_string(),
            total_amount: "100.00".to_string(),
            currency: "NGN".to_string(),
            payment_method: PaymentMethod::Paystack,
            quantity: 2,
            price_categories: vec![OrderLine {
                name: "Regular".to_string(),
                price: Decimal::new(5000, 2),
                quantity: 2,
            }],
            reference: "evt-1-1700000000000-abcd1234".to_string(),
            payment_status: PaymentStatus::Completed,
            created_at: 1_700_000_000_000,
        };

        let json = serde_json::to_string(&order).unwrap();
        assert!(json.contains("\"eventId\":\"evt-1\""));
        assert!(json.contains("\"buyerEmail\":\"buyer@example.com\""));
        assert!(json.contains("\"totalAmount\":\"100.00\""));
        assert!(json.contains("\"paymentMethod\":\"paystack\""));
        assert!(json.contains("\"paymentStatus\":\"completed\""));
        // guest checkout: buyerId omitted entirely
        assert!(!json.contains("buyerId"));
    }
}
