//! Checkout metadata codec
//!
//! Checkout context rides through the provider as a flat string map and
//! comes back on the webhook. The line snapshot is serialized into a single
//! string field since providers only carry flat maps. Decoding is strict
//! about the event id and buyer marker: without them a charge cannot be
//! materialized into an order.

use std::collections::BTreeMap;

use shared::error::{AppError, ErrorCode};
use shared::models::OrderLine;

/// Buyer marker. Guest checkouts have no user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Buyer {
    Known(String),
    Guest,
}

const GUEST_SENTINEL: &str = "guest";

impl Buyer {
    pub fn as_value(&self) -> &str {
        match self {
            Self::Known(id) => id,
            Self::Guest => GUEST_SENTINEL,
        }
    }

    pub fn from_value(value: &str) -> Self {
        if value == GUEST_SENTINEL {
            Self::Guest
        } else {
            Self::Known(value.to_string())
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Known(id) => Some(id),
            Self::Guest => None,
        }
    }
}

/// Context attached to a provider charge and recovered on the webhook
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutMetadata {
    pub event_id: String,
    pub buyer: Buyer,
    pub quantity: u32,
    /// Ticket selection snapshot at purchase time
    pub lines: Vec<OrderLine>,
    /// Buyer identity captured at checkout; webhook customer data wins for
    /// the email, these fill the gaps
    pub buyer_email: String,
    pub first_name: String,
    pub last_name: String,
}

impl CheckoutMetadata {
    pub fn encode(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("event_id".to_string(), self.event_id.clone());
        map.insert("buyer_id".to_string(), self.buyer.as_value().to_string());
        map.insert("quantity".to_string(), self.quantity.to_string());
        map.insert(
            "lines".to_string(),
            serde_json::to_string(&self.lines).unwrap_or_else(|_| "[]".to_string()),
        );
        map.insert("buyer_email".to_string(), self.buyer_email.clone());
        map.insert("first_name".to_string(), self.first_name.clone());
        map.insert("last_name".to_string(), self.last_name.clone());
        map
    }

    pub fn decode(map: &BTreeMap<String, String>) -> Result<Self, AppError> {
        let event_id = required(map, "event_id")?;
        let buyer = Buyer::from_value(&required(map, "buyer_id")?);
        let quantity = required(map, "quantity")?
            .parse::<u32>()
            .map_err(|_| invalid("quantity is not a positive integer"))?;

        let lines = match map.get("lines") {
            Some(raw) => {
                serde_json::from_str(raw).map_err(|_| invalid("lines is not a line snapshot"))?
            }
            None => Vec::new(),
        };

        Ok(Self {
            event_id,
            buyer,
            quantity,
            lines,
            buyer_email: map.get("buyer_email").cloned().unwrap_or_default(),
            first_name: map.get("first_name").cloned().unwrap_or_default(),
            last_name: map.get("last_name").cloned().unwrap_or_default(),
        })
    }

    /// Decode from a JSON object whose values are strings.
    pub fn decode_json(value: &serde_json::Value) -> Result<Self, AppError> {
        let object = value
            .as_object()
            .ok_or_else(|| invalid("metadata is not an object"))?;
        let map: BTreeMap<String, String> = object
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect();
        Self::decode(&map)
    }
}

fn required(map: &BTreeMap<String, String>, key: &str) -> Result<String, AppError> {
    map.get(key)
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or_else(|| invalid(format!("missing {}", key)))
}

fn invalid(msg: impl Into<String>) -> AppError {
    AppError::with_message(ErrorCode::MetadataInvalid, msg)
}
