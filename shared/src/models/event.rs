//! Event model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Event lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    /// Created, not yet visible for checkout
    Draft,
    /// Live, checkout allowed
    Published,
}

impl EventStatus {
    /// Parse from database string value (lowercase)
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            _ => None,
        }
    }

    /// Database string representation (lowercase)
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }
}

/// Ticket tier embedded in the owning event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceCategory {
    pub name: String,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_cap: Option<u32>,
}

/// Event entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub organizer_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free text, used to infer the charge country
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub currency: String,
    pub is_free: bool,
    pub price_categories: Vec<PriceCategory>,
    pub status: EventStatus,
    pub created_at: i64,
}

/// Create event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCreate {
    pub organizer_id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub currency: String,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub price_categories: Vec<PriceCategory>,
}
