//! Provider routing
//!
//! A charge goes to the local aggregator only when both the event currency
//! is the local currency and the event location mentions the local country.
//! Everything else goes to the international provider.

use shared::models::ProviderKind;

#[derive(Debug, Clone)]
pub struct RoutingRules {
    local_currency: String,
    local_country: String,
}

impl RoutingRules {
    pub fn new(local_currency: &str, local_country: &str) -> Self {
        Self {
            local_currency: local_currency.to_lowercase(),
            local_country: local_country.to_lowercase(),
        }
    }

    pub fn route(&self, currency: &str, location: Option<&str>) -> ProviderKind {
        let currency_is_local = currency.to_lowercase() == self.local_currency;
        let location_is_local = location
            .map(|l| l.to_lowercase().contains(&self.local_country))
            .unwrap_or(false);

        if currency_is_local && location_is_local {
            ProviderKind::Paystack
        } else {
            ProviderKind::Stripe
        }
    }
}

impl Default for RoutingRules {
    fn default() -> Self {
        Self::new("NGN", "Nigeria")
    }
}
