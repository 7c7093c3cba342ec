//! Payment provider integration
//!
//! Routing picks the provider, `money` converts between major and minor
//! units, `metadata` round-trips checkout context through the provider,
//! and the provider clients speak plain REST over reqwest.

pub mod metadata;
pub mod money;
pub mod paystack;
pub mod routing;
pub mod stripe;
