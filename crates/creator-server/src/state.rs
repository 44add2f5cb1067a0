//! Application State

use std::sync::Arc;

use creator_bot::Bot;
use creator_payments::{PaymentGateway, SubscriberStore};
use pricing_core::PricingEngine;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Pricing engine over the loaded rate tables
    pub engine: Arc<PricingEngine>,

    /// Subscribers and payments
    pub subscribers: Arc<dyn SubscriberStore>,

    /// Payment gateway (optional - None if not configured)
    pub gateway: Option<Arc<dyn PaymentGateway>>,

    /// Key Paystack signs webhooks with
    pub webhook_secret: Option<String>,

    /// Paystack redirect target after checkout
    pub callback_url: Option<String>,

    /// Chat flow
    pub bot: Arc<Bot>,
}
