//! Error Types

use thiserror::Error;

use creator_payments::PaymentError;
use pricing_core::PricingError;

/// Result type alias for bot operations
pub type Result<T> = std::result::Result<T, BotError>;

/// Bot error types
#[derive(Error, Debug)]
pub enum BotError {
    /// Pricing engine failure that the user cannot fix
    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    /// Subscriber lookup or payment failure
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Session or intake storage failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl BotError {
    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Pricing(err) => err.user_message(),
            Self::Payment(err) => err.user_message().to_string(),
            Self::Storage(_) => "Something went wrong on our side. Please try again.".into(),
        }
    }
}
