//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Paystack rejected the request or returned an unusable body
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Caller supplied an unusable request (unknown plan, missing id)
    #[error("Invalid payment request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl PaymentError {
    /// Get user-friendly message
    pub const fn user_message(&self) -> &str {
        match self {
            Self::Gateway(_) | Self::Network(_) => "Payment initialization failed. Please try again shortly.",
            Self::InvalidRequest(_) => "That payment request is not valid.",
            Self::Config(_) => "Payments are not configured.",
            _ => "An error occurred processing your payment.",
        }
    }
}
