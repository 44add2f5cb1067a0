//! Error Types for the Pricing Engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PricingError>;

#[derive(Error, Debug)]
pub enum PricingError {
    /// Neither followers nor average views were supplied
    #[error("Insufficient data: followers or average views required")]
    InsufficientData,

    /// Out-of-range signal (engagement outside (0, 1], absurd counts)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PricingError {
    /// Stable machine-readable code, used as the `detail` of HTTP errors
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InsufficientData => "insufficient_data",
            Self::InvalidInput(_) => "invalid_input",
            Self::Config(_) | Self::Io(_) | Self::Serialization(_) => "configuration_error",
        }
    }

    /// Whether the caller can fix this by sending different input
    pub const fn is_caller_error(&self) -> bool {
        matches!(self, Self::InsufficientData | Self::InvalidInput(_))
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::InsufficientData => {
                "Please send your follower count or your average views so we can price you.".into()
            }
            Self::InvalidInput(msg) => format!("Some of your stats look off: {msg}"),
            _ => "Pricing is temporarily unavailable.".into(),
        }
    }
}
