//! Chat Input Parsing
//!
//! Turns free text into audience signals and commands.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::str::FromStr;
use thiserror::Error;

use pricing_core::AudienceSignals;

/// Words that open the tier menu
pub const UPGRADE_KEYWORDS: &[&str] = &["upgrade", "pro", "subscribe", "join pro", "unlock pro"];

/// Unusable stats message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("expected 1 to 3 values, got {0}")]
    Arity(usize),

    #[error("not a count: {0}")]
    Number(String),

    #[error("not an engagement rate: {0}")]
    Engagement(String),
}

/// Slash commands the bot understands
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Status,
    Upgrade,
    Deal,
    Cancel,
    Unknown(String),
}

impl Command {
    /// Parse `/name`, `/name@BotName` or `/name args`
    pub fn parse(raw: &str) -> Self {
        let name = raw
            .trim()
            .trim_start_matches('/')
            .split_whitespace()
            .next()
            .unwrap_or_default();
        let name = name.split('@').next().unwrap_or_default().to_lowercase();

        match name.as_str() {
            "start" | "help" => Self::Start,
            "status" => Self::Status,
            "upgrade" | "subscribe" | "pay" => Self::Upgrade,
            "deal" => Self::Deal,
            "cancel" => Self::Cancel,
            _ => Self::Unknown(name),
        }
    }
}

/// True for the plain-text upgrade triggers
pub fn is_upgrade_keyword(text: &str) -> bool {
    let text = text.trim().to_lowercase();
    UPGRADE_KEYWORDS.contains(&text.as_str())
}

/// Parse a count such as `50k`, `1.2m`, `500,000` or `12000`
pub fn parse_number(raw: &str) -> Result<u64, InputError> {
    let invalid = || InputError::Number(raw.to_string());

    let cleaned = raw.trim().replace(',', "").to_lowercase();
    let (digits, multiplier) = if let Some(rest) = cleaned.strip_suffix('k') {
        (rest, Decimal::from(1_000))
    } else if let Some(rest) = cleaned.strip_suffix('m') {
        (rest, Decimal::from(1_000_000))
    } else {
        (cleaned.as_str(), Decimal::ONE)
    };

    let value = Decimal::from_str(digits).map_err(|_| invalid())?;
    if value.is_sign_negative() {
        return Err(invalid());
    }

    value
        .checked_mul(multiplier)
        .and_then(|v| v.trunc().to_u64())
        .ok_or_else(invalid)
}

/// Parse an engagement rate into (0, 1]
///
/// `0.08` and `8` both mean 8%; a trailing `%` always divides by 100, so
/// `0.8%` is 0.008.
pub fn parse_engagement(raw: &str) -> Result<f64, InputError> {
    let invalid = || InputError::Engagement(raw.to_string());

    let trimmed = raw.trim();
    let (digits, percent) = match trimmed.strip_suffix('%') {
        Some(rest) => (rest.trim(), true),
        None => (trimmed, false),
    };

    let value: f64 = digits.parse().map_err(|_| invalid())?;
    let rate = if percent || value > 1.0 { value / 100.0 } else { value };

    if rate.is_finite() && rate > 0.0 && rate <= 1.0 {
        Ok(rate)
    } else {
        Err(invalid())
    }
}

/// Parse a stats message
///
/// - `50k` is followers only
/// - `12000 0.08` is average views and engagement
/// - `50k 12000 0.08` is all three
pub fn parse_stats(text: &str) -> Result<AudienceSignals, InputError> {
    let parts: Vec<&str> = text.split_whitespace().collect();

    match parts.as_slice() {
        [followers] => Ok(AudienceSignals::followers_only(parse_number(followers)?)),
        [views, engagement] => Ok(AudienceSignals::views_only(
            parse_number(views)?,
            Some(parse_engagement(engagement)?),
        )),
        [followers, views, engagement] => Ok(AudienceSignals::new(
            Some(parse_number(followers)?),
            Some(parse_number(views)?),
            Some(parse_engagement(engagement)?),
        )),
        other => Err(InputError::Arity(other.len())),
    }
}
