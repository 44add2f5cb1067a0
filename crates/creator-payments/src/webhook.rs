//! Paystack Webhook Handling
//!
//! Verifies the `x-paystack-signature` HMAC, extracts successful charges and
//! applies them to the subscriber store.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha512;
use std::sync::Arc;

use crate::error::{PaymentError, Result};
use crate::plan::Plan;
use crate::subscriber::{ConfirmOutcome, PaymentConfirmation, SubscriberStore};

/// Header carrying the hex HMAC-SHA512 of the raw body
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

const CHARGE_SUCCESS: &str = "charge.success";

type HmacSha512 = Hmac<Sha512>;

fn mac(secret: &str) -> Result<HmacSha512> {
    HmacSha512::new_from_slice(secret.as_bytes()).map_err(|e| PaymentError::Config(e.to_string()))
}

/// Hex signature Paystack would send for `body`
pub fn sign(secret: &str, body: &[u8]) -> Result<String> {
    let mut mac = mac(secret)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a webhook signature in constant time
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> Result<()> {
    let expected = hex::decode(signature.trim())
        .map_err(|_| PaymentError::WebhookSignature("signature is not hex".into()))?;

    let mut mac = mac(secret)?;
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| {
        tracing::warn!("Rejected webhook with bad signature");
        PaymentError::WebhookSignature("signature mismatch".into())
    })
}

/// Parsed webhook event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookEvent {
    /// A charge completed
    ChargeSuccess {
        reference: String,
        subscriber_id: String,
        plan: Option<Plan>,
        amount_kobo: Option<i64>,
    },

    /// Anything we do not act on, including charges missing fields
    Ignored { event_type: String },
}

/// Parse a verified webhook body
pub fn parse_event(body: &[u8]) -> Result<WebhookEvent> {
    let payload: Value = serde_json::from_slice(body).map_err(|e| PaymentError::WebhookParse(e.to_string()))?;

    let event_type = payload
        .get("event")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if event_type != CHARGE_SUCCESS {
        return Ok(WebhookEvent::Ignored { event_type });
    }

    let data = payload.get("data").unwrap_or(&Value::Null);
    let metadata = data.get("metadata").unwrap_or(&Value::Null);

    let reference = data.get("reference").and_then(scalar_string);
    let subscriber_id = metadata.get("telegram_id").and_then(scalar_string);

    let (Some(reference), Some(subscriber_id)) = (reference, subscriber_id) else {
        tracing::warn!("charge.success missing reference or telegram_id");
        return Ok(WebhookEvent::Ignored { event_type });
    };

    let plan = metadata
        .get("plan")
        .and_then(Value::as_str)
        .and_then(|raw| raw.parse::<Plan>().ok());

    Ok(WebhookEvent::ChargeSuccess {
        reference,
        subscriber_id,
        plan,
        amount_kobo: data.get("amount").and_then(Value::as_i64),
    })
}

/// Non-empty string from a JSON string or number
fn scalar_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// What handling a webhook did
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum WebhookOutcome {
    Confirmed(ConfirmOutcome),
    Ignored { event_type: String },
}

impl WebhookOutcome {
    /// Short status for the HTTP response
    pub const fn status(&self) -> &'static str {
        match self {
            Self::Confirmed(ConfirmOutcome::Activated { .. }) => "activated",
            Self::Confirmed(ConfirmOutcome::Recorded { .. }) => "recorded",
            Self::Confirmed(ConfirmOutcome::AlreadyProcessed { .. }) => "already_processed",
            Self::Confirmed(ConfirmOutcome::MissingPlan { .. }) | Self::Ignored { .. } => "ignored",
        }
    }
}

/// Webhook handler
pub struct WebhookHandler<S: SubscriberStore + ?Sized> {
    store: Arc<S>,
}

impl<S: SubscriberStore + ?Sized> WebhookHandler<S> {
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Apply a parsed event
    pub fn handle(&self, event: WebhookEvent, now: DateTime<Utc>) -> Result<WebhookOutcome> {
        match event {
            WebhookEvent::ChargeSuccess {
                reference,
                subscriber_id,
                plan,
                amount_kobo,
            } => {
                tracing::info!(reference = %reference, subscriber_id = %subscriber_id, "Processing Paystack charge");

                let outcome = self.store.confirm_payment(
                    &PaymentConfirmation {
                        reference,
                        subscriber_id,
                        plan,
                        amount_kobo,
                    },
                    now,
                )?;
                Ok(WebhookOutcome::Confirmed(outcome))
            }
            WebhookEvent::Ignored { event_type } => {
                tracing::debug!(event_type = %event_type, "Unhandled webhook event");
                Ok(WebhookOutcome::Ignored { event_type })
            }
        }
    }

    /// Verify, parse and apply a raw delivery
    pub fn process(&self, secret: &str, body: &[u8], signature: &str, now: DateTime<Utc>) -> Result<WebhookOutcome> {
        verify_signature(secret, body, signature)?;
        self.handle(parse_event(body)?, now)
    }
}
