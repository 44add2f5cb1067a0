//! Subscriber & Payment Records
//!
//! Storage for PRO subscribers and the payments that fund them. Payment
//! confirmation is idempotent per gateway reference: a webhook delivered
//! twice extends an entitlement once.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::{PaymentError, Result};
use crate::gate;
use crate::plan::Plan;

/// A subscriber record, keyed by chat user id
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberRecord {
    /// Opaque user identifier (the chat id)
    pub id: String,

    /// Stored entitlement flag; the expiry overrides it
    pub has_active_entitlement: bool,

    /// Expiry exactly as persisted; read through [`gate::normalize_expiry`]
    pub entitlement_expires_at: Option<String>,

    /// Start of the current entitlement period
    pub activated_at: Option<DateTime<Utc>>,

    pub updated_at: DateTime<Utc>,
}

impl SubscriberRecord {
    /// A subscriber without entitlement
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            has_active_entitlement: false,
            entitlement_expires_at: None,
            activated_at: None,
            updated_at: now,
        }
    }

    /// Add `days` of entitlement, stacking on top of any unexpired period
    pub fn extend_entitlement(&mut self, days: i64, now: DateTime<Utc>) -> DateTime<Utc> {
        let current = match gate::evaluate(Some(self), now) {
            gate::EntitlementStatus::Active { expires_at } => Some(expires_at),
            _ => None,
        };

        if current.is_none() {
            self.activated_at = Some(now);
        }

        let expires_at = current.unwrap_or(now) + Duration::days(days);
        self.has_active_entitlement = true;
        self.entitlement_expires_at = Some(expires_at.to_rfc3339());
        self.updated_at = now;

        expires_at
    }
}

/// Lifecycle of a gateway payment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
}

/// A payment initialized with (or reported by) the gateway
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Gateway transaction reference
    pub reference: String,

    pub subscriber_id: String,

    pub plan: Plan,

    pub amount_kobo: i64,

    pub status: PaymentStatus,

    pub created_at: DateTime<Utc>,

    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    pub fn pending(
        reference: impl Into<String>,
        subscriber_id: impl Into<String>,
        plan: Plan,
        amount_kobo: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            reference: reference.into(),
            subscriber_id: subscriber_id.into(),
            plan,
            amount_kobo,
            status: PaymentStatus::Pending,
            created_at: now,
            paid_at: None,
        }
    }
}

/// A successful charge reported by the gateway
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentConfirmation {
    pub reference: String,
    pub subscriber_id: String,
    /// Plan from the charge metadata; the pending record takes precedence
    pub plan: Option<Plan>,
    pub amount_kobo: Option<i64>,
}

/// What confirming a payment did
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConfirmOutcome {
    /// PRO granted or extended
    Activated {
        subscriber_id: String,
        plan: Plan,
        expires_at: DateTime<Utc>,
    },

    /// Paid plan without entitlement (ELITE)
    Recorded { subscriber_id: String, plan: Plan },

    /// Reference already confirmed; nothing changed
    AlreadyProcessed { reference: String },

    /// No plan on the charge or a pending record; nothing changed
    MissingPlan { reference: String },
}

/// Subscriber storage trait
pub trait SubscriberStore: Send + Sync {
    /// Get a subscriber by id
    fn get(&self, id: &str) -> Result<Option<SubscriberRecord>>;

    /// Save or update a subscriber
    fn save(&self, record: &SubscriberRecord) -> Result<()>;

    /// Remember a payment initialized with the gateway
    fn record_pending(&self, payment: &PaymentRecord) -> Result<()>;

    /// Get a payment by gateway reference
    fn get_payment(&self, reference: &str) -> Result<Option<PaymentRecord>>;

    /// Mark a payment successful and apply its plan (atomic, idempotent)
    fn confirm_payment(&self, confirmation: &PaymentConfirmation, now: DateTime<Utc>) -> Result<ConfirmOutcome>;
}

/// In-memory subscriber store (for development)
pub struct MemorySubscriberStore {
    subscribers: RwLock<HashMap<String, SubscriberRecord>>,
    payments: RwLock<HashMap<String, PaymentRecord>>,
}

impl Default for MemorySubscriberStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySubscriberStore {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            payments: RwLock::new(HashMap::new()),
        }
    }
}

fn poisoned<T>(_: PoisonError<T>) -> PaymentError {
    PaymentError::Storage("store lock poisoned".into())
}

impl SubscriberStore for MemorySubscriberStore {
    fn get(&self, id: &str) -> Result<Option<SubscriberRecord>> {
        let subscribers = self.subscribers.read().map_err(poisoned)?;
        Ok(subscribers.get(id).cloned())
    }

    fn save(&self, record: &SubscriberRecord) -> Result<()> {
        let mut subscribers = self.subscribers.write().map_err(poisoned)?;
        subscribers.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn record_pending(&self, payment: &PaymentRecord) -> Result<()> {
        let mut payments = self.payments.write().map_err(poisoned)?;
        if payments.contains_key(&payment.reference) {
            return Err(PaymentError::Storage(format!(
                "duplicate payment reference {}",
                payment.reference
            )));
        }
        payments.insert(payment.reference.clone(), payment.clone());
        Ok(())
    }

    fn get_payment(&self, reference: &str) -> Result<Option<PaymentRecord>> {
        let payments = self.payments.read().map_err(poisoned)?;
        Ok(payments.get(reference).cloned())
    }

    fn confirm_payment(&self, confirmation: &PaymentConfirmation, now: DateTime<Utc>) -> Result<ConfirmOutcome> {
        // Lock order: payments, then subscribers
        let mut payments = self.payments.write().map_err(poisoned)?;
        let reference = confirmation.reference.clone();

        let existing = payments.get(&reference).cloned();
        if existing.as_ref().is_some_and(|p| p.status == PaymentStatus::Success) {
            tracing::info!(reference = %reference, "Payment already confirmed, skipping");
            return Ok(ConfirmOutcome::AlreadyProcessed { reference });
        }

        let Some(plan) = existing.as_ref().map(|p| p.plan).or(confirmation.plan) else {
            tracing::warn!(reference = %reference, "Confirmed charge carries no plan");
            return Ok(ConfirmOutcome::MissingPlan { reference });
        };

        let subscriber_id = match &existing {
            Some(pending) => {
                if pending.subscriber_id != confirmation.subscriber_id {
                    tracing::warn!(
                        reference = %reference,
                        pending = %pending.subscriber_id,
                        reported = %confirmation.subscriber_id,
                        "Charge metadata disagrees with pending payment, using pending subscriber"
                    );
                }
                pending.subscriber_id.clone()
            }
            None => {
                tracing::warn!(reference = %reference, "Confirming payment with no pending record");
                confirmation.subscriber_id.clone()
            }
        };

        let mut payment = existing.unwrap_or_else(|| {
            PaymentRecord::pending(
                reference.clone(),
                subscriber_id.clone(),
                plan,
                confirmation.amount_kobo.unwrap_or(plan.pricing().amount_kobo),
                now,
            )
        });
        payment.status = PaymentStatus::Success;
        payment.paid_at = Some(now);

        let outcome = match plan.pricing().entitlement_days {
            Some(days) => {
                let mut subscribers = self.subscribers.write().map_err(poisoned)?;
                let record = subscribers
                    .entry(subscriber_id.clone())
                    .or_insert_with(|| SubscriberRecord::new(subscriber_id.clone(), now));
                let expires_at = record.extend_entitlement(days, now);

                tracing::info!(
                    subscriber_id = %subscriber_id,
                    plan = %plan,
                    expires_at = %expires_at,
                    "Granted PRO entitlement"
                );
                ConfirmOutcome::Activated {
                    subscriber_id,
                    plan,
                    expires_at,
                }
            }
            None => {
                tracing::info!(subscriber_id = %subscriber_id, plan = %plan, "Recorded payment");
                ConfirmOutcome::Recorded { subscriber_id, plan }
            }
        };

        payments.insert(reference, payment);
        Ok(outcome)
    }
}
