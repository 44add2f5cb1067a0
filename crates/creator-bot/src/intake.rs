//! Intake Forms
//!
//! Collects delivery details for the PRO deal pack and ELITE packaging:
//! email, full name, brand (optional), phone (optional).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

use crate::error::{BotError, Result};

/// Which form is being filled
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntakeKind {
    /// PRO brand-deal pack
    Deal,
    /// ELITE done-for-you packaging
    Elite,
}

impl IntakeKind {
    /// First prompt of the form
    pub const fn intro(&self) -> &'static str {
        match self {
            Self::Deal => {
                "📝 *PRO Brand Deal Setup*\n\n\
                 To personalize your PRO Creator Monetization Pack and deliver it by email, \
                 please provide a few details.\n\n\
                 ⏱ Takes less than 1 minute.\n\
                 🔒 Your data is used only for delivery.\n\n\
                 📧 *Enter your email address:*"
            }
            Self::Elite => {
                "📦 *ELITE Deal Packaging, Intake Form*\n\n\
                 We will prepare your brand-ready creator packaging.\n\n\
                 📧 First, enter your *email address:*"
            }
        }
    }

    const fn completed(&self) -> &'static str {
        match self {
            Self::Deal => {
                "✅ *Details Received Successfully*\n\n\
                 📦 Your *PRO Creator Monetization Pack* will be delivered to your email within *24 hours*.\n\n\
                 Thank you for upgrading to PRO."
            }
            Self::Elite => {
                "🎉 *ELITE Request Received!*\n\n\
                 Our team will prepare your deliverables and email you within *24 hours*.\n\n\
                 Deliverables include:\n\
                 ✔ Pricing & Usage Rights\n\
                 ✔ Deal Positioning\n\
                 ✔ Negotiation Language\n\
                 ✔ Brand Pitch Assets"
            }
        }
    }
}

/// Current form field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeStep {
    Email,
    FullName,
    BrandName,
    Phone,
}

/// A form in progress
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeDraft {
    pub kind: IntakeKind,
    pub step: IntakeStep,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub brand_name: Option<String>,
}

/// Result of feeding one message to a draft
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepResult {
    /// Field accepted; ask for the next one
    Next(String),
    /// Field rejected; ask again
    Retry(String),
    /// Form finished
    Complete(IntakeRequest),
}

impl IntakeDraft {
    pub const fn new(kind: IntakeKind) -> Self {
        Self {
            kind,
            step: IntakeStep::Email,
            email: None,
            full_name: None,
            brand_name: None,
        }
    }

    /// Apply one message from the user
    pub fn advance(&mut self, subscriber_id: &str, text: &str, now: DateTime<Utc>) -> StepResult {
        let text = text.trim();

        match self.step {
            IntakeStep::Email => {
                if !looks_like_email(text) {
                    return StepResult::Retry("❌ Please enter a valid email address.".into());
                }
                self.email = Some(text.to_string());
                self.step = IntakeStep::FullName;
                StepResult::Next("👤 Enter your *Full Name:*".into())
            }
            IntakeStep::FullName => {
                if text.is_empty() {
                    return StepResult::Retry("❌ Name cannot be empty.".into());
                }
                self.full_name = Some(text.to_string());
                self.step = IntakeStep::BrandName;
                StepResult::Next("🏢 Enter your *Creator Brand Name* (or type `skip`):".into())
            }
            IntakeStep::BrandName => {
                self.brand_name = optional(text);
                self.step = IntakeStep::Phone;
                StepResult::Next("📞 Enter your *Phone Number* (or type `skip`):".into())
            }
            IntakeStep::Phone => StepResult::Complete(IntakeRequest {
                id: Uuid::new_v4(),
                kind: self.kind,
                subscriber_id: subscriber_id.to_string(),
                email: self.email.clone().unwrap_or_default(),
                full_name: self.full_name.clone().unwrap_or_default(),
                brand_name: self.brand_name.clone(),
                phone: optional(text),
                requested_at: now,
            }),
        }
    }
}

fn optional(text: &str) -> Option<String> {
    (!text.is_empty() && !text.eq_ignore_ascii_case("skip")).then(|| text.to_string())
}

fn looks_like_email(text: &str) -> bool {
    match text.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !text.contains(char::is_whitespace) && domain.contains('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

/// A submitted form
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeRequest {
    pub id: Uuid,
    pub kind: IntakeKind,
    pub subscriber_id: String,
    pub email: String,
    pub full_name: String,
    pub brand_name: Option<String>,
    pub phone: Option<String>,
    pub requested_at: DateTime<Utc>,
}

impl IntakeRequest {
    /// Confirmation shown once the form is stored
    pub const fn confirmation(&self) -> &'static str {
        self.kind.completed()
    }
}

/// Intake persistence
pub trait IntakeStore: Send + Sync {
    fn save(&self, request: &IntakeRequest) -> Result<()>;

    /// Whether this subscriber already submitted a form of this kind
    fn has_submitted(&self, subscriber_id: &str, kind: IntakeKind) -> Result<bool>;
}

/// In-memory intake store (for development/testing)
pub struct MemoryIntakeStore {
    requests: RwLock<HashMap<String, Vec<IntakeRequest>>>,
}

impl Default for MemoryIntakeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIntakeStore {
    pub fn new() -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
        }
    }
}

fn poisoned<T>(_: PoisonError<T>) -> BotError {
    BotError::Storage("intake store lock poisoned".into())
}

impl IntakeStore for MemoryIntakeStore {
    fn save(&self, request: &IntakeRequest) -> Result<()> {
        let mut requests = self.requests.write().map_err(poisoned)?;
        requests
            .entry(request.subscriber_id.clone())
            .or_default()
            .push(request.clone());

        tracing::info!(
            subscriber_id = %request.subscriber_id,
            kind = ?request.kind,
            "Stored intake request"
        );
        Ok(())
    }

    fn has_submitted(&self, subscriber_id: &str, kind: IntakeKind) -> Result<bool> {
        let requests = self.requests.read().map_err(poisoned)?;
        Ok(requests
            .get(subscriber_id)
            .is_some_and(|list| list.iter().any(|r| r.kind == kind)))
    }
}
