//! # creator-payments
//!
//! Paystack payments and PRO entitlement for the creator pricing service.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐  initialize   ┌─────────────────┐  charge.success  ┌──────────────┐
//! │  Chat / API │──────────────▶│ Paystack Hosted │─────────────────▶│   Webhook    │
//! │  (upgrade)  │◀──────────────│  Checkout Page  │    (HMAC-512)    │   Handler    │
//! └─────────────┘  auth URL     └─────────────────┘                  └──────┬───────┘
//!                                                                           │ confirm
//!                                                                    ┌──────▼───────┐
//!                                              gate::is_entitled ◀───│  Subscriber  │
//!                                                                    │    Store     │
//!                                                                    └──────────────┘
//! ```
//!
//! A PRO payment grants 30 days of entitlement, stacking on any unexpired
//! period. Confirmation is idempotent per transaction reference.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use creator_payments::{CheckoutRequest, PaymentGateway, PaystackClient, Plan};
//!
//! let client = PaystackClient::new("sk_test_xxx")?;
//! let session = client
//!     .initialize(&CheckoutRequest::new("123456", Plan::Pro))
//!     .await?;
//!
//! // Send the payer to: session.authorization_url
//! ```

pub mod checkout;
pub mod error;
pub mod gate;
pub mod plan;
pub mod subscriber;
pub mod webhook;

pub use checkout::{CheckoutRequest, CheckoutSession, PaymentGateway, PaystackClient};
pub use error::{PaymentError, Result};
pub use gate::{EntitlementStatus, evaluate, is_entitled, normalize_expiry};
pub use plan::{Plan, PlanPricing};
pub use subscriber::{
    ConfirmOutcome, MemorySubscriberStore, PaymentConfirmation, PaymentRecord, PaymentStatus, SubscriberRecord,
    SubscriberStore,
};
pub use webhook::{SIGNATURE_HEADER, WebhookEvent, WebhookHandler, WebhookOutcome, parse_event, verify_signature};
