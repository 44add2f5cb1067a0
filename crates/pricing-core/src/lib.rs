//! # pricing-core
//!
//! Hybrid brand-deal pricing for social-media creators.
//!
//! The engine turns partial or complete audience signals into an advisory
//! price. It is pure: no I/O, no state beyond the read-only [`RateTables`]
//! it is constructed with.
//!
//! ## Example: Instagram tech creator, 50k followers / 12k views
//!
//! ```text
//! Views value     12 × ₦12,285 CPM × 2.5 (tech)  = ₦368,550
//! Follower floor  5 × ₦100,000 × 1.0             = ₦500,000
//! Base            max(views, floor)              = ₦500,000
//!                 × 2.0 (3-month usage rights)
//! ──────────────────────────────────────────────────────────
//! Recommended     ₦1,000,000   (~$769.23)
//! Minimum         ₦500,000
//! Whitelisting    ₦2,000,000   (PRO only)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pricing_core::{AudienceSignals, PricingEngine};
//!
//! let engine = PricingEngine::default();
//! let signals = AudienceSignals::new(Some(50_000), Some(12_000), Some(0.08));
//! let quote = engine.calculate(&signals, "instagram", "tech", false)?;
//! assert!(quote.whitelist.is_none());
//! ```

pub mod error;
pub mod quote;
pub mod rates;
pub mod request;
pub mod valuation;

pub use error::{PricingError, Result};
pub use quote::{EffectiveMode, Quote, QuoteBasis, RangeQuote, SingleQuote, WhitelistQuote};
pub use rates::{PlatformRates, RateTables, ResolvedNiche, ResolvedPlatform};
pub use request::{AudienceSignals, MAX_AUDIENCE, OutputShape, PricingRequest};
pub use valuation::PricingEngine;
