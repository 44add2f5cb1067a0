//! # creator-bot
//!
//! The chat front end of the pricing service, independent of any chat
//! transport. A host feeds [`Update`]s to [`Bot::handle`] and delivers the
//! returned [`Reply`]s.
//!
//! ```text
//! "50k 12k 0.08" ──▶ platform buttons ──▶ niche buttons ──▶ quote
//!                                                            │
//!                          FREE: lock notice + Unlock PRO ◀──┤
//!                          PRO:  whitelisting + USD      ◀──┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use creator_bot::{Bot, MemoryIntakeStore, MemorySessionStore, Update};
//!
//! let bot = Bot::new(engine, subscribers, Arc::new(MemorySessionStore::new()), Arc::new(MemoryIntakeStore::new()));
//! let replies = bot.handle(&Update::Text { chat_id: "42".into(), text: "50k".into() }, Utc::now())?;
//! ```

pub mod error;
pub mod flow;
pub mod input;
pub mod intake;
pub mod keyboard;
pub mod render;
pub mod session;

pub use error::{BotError, Result};
pub use flow::{Bot, BotAction, Reply, Update};
pub use input::{Command, InputError, parse_engagement, parse_number, parse_stats};
pub use intake::{IntakeDraft, IntakeKind, IntakeRequest, IntakeStep, IntakeStore, MemoryIntakeStore};
pub use keyboard::{Button, Keyboard};
pub use session::{ChatSession, MemorySessionStore, SessionStore, Stage};
