//! Conversation Flow
//!
//! Routes one chat update at a time: stats text, platform and niche
//! buttons, upgrade callbacks and intake forms. The host delivers replies
//! and fulfils any [`BotAction`] they carry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use creator_payments::{Plan, SubscriberStore, gate};
use pricing_core::{PricingEngine, PricingError};

use crate::error::Result;
use crate::input::{self, Command};
use crate::intake::{IntakeDraft, IntakeKind, IntakeStore, StepResult};
use crate::keyboard::{self, Keyboard};
use crate::render;
use crate::session::{ChatSession, SessionStore, Stage};

const DEAL_IN_PROGRESS: &str = "📦 *PRO Pack In Progress*\n\n\
Your details have already been received.\n\
Your PRO Creator Monetization Pack will be delivered to your email within *24 hours*.";

/// An incoming chat event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Update {
    Command { chat_id: String, command: String },
    Text { chat_id: String, text: String },
    Callback { chat_id: String, data: String },
}

impl Update {
    pub fn chat_id(&self) -> &str {
        match self {
            Self::Command { chat_id, .. } | Self::Text { chat_id, .. } | Self::Callback { chat_id, .. } => chat_id,
        }
    }
}

/// Side effect the host performs after sending a reply
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BotAction {
    /// Open a hosted checkout for the chat's user
    Checkout { plan: Plan },
}

/// An outgoing message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Keyboard,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<BotAction>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
            action: None,
        }
    }

    #[must_use]
    pub fn with_buttons(mut self, buttons: Keyboard) -> Self {
        self.buttons = buttons;
        self
    }

    #[must_use]
    pub const fn with_action(mut self, action: BotAction) -> Self {
        self.action = Some(action);
        self
    }
}

/// The chat bot
pub struct Bot {
    engine: Arc<PricingEngine>,
    subscribers: Arc<dyn SubscriberStore>,
    sessions: Arc<dyn SessionStore>,
    intakes: Arc<dyn IntakeStore>,
}

impl Bot {
    pub fn new(
        engine: Arc<PricingEngine>,
        subscribers: Arc<dyn SubscriberStore>,
        sessions: Arc<dyn SessionStore>,
        intakes: Arc<dyn IntakeStore>,
    ) -> Self {
        Self {
            engine,
            subscribers,
            sessions,
            intakes,
        }
    }

    /// Handle one update and persist the session
    pub fn handle(&self, update: &Update, now: DateTime<Utc>) -> Result<Vec<Reply>> {
        let chat_id = update.chat_id();
        let mut session = self
            .sessions
            .load(chat_id)?
            .unwrap_or_else(|| ChatSession::new(chat_id, now));

        tracing::debug!(chat_id = %chat_id, stage = ?session.stage, "Handling chat update");

        let replies = match update {
            Update::Command { command, .. } => self.on_command(&Command::parse(command), &mut session, now)?,
            Update::Text { text, .. } => self.on_text(text, &mut session, now)?,
            Update::Callback { data, .. } => self.on_callback(data, &mut session, now)?,
        };

        if session.is_idle() {
            self.sessions.delete(chat_id)?;
        } else {
            self.sessions.save(&session)?;
        }
        Ok(replies)
    }

    fn is_pro(&self, chat_id: &str, now: DateTime<Utc>) -> Result<bool> {
        let record = self.subscribers.get(chat_id)?;
        Ok(gate::is_entitled(record.as_ref(), now))
    }

    fn on_command(&self, command: &Command, session: &mut ChatSession, now: DateTime<Utc>) -> Result<Vec<Reply>> {
        let reply = match command {
            Command::Start => {
                session.reset(now);
                Reply::text(render::WELCOME)
            }
            Command::Status => {
                let record = self.subscribers.get(&session.chat_id)?;
                let status = gate::evaluate(record.as_ref(), now);
                Reply::text(render::status(&status, record.as_ref()))
            }
            Command::Upgrade => tiers(),
            Command::Deal => return self.deal_entry(session, now),
            Command::Cancel => {
                session.reset(now);
                Reply::text(render::CANCELLED)
            }
            Command::Unknown(name) => {
                tracing::debug!(command = %name, "Unknown command");
                Reply::text(render::UNKNOWN_COMMAND)
            }
        };
        Ok(vec![reply])
    }

    fn on_text(&self, text: &str, session: &mut ChatSession, now: DateTime<Utc>) -> Result<Vec<Reply>> {
        if let Stage::Intake { draft } = &mut session.stage {
            return match draft.advance(&session.chat_id, text, now) {
                StepResult::Next(prompt) | StepResult::Retry(prompt) => {
                    session.touch(now);
                    Ok(vec![Reply::text(prompt)])
                }
                StepResult::Complete(request) => {
                    self.intakes.save(&request)?;
                    session.reset(now);

                    let mut reply = Reply::text(request.confirmation());
                    if request.kind == IntakeKind::Elite {
                        reply = reply.with_action(BotAction::Checkout { plan: Plan::Elite });
                    }
                    Ok(vec![reply])
                }
            };
        }

        if input::is_upgrade_keyword(text) {
            return Ok(vec![tiers()]);
        }

        match input::parse_stats(text) {
            Ok(stats) => {
                session.set_stats(stats, now);
                Ok(vec![
                    Reply::text(render::ASK_PLATFORM).with_buttons(keyboard::platform_keyboard()),
                ])
            }
            Err(err) => {
                tracing::debug!(chat_id = %session.chat_id, error = %err, "Unparsable stats");
                Ok(vec![Reply::text(render::INVALID_FORMAT)])
            }
        }
    }

    fn on_callback(&self, data: &str, session: &mut ChatSession, now: DateTime<Utc>) -> Result<Vec<Reply>> {
        if let Some(platform) = data.strip_prefix(keyboard::PLATFORM_PREFIX) {
            return Ok(select_platform(platform, session, now));
        }
        if let Some(niche) = data.strip_prefix(keyboard::NICHE_PREFIX) {
            return self.select_niche(niche, session, now);
        }

        let reply = match data {
            keyboard::UPGRADE_PRO => {
                if self.is_pro(&session.chat_id, now)? {
                    Reply::text(render::ALREADY_PRO)
                } else {
                    Reply::text(render::CHECKOUT_PENDING).with_action(BotAction::Checkout { plan: Plan::Pro })
                }
            }
            keyboard::ELITE_PACKAGE => {
                session.start_intake(IntakeDraft::new(IntakeKind::Elite), now);
                Reply::text(IntakeKind::Elite.intro())
            }
            keyboard::DEAL_PACKAGING => return self.deal_entry(session, now),
            keyboard::EXPORT_RATECARD => Reply::text(render::EXPORT_SOON),
            other => {
                tracing::warn!(chat_id = %session.chat_id, data = %other, "Unknown callback");
                Reply::text(render::UNKNOWN_ACTION)
            }
        };
        Ok(vec![reply])
    }

    fn select_niche(&self, button: &str, session: &mut ChatSession, now: DateTime<Utc>) -> Result<Vec<Reply>> {
        let (stats, platform) = match &session.stage {
            Stage::AwaitingNiche { stats, platform } => (*stats, platform.clone()),
            Stage::AwaitingPlatform { .. } => {
                return Ok(vec![
                    Reply::text(render::ASK_PLATFORM).with_buttons(keyboard::platform_keyboard()),
                ]);
            }
            Stage::Idle | Stage::Intake { .. } => return Ok(vec![Reply::text(render::STATS_FIRST)]),
        };

        let niche = keyboard::niche_for_button(button);
        let is_pro = self.is_pro(&session.chat_id, now)?;

        let reply = match self.engine.calculate(&stats, &platform, niche, is_pro) {
            Ok(quote) => {
                tracing::info!(
                    chat_id = %session.chat_id,
                    platform = %quote.basis.platform,
                    niche = %quote.basis.niche,
                    mode = %quote.basis.mode,
                    recommended = quote.recommended_amount,
                    is_pro,
                    "Quoted creator"
                );
                Reply::text(render::quote(&quote)).with_buttons(keyboard::quote_keyboard(is_pro))
            }
            Err(PricingError::InsufficientData) => Reply::text(render::missing_metric()),
            Err(err) if err.is_caller_error() => Reply::text(err.user_message()),
            Err(err) => return Err(err.into()),
        };

        session.reset(now);
        Ok(vec![
            Reply::text(format!("🎯 Niche selected: *{}*", keyboard::title_case(niche))),
            reply,
        ])
    }

    fn deal_entry(&self, session: &mut ChatSession, now: DateTime<Utc>) -> Result<Vec<Reply>> {
        if !self.is_pro(&session.chat_id, now)? {
            return Ok(vec![
                Reply::text(render::PRO_LOCKED).with_buttons(keyboard::tiers_keyboard()),
            ]);
        }

        if self.intakes.has_submitted(&session.chat_id, IntakeKind::Deal)? {
            return Ok(vec![Reply::text(DEAL_IN_PROGRESS)]);
        }

        session.start_intake(IntakeDraft::new(IntakeKind::Deal), now);
        Ok(vec![Reply::text(IntakeKind::Deal.intro())])
    }
}

fn tiers() -> Reply {
    Reply::text(render::TIERS).with_buttons(keyboard::tiers_keyboard())
}

/// A platform button may also re-pick the platform while the niche is pending
fn select_platform(platform: &str, session: &mut ChatSession, now: DateTime<Utc>) -> Vec<Reply> {
    let Some(stats) = session.stats() else {
        return vec![Reply::text(render::STATS_FIRST)];
    };

    let platform = platform.trim().to_lowercase();
    let selected = format!("🎯 Platform selected: *{}*", keyboard::title_case(&platform));
    session.stage = Stage::AwaitingNiche { stats, platform };
    session.touch(now);

    vec![
        Reply::text(selected),
        Reply::text(render::ASK_NICHE).with_buttons(keyboard::niche_keyboard()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::MemoryIntakeStore;
    use crate::session::MemorySessionStore;
    use creator_payments::{MemorySubscriberStore, PaymentConfirmation};

    struct Harness {
        bot: Bot,
        subscribers: Arc<MemorySubscriberStore>,
        sessions: Arc<MemorySessionStore>,
        intakes: Arc<MemoryIntakeStore>,
    }

    fn harness() -> Harness {
        let subscribers = Arc::new(MemorySubscriberStore::new());
        let sessions = Arc::new(MemorySessionStore::new());
        let intakes = Arc::new(MemoryIntakeStore::new());
        let bot = Bot::new(
            Arc::new(PricingEngine::default()),
            subscribers.clone(),
            sessions.clone(),
            intakes.clone(),
        );
        Harness {
            bot,
            subscribers,
            sessions,
            intakes,
        }
    }

    impl Harness {
        fn send(&self, update: Update) -> Vec<Reply> {
            self.bot.handle(&update, Utc::now()).unwrap()
        }

        fn text(&self, text: &str) -> Vec<Reply> {
            self.send(Update::Text {
                chat_id: "42".into(),
                text: text.into(),
            })
        }

        fn tap(&self, data: &str) -> Vec<Reply> {
            self.send(Update::Callback {
                chat_id: "42".into(),
                data: data.into(),
            })
        }

        fn command(&self, command: &str) -> Vec<Reply> {
            self.send(Update::Command {
                chat_id: "42".into(),
                command: command.into(),
            })
        }

        fn make_pro(&self) {
            self.subscribers
                .confirm_payment(
                    &PaymentConfirmation {
                        reference: "ref-pro".into(),
                        subscriber_id: "42".into(),
                        plan: Some(Plan::Pro),
                        amount_kobo: Some(1_000_000),
                    },
                    Utc::now(),
                )
                .unwrap();
        }
    }

    #[test]
    fn test_free_quote_flow() {
        let h = harness();

        let replies = h.text("50k 12k 0.08");
        assert_eq!(replies[0].text, render::ASK_PLATFORM);
        assert_eq!(replies[0].buttons.concat().len(), 6);

        let replies = h.tap("platform_instagram");
        assert!(replies[0].text.contains("Instagram"));
        assert_eq!(replies[1].buttons.concat().len(), 8);

        let replies = h.tap("niche_tech");
        let quote = &replies[1];
        assert!(quote.text.contains("₦1,000,000"));
        assert!(quote.text.contains("Locked (PRO only)"));
        assert_eq!(quote.buttons[0][0].callback_data.as_deref(), Some(keyboard::UPGRADE_PRO));
    }

    #[test]
    fn test_pro_quote_shows_whitelisting() {
        let h = harness();
        h.make_pro();

        h.text("50k 12k 0.08");
        h.tap("platform_instagram");
        let replies = h.tap("niche_tech");

        assert!(replies[1].text.contains("₦2,000,000"));
        assert!(replies[1].text.contains("$769.23"));
    }

    #[test]
    fn test_niche_before_stats() {
        let h = harness();
        assert_eq!(h.tap("niche_tech")[0].text, render::STATS_FIRST);
        assert_eq!(h.tap("platform_tiktok")[0].text, render::STATS_FIRST);
    }

    #[test]
    fn test_niche_before_platform_asks_for_platform() {
        let h = harness();
        h.text("50k");
        let replies = h.tap("niche_tech");
        assert_eq!(replies[0].text, render::ASK_PLATFORM);
        assert_eq!(replies[0].buttons.concat().len(), 6);
    }

    #[test]
    fn test_platform_can_be_changed_before_niche() {
        let h = harness();
        h.text("50k");
        h.tap("platform_instagram");
        h.tap("platform_tiktok");

        let stored = h.sessions.load("42").unwrap().unwrap();
        assert!(matches!(&stored.stage, Stage::AwaitingNiche { platform, .. } if platform == "tiktok"));

        // 5 × 100,000 × 0.8 × 2.0 on tiktok
        let replies = h.tap("niche_other");
        assert!(replies[1].text.contains("₦800,000"));
    }

    #[test]
    fn test_idle_sessions_are_not_kept() {
        let h = harness();
        h.command("/status");
        assert!(h.sessions.is_empty());

        h.text("50k 12k 0.08");
        assert_eq!(h.sessions.len(), 1);
        h.tap("platform_instagram");
        h.tap("niche_tech");
        assert!(h.sessions.is_empty());
    }

    #[test]
    fn test_zero_followers_asks_for_metric() {
        let h = harness();
        h.text("0");
        h.tap("platform_tiktok");
        let replies = h.tap("niche_other");
        assert!(replies[1].text.contains("follower count or your average views"));
    }

    #[test]
    fn test_invalid_stats() {
        let h = harness();
        assert_eq!(h.text("hello there friend, hi")[0].text, render::INVALID_FORMAT);
        assert_eq!(h.text("12000 300")[0].text, render::INVALID_FORMAT);
    }

    #[test]
    fn test_upgrade_keyword_and_checkout() {
        let h = harness();

        let replies = h.text("Unlock PRO");
        assert_eq!(replies[0].buttons.len(), 2);

        let replies = h.tap(keyboard::UPGRADE_PRO);
        assert_eq!(replies[0].action, Some(BotAction::Checkout { plan: Plan::Pro }));

        h.make_pro();
        let replies = h.tap(keyboard::UPGRADE_PRO);
        assert_eq!(replies[0].text, render::ALREADY_PRO);
        assert!(replies[0].action.is_none());
    }

    #[test]
    fn test_deal_is_pro_gated_and_submitted_once() {
        let h = harness();
        assert_eq!(h.command("/deal")[0].text, render::PRO_LOCKED);

        h.make_pro();
        assert_eq!(h.command("/deal")[0].text, IntakeKind::Deal.intro());
        h.text("ada@example.com");
        h.text("Ada Obi");
        h.text("skip");
        let done = h.text("skip");
        assert!(done[0].text.contains("Details Received"));
        assert!(h.intakes.has_submitted("42", IntakeKind::Deal).unwrap());

        assert_eq!(h.tap(keyboard::DEAL_PACKAGING)[0].text, DEAL_IN_PROGRESS);
    }

    #[test]
    fn test_elite_intake_ends_in_checkout() {
        let h = harness();
        h.tap(keyboard::ELITE_PACKAGE);

        // intake takes priority over keyword and stats parsing
        let replies = h.text("pro");
        assert!(replies[0].text.contains("valid email"));

        h.text("ada@example.com");
        h.text("Ada Obi");
        h.text("AdaCreates");
        let done = h.text("+2348000000000");
        assert_eq!(done[0].action, Some(BotAction::Checkout { plan: Plan::Elite }));
        assert!(h.intakes.has_submitted("42", IntakeKind::Elite).unwrap());
    }

    #[test]
    fn test_cancel_clears_intake() {
        let h = harness();
        h.tap(keyboard::ELITE_PACKAGE);
        assert_eq!(h.command("/cancel")[0].text, render::CANCELLED);
        assert_eq!(h.text("50k")[0].text, render::ASK_PLATFORM);
    }

    #[test]
    fn test_status_and_misc() {
        let h = harness();
        assert!(h.command("/status")[0].text.contains("FREE"));
        h.make_pro();
        assert!(h.command("/status@CreatorBot")[0].text.contains("PRO"));

        assert_eq!(h.tap(keyboard::EXPORT_RATECARD)[0].text, render::EXPORT_SOON);
        assert_eq!(h.tap("mystery")[0].text, render::UNKNOWN_ACTION);
        assert_eq!(h.command("/start")[0].text, render::WELCOME);
        assert_eq!(h.command("/dance")[0].text, render::UNKNOWN_COMMAND);
    }
}
