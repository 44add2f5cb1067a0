//! Session Management
//!
//! Per-chat state between messages: collected stats, chosen platform and
//! any intake form in progress. Idle chats hold nothing worth keeping and
//! are dropped from the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use pricing_core::AudienceSignals;

use crate::error::{BotError, Result};
use crate::intake::IntakeDraft;

/// Where the chat is in the flow
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Idle,
    /// Stats received, waiting for a platform button
    AwaitingPlatform { stats: AudienceSignals },
    /// Platform chosen, waiting for a niche button
    AwaitingNiche { stats: AudienceSignals, platform: String },
    /// Filling a form
    Intake { draft: IntakeDraft },
}

/// A chat session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Chat id (also the subscriber id)
    pub chat_id: String,

    pub stage: Stage,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(chat_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            chat_id: chat_id.into(),
            stage: Stage::Idle,
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the activity timestamp
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Drop stats, platform and any form in progress
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.stage = Stage::Idle;
        self.touch(now);
    }

    /// Remember stats and wait for a platform
    pub fn set_stats(&mut self, stats: AudienceSignals, now: DateTime<Utc>) {
        self.stage = Stage::AwaitingPlatform { stats };
        self.touch(now);
    }

    /// Stats collected so far, if the chat is in the pricing flow
    pub const fn stats(&self) -> Option<AudienceSignals> {
        match &self.stage {
            Stage::AwaitingPlatform { stats } | Stage::AwaitingNiche { stats, .. } => Some(*stats),
            Stage::Idle | Stage::Intake { .. } => None,
        }
    }

    pub const fn is_idle(&self) -> bool {
        matches!(self.stage, Stage::Idle)
    }

    pub fn start_intake(&mut self, draft: IntakeDraft, now: DateTime<Utc>) {
        self.stage = Stage::Intake { draft };
        self.touch(now);
    }
}

/// Session store trait for persistence
pub trait SessionStore: Send + Sync {
    /// Save a session
    fn save(&self, session: &ChatSession) -> Result<()>;

    /// Load a session by chat id
    fn load(&self, chat_id: &str) -> Result<Option<ChatSession>>;

    /// Delete a session
    fn delete(&self, chat_id: &str) -> Result<()>;
}

/// In-memory session store (for development/testing)
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, ChatSession>>,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map_or(0, |sessions| sessions.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: PoisonError<T>) -> BotError {
    BotError::Storage("session store lock poisoned".into())
}

impl SessionStore for MemorySessionStore {
    fn save(&self, session: &ChatSession) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.insert(session.chat_id.clone(), session.clone());
        Ok(())
    }

    fn load(&self, chat_id: &str) -> Result<Option<ChatSession>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.get(chat_id).cloned())
    }

    fn delete(&self, chat_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.remove(chat_id);
        Ok(())
    }
}
