//! Session context: which kind of session a save file belongs to.

use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// Connection options for a networked multiworld session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Server address as `host:port`.
    pub uri: String,
    /// Slot name this player occupies in the session.
    pub slot_name: String,
    /// Optional room password.
    pub password: Option<String>,
    /// Whether deaths are shared with the rest of the session.
    pub death_link: bool,
}

impl SessionOptions {
    pub fn new(uri: impl Into<String>, slot_name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            slot_name: slot_name.into(),
            password: None,
            death_link: false,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_death_link(mut self, death_link: bool) -> Self {
        self.death_link = death_link;
        self
    }
}

/// Tag for the two session kinds, used in status queries and log fields.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SessionKind {
    Offline,
    Networked,
}

/// Which kind of session a save file is bound to.
///
/// A save file is created either for local play or for one specific multiworld
/// session, and keeps that binding for its whole life.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionContext {
    /// Local play without a session server.
    Offline,
    /// Play inside a remote multiworld session.
    Networked(SessionOptions),
}

impl SessionContext {
    pub fn kind(&self) -> SessionKind {
        match self {
            Self::Offline => SessionKind::Offline,
            Self::Networked(_) => SessionKind::Networked,
        }
    }

    pub fn is_networked(&self) -> bool {
        matches!(self, Self::Networked(_))
    }
}

/// Decides which session context a newly created save file runs under.
///
/// Asked exactly once per save-file load, by the component that owns engine
/// lifecycle. Saves that already carry a context keep it; the provider only
/// answers for saves that do not.
pub trait ContextProvider: Send + Sync {
    fn current_context(&self) -> SessionContext;
}

/// Provider backed by a value chosen up front (config file, launcher UI, tests).
pub struct FixedContextProvider {
    context: RwLock<SessionContext>,
}

impl FixedContextProvider {
    pub fn new(context: SessionContext) -> Self {
        Self {
            context: RwLock::new(context),
        }
    }

    pub fn offline() -> Self {
        Self::new(SessionContext::Offline)
    }

    /// Replaces the announced context for the next load.
    pub fn set(&self, context: SessionContext) {
        *self.context.write().unwrap_or_else(PoisonError::into_inner) = context;
    }
}

impl ContextProvider for FixedContextProvider {
    fn current_context(&self) -> SessionContext {
        self.context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

// ============================================================================
// Tests
// ============================================================================
