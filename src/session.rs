//! Per-user session state and the pure transitions around one request
//!
//! Nothing here performs I/O. The orchestrator loads a [`SessionState`] from
//! a [`crate::memory::MemoryStore`], runs it through [`SessionManager`], and
//! hands the result back to the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::language::Language;

/// User id assigned to requests that do not identify themselves
pub const GUEST_USER_ID: &str = "guest";

/// Default number of turns sent to the responder as context
pub const DEFAULT_CONTEXT_LIMIT: usize = 12;

/// Stored history may hold this many context windows before trimming
pub const HISTORY_CAP_FACTOR: usize = 4;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Wire name of the role
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single utterance in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    /// Create a turn
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user turn
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant turn
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A user's remembered language preference and conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Language code used for this user's most recent persisted request
    #[serde(default = "default_language_code")]
    pub preferred_language: String,

    /// Chronological, append-only turn history
    #[serde(default)]
    pub history: Vec<Turn>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            preferred_language: default_language_code(),
            history: Vec::new(),
        }
    }
}

impl SessionState {
    /// The stored preference, if it names a supported language
    #[must_use]
    pub fn stored_language(&self) -> Option<Language> {
        Language::from_code(&self.preferred_language)
    }
}

fn default_language_code() -> String {
    Language::default().code().to_string()
}

/// Every known user's session state, keyed by user id
pub type SessionStore = BTreeMap<String, SessionState>;

/// Trim a raw user id, substituting [`GUEST_USER_ID`] when blank
#[must_use]
pub fn normalize_user_id(user_id: Option<&str>) -> String {
    match user_id.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => GUEST_USER_ID.to_string(),
    }
}

/// Pick the language for a request
///
/// An explicit supported choice wins, then the stored preference, then the
/// default. Unsupported selections must already be mapped to `None`.
#[must_use]
pub fn resolve_language(explicit: Option<Language>, stored: Option<Language>) -> Language {
    explicit.or(stored).unwrap_or_default()
}

/// The most recent `limit` turns of `history`
#[must_use]
pub fn prepare_context(history: &[Turn], limit: usize) -> &[Turn] {
    let start = history.len().saturating_sub(limit);
    &history[start..]
}

/// Drop the oldest turns until `history` fits in `cap`
pub fn trim_history(history: &mut Vec<Turn>, cap: usize) {
    if history.len() > cap {
        let excess = history.len() - cap;
        history.drain(..excess);
    }
}

/// Applies the configured context bounds to session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionManager {
    context_limit: usize,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_LIMIT)
    }
}

impl SessionManager {
    /// Create a manager sending at most `context_limit` turns of context
    ///
    /// A limit of zero is raised to one so the history cap stays positive.
    #[must_use]
    pub fn new(context_limit: usize) -> Self {
        Self {
            context_limit: context_limit.max(1),
        }
    }

    #[must_use]
    pub const fn context_limit(&self) -> usize {
        self.context_limit
    }

    /// Maximum number of turns kept in stored history
    #[must_use]
    pub const fn history_cap(&self) -> usize {
        self.context_limit.saturating_mul(HISTORY_CAP_FACTOR)
    }

    /// Resolve the effective language for a request against stored state
    #[must_use]
    pub fn resolve_language(&self, explicit: Option<Language>, state: &SessionState) -> Language {
        resolve_language(explicit, state.stored_language())
    }

    /// The context window for the responder
    #[must_use]
    pub fn context_window<'a>(&self, history: &'a [Turn]) -> &'a [Turn] {
        prepare_context(history, self.context_limit)
    }

    /// Record a finished exchange
    ///
    /// With `persist` unset the state comes back untouched. Otherwise the
    /// non-empty texts are appended (user first), the preference follows
    /// `language`, and the history is trimmed to [`Self::history_cap`].
    #[must_use]
    pub fn commit_turn(
        &self,
        mut state: SessionState,
        user_text: &str,
        assistant_text: &str,
        language: Language,
        persist: bool,
    ) -> SessionState {
        if !persist {
            return state;
        }

        if !user_text.trim().is_empty() {
            state.history.push(Turn::user(user_text));
        }
        if !assistant_text.trim().is_empty() {
            state.history.push(Turn::assistant(assistant_text));
        }
        state.preferred_language = language.code().to_string();
        trim_history(&mut state.history, self.history_cap());

        state
    }
}
