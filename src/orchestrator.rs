//! Conversation orchestrator
//!
//! Runs one request through transcribe → generate → synthesize, reading and
//! writing the caller's session around it. Every stage fails soft: whatever
//! goes wrong, the caller still receives reply text.

use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::Result;
use crate::config::Config;
use crate::language::Language;
use crate::llm::{Responder, responder_from_config};
use crate::memory::{self, MemoryStore};
use crate::session::{SessionManager, Turn, normalize_user_id};
use crate::voice::{
    AudioClip, SpeechAudio, Synthesizer, Transcriber, synthesizer_from_config,
    transcriber_from_config,
};

/// User turn recorded when a request carried no intelligible speech
///
/// Keeps the stored history paired (user, assistant) when the reply is the
/// "didn't catch that" fallback.
pub const SILENT_USER_TURN: &str = "[no speech detected]";

/// Outcome of a fail-soft collaborator call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Soft<T> {
    /// The collaborator produced a value
    Ok(T),
    /// The collaborator failed; carries a user-facing diagnostic instead
    Degraded(String),
}

impl<T> Soft<T> {
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

impl Soft<String> {
    /// The text to carry forward, whether real output or diagnostic
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Ok(text) | Self::Degraded(text) => text,
        }
    }
}

/// One conversational request
#[derive(Debug, Clone, Default)]
pub struct ConversationRequest {
    /// Recorded speech; `None` or empty means nothing was said
    pub audio: Option<AudioClip>,

    /// Language selection as offered to users (name or code)
    pub language: Option<String>,

    /// Self-asserted user id; blank means guest
    pub user_id: Option<String>,

    /// Whether to remember this exchange
    pub persist: bool,
}

/// Which stages fell back to a substitute result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Degradation {
    pub transcription: bool,
    pub generation: bool,
    pub synthesis: bool,
}

/// Result of one conversational request
#[derive(Debug, Clone)]
pub struct ConversationReply {
    /// Reply text (possibly a fallback or diagnostic)
    pub text: String,

    /// Spoken reply, absent if synthesis failed
    pub audio: Option<SpeechAudio>,

    /// Language the reply was produced in
    pub language: Language,

    /// Normalized user id the request ran as
    pub user_id: String,

    /// What was heard (possibly a diagnostic)
    pub transcript: String,

    /// Which stages degraded
    pub degraded: Degradation,
}

/// Sequences the speech collaborators around a user's session
pub struct Orchestrator {
    transcriber: Arc<dyn Transcriber>,
    responder: Arc<dyn Responder>,
    synthesizer: Arc<dyn Synthesizer>,
    memory: Arc<dyn MemoryStore>,
    sessions: SessionManager,
}

impl Orchestrator {
    /// Create an orchestrator over injected collaborators
    #[must_use]
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        responder: Arc<dyn Responder>,
        synthesizer: Arc<dyn Synthesizer>,
        memory: Arc<dyn MemoryStore>,
        sessions: SessionManager,
    ) -> Self {
        Self {
            transcriber,
            responder,
            synthesizer,
            memory,
            sessions,
        }
    }

    /// Build an orchestrator with the configured HTTP collaborators and store
    ///
    /// # Errors
    ///
    /// Returns error if a provider's API key is missing or the memory store
    /// cannot be opened
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            transcriber_from_config(&config.stt, &config.api_keys)?,
            responder_from_config(&config.llm, &config.api_keys)?,
            synthesizer_from_config(&config.tts, &config.api_keys)?,
            memory::open(&config.memory)?,
            SessionManager::new(config.memory.context_limit),
        ))
    }

    /// The store sessions are read from and written to
    #[must_use]
    pub fn memory(&self) -> &Arc<dyn MemoryStore> {
        &self.memory
    }

    #[must_use]
    pub const fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Run one request to completion
    pub async fn converse(&self, request: ConversationRequest) -> ConversationReply {
        let user_id = normalize_user_id(request.user_id.as_deref());
        let span = tracing::info_span!(
            "converse",
            request_id = %Uuid::new_v4(),
            user_id = %user_id
        );

        self.run(user_id, request).instrument(span).await
    }

    async fn run(&self, user_id: String, request: ConversationRequest) -> ConversationReply {
        let explicit = request.language.as_deref().and_then(Language::from_selection);

        let state = self.memory.load_user(&user_id);
        let language = self.sessions.resolve_language(explicit, &state);
        tracing::debug!(
            language = language.code(),
            explicit = explicit.is_some(),
            stored_turns = state.history.len(),
            "session loaded"
        );

        let heard = self.transcribe(request.audio.as_ref(), language).await;
        let transcription_degraded = heard.is_degraded();
        let transcript = heard.into_text();

        let context = self.sessions.context_window(&state.history);
        let reply = self.generate(&transcript, context, language).await;
        let generation_degraded = reply.is_degraded();
        let text = reply.into_text();

        let audio = self.synthesize(&text, language).await;

        if request.persist {
            let user_turn = if transcript.trim().is_empty() {
                SILENT_USER_TURN
            } else {
                transcript.as_str()
            };
            let state = self
                .sessions
                .commit_turn(state, user_turn, &text, language, true);
            tracing::debug!(stored_turns = state.history.len(), "persisting session");
            self.memory.save_user(&user_id, state);
        }

        let degraded = Degradation {
            transcription: transcription_degraded,
            generation: generation_degraded,
            synthesis: audio.is_none(),
        };
        tracing::info!(
            language = language.code(),
            reply_chars = text.len(),
            has_audio = audio.is_some(),
            ?degraded,
            "conversation turn complete"
        );

        ConversationReply {
            text,
            audio,
            language,
            user_id,
            transcript,
            degraded,
        }
    }

    /// Transcribe the request audio; silence is an empty transcript
    async fn transcribe(&self, audio: Option<&AudioClip>, language: Language) -> Soft<String> {
        let Some(audio) = audio.filter(|a| !a.is_empty()) else {
            tracing::debug!("no audio in request");
            return Soft::Ok(String::new());
        };

        match self.transcriber.transcribe(audio, language).await {
            Ok(text) => Soft::Ok(text.trim().to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "transcription failed");
                Soft::Degraded(language.transcription_error(&e.to_string()))
            }
        }
    }

    /// Generate the reply; empty transcripts get the fixed fallback
    async fn generate(&self, transcript: &str, context: &[Turn], language: Language) -> Soft<String> {
        if transcript.trim().is_empty() {
            tracing::debug!("empty transcript, using fallback reply");
            return Soft::Ok(language.didnt_catch_that().to_string());
        }

        match self
            .responder
            .generate(&language.system_instruction(), context, transcript)
            .await
        {
            Ok(reply) => Soft::Ok(reply),
            Err(e) => {
                tracing::warn!(error = %e, "generation failed");
                Soft::Degraded(language.generation_error(&e.to_string()))
            }
        }
    }

    /// Speak the reply, or nothing if synthesis fails
    async fn synthesize(&self, text: &str, language: Language) -> Option<SpeechAudio> {
        let spoken = if text.trim().is_empty() {
            language.empty_reply_apology()
        } else {
            text
        };

        match self.synthesizer.synthesize(spoken, language).await {
            Ok(audio) if !audio.bytes.is_empty() => Some(audio),
            Ok(_) => {
                tracing::warn!("synthesizer returned no audio");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "synthesis failed");
                None
            }
        }
    }
}
