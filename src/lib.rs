//! Parley Gateway - Multilingual voice conversation with session memory
//!
//! This library provides the core of the parley voice pipeline:
//! - Per-user session memory (JSON file or `SQLite`)
//! - Session management (language resolution, context windows, bounded history)
//! - Conversation orchestration over pluggable STT, LLM and TTS collaborators
//! - An HTTP API exposing one conversational turn per request
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Interfaces                       │
//! │          HTTP API (axum)   │   CLI (clap)           │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Orchestrator                       │
//! │  Transcriber → Responder → Synthesizer  (fail-soft) │
//! └──────────┬─────────────────────────────┬────────────┘
//!            │                             │
//! ┌──────────▼──────────┐       ┌──────────▼────────────┐
//! │   Session Manager   │       │     Memory Store      │
//! │ language · context  │       │   JSON file · SQLite  │
//! └─────────────────────┘       └───────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod language;
pub mod llm;
pub mod memory;
pub mod orchestrator;
pub mod session;
pub mod voice;

pub use config::Config;
pub use db::{DbConn, DbPool};
pub use error::{Error, Result};
pub use language::Language;
pub use llm::{ChatResponder, Responder};
pub use memory::{JsonFileStore, MemoryStore, SqliteStore};
pub use orchestrator::{
    ConversationReply, ConversationRequest, Degradation, Orchestrator, Soft,
};
pub use session::{Role, SessionManager, SessionState, SessionStore, Turn};
pub use voice::{AudioClip, SpeechAudio, Synthesizer, Transcriber};
