//! Configuration management for the Parley gateway
//!
//! Every setting resolves as env > TOML file > default.

pub mod file;

use std::path::{Path, PathBuf};

use crate::session::DEFAULT_CONTEXT_LIMIT;

use file::ParleyConfigFile;

/// Default API server port
pub const DEFAULT_PORT: u16 = 18790;

/// Default upload limit for request audio (25 MiB)
pub const DEFAULT_MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// Parley gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to data directory (memory file/database)
    pub data_dir: PathBuf,

    /// HTTP API server configuration
    pub server: ServerConfig,

    /// Session memory configuration
    pub memory: MemoryConfig,

    /// Speech-to-text configuration
    pub stt: SttConfig,

    /// Text generation configuration
    pub llm: LlmConfig,

    /// Text-to-speech configuration
    pub tts: TtsConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Largest accepted audio upload, in bytes
    pub max_audio_bytes: usize,
}

/// Which memory backend persists sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryBackend {
    /// One JSON document holding every user
    #[default]
    Json,
    /// One `SQLite` row per user
    Sqlite,
}

impl MemoryBackend {
    /// Parse a backend name, defaulting to JSON
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "db" => Self::Sqlite,
            _ => Self::Json,
        }
    }

    /// Default file name inside the data directory
    #[must_use]
    pub const fn default_file_name(self) -> &'static str {
        match self {
            Self::Json => "sessions.json",
            Self::Sqlite => "sessions.db",
        }
    }
}

/// Session memory configuration
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Storage backend
    pub backend: MemoryBackend,

    /// Path of the JSON file or `SQLite` database
    pub path: PathBuf,

    /// Turns of history sent to the LLM (stored history keeps 4x this)
    pub context_limit: usize,
}

/// STT provider backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SttProvider {
    /// Whisper via Groq's OpenAI-compatible API
    #[default]
    Groq,
    /// Whisper via `OpenAI`
    OpenAi,
    /// Deepgram
    Deepgram,
}

impl SttProvider {
    /// Parse a provider name, defaulting to Groq
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "openai" | "whisper" => Self::OpenAi,
            "deepgram" => Self::Deepgram,
            _ => Self::Groq,
        }
    }

    const fn default_model(self) -> &'static str {
        match self {
            Self::Groq => "whisper-large-v3",
            Self::OpenAi => "whisper-1",
            Self::Deepgram => "nova-2",
        }
    }
}

/// Speech-to-text configuration
#[derive(Debug, Clone)]
pub struct SttConfig {
    pub provider: SttProvider,

    /// Model identifier
    pub model: String,

    /// Override for the provider's API base URL
    pub base_url: Option<String>,
}

/// LLM provider backend (both speak the `OpenAI` chat completions protocol)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    #[default]
    Groq,
    OpenAi,
}

impl LlmProvider {
    /// Parse a provider name, defaulting to Groq
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "openai" => Self::OpenAi,
            _ => Self::Groq,
        }
    }

    const fn default_model(self) -> &'static str {
        match self {
            Self::Groq => "llama-3.1-8b-instant",
            Self::OpenAi => "gpt-4o-mini",
        }
    }
}

/// Text generation configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,

    /// Model identifier
    pub model: String,

    /// Override for the provider's API base URL
    pub base_url: Option<String>,

    /// Sampling temperature
    pub temperature: f32,
}

/// TTS provider backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtsProvider {
    #[default]
    OpenAi,
    ElevenLabs,
}

impl TtsProvider {
    /// Parse a provider name, defaulting to `OpenAI`
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "elevenlabs" | "eleven_labs" => Self::ElevenLabs,
            _ => Self::OpenAi,
        }
    }

    const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "tts-1",
            Self::ElevenLabs => "eleven_multilingual_v2",
        }
    }

    const fn default_voice(self) -> &'static str {
        match self {
            Self::OpenAi => "alloy",
            // ElevenLabs "Rachel"
            Self::ElevenLabs => "21m00Tcm4TlvDq8ikWAM",
        }
    }
}

/// Text-to-speech configuration
#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub provider: TtsProvider,

    /// Model identifier
    pub model: String,

    /// Voice identifier
    pub voice: String,

    /// Speed multiplier (0.25 to 4.0, `OpenAI` only)
    pub speed: f32,

    /// Override for the provider's API base URL
    pub base_url: Option<String>,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// Groq API key (Whisper STT and chat completions)
    pub groq: Option<String>,

    /// `OpenAI` API key (Whisper, chat completions, TTS)
    pub openai: Option<String>,

    /// Deepgram API key (optional STT)
    pub deepgram: Option<String>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<String>,
}

fn parse_env<T, F>(env: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    env(key).and_then(|s| s.trim().parse().ok())
}

/// Default data directory: `~/.local/share/parley` on Linux
#[must_use]
pub fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map_or_else(|| PathBuf::from(".parley"), |d| d.data_dir().join("parley"))
}

impl Config {
    /// Load configuration from the environment and the standard config file
    #[must_use]
    pub fn load() -> Self {
        Self::from_sources(file::load_config_file(), |key| std::env::var(key).ok())
    }

    /// Load configuration using an explicit config file instead of the standard one
    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        Self::from_sources(file::load_config_from(path), |key| std::env::var(key).ok())
    }

    /// Resolve configuration from a parsed file and an env lookup
    #[must_use]
    pub fn from_sources<F>(fc: ParleyConfigFile, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // API keys (env > toml > None)
        let api_keys = ApiKeys {
            groq: env("GROQ_API_KEY").or(fc.api_keys.groq),
            openai: env("OPENAI_API_KEY").or(fc.api_keys.openai),
            deepgram: env("DEEPGRAM_API_KEY").or(fc.api_keys.deepgram),
            elevenlabs: env("ELEVENLABS_API_KEY").or(fc.api_keys.elevenlabs),
        };

        let server = ServerConfig {
            port: parse_env(&env, "PARLEY_PORT")
                .or_else(|| parse_env(&env, "PORT"))
                .or(fc.server.port)
                .unwrap_or(DEFAULT_PORT),
            max_audio_bytes: parse_env(&env, "PARLEY_MAX_AUDIO_BYTES")
                .or(fc.server.max_audio_bytes)
                .unwrap_or(DEFAULT_MAX_AUDIO_BYTES),
        };

        let data_dir = env("PARLEY_DATA_DIR").map_or_else(default_data_dir, PathBuf::from);

        // Memory (env > toml > default)
        let backend = env("PARLEY_MEMORY_BACKEND")
            .or(fc.memory.backend)
            .map(|s| MemoryBackend::parse(&s))
            .unwrap_or_default();
        let memory = MemoryConfig {
            backend,
            path: env("PARLEY_MEMORY_PATH")
                .or(fc.memory.path)
                .map_or_else(|| data_dir.join(backend.default_file_name()), PathBuf::from),
            context_limit: parse_env(&env, "PARLEY_CONTEXT_LIMIT")
                .or(fc.memory.context_limit)
                .unwrap_or(DEFAULT_CONTEXT_LIMIT),
        };

        let stt_provider = env("PARLEY_STT_PROVIDER")
            .or(fc.stt.provider)
            .map(|s| SttProvider::parse(&s))
            .unwrap_or_default();
        let stt = SttConfig {
            provider: stt_provider,
            model: env("PARLEY_STT_MODEL")
                .or(fc.stt.model)
                .unwrap_or_else(|| stt_provider.default_model().to_string()),
            base_url: env("PARLEY_STT_BASE_URL").or(fc.stt.base_url),
        };

        let llm_provider = env("PARLEY_LLM_PROVIDER")
            .or(fc.llm.provider)
            .map(|s| LlmProvider::parse(&s))
            .unwrap_or_default();
        let llm = LlmConfig {
            provider: llm_provider,
            model: env("PARLEY_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or_else(|| llm_provider.default_model().to_string()),
            base_url: env("PARLEY_LLM_BASE_URL").or(fc.llm.base_url),
            temperature: parse_env(&env, "PARLEY_LLM_TEMPERATURE")
                .or(fc.llm.temperature)
                .unwrap_or(0.3),
        };

        let tts_provider = env("PARLEY_TTS_PROVIDER")
            .or(fc.tts.provider)
            .map(|s| TtsProvider::parse(&s))
            .unwrap_or_default();
        let tts = TtsConfig {
            provider: tts_provider,
            model: env("PARLEY_TTS_MODEL")
                .or(fc.tts.model)
                .unwrap_or_else(|| tts_provider.default_model().to_string()),
            voice: env("PARLEY_TTS_VOICE")
                .or(fc.tts.voice)
                .unwrap_or_else(|| tts_provider.default_voice().to_string()),
            speed: parse_env(&env, "PARLEY_TTS_SPEED")
                .or(fc.tts.speed)
                .unwrap_or(1.0),
            base_url: env("PARLEY_TTS_BASE_URL").or(fc.tts.base_url),
        };

        Self {
            data_dir,
            server,
            memory,
            stt,
            llm,
            tts,
            api_keys,
        }
    }
}
