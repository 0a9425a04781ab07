//! Speech-to-text (STT) processing

use std::sync::Arc;

use async_trait::async_trait;

use super::AudioClip;
use crate::config::{ApiKeys, SttConfig, SttProvider};
use crate::language::Language;
use crate::{Error, Result};

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEEPGRAM_BASE_URL: &str = "https://api.deepgram.com/v1";

/// Converts recorded speech to text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe `audio`, which is expected to be spoken in `language`
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the request or cannot be reached
    async fn transcribe(&self, audio: &AudioClip, language: Language) -> Result<String>;
}

/// Response from an OpenAI-compatible Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Response from Deepgram transcription API
#[derive(serde::Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(serde::Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(serde::Deserialize)]
struct DeepgramAlternative {
    transcript: String,
}

/// Whisper over the `OpenAI` transcription protocol (`OpenAI` or Groq)
pub struct WhisperTranscriber {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl WhisperTranscriber {
    /// Create a Whisper transcriber against `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String, model: String, base_url: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("API key required for Whisper".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio: &AudioClip, language: Language) -> Result<String> {
        tracing::debug!(
            audio_bytes = audio.bytes.len(),
            language = language.code(),
            "starting Whisper transcription"
        );

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.bytes.clone())
                    .file_name(audio.file_name())
                    .mime_str(&audio.mime_type)
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", language.code());

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse response");
            e
        })?;

        let transcript = result.text.trim().to_string();
        tracing::info!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }
}

/// Deepgram pre-recorded transcription
pub struct DeepgramTranscriber {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl DeepgramTranscriber {
    /// Create a Deepgram transcriber
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String, model: String, base_url: Option<String>) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("Deepgram API key required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url
                .unwrap_or_else(|| DEEPGRAM_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

#[async_trait]
impl Transcriber for DeepgramTranscriber {
    async fn transcribe(&self, audio: &AudioClip, language: Language) -> Result<String> {
        tracing::debug!(
            audio_bytes = audio.bytes.len(),
            language = language.code(),
            "starting Deepgram transcription"
        );

        let url = format!(
            "{}/listen?model={}&language={}&punctuate=true",
            self.base_url,
            self.model,
            language.code()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", &audio.mime_type)
            .body(audio.bytes.clone())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Deepgram request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Deepgram API error");
            return Err(Error::Stt(format!("Deepgram API error {status}: {body}")));
        }

        let result: DeepgramResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse Deepgram response");
            e
        })?;

        let transcript = result
            .results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .map(|a| a.transcript.trim().to_string())
            .unwrap_or_default();

        tracing::info!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }
}

/// Build the configured transcriber
///
/// # Errors
///
/// Returns error if the provider's API key is not configured
pub fn transcriber_from_config(config: &SttConfig, keys: &ApiKeys) -> Result<Arc<dyn Transcriber>> {
    let transcriber: Arc<dyn Transcriber> = match config.provider {
        SttProvider::Groq => Arc::new(WhisperTranscriber::new(
            keys.groq.clone().unwrap_or_default(),
            config.model.clone(),
            config.base_url.clone().unwrap_or_else(|| GROQ_BASE_URL.to_string()),
        )?),
        SttProvider::OpenAi => Arc::new(WhisperTranscriber::new(
            keys.openai.clone().unwrap_or_default(),
            config.model.clone(),
            config.base_url.clone().unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
        )?),
        SttProvider::Deepgram => Arc::new(DeepgramTranscriber::new(
            keys.deepgram.clone().unwrap_or_default(),
            config.model.clone(),
            config.base_url.clone(),
        )?),
    };

    tracing::info!(provider = ?config.provider, model = %config.model, "STT configured");
    Ok(transcriber)
}
