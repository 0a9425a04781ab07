//! Text-to-speech (TTS) processing

use std::sync::Arc;

use async_trait::async_trait;

use super::SpeechAudio;
use crate::config::{ApiKeys, TtsConfig, TtsProvider};
use crate::language::Language;
use crate::{Error, Result};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io/v1";

/// Converts reply text to speech
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Speak `text` in `language`
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    async fn synthesize(&self, text: &str, language: Language) -> Result<SpeechAudio>;
}

/// `OpenAI` speech synthesis
///
/// The voices are multilingual and infer the language from the text, so the
/// language hint is only logged.
pub struct OpenAiSynthesizer {
    client: reqwest::Client,
    api_key: String,
    voice: String,
    speed: f32,
    model: String,
    base_url: String,
}

impl OpenAiSynthesizer {
    /// Create a new `OpenAI` synthesizer
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(
        api_key: String,
        voice: String,
        speed: f32,
        model: String,
        base_url: Option<String>,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice,
            speed,
            model,
            base_url: base_url
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

#[async_trait]
impl Synthesizer for OpenAiSynthesizer {
    async fn synthesize(&self, text: &str, language: Language) -> Result<SpeechAudio> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        tracing::debug!(chars = text.len(), language = language.code(), "starting OpenAI TTS");

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
        };

        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(SpeechAudio::mp3(audio.to_vec()))
    }
}

/// `ElevenLabs` speech synthesis
pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    api_key: String,
    voice_id: String,
    model: String,
    base_url: String,
}

impl ElevenLabsSynthesizer {
    /// Create a new `ElevenLabs` synthesizer
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(
        api_key: String,
        voice_id: String,
        model: String,
        base_url: Option<String>,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "ElevenLabs API key required for TTS".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice_id,
            model,
            base_url: base_url
                .unwrap_or_else(|| ELEVENLABS_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

#[async_trait]
impl Synthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str, language: Language) -> Result<SpeechAudio> {
        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
            language_code: &'a str,
        }

        let url = format!("{}/text-to-speech/{}", self.base_url, self.voice_id);

        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
            language_code: language.code(),
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(SpeechAudio::mp3(audio.to_vec()))
    }
}

/// Build the configured synthesizer
///
/// # Errors
///
/// Returns error if the provider's API key is not configured
pub fn synthesizer_from_config(config: &TtsConfig, keys: &ApiKeys) -> Result<Arc<dyn Synthesizer>> {
    let synthesizer: Arc<dyn Synthesizer> = match config.provider {
        TtsProvider::OpenAi => Arc::new(OpenAiSynthesizer::new(
            keys.openai.clone().unwrap_or_default(),
            config.voice.clone(),
            config.speed,
            config.model.clone(),
            config.base_url.clone(),
        )?),
        TtsProvider::ElevenLabs => Arc::new(ElevenLabsSynthesizer::new(
            keys.elevenlabs.clone().unwrap_or_default(),
            config.voice.clone(),
            config.model.clone(),
            config.base_url.clone(),
        )?),
    };

    tracing::info!(provider = ?config.provider, model = %config.model, "TTS configured");
    Ok(synthesizer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_requires_key() {
        let result = OpenAiSynthesizer::new(
            String::new(),
            "alloy".to_string(),
            1.0,
            "tts-1".to_string(),
            None,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn factory_selects_elevenlabs_key() {
        let config = TtsConfig {
            provider: TtsProvider::ElevenLabs,
            model: "eleven_multilingual_v2".to_string(),
            voice: "voice".to_string(),
            speed: 1.0,
            base_url: None,
        };
        let openai_only = ApiKeys {
            openai: Some("sk-test".to_string()),
            ..ApiKeys::default()
        };
        assert!(synthesizer_from_config(&config, &openai_only).is_err());

        let elevenlabs = ApiKeys {
            elevenlabs: Some("xi-test".to_string()),
            ..ApiKeys::default()
        };
        assert!(synthesizer_from_config(&config, &elevenlabs).is_ok());
    }
}
