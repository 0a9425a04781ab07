//! Shared test utilities
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use parley_gateway::{
    AudioClip, Error, JsonFileStore, Language, MemoryStore, Orchestrator, Responder, Result,
    SessionManager, SpeechAudio, Synthesizer, Transcriber, Turn,
};
use tempfile::TempDir;

/// Transcriber returning a fixed transcript, or failing
pub struct FakeTranscriber {
    transcript: std::result::Result<String, String>,
    calls: Mutex<Vec<Language>>,
}

impl FakeTranscriber {
    pub fn hearing(transcript: &str) -> Arc<Self> {
        Arc::new(Self {
            transcript: Ok(transcript.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            transcript: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Language> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _audio: &AudioClip, language: Language) -> Result<String> {
        self.calls.lock().unwrap().push(language);
        self.transcript.clone().map_err(Error::Stt)
    }
}

/// What a responder was asked
#[derive(Debug, Clone)]
pub struct ResponderCall {
    pub system_instruction: String,
    pub context: Vec<Turn>,
    pub user_text: String,
}

/// Responder returning a fixed reply, or failing
pub struct FakeResponder {
    reply: std::result::Result<String, String>,
    calls: Mutex<Vec<ResponderCall>>,
}

impl FakeResponder {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<ResponderCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Responder for FakeResponder {
    async fn generate(
        &self,
        system_instruction: &str,
        context: &[Turn],
        user_text: &str,
    ) -> Result<String> {
        self.calls.lock().unwrap().push(ResponderCall {
            system_instruction: system_instruction.to_string(),
            context: context.to_vec(),
            user_text: user_text.to_string(),
        });
        self.reply.clone().map_err(Error::Llm)
    }
}

/// Synthesizer returning the spoken text as "audio", or failing
pub struct FakeSynthesizer {
    fail: bool,
    spoken: Mutex<Vec<(String, Language)>>,
}

impl FakeSynthesizer {
    pub fn working() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            spoken: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            spoken: Mutex::new(Vec::new()),
        })
    }

    pub fn spoken(&self) -> Vec<(String, Language)> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl Synthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str, language: Language) -> Result<SpeechAudio> {
        self.spoken.lock().unwrap().push((text.to_string(), language));
        if self.fail {
            return Err(Error::Tts("voice service unavailable".to_string()));
        }
        Ok(SpeechAudio::mp3(text.as_bytes().to_vec()))
    }
}

/// A JSON store in a fresh temp directory
///
/// Keep the `TempDir` alive for as long as the store is used.
pub fn temp_store() -> (TempDir, Arc<JsonFileStore>) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let store = Arc::new(JsonFileStore::new(dir.path().join("sessions.json")));
    (dir, store)
}

/// A non-empty WAV-tagged clip
pub fn speech() -> AudioClip {
    AudioClip::wav(vec![0x52, 0x49, 0x46, 0x46, 1, 2, 3, 4])
}

/// Wire fakes and a store into an orchestrator
pub fn orchestrator(
    transcriber: Arc<FakeTranscriber>,
    responder: Arc<FakeResponder>,
    synthesizer: Arc<FakeSynthesizer>,
    store: Arc<dyn MemoryStore>,
    context_limit: usize,
) -> Orchestrator {
    Orchestrator::new(
        transcriber,
        responder,
        synthesizer,
        store,
        SessionManager::new(context_limit),
    )
}
