//! Speech collaborators
//!
//! The orchestrator only sees the [`Transcriber`] and [`Synthesizer`] traits.
//! The HTTP-backed implementations here talk to hosted STT/TTS services.

mod stt;
mod tts;

pub use stt::{DeepgramTranscriber, Transcriber, WhisperTranscriber, transcriber_from_config};
pub use tts::{ElevenLabsSynthesizer, OpenAiSynthesizer, Synthesizer, synthesizer_from_config};

/// Recorded speech submitted with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    /// Encoded audio bytes (WAV, MP3, `WebM`, ...)
    pub bytes: Vec<u8>,

    /// MIME type of `bytes`
    pub mime_type: String,
}

impl AudioClip {
    /// Wrap encoded audio with its MIME type
    #[must_use]
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Wrap WAV bytes
    #[must_use]
    pub fn wav(bytes: Vec<u8>) -> Self {
        Self::new(bytes, "audio/wav")
    }

    /// Guess the MIME type from a file extension, defaulting to WAV
    #[must_use]
    pub fn mime_for_path(path: &std::path::Path) -> &'static str {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("mp3") => "audio/mpeg",
            Some("ogg" | "oga") => "audio/ogg",
            Some("webm") => "audio/webm",
            Some("m4a" | "mp4") => "audio/mp4",
            Some("flac") => "audio/flac",
            _ => "audio/wav",
        }
    }

    /// File name hint matching the MIME type, for multipart uploads
    #[must_use]
    pub fn file_name(&self) -> &'static str {
        match self.mime_type.as_str() {
            "audio/mpeg" | "audio/mp3" => "audio.mp3",
            "audio/ogg" => "audio.ogg",
            "audio/webm" | "video/webm" => "audio.webm",
            "audio/mp4" | "audio/m4a" => "audio.m4a",
            "audio/flac" => "audio.flac",
            _ => "audio.wav",
        }
    }

    /// True when there is nothing to transcribe
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Synthesized speech returned with a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechAudio {
    /// Encoded audio bytes
    pub bytes: Vec<u8>,

    /// MIME type of `bytes`
    pub mime_type: String,
}

impl SpeechAudio {
    /// Wrap MP3 bytes
    #[must_use]
    pub fn mp3(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: "audio/mpeg".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn mime_follows_extension() {
        assert_eq!(AudioClip::mime_for_path(Path::new("a.MP3")), "audio/mpeg");
        assert_eq!(AudioClip::mime_for_path(Path::new("a.webm")), "audio/webm");
        assert_eq!(AudioClip::mime_for_path(Path::new("a")), "audio/wav");
    }

    #[test]
    fn file_name_follows_mime() {
        assert_eq!(AudioClip::new(vec![1], "audio/ogg").file_name(), "audio.ogg");
        assert_eq!(AudioClip::wav(vec![1]).file_name(), "audio.wav");
        assert_eq!(AudioClip::new(vec![1], "application/octet-stream").file_name(), "audio.wav");
    }
}
