//! End-to-end conversation flow over fake collaborators

use std::sync::Arc;

use parley_gateway::orchestrator::SILENT_USER_TURN;
use parley_gateway::{
    ConversationRequest, JsonFileStore, Language, MemoryStore, SessionState, Turn,
};

mod common;
use common::{
    FakeResponder, FakeSynthesizer, FakeTranscriber, orchestrator, speech, temp_store,
};

fn request(language: Option<&str>, user_id: &str, persist: bool) -> ConversationRequest {
    ConversationRequest {
        audio: Some(speech()),
        language: language.map(ToString::to_string),
        user_id: Some(user_id.to_string()),
        persist,
    }
}

#[tokio::test]
async fn first_silent_request_stores_fallback_exchange() {
    let (_dir, store) = temp_store();
    let transcriber = FakeTranscriber::hearing("unused");
    let responder = FakeResponder::replying("unused");
    let synthesizer = FakeSynthesizer::working();
    let orch = orchestrator(
        transcriber.clone(),
        responder.clone(),
        synthesizer.clone(),
        store.clone(),
        12,
    );

    let reply = orch
        .converse(ConversationRequest {
            audio: None,
            language: Some("English".to_string()),
            user_id: Some("u1".to_string()),
            persist: true,
        })
        .await;

    assert_eq!(reply.text, "I didn't catch that. Please try again.");
    assert_eq!(reply.language, Language::English);
    assert!(reply.audio.is_some());
    assert!(transcriber.calls().is_empty());
    assert!(responder.calls().is_empty());

    let state = store.load_user("u1");
    assert_eq!(state.preferred_language, "en");
    assert_eq!(
        state.history,
        vec![
            Turn::user(SILENT_USER_TURN),
            Turn::assistant("I didn't catch that. Please try again."),
        ]
    );
}

#[tokio::test]
async fn empty_audio_is_treated_as_silence() {
    let (_dir, store) = temp_store();
    let transcriber = FakeTranscriber::hearing("unused");
    let orch = orchestrator(
        transcriber.clone(),
        FakeResponder::replying("unused"),
        FakeSynthesizer::working(),
        store,
        12,
    );

    let reply = orch
        .converse(ConversationRequest {
            audio: Some(parley_gateway::AudioClip::wav(Vec::new())),
            language: Some("hi".to_string()),
            ..ConversationRequest::default()
        })
        .await;

    assert_eq!(reply.text, Language::Hindi.didnt_catch_that());
    assert!(transcriber.calls().is_empty());
}

#[tokio::test]
async fn stored_preference_applies_without_selection() {
    let (_dir, store) = temp_store();
    store.save_user(
        "u2",
        SessionState {
            preferred_language: "hi".to_string(),
            history: Vec::new(),
        },
    );
    let responder = FakeResponder::replying("नमस्ते");
    let orch = orchestrator(
        FakeTranscriber::hearing("hello"),
        responder.clone(),
        FakeSynthesizer::working(),
        store,
        12,
    );

    let omitted = orch.converse(request(None, "u2", false)).await;
    assert_eq!(omitted.language, Language::Hindi);

    let unsupported = orch.converse(request(Some("French"), "u2", false)).await;
    assert_eq!(unsupported.language, Language::Hindi);

    let calls = responder.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].system_instruction.starts_with("Reply ONLY in Hindi."));
}

#[tokio::test]
async fn explicit_selection_overrides_and_is_remembered() {
    let (_dir, store) = temp_store();
    let orch = orchestrator(
        FakeTranscriber::hearing("hello"),
        FakeResponder::replying("hi there"),
        FakeSynthesizer::working(),
        store.clone(),
        12,
    );

    let first = orch.converse(request(Some("Hindi"), "u3", true)).await;
    assert_eq!(first.language, Language::Hindi);
    assert_eq!(store.load_user("u3").preferred_language, "hi");

    let second = orch.converse(request(None, "u3", true)).await;
    assert_eq!(second.language, Language::Hindi);

    let third = orch.converse(request(Some("en"), "u3", true)).await;
    assert_eq!(third.language, Language::English);
    assert_eq!(store.load_user("u3").preferred_language, "en");
}

#[tokio::test]
async fn synthesis_failure_still_returns_text() {
    let (_dir, store) = temp_store();
    let orch = orchestrator(
        FakeTranscriber::hearing("what time is it"),
        FakeResponder::replying("It is noon."),
        FakeSynthesizer::failing(),
        store.clone(),
        12,
    );

    let reply = orch.converse(request(Some("English"), "u4", true)).await;

    assert_eq!(reply.text, "It is noon.");
    assert!(reply.audio.is_none());
    assert!(reply.degraded.synthesis);
    assert!(!reply.degraded.generation);
    assert_eq!(store.load_user("u4").history.len(), 2);
}

#[tokio::test]
async fn history_is_capped_oldest_first() {
    let (_dir, store) = temp_store();
    let seeded: Vec<Turn> = (1..=48)
        .map(|n| {
            let text = format!("turn {n}");
            if n % 2 == 1 { Turn::user(text) } else { Turn::assistant(text) }
        })
        .collect();
    store.save_user(
        "u5",
        SessionState {
            preferred_language: "en".to_string(),
            history: seeded,
        },
    );

    let responder = FakeResponder::replying("turn 50");
    let orch = orchestrator(
        FakeTranscriber::hearing("turn 49"),
        responder.clone(),
        FakeSynthesizer::working(),
        store.clone(),
        12,
    );

    orch.converse(request(None, "u5", true)).await;

    let history = store.load_user("u5").history;
    assert_eq!(history.len(), 48);
    let contents: Vec<&str> = history.iter().map(Turn::content).collect();
    let expected: Vec<String> = (3..=50).map(|n| format!("turn {n}")).collect();
    assert_eq!(contents, expected);
}

#[tokio::test]
async fn responder_sees_clipped_window_and_new_text() {
    let (_dir, store) = temp_store();
    let history: Vec<Turn> = (1..=10)
        .map(|n| {
            let text = format!("turn {n}");
            if n % 2 == 1 { Turn::user(text) } else { Turn::assistant(text) }
        })
        .collect();
    store.save_user(
        "u6",
        SessionState {
            preferred_language: "en".to_string(),
            history,
        },
    );

    let responder = FakeResponder::replying("ok");
    let orch = orchestrator(
        FakeTranscriber::hearing("latest question"),
        responder.clone(),
        FakeSynthesizer::working(),
        store,
        4,
    );

    orch.converse(request(Some("English"), "u6", false)).await;

    let calls = responder.calls();
    assert_eq!(calls.len(), 1);
    let context: Vec<&str> = calls[0].context.iter().map(Turn::content).collect();
    assert_eq!(context, ["turn 7", "turn 8", "turn 9", "turn 10"]);
    assert_eq!(calls[0].user_text, "latest question");
    assert!(calls[0].system_instruction.starts_with("Reply ONLY in English."));
}

#[tokio::test]
async fn transcription_error_becomes_localized_transcript() {
    let (_dir, store) = temp_store();
    let responder = FakeResponder::replying("Could you repeat?");
    let orch = orchestrator(
        FakeTranscriber::failing("connection reset"),
        responder.clone(),
        FakeSynthesizer::working(),
        store.clone(),
        12,
    );

    let reply = orch.converse(request(Some("English"), "u7", true)).await;

    assert!(reply.degraded.transcription);
    assert!(reply.transcript.starts_with("[Transcription error]"));
    assert!(reply.transcript.contains("connection reset"));
    assert_eq!(responder.calls()[0].user_text, reply.transcript);

    let history = store.load_user("u7").history;
    assert_eq!(history[0].content(), reply.transcript);
}

#[tokio::test]
async fn generation_error_becomes_localized_reply() {
    let (_dir, store) = temp_store();
    let synthesizer = FakeSynthesizer::working();
    let orch = orchestrator(
        FakeTranscriber::hearing("नमस्ते"),
        FakeResponder::failing("rate limited"),
        synthesizer.clone(),
        store,
        12,
    );

    let reply = orch.converse(request(Some("Hindi"), "u8", false)).await;

    assert!(reply.degraded.generation);
    assert!(reply.text.starts_with("[जनरेशन त्रुटि]"));
    assert_eq!(synthesizer.spoken()[0].0, reply.text);
    assert_eq!(synthesizer.spoken()[0].1, Language::Hindi);
}

#[tokio::test]
async fn empty_reply_is_spoken_as_apology() {
    let (_dir, store) = temp_store();
    let synthesizer = FakeSynthesizer::working();
    let orch = orchestrator(
        FakeTranscriber::hearing("hello"),
        FakeResponder::replying(""),
        synthesizer.clone(),
        store,
        12,
    );

    let reply = orch.converse(request(Some("English"), "u9", false)).await;

    assert_eq!(reply.text, "");
    assert_eq!(
        synthesizer.spoken()[0].0,
        "Sorry, I couldn't generate a response."
    );
}

#[tokio::test]
async fn without_persist_store_is_untouched() {
    let (_dir, store) = temp_store();
    let orch = orchestrator(
        FakeTranscriber::hearing("remember me"),
        FakeResponder::replying("I won't"),
        FakeSynthesizer::working(),
        store.clone(),
        12,
    );

    let reply = orch.converse(request(Some("Hindi"), "u10", false)).await;

    assert_eq!(reply.text, "I won't");
    assert!(store.load().is_empty());
    assert!(!store.path().exists());
}

#[tokio::test]
async fn blank_user_runs_as_guest() {
    let (_dir, store) = temp_store();
    let orch = orchestrator(
        FakeTranscriber::hearing("hi"),
        FakeResponder::replying("hello"),
        FakeSynthesizer::working(),
        store.clone(),
        12,
    );

    let reply = orch.converse(request(None, "   ", true)).await;

    assert_eq!(reply.user_id, "guest");
    assert_eq!(store.load_user("guest").history.len(), 2);
}

#[tokio::test]
async fn unwritable_store_does_not_break_conversation() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let store: Arc<dyn MemoryStore> =
        Arc::new(JsonFileStore::new(blocker.join("sessions.json")));

    let orch = orchestrator(
        FakeTranscriber::hearing("hi"),
        FakeResponder::replying("hello"),
        FakeSynthesizer::working(),
        store,
        12,
    );

    let reply = orch.converse(request(None, "u11", true)).await;
    assert_eq!(reply.text, "hello");
    assert!(reply.audio.is_some());
}
