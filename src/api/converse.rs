//! Conversation endpoint: recorded speech in, reply text and speech out

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, header},
    routing::post,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiState};
use crate::orchestrator::{ConversationReply, ConversationRequest, Degradation};
use crate::voice::AudioClip;

/// Build conversation router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new().route("/", post(converse)).with_state(state)
}

/// Query parameters accompanying the audio body
#[derive(Debug, Default, Deserialize)]
pub struct ConverseParams {
    /// Language name or code; unsupported values fall back to the stored preference
    pub language: Option<String>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub persist: bool,
}

/// Conversation response
#[derive(Debug, Serialize)]
pub struct ConverseResponse {
    pub text: String,
    pub transcript: String,
    pub user_id: String,
    pub language: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_mime: Option<String>,
    pub degraded: Degradation,
}

impl From<ConversationReply> for ConverseResponse {
    fn from(reply: ConversationReply) -> Self {
        let (audio_base64, audio_mime) = reply
            .audio
            .map(|audio| (BASE64.encode(&audio.bytes), audio.mime_type))
            .unzip();

        Self {
            text: reply.text,
            transcript: reply.transcript,
            user_id: reply.user_id,
            language: reply.language.code(),
            audio_base64,
            audio_mime,
            degraded: reply.degraded,
        }
    }
}

/// MIME type of the uploaded audio, without parameters
///
/// A missing or generic binary type is treated as WAV.
fn audio_mime(headers: &HeaderMap) -> Result<String, ApiError> {
    let Some(value) = headers.get(header::CONTENT_TYPE) else {
        return Ok("audio/wav".to_string());
    };

    let value = value
        .to_str()
        .map_err(|_| ApiError::BadRequest("invalid Content-Type header".to_string()))?;
    let mime = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "" | "application/octet-stream" => Ok("audio/wav".to_string()),
        m if m.starts_with("audio/") || m == "video/webm" => Ok(mime),
        _ => Err(ApiError::UnsupportedMedia(format!(
            "expected audio content, got {value}"
        ))),
    }
}

/// Run one conversational turn
///
/// The body is the raw recording; an empty body means nothing was said.
/// Collaborator failures are reported in `degraded`, never as HTTP errors.
async fn converse(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<ConverseParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ConverseResponse>, ApiError> {
    let mime = audio_mime(&headers)?;
    let audio = (!body.is_empty()).then(|| AudioClip::new(body.to_vec(), mime));

    let request = ConversationRequest {
        audio,
        language: params.language,
        user_id: params.user_id,
        persist: params.persist,
    };

    let reply = state.orchestrator.converse(request).await;
    Ok(Json(reply.into()))
}
