//! HTTP API server for the parley gateway

pub mod converse;
pub mod health;
pub mod languages;
pub mod sessions;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::orchestrator::Orchestrator;

/// Shared state for API handlers
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
}

/// HTTP front end over an [`Orchestrator`]
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    max_audio_bytes: usize,
}

impl ApiServer {
    /// Create a server that accepts request bodies up to `max_audio_bytes`
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>, port: u16, max_audio_bytes: usize) -> Self {
        Self {
            state: Arc::new(ApiState { orchestrator }),
            port,
            max_audio_bytes,
        }
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let router = Router::new()
            .nest("/api/converse", converse::router(self.state.clone()))
            .nest("/api/sessions", sessions::router(self.state.clone()))
            .nest("/api/languages", languages::router())
            .merge(health::router());

        // CORS layer for cross-origin requests from browser recorders
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(self.max_audio_bytes))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, max_audio_bytes = self.max_audio_bytes, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}

/// API errors for malformed requests
///
/// Collaborator failures never surface here; they degrade the reply instead.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    UnsupportedMedia(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::UnsupportedMedia(msg) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_media_type", msg)
            }
        };

        (status, Json(ErrorResponse { error: ErrorBody { code, message } })).into_response()
    }
}
