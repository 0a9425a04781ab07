//! Supported language listing

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::language::Language;

/// A language as offered to clients
#[derive(Debug, Serialize)]
pub struct LanguageInfo {
    pub code: &'static str,
    pub name: &'static str,
}

/// Languages response
#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
    pub default: &'static str,
    pub languages: Vec<LanguageInfo>,
}

async fn list() -> Json<LanguagesResponse> {
    Json(LanguagesResponse {
        default: Language::default().code(),
        languages: Language::ALL
            .into_iter()
            .map(|lang| LanguageInfo {
                code: lang.code(),
                name: lang.display_name(),
            })
            .collect(),
    })
}

/// Build languages router
pub fn router() -> Router {
    Router::new().route("/", get(list))
}
