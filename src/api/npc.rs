//! NPC chat endpoint
//!
//! The game client always gets a `{texto, accion, audioUrl}` body back, even
//! when the chat model or the synthesis engine is down.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{ApiState, ErrorBody};
use crate::dialogue::{ActionTag, ChatTurn, DialogueRequest, FALLBACK_TEXT};
use crate::voice::voice_for;

/// Largest accepted chat body (10 MB)
const CHAT_BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// NPC used when the request names none
const DEFAULT_NPC_NAME: &str = "Rulo";

/// Build chat router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route(
            "/v1/npc/chat",
            post(chat).layer(DefaultBodyLimit::max(CHAT_BODY_LIMIT_BYTES)),
        )
        .with_state(state)
}

/// Chat request body; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatBody {
    pub npc_name: Option<String>,
    pub npc_personality: Option<String>,
    pub player_text: Option<String>,
    /// Any truthy JSON value (`true`, `1`, `"si"`) marks the turn proactive
    #[serde(deserialize_with = "truthy")]
    pub is_proactive: Option<bool>,
    /// `"hombre"` or `"mujer"`; anything else uses the male voice
    pub gender: Option<String>,
    pub history: Option<Vec<ChatTurn>>,
}

/// Read a flag the way loosely typed game scripts send it
fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(|value| match value {
        Value::Null => false,
        Value::Bool(flag) => flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }))
}

impl ChatBody {
    fn into_request(self) -> DialogueRequest {
        DialogueRequest {
            npc_name: self.npc_name.unwrap_or_else(|| DEFAULT_NPC_NAME.to_string()),
            npc_personality: self.npc_personality.unwrap_or_default(),
            player_text: self.player_text.unwrap_or_default(),
            is_proactive: self.is_proactive.unwrap_or(false),
            history: self.history.unwrap_or_default(),
        }
    }
}

/// Chat response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub texto: String,
    pub accion: ActionTag,
    /// Absolute URL of the reply audio, empty if synthesis failed
    pub audio_url: String,
}

impl ChatResponse {
    /// Reply used when the chat model cannot be reached
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            texto: FALLBACK_TEXT.to_string(),
            accion: ActionTag::None,
            audio_url: String::new(),
        }
    }
}

/// Produce the NPC's next line and its audio
///
/// The body is parsed by hand so that an empty body or a missing
/// content type behave like `{}`.
async fn chat(State(state): State<Arc<ApiState>>, body: Bytes) -> Response {
    let body: ChatBody = if body.iter().all(u8::is_ascii_whitespace) {
        ChatBody::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "invalid chat body");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorBody {
                        error: format!("JSON inválido: {e}"),
                    }),
                )
                    .into_response();
            }
        }
    };

    let voice = voice_for(body.gender.as_deref().unwrap_or_default());
    let request = body.into_request();

    tracing::info!(
        npc = %request.npc_name,
        player_text = %request.player_text,
        proactive = request.is_proactive,
        history = request.history.len(),
        "chat request"
    );

    let reply = match state.dialogue.reply(&request).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(error = %e, npc = %request.npc_name, "dialogue call failed");
            return (state.fallback_status, Json(ChatResponse::fallback())).into_response();
        }
    };

    let audio_url = match state.synthesizer.synthesize(&reply.text, voice).await {
        Ok(file) => state.audio_url(&file),
        Err(e) => {
            tracing::error!(error = %e, voice, "synthesis failed, replying without audio");
            String::new()
        }
    };

    Json(ChatResponse {
        texto: reply.text,
        accion: reply.action,
        audio_url,
    })
    .into_response()
}
