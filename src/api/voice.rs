//! Transcription endpoint

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;

use super::{ApiState, ErrorBody};
use crate::voice::MAX_UPLOAD_BYTES;

/// Room for multipart boundaries and the other form fields
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build transcription router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route(
            "/v1/transcribe",
            post(transcribe).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .with_state(state)
}

/// Transcription response
#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub transcript: String,
}

/// Transcribe the multipart `file` field
async fn transcribe(
    State(state): State<Arc<ApiState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TranscribeResponse>, TranscribeError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::warn!(error = %e, "transcribe called without a multipart body");
        TranscribeError::MissingFile
    })?;
    let mut audio = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!(error = %e, "unreadable multipart body");
        TranscribeError::from_status(e.status())
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let bytes = field.bytes().await.map_err(|e| {
            tracing::warn!(error = %e, "failed reading uploaded file");
            TranscribeError::from_status(e.status())
        })?;
        audio = Some(bytes);
        break;
    }

    let audio = audio
        .filter(|bytes| !bytes.is_empty())
        .ok_or(TranscribeError::MissingFile)?;

    if audio.len() > MAX_UPLOAD_BYTES {
        return Err(TranscribeError::TooLarge);
    }

    let transcript = state.transcriber.transcribe(&audio).await.map_err(|e| {
        tracing::error!(error = %e, audio_bytes = audio.len(), "transcription failed");
        TranscribeError::Failed
    })?;

    Ok(Json(TranscribeResponse { transcript }))
}

/// Transcription API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscribeError {
    MissingFile,
    TooLarge,
    Failed,
}

impl TranscribeError {
    fn from_status(status: StatusCode) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Self::TooLarge
        } else {
            Self::MissingFile
        }
    }
}

impl IntoResponse for TranscribeError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingFile => (StatusCode::BAD_REQUEST, "No se recibió audio"),
            Self::TooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "El audio supera los 25 MB"),
            Self::Failed => (StatusCode::INTERNAL_SERVER_ERROR, "Error al transcribir"),
        };

        (
            status,
            Json(ErrorBody {
                error: message.to_string(),
            }),
        )
            .into_response()
    }
}
