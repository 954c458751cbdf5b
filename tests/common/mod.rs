//! Shared test utilities

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::StatusCode;
use npc_voice_relay::config::DialogueConfig;
use npc_voice_relay::dialogue::{ChatModel, ChatRequest};
use npc_voice_relay::voice::{SpeechEngine, SpeechToText};
use npc_voice_relay::{
    ApiServer, ApiServerBuilder, AudioStore, DialogueClient, Error, Result, SpeechSynthesizer,
    Transcriber,
};

pub const BASE_URL: &str = "https://npc.example.com";

/// Transcription backend that records what it saw
pub struct FakeStt {
    pub reply: Option<String>,
    /// (path, existed during call)
    pub calls: Mutex<Vec<(std::path::PathBuf, bool)>>,
}

#[async_trait]
impl SpeechToText for FakeStt {
    async fn transcribe_file(&self, path: &Path, _language: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((path.to_path_buf(), path.exists()));
        self.reply
            .clone()
            .ok_or_else(|| Error::Stt("whisper unavailable".to_string()))
    }
}

/// Chat model that returns a canned answer and records requests
pub struct FakeChat {
    pub reply: Option<String>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

#[async_trait]
impl ChatModel for FakeChat {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        self.reply
            .clone()
            .ok_or_else(|| Error::Dialogue("401 invalid api key".to_string()))
    }
}

/// TTS engine that writes a stub MP3, or fails
pub struct FakeTts {
    pub works: bool,
    pub voices: Mutex<Vec<String>>,
}

#[async_trait]
impl SpeechEngine for FakeTts {
    async fn render(&self, _text: &str, voice: &str, out: &Path) -> Result<()> {
        self.voices.lock().unwrap().push(voice.to_string());
        if self.works {
            tokio::fs::write(out, b"ID3fake").await?;
            Ok(())
        } else {
            Err(Error::Tts("edge-tts exited with code 1".to_string()))
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Test relay with inspectable fakes
pub struct TestRelay {
    pub dir: tempfile::TempDir,
    pub store: Arc<AudioStore>,
    pub stt: Arc<FakeStt>,
    pub chat: Arc<FakeChat>,
    pub tts: Arc<FakeTts>,
    pub server: ApiServer,
}

/// Knobs for building a [`TestRelay`]
pub struct RelayOptions {
    pub transcript: Option<String>,
    pub chat_reply: Option<String>,
    pub tts_works: bool,
    pub credential_configured: bool,
    pub fallback_status: StatusCode,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            transcript: Some("seguime".to_string()),
            chat_reply: Some(r#"{"texto":"Dale, vamos","accion":"NONE"}"#.to_string()),
            tts_works: true,
            credential_configured: true,
            fallback_status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Build a relay around fake backends
pub fn relay(options: RelayOptions) -> TestRelay {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(AudioStore::open(dir.path()).expect("store"));

    let stt = Arc::new(FakeStt {
        reply: options.transcript,
        calls: Mutex::new(Vec::new()),
    });
    let chat = Arc::new(FakeChat {
        reply: options.chat_reply,
        requests: Mutex::new(Vec::new()),
    });
    let tts = Arc::new(FakeTts {
        works: options.tts_works,
        voices: Mutex::new(Vec::new()),
    });

    let server = ApiServerBuilder::new(
        Transcriber::new(stt.clone(), store.clone(), "es"),
        DialogueClient::new(chat.clone(), DialogueConfig::default()),
        SpeechSynthesizer::new(tts.clone(), store.clone()),
        store.clone(),
        3000,
    )
    .public_base_url(BASE_URL)
    .credential_configured(options.credential_configured)
    .fallback_status(options.fallback_status)
    .build();

    TestRelay {
        dir,
        store,
        stt,
        chat,
        tts,
        server,
    }
}

/// Read a response body as JSON
pub async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
