//! HTTP API server for the NPC voice relay

pub mod health;
pub mod npc;
pub mod voice;

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::dialogue::{ChatCompletions, DialogueClient};
use crate::provider::Provider;
use crate::store::AudioStore;
use crate::voice::{EdgeTts, SpeechSynthesizer, Transcriber, WhisperApi};
use crate::{Error, Result};

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub transcriber: Transcriber,
    pub dialogue: DialogueClient,
    pub synthesizer: SpeechSynthesizer,
    pub store: Arc<AudioStore>,
    /// Public base URL for audio links, without trailing slash
    pub public_base_url: String,
    /// Whether the provider credential is configured (reported by `/health`)
    pub credential_configured: bool,
    /// Status paired with the fallback reply when the dialogue call fails
    pub fallback_status: StatusCode,
}

impl ApiState {
    /// Absolute URL of a synthesized file
    #[must_use]
    pub fn audio_url(&self, file_name: &str) -> String {
        format!("{}/audio/{file_name}", self.public_base_url)
    }
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    transcriber: Transcriber,
    dialogue: DialogueClient,
    synthesizer: SpeechSynthesizer,
    store: Arc<AudioStore>,
    port: u16,
    public_base_url: Option<String>,
    credential_configured: bool,
    fallback_status: StatusCode,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(
        transcriber: Transcriber,
        dialogue: DialogueClient,
        synthesizer: SpeechSynthesizer,
        store: Arc<AudioStore>,
        port: u16,
    ) -> Self {
        Self {
            transcriber,
            dialogue,
            synthesizer,
            store,
            port,
            public_base_url: None,
            credential_configured: false,
            fallback_status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wire the production backends described by `config`
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be opened or the fallback status
    /// is not a valid HTTP status
    pub fn from_config(config: Config) -> Result<Self> {
        let store = Arc::new(AudioStore::open(&config.data_dir)?);
        let credential_configured = config.has_api_key();
        let provider = Arc::new(Provider::from_config(config.provider));

        let transcriber = Transcriber::new(
            Arc::new(WhisperApi::new(provider.clone(), config.voice.stt_model)),
            store.clone(),
            config.voice.stt_language,
        );
        let dialogue = DialogueClient::new(Arc::new(ChatCompletions::new(provider)), config.dialogue);
        let synthesizer = SpeechSynthesizer::new(Arc::new(EdgeTts::locate(&config.voice.tts_bin)), store.clone())
            .with_timeout(config.voice.tts_timeout);

        let fallback_status = StatusCode::from_u16(config.fallback_status)
            .map_err(|e| Error::Config(format!("invalid fallback status: {e}")))?;

        Ok(Self::new(transcriber, dialogue, synthesizer, store, config.port)
            .public_base_url(config.base_url)
            .credential_configured(credential_configured)
            .fallback_status(fallback_status))
    }

    /// Set the public base URL used in audio links
    #[must_use]
    pub fn public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    /// Record whether the provider credential is configured
    #[must_use]
    pub fn credential_configured(mut self, configured: bool) -> Self {
        self.credential_configured = configured;
        self
    }

    /// Set the status returned alongside the dialogue fallback reply
    #[must_use]
    pub fn fallback_status(mut self, status: StatusCode) -> Self {
        self.fallback_status = status;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let public_base_url = self
            .public_base_url
            .unwrap_or_else(|| format!("http://localhost:{}", self.port));

        let state = Arc::new(ApiState {
            transcriber: self.transcriber,
            dialogue: self.dialogue,
            synthesizer: self.synthesizer,
            store: self.store,
            public_base_url,
            credential_configured: self.credential_configured,
            fallback_status: self.fallback_status,
        });

        ApiServer {
            state,
            port: self.port,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Shared handler state
    #[must_use]
    pub fn state(&self) -> Arc<ApiState> {
        self.state.clone()
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let audio = ServeDir::new(self.state.store.audio_dir());

        let router = Router::new()
            .merge(voice::router(self.state.clone()))
            .merge(npc::router(self.state.clone()))
            .merge(health::router(self.state.clone()))
            .nest_service("/audio", audio);

        // CORS layer for cross-origin requests from game clients
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server until ctrl-c
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Config(format!("API server error: {e}")))?;

        tracing::info!("API server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

/// JSON `{ "error": ... }` body shared by the handlers
#[derive(Debug, serde::Serialize)]
pub struct ErrorBody {
    pub error: String,
}
