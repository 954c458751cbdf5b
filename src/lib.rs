//! NPC Voice Relay - conversational NPCs for game servers
//!
//! This library provides the pieces of the relay:
//! - Player speech transcription (Whisper over an OpenAI-compatible API)
//! - NPC dialogue with a closed action vocabulary (chat completions)
//! - Reply speech synthesis (Edge TTS)
//! - A transient store for audio artifacts with time-based eviction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Game server                       │
//! └────────────────────┬────────────────────────────────┘
//!                      │ HTTP
//! ┌────────────────────▼────────────────────────────────┐
//! │                  NPC Voice Relay                     │
//! │  /v1/transcribe │ /v1/npc/chat │ /audio │ /health   │
//! └──────┬─────────────────┬──────────────────┬─────────┘
//!        │                 │                  │
//! ┌──────▼──────┐  ┌───────▼───────┐  ┌───────▼───────┐
//! │  Whisper    │  │  Chat model   │  │   Edge TTS    │
//! └─────────────┘  └───────────────┘  └───────────────┘
//! ```

pub mod api;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod provider;
pub mod store;
pub mod voice;

pub use api::{ApiServer, ApiServerBuilder, ApiState};
pub use config::Config;
pub use dialogue::{ActionTag, ChatTurn, DialogueClient, DialogueRequest, NpcReply, Role};
pub use error::{Error, Result};
pub use provider::Provider;
pub use store::AudioStore;
pub use voice::{SpeechSynthesizer, Transcriber};
