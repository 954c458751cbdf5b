//! Voice processing module
//!
//! Speech-to-text for player recordings and text-to-speech for NPC replies

pub mod stt;
pub mod tts;

pub use stt::{MAX_UPLOAD_BYTES, SpeechToText, Transcriber, WhisperApi};
pub use tts::{EdgeTts, SpeechEngine, SpeechSynthesizer, sanitize, voice_for};
