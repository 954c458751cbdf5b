//! NPC dialogue through a remote chat model
//!
//! Builds the prompt from NPC identity, personality and trailing history,
//! asks the model for a strict JSON object and parses it into an
//! [`NpcReply`].

pub mod completions;
pub mod parse;
pub mod prompt;
pub mod types;

use std::sync::Arc;

pub use completions::{ChatCompletions, ChatModel, ChatRequest, ResponseFormat};
pub use parse::{DEFAULT_TEXT, parse_reply};
pub use prompt::{DialogueRequest, PROACTIVE_MARKER, build_messages, system_prompt};
pub use types::{ActionTag, ChatTurn, NpcReply, Role};

use crate::Result;
use crate::config::DialogueConfig;

/// Said when the chat model cannot be reached at all
pub const FALLBACK_TEXT: &str = "Se me trabó la lengua, preguntame de vuelta";

/// Produces NPC replies from a chat model
#[derive(Clone)]
pub struct DialogueClient {
    model: Arc<dyn ChatModel>,
    settings: DialogueConfig,
}

impl DialogueClient {
    #[must_use]
    pub fn new(model: Arc<dyn ChatModel>, settings: DialogueConfig) -> Self {
        Self { model, settings }
    }

    /// The completion request sent for `request`
    #[must_use]
    pub fn chat_request(&self, request: &DialogueRequest) -> ChatRequest {
        ChatRequest {
            model: self.settings.model.clone(),
            messages: build_messages(request, self.settings.history_limit),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            response_format: ResponseFormat::json_object(),
        }
    }

    /// Ask the model for the NPC's next line
    ///
    /// # Errors
    ///
    /// Returns error if the chat model call fails. Malformed model output
    /// is not an error; it degrades to default text and `NONE`.
    pub async fn reply(&self, request: &DialogueRequest) -> Result<NpcReply> {
        let chat = self.chat_request(request);
        tracing::debug!(
            npc = %request.npc_name,
            turns = chat.messages.len(),
            proactive = request.is_proactive,
            "requesting NPC reply"
        );

        let raw = self.model.complete(&chat).await?;
        let reply = parse_reply(&raw);

        if !reply.action.is_known() {
            tracing::warn!(action = %reply.action, "model returned an unknown action tag");
        }
        tracing::info!(npc = %request.npc_name, text = %reply.text, action = %reply.action, "NPC reply");

        Ok(reply)
    }
}
