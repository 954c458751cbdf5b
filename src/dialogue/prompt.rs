//! System prompt and message list for NPC dialogue

use super::types::ChatTurn;

/// Prefix marking a turn as world-originated rather than spoken by the player
pub const PROACTIVE_MARKER: &str = "[SISTEMA]: ";

/// Everything the model needs to produce one NPC line
#[derive(Debug, Clone, Default)]
pub struct DialogueRequest {
    pub npc_name: String,
    pub npc_personality: String,
    pub player_text: String,
    pub is_proactive: bool,
    /// Prior turns, oldest first
    pub history: Vec<ChatTurn>,
}

/// Build the system instruction for an NPC
///
/// The register, length limit, command handling, action vocabulary and JSON
/// reply shape are fixed; only name and personality vary.
#[must_use]
pub fn system_prompt(npc_name: &str, npc_personality: &str) -> String {
    format!(
        r#"Sos {npc_name}, un NPC de un servidor GTA V roleplay argentino.
Personalidad: {npc_personality}.

REGLAS:
- Hablás siempre en español rioplatense (vos, che, boludo, pibe, etc.)
- Respuestas CORTAS: 1 a 3 oraciones máximo, naturales y directas
- Si el jugador te da una ORDEN, la obedecés y comentás algo al respecto
- Recordás lo que se habló antes
- Si es proactivo, arrancá conversación de forma casual y natural

ACCIONES DISPONIBLES (solo usar cuando el jugador te lo pide explícitamente):
- FOLLOW        → seguirte, ir con vos
- STOP          → parar, quedarse, esperar
- ATTACK        → atacar a alguien
- ENTER_VEHICLE → subirse al auto/vehículo
- EXIT_VEHICLE  → bajarse del auto
- NONE          → conversación normal

RESPONDÉ ÚNICAMENTE con este JSON (sin markdown, sin comillas extras):
{{"texto":"lo que decís","accion":"NONE"}}"#
    )
}

/// Assemble the message list: system prompt, trailing history, player turn
///
/// Only the last `history_limit` turns are kept, in their original order.
#[must_use]
pub fn build_messages(request: &DialogueRequest, history_limit: usize) -> Vec<ChatTurn> {
    let skip = request.history.len().saturating_sub(history_limit);
    let history = &request.history[skip..];

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatTurn::system(system_prompt(
        &request.npc_name,
        &request.npc_personality,
    )));
    messages.extend_from_slice(history);

    let content = if request.is_proactive {
        format!("{PROACTIVE_MARKER}{}", request.player_text)
    } else {
        request.player_text.clone()
    };
    messages.push(ChatTurn::user(content));

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::types::{ActionTag, Role};

    fn request(player_text: &str, is_proactive: bool, history: Vec<ChatTurn>) -> DialogueRequest {
        DialogueRequest {
            npc_name: "Rulo".to_string(),
            npc_personality: "borracho simpático".to_string(),
            player_text: player_text.to_string(),
            is_proactive,
            history,
        }
    }

    #[test]
    fn system_prompt_embeds_persona_and_vocabulary() {
        let prompt = system_prompt("Rulo", "borracho simpático");

        assert!(prompt.starts_with("Sos Rulo, un NPC"));
        assert!(prompt.contains("Personalidad: borracho simpático."));
        assert!(prompt.contains("español rioplatense"));
        assert!(prompt.contains("1 a 3 oraciones"));
        for tag in ActionTag::KNOWN {
            assert!(prompt.contains(tag.as_str()), "missing {tag}");
        }
        assert!(prompt.ends_with(r#"{"texto":"lo que decís","accion":"NONE"}"#));
    }

    #[test]
    fn direct_turn_is_sent_verbatim() {
        let messages = build_messages(&request("seguime", false, vec![]), 12);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1], ChatTurn::user("seguime"));
    }

    #[test]
    fn proactive_turn_is_marked() {
        let messages = build_messages(&request("El jugador pasa cerca", true, vec![]), 12);

        assert_eq!(
            messages.last().unwrap().content,
            "[SISTEMA]: El jugador pasa cerca"
        );
    }

    #[test]
    fn history_is_truncated_to_most_recent_turns_in_order() {
        let history: Vec<ChatTurn> = (0..20)
            .map(|i| {
                if i % 2 == 0 {
                    ChatTurn::user(format!("turn {i}"))
                } else {
                    ChatTurn::assistant(format!("turn {i}"))
                }
            })
            .collect();

        let messages = build_messages(&request("y ahora?", false, history.clone()), 12);

        assert_eq!(messages.len(), 1 + 12 + 1);
        assert_eq!(&messages[1..13], &history[8..]);
        assert_eq!(messages[1].content, "turn 8");
        assert_eq!(messages[12].content, "turn 19");
    }

    #[test]
    fn short_history_is_kept_whole() {
        let history = vec![ChatTurn::user("hola"), ChatTurn::assistant("¿Qué hacés, pibe?")];

        let messages = build_messages(&request("nada", false, history.clone()), 12);

        assert_eq!(&messages[1..3], history.as_slice());
    }
}
