//! Lenient parsing of the model's JSON reply

use serde_json::{Map, Value};

use super::types::{ActionTag, NpcReply};

/// Said when the model returns no usable line
pub const DEFAULT_TEXT: &str = "¿Decías algo?";

/// Parse raw model output into an [`NpcReply`]
///
/// Tries the whole string as JSON, then the outermost `{...}` span, then
/// gives up and uses an empty object. Missing fields take defaults.
#[must_use]
pub fn parse_reply(raw: &str) -> NpcReply {
    let value = serde_json::from_str::<Value>(raw)
        .ok()
        .or_else(|| extract_object(raw))
        .unwrap_or_else(|| Value::Object(Map::new()));

    let text = value
        .get("texto")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TEXT)
        .to_string();

    let action = value
        .get("accion")
        .and_then(Value::as_str)
        .filter(|a| !a.is_empty())
        .map_or(ActionTag::None, ActionTag::parse);

    NpcReply { text, action }
}

fn extract_object(raw: &str) -> Option<Value> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json() {
        let reply = parse_reply(r#"{"texto":"Dale, vamos","accion":"FOLLOW"}"#);

        assert_eq!(reply.text, "Dale, vamos");
        assert_eq!(reply.action, ActionTag::Follow);
    }

    #[test]
    fn extracts_object_from_surrounding_prose() {
        let raw = "Claro! ```json\n{\"texto\": \" Me quedo acá \", \"accion\": \"stop\"}\n```";
        let reply = parse_reply(raw);

        assert_eq!(reply.text, "Me quedo acá");
        assert_eq!(reply.action, ActionTag::Stop);
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        for raw in ["", "no sé qué decir", "{roto", "} al revés {"] {
            let reply = parse_reply(raw);
            assert_eq!(reply.text, DEFAULT_TEXT, "input {raw:?}");
            assert_eq!(reply.action, ActionTag::None, "input {raw:?}");
        }
    }

    #[test]
    fn missing_or_blank_fields_take_defaults() {
        assert_eq!(parse_reply(r#"{"accion":"ATTACK"}"#).text, DEFAULT_TEXT);
        assert_eq!(parse_reply(r#"{"texto":"   "}"#).text, DEFAULT_TEXT);
        assert_eq!(parse_reply(r#"{"texto":"Hola"}"#).action, ActionTag::None);
        assert_eq!(parse_reply(r#"{"texto":"Hola","accion":""}"#).action, ActionTag::None);
    }

    #[test]
    fn non_string_fields_are_ignored() {
        let reply = parse_reply(r#"{"texto":42,"accion":["FOLLOW"]}"#);

        assert_eq!(reply.text, DEFAULT_TEXT);
        assert_eq!(reply.action, ActionTag::None);
    }

    #[test]
    fn unknown_action_is_uppercased() {
        let reply = parse_reply(r#"{"texto":"A bailar","accion":"dance"}"#);
        assert_eq!(reply.action.as_str(), "DANCE");
    }
}
