//! Chat turns, NPC replies and the action vocabulary

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Author of a chat turn
///
/// Roles the game client invents are forwarded untouched in
/// [`Role::Other`]; the chat provider decides whether it accepts them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    #[serde(untagged)]
    Other(String),
}

/// One message of a conversation, oldest first when in a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Behavior instruction the game client executes alongside the reply
///
/// Values outside the known set are passed through uppercased in
/// [`ActionTag::Other`]; the relay does not validate them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActionTag {
    /// Follow the player
    Follow,
    /// Stop, stay, wait
    Stop,
    /// Attack someone
    Attack,
    /// Get into the vehicle
    EnterVehicle,
    /// Get out of the vehicle
    ExitVehicle,
    /// Plain conversation
    #[default]
    None,
    /// Unrecognized tag, uppercased
    Other(String),
}

impl ActionTag {
    /// The closed vocabulary advertised to the model
    pub const KNOWN: [Self; 6] = [
        Self::Follow,
        Self::Stop,
        Self::Attack,
        Self::EnterVehicle,
        Self::ExitVehicle,
        Self::None,
    ];

    /// Parse a raw model value, uppercasing it
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let upper = raw.to_uppercase();
        match upper.as_str() {
            "FOLLOW" => Self::Follow,
            "STOP" => Self::Stop,
            "ATTACK" => Self::Attack,
            "ENTER_VEHICLE" => Self::EnterVehicle,
            "EXIT_VEHICLE" => Self::ExitVehicle,
            "NONE" => Self::None,
            _ => Self::Other(upper),
        }
    }

    /// Wire representation
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Follow => "FOLLOW",
            Self::Stop => "STOP",
            Self::Attack => "ATTACK",
            Self::EnterVehicle => "ENTER_VEHICLE",
            Self::ExitVehicle => "EXIT_VEHICLE",
            Self::None => "NONE",
            Self::Other(tag) => tag,
        }
    }

    /// Whether this is one of the six advertised tags
    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for ActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ActionTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActionTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Parsed model output: what the NPC says and what it does
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpcReply {
    pub text: String,
    pub action: ActionTag,
}
