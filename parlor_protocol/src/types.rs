// Core identifier types for the room protocol.
//
// `ParticipantId` is the server-assigned connection id — a compact u32 scoped
// to the process lifetime, used to key memberships and to address role
// commands on the wire. Display names and room names are referenced on the
// wire through their *normalized* form (`to_id`): lowercase, ASCII
// alphanumeric only. Normalization is shared by both sides so that ids
// computed from names always agree.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Server-assigned participant id (compact u32, unique for the process
/// lifetime, never reused across reconnects).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(pub u32);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed set of room variants the server can construct.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoomKind {
    Base,
    Chat,
    Jeopardy,
}

impl RoomKind {
    /// The type tag used on the wire and as the factory-registry key.
    pub fn as_tag(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Chat => "chat",
            Self::Jeopardy => "jeopardy",
        }
    }
}

impl fmt::Display for RoomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// A room-type tag that names no known variant.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("Invalid room type given.")]
pub struct UnknownRoomKind;

impl FromStr for RoomKind {
    type Err = UnknownRoomKind;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "base" => Ok(Self::Base),
            "chat" => Ok(Self::Chat),
            "jeopardy" => Ok(Self::Jeopardy),
            _ => Err(UnknownRoomKind),
        }
    }
}

/// Normalize a display name or room name into a stable lookup key:
/// lowercase, ASCII alphanumeric characters only.
pub fn to_id(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Clean a user-supplied display or room name: strip the protocol's field
/// and list separators (`|`, `,`), collapse newlines away, and trim
/// surrounding whitespace. The result is safe to embed in any outbound field.
pub fn clean_name(input: &str) -> String {
    input
        .chars()
        .filter(|c| *c != '|' && *c != ',' && !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}
