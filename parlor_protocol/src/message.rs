// The pipe-delimited message vocabulary.
//
// Three views of the protocol live here:
// - `GlobalCommand`: inbound frames whose first field is empty — room
//   lifecycle and identity commands handled by the router itself.
// - `RoomCommand`: inbound frames addressed to a room — the fields after the
//   room id, parsed into the closed set of operations rooms understand.
//   Unknown kinds and unparseable numbers yield `None`; the router and rooms
//   silently drop those, per the protocol's ignore-don't-reply stance.
// - `ServerMessage`: every outbound message, with `encode` producing the
//   exact wire text and `parse` recovering the typed form (used by clients
//   and tests).
//
// Free-text fields (chat text, question text, names already cleaned of `|`)
// always sit last in a frame and rejoin any remaining separators, so text
// containing `|` survives the field split.

use std::fmt::Write as _;

use crate::types::{ParticipantId, RoomKind, to_id};

/// Field accessor: missing trailing fields read as empty. Shared with the
/// server's frame router.
pub fn field<'a>(fields: &[&'a str], index: usize) -> &'a str {
    fields.get(index).copied().unwrap_or("")
}

/// Rejoin the fields from `index` onward (the free-text tail of a frame).
fn tail(fields: &[&str], index: usize) -> String {
    if index >= fields.len() {
        String::new()
    } else {
        fields[index..].join("|")
    }
}

/// A global command: an inbound frame whose first field was empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GlobalCommand {
    /// Request the current room list.
    QueryRooms,
    /// Create a room and join it. The type tag is kept raw so the directory
    /// can reject unknown tags with an explicit error.
    CreateRoom {
        kind_tag: String,
        name: String,
        password: String,
    },
    /// Join an existing room.
    Join { room_id: String, password: String },
    /// Leave a room.
    Leave { room_id: String },
    /// Request a display-name change.
    ChangeName { name: String },
}

impl GlobalCommand {
    /// Parse the full field split of a global frame (`fields[0]` is the
    /// empty routing field). Unknown commands yield `None` and are ignored.
    pub fn parse(fields: &[&str]) -> Option<Self> {
        match to_id(field(fields, 1)).as_str() {
            "queryrooms" => Some(Self::QueryRooms),
            "createroom" => Some(Self::CreateRoom {
                kind_tag: field(fields, 2).to_string(),
                name: field(fields, 3).to_string(),
                password: tail(fields, 4),
            }),
            "join" => Some(Self::Join {
                room_id: to_id(field(fields, 2)),
                password: tail(fields, 3),
            }),
            "leave" => Some(Self::Leave {
                room_id: to_id(field(fields, 2)),
            }),
            "cn" => Some(Self::ChangeName {
                name: tail(fields, 2),
            }),
            _ => None,
        }
    }
}

/// A room-targeted command: the fields after the room id, parsed into the
/// closed set of operations rooms understand. Each room variant handles the
/// subset it cares about and ignores the rest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoomCommand {
    /// Free-text chat message.
    Text(String),
    /// Host: set a question's text.
    SetQuestion {
        category: usize,
        question: usize,
        text: String,
    },
    /// Host: reveal a question and open buzzing.
    ShowQuestion { category: usize, question: usize },
    /// Host: set a category's name.
    SetCategory { category: usize, text: String },
    /// Host: demote a player to spectator.
    SetSpectator { target: ParticipantId },
    /// Host: promote a spectator to player.
    SetPlayer { target: ParticipantId },
    /// Player buzz attempt.
    Buzz,
    /// Host: award a question's points to a player.
    Correct {
        category: usize,
        question: usize,
        target: ParticipantId,
    },
    /// Host: manually enable buzzing.
    BuzzOn,
    /// Host: manually disable buzzing.
    BuzzOff,
    /// Host: regenerate the board with a new point multiplier.
    RemakeBoard { multiplier: u32 },
}

impl RoomCommand {
    /// Parse the fields of a room-targeted frame (everything after the room
    /// id). Unknown kinds and malformed numbers yield `None`; callers drop
    /// those silently.
    pub fn parse(fields: &[&str]) -> Option<Self> {
        match field(fields, 0) {
            "t" => Some(Self::Text(tail(fields, 1))),
            "q" => Some(Self::SetQuestion {
                category: field(fields, 1).parse().ok()?,
                question: field(fields, 2).parse().ok()?,
                text: tail(fields, 3).trim().to_string(),
            }),
            "show" | "ask" => Some(Self::ShowQuestion {
                category: field(fields, 1).parse().ok()?,
                question: field(fields, 2).parse().ok()?,
            }),
            "cat" => Some(Self::SetCategory {
                category: field(fields, 1).parse().ok()?,
                text: tail(fields, 2).trim().to_string(),
            }),
            "spec" => Some(Self::SetSpectator {
                target: ParticipantId(field(fields, 1).parse().ok()?),
            }),
            "player" => Some(Self::SetPlayer {
                target: ParticipantId(field(fields, 1).parse().ok()?),
            }),
            "buzz" => Some(Self::Buzz),
            "correct" => Some(Self::Correct {
                category: field(fields, 1).parse().ok()?,
                question: field(fields, 2).parse().ok()?,
                target: ParticipantId(field(fields, 3).parse().ok()?),
            }),
            "buzzon" => Some(Self::BuzzOn),
            "buzzoff" => Some(Self::BuzzOff),
            "board" => Some(Self::RemakeBoard {
                multiplier: field(fields, 1).parse().ok()?,
            }),
            _ => None,
        }
    }
}

/// One entry of the room list: `name,count,y|n,type`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomSummary {
    pub name: String,
    pub member_count: usize,
    pub has_password: bool,
    pub kind: RoomKind,
}

impl RoomSummary {
    fn encode(&self) -> String {
        format!(
            "{},{},{},{}",
            self.name,
            self.member_count,
            if self.has_password { "y" } else { "n" },
            self.kind
        )
    }

    fn parse(entry: &str) -> Option<Self> {
        let mut parts = entry.split(',');
        let name = parts.next()?.to_string();
        let member_count = parts.next()?.parse().ok()?;
        let has_password = match parts.next()? {
            "y" => true,
            "n" => false,
            _ => return None,
        };
        let kind = parts.next()?.parse().ok()?;
        Some(Self {
            name,
            member_count,
            has_password,
            kind,
        })
    }
}

/// Per-recipient UI-capability toggle sent on role changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Player,
    Spectator,
}

impl UiMode {
    fn as_tag(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Spectator => "spec",
        }
    }
}

/// Every message the server sends to a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerMessage {
    /// Current room list.
    RoomList { rooms: Vec<RoomSummary> },
    /// Room admission plus the initial state dump.
    Init {
        kind: RoomKind,
        name: String,
        state: String,
    },
    /// Room removal notice.
    Deinit { room: String },
    /// Chat broadcast (sender prefix already baked into the text).
    Chat { room: String, text: String },
    /// Question update or reveal.
    Question {
        room: String,
        category: usize,
        question: usize,
        text: String,
    },
    /// Category update.
    Category {
        room: String,
        category: usize,
        text: String,
    },
    /// Player roster/score update.
    PlayerScore {
        room: String,
        name: String,
        score: u32,
    },
    /// Role change to spectator, addressed by normalized name.
    Spectator { room: String, norm_id: String },
    /// Per-recipient UI-capability toggle.
    UiMode { room: String, mode: UiMode },
    /// Buzz control enabled for the recipient.
    CanBuzz { room: String },
    /// Buzz control disabled for the recipient.
    CantBuzz { room: String },
    /// Display-name change notice.
    NameChange {
        room: String,
        old_id: String,
        new_name: String,
    },
    /// Full board dump (client remakes its board view).
    Board { room: String, board: String },
    /// Rejected request.
    Error { message: String },
}

impl ServerMessage {
    /// Encode to the exact wire text.
    pub fn encode(&self) -> String {
        match self {
            Self::RoomList { rooms } => {
                let mut out = String::from("|roomlist");
                for room in rooms {
                    let _ = write!(out, "|{}", room.encode());
                }
                out
            }
            Self::Init { kind, name, state } => format!("|init|{kind}|{name}|{state}"),
            Self::Deinit { room } => format!("|deinit|{room}"),
            Self::Chat { room, text } => format!("{room}|t|{text}"),
            Self::Question {
                room,
                category,
                question,
                text,
            } => format!("{room}|q|{category}|{question}|{text}"),
            Self::Category {
                room,
                category,
                text,
            } => format!("{room}|cat|{category}|{text}"),
            Self::PlayerScore { room, name, score } => format!("{room}|player|{name}|{score}"),
            Self::Spectator { room, norm_id } => format!("{room}|spec|{norm_id}"),
            Self::UiMode { room, mode } => format!("{room}|ui|{}", mode.as_tag()),
            Self::CanBuzz { room } => format!("{room}|canbuzz"),
            Self::CantBuzz { room } => format!("{room}|cantbuzz"),
            Self::NameChange {
                room,
                old_id,
                new_name,
            } => format!("{room}|cn|{old_id}|{new_name}"),
            Self::Board { room, board } => format!("{room}|board\n{board}"),
            Self::Error { message } => format!("|error|{message}"),
        }
    }

    /// Parse wire text back into the typed form. Returns `None` for text
    /// that is not a well-formed server message.
    pub fn parse(raw: &str) -> Option<Self> {
        if let Some(rest) = raw.strip_prefix('|') {
            let (command, args) = rest.split_once('|').unwrap_or((rest, ""));
            return match command {
                "roomlist" => {
                    let rooms = if args.is_empty() {
                        Vec::new()
                    } else {
                        args.split('|')
                            .map(RoomSummary::parse)
                            .collect::<Option<Vec<_>>>()?
                    };
                    Some(Self::RoomList { rooms })
                }
                "init" => {
                    let mut parts = args.splitn(3, '|');
                    Some(Self::Init {
                        kind: parts.next()?.parse().ok()?,
                        name: parts.next()?.to_string(),
                        state: parts.next()?.to_string(),
                    })
                }
                "deinit" => Some(Self::Deinit {
                    room: args.to_string(),
                }),
                "error" => Some(Self::Error {
                    message: args.to_string(),
                }),
                _ => None,
            };
        }

        let (room, rest) = raw.split_once('|')?;
        let room = room.to_string();
        if let Some(board) = rest.strip_prefix("board\n") {
            return Some(Self::Board {
                room,
                board: board.to_string(),
            });
        }
        let (kind, args) = rest.split_once('|').unwrap_or((rest, ""));
        match kind {
            "t" => Some(Self::Chat {
                room,
                text: args.to_string(),
            }),
            "q" => {
                let mut parts = args.splitn(3, '|');
                Some(Self::Question {
                    room,
                    category: parts.next()?.parse().ok()?,
                    question: parts.next()?.parse().ok()?,
                    text: parts.next()?.to_string(),
                })
            }
            "cat" => {
                let (category, text) = args.split_once('|')?;
                Some(Self::Category {
                    room,
                    category: category.parse().ok()?,
                    text: text.to_string(),
                })
            }
            "player" => {
                let (name, score) = args.rsplit_once('|')?;
                Some(Self::PlayerScore {
                    room,
                    name: name.to_string(),
                    score: score.parse().ok()?,
                })
            }
            "spec" => Some(Self::Spectator {
                room,
                norm_id: args.to_string(),
            }),
            "ui" => match args {
                "player" => Some(Self::UiMode {
                    room,
                    mode: UiMode::Player,
                }),
                "spec" => Some(Self::UiMode {
                    room,
                    mode: UiMode::Spectator,
                }),
                _ => None,
            },
            "canbuzz" => Some(Self::CanBuzz { room }),
            "cantbuzz" => Some(Self::CantBuzz { room }),
            "cn" => {
                let (old_id, new_name) = args.split_once('|')?;
                Some(Self::NameChange {
                    room,
                    old_id: old_id.to_string(),
                    new_name: new_name.to_string(),
                })
            }
            _ => None,
        }
    }
}
