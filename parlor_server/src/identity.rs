// Identity registry for connected participants.
//
// `Roster` is the canonical store of everyone currently connected: it assigns
// connection ids, owns each connection's buffered write half, and keeps the
// display-name maps consistent through a single mutation path (`register` /
// `rename` / `deregister`). The normalized-name map is derived state — it is
// only ever touched inside those three methods.
//
// Rename constraints (checked in order):
// - the cleaned name must be 1–20 characters;
// - its normalized form must be non-empty (a name of pure punctuation has no
//   stable lookup key);
// - the normalized form must not match the reserved auto-generated pattern
//   `guest<digits>`;
// - the normalized form must not belong to a *different* connected
//   participant. Renaming to a different casing of your own name is allowed.
//
// Failures change no state and send nothing to the requester; the router
// logs them at debug. Sends are fire-and-forget: a write error is logged and
// swallowed — the connection's reader thread discovers the closed socket and
// triggers the ordinary disconnect cleanup.

use std::collections::BTreeMap;
use std::io::BufWriter;
use std::net::TcpStream;

use parlor_protocol::framing::write_message;
use parlor_protocol::message::ServerMessage;
use parlor_protocol::types::{ParticipantId, to_id};
use thiserror::Error;

/// A connected participant: id, display name, and the write half of their
/// connection.
pub struct Participant {
    name: String,
    writer: BufWriter<TcpStream>,
}

/// Why a rename request was rejected. All variants are silent on the wire;
/// the taxonomy exists for logging and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RenameError {
    #[error("name must be 1-20 characters")]
    BadLength,
    #[error("name has no usable characters")]
    Unusable,
    #[error("guest names are reserved")]
    Reserved,
    #[error("name already in use")]
    Taken,
    #[error("no such participant")]
    UnknownParticipant,
}

/// A successful rename: the normalized form the participant was previously
/// known by, which rooms need to re-key their name indexes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenameOutcome {
    pub old_norm: String,
}

/// The identity registry: canonical participant store plus the derived
/// normalized-name lookup.
#[derive(Default)]
pub struct Roster {
    participants: BTreeMap<ParticipantId, Participant>,
    by_norm: BTreeMap<String, ParticipantId>,
    next_id: u32,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection: assign the next id and the default guest
    /// name, and take ownership of the write half.
    pub fn register(&mut self, stream: TcpStream) -> ParticipantId {
        let id = ParticipantId(self.next_id);
        self.next_id += 1;
        let name = format!("Guest {}", id.0);
        self.by_norm.insert(to_id(&name), id);
        self.participants.insert(
            id,
            Participant {
                name,
                writer: BufWriter::new(stream),
            },
        );
        id
    }

    /// Attempt a display-name change. On success both maps are updated and
    /// the previous normalized form is returned so rooms can re-key their
    /// indexes; on failure nothing changes.
    pub fn rename(&mut self, id: ParticipantId, new_name: &str) -> Result<RenameOutcome, RenameError> {
        let cleaned = parlor_protocol::types::clean_name(new_name);
        let len = cleaned.chars().count();
        if !(1..=20).contains(&len) {
            return Err(RenameError::BadLength);
        }
        let norm = to_id(&cleaned);
        if norm.is_empty() {
            return Err(RenameError::Unusable);
        }
        if is_reserved_guest(&norm) {
            return Err(RenameError::Reserved);
        }
        if let Some(owner) = self.by_norm.get(&norm)
            && *owner != id
        {
            return Err(RenameError::Taken);
        }
        let participant = self
            .participants
            .get_mut(&id)
            .ok_or(RenameError::UnknownParticipant)?;
        let old_norm = to_id(&participant.name);
        participant.name = cleaned;
        self.by_norm.remove(&old_norm);
        self.by_norm.insert(norm, id);
        Ok(RenameOutcome { old_norm })
    }

    /// Drop a participant from both maps. The caller removes them from every
    /// room first so leave/empty-destroy logic runs against a live entry.
    pub fn deregister(&mut self, id: ParticipantId) {
        if let Some(participant) = self.participants.remove(&id) {
            self.by_norm.remove(&to_id(&participant.name));
        }
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.participants.contains_key(&id)
    }

    /// Display name, or `None` for an unknown id.
    pub fn name_of(&self, id: ParticipantId) -> Option<&str> {
        self.participants.get(&id).map(|p| p.name.as_str())
    }

    /// Normalized identifier of a participant's current name.
    pub fn norm_of(&self, id: ParticipantId) -> Option<String> {
        self.name_of(id).map(to_id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Encode, frame, and write a message to one participant. Write errors
    /// are logged and swallowed — the reader thread owns disconnect
    /// detection.
    pub fn send(&mut self, id: ParticipantId, msg: &ServerMessage) {
        if let Some(participant) = self.participants.get_mut(&id)
            && let Err(e) = write_message(&mut participant.writer, &msg.encode())
        {
            log::debug!("write to participant {id} failed: {e}");
        }
    }
}

/// True if a normalized name matches the reserved auto-generated pattern
/// `guest<digits>`.
fn is_reserved_guest(norm: &str) -> bool {
    norm.strip_prefix("guest")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}
