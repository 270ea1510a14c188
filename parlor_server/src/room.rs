// Room base contract, the Base and Chat variants, and the room factory.
//
// Every room variant implements the `Room` trait: membership management,
// message handling, the init dump sent on admission, and the summary line
// for the room list. Shared state and behavior live in `RoomCore`, which each
// variant embeds; trait default methods cover the Base behavior so variants
// only override what they specialize.
//
// Membership is a set of participant ids — the `Roster` stays the one
// canonical store of participants, and rooms address members through it.
// Adding an existing member or removing a non-member is a no-op. A message
// from a non-member is silently dropped.
//
// `ChatRoom` adds the one message kind chat understands (`t`, free text,
// rebroadcast with the sender's name prefixed) and a secondary index from
// normalized participant name to id, so display-name changes re-key in
// O(log n) instead of scanning the membership.

use std::collections::{BTreeMap, BTreeSet};

use parlor_protocol::message::{RoomCommand, RoomSummary, ServerMessage};
use parlor_protocol::types::{ParticipantId, RoomKind, to_id};

use crate::identity::Roster;
use crate::jeopardy::JeopardyRoom;

/// State every room variant shares: identity, password, membership.
pub struct RoomCore {
    id: String,
    name: String,
    password: String,
    members: BTreeSet<ParticipantId>,
}

impl RoomCore {
    /// `name` is expected to be pre-cleaned (`clean_name`); the room id is
    /// its normalized form.
    pub fn new(name: &str, password: &str) -> Self {
        Self {
            id: to_id(name),
            name: name.to_string(),
            password: password.to_string(),
            members: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Empty string means no password.
    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_member(&self, id: ParticipantId) -> bool {
        self.members.contains(&id)
    }

    pub fn member_ids(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.members.iter().copied()
    }

    /// Returns false if the participant was already a member.
    pub fn insert_member(&mut self, id: ParticipantId) -> bool {
        self.members.insert(id)
    }

    /// Returns false if the participant was not a member.
    pub fn remove_member(&mut self, id: ParticipantId) -> bool {
        self.members.remove(&id)
    }

    /// Send a message to every current member. All room processing runs on
    /// the server's single owner thread, so membership cannot change midway
    /// and each member receives the message exactly once.
    pub fn broadcast(&self, roster: &mut Roster, msg: &ServerMessage) {
        for member in self.members.iter().copied() {
            roster.send(member, msg);
        }
    }

    /// Announce a member's display-name change to the whole room.
    pub fn announce_rename(&self, roster: &mut Roster, id: ParticipantId, old_norm: &str) {
        let Some(new_name) = roster.name_of(id).map(str::to_string) else {
            return;
        };
        self.broadcast(
            roster,
            &ServerMessage::NameChange {
                room: self.id.clone(),
                old_id: old_norm.to_string(),
                new_name,
            },
        );
    }
}

/// The capability surface every room variant provides.
pub trait Room {
    fn kind(&self) -> RoomKind;
    fn core(&self) -> &RoomCore;
    fn core_mut(&mut self) -> &mut RoomCore;

    /// Handle a room-targeted message from a participant. Implementations
    /// must drop messages from non-members.
    fn receive_message(&mut self, roster: &mut Roster, from: ParticipantId, fields: &[&str]);

    /// The room-type-specific state dump carried in the init message.
    fn init_state(&self) -> String {
        format!("Welcome to {}", self.core().name())
    }

    /// The admission message a new member receives: room type, name, and
    /// enough state to reconstruct the room's current view.
    fn init_message_for(&self, _member: ParticipantId) -> ServerMessage {
        ServerMessage::Init {
            kind: self.kind(),
            name: self.core().name().to_string(),
            state: self.init_state(),
        }
    }

    /// Add a participant to membership and send them the init message.
    /// No-op if already a member.
    fn add_member(&mut self, roster: &mut Roster, id: ParticipantId) {
        if !self.core_mut().insert_member(id) {
            return;
        }
        let init = self.init_message_for(id);
        roster.send(id, &init);
    }

    /// Remove a participant from membership and send them the deinit
    /// notice. No-op if not a member.
    fn remove_member(&mut self, roster: &mut Roster, id: ParticipantId) {
        if !self.core_mut().remove_member(id) {
            return;
        }
        roster.send(
            id,
            &ServerMessage::Deinit {
                room: self.core().id().to_string(),
            },
        );
    }

    /// React to a member's display-name change: re-key any room-local name
    /// index and announce the change to the room.
    fn handle_rename(&mut self, roster: &mut Roster, id: ParticipantId, old_norm: &str) {
        self.core().announce_rename(roster, id, old_norm);
    }

    /// One entry for the room list.
    fn summary(&self) -> RoomSummary {
        let core = self.core();
        RoomSummary {
            name: core.name().to_string(),
            member_count: core.member_count(),
            has_password: !core.password().is_empty(),
            kind: self.kind(),
        }
    }
}

/// Factory registry: construct the variant for a type tag's `RoomKind`.
pub fn make_room(kind: RoomKind, name: &str, password: &str) -> Box<dyn Room> {
    match kind {
        RoomKind::Base => Box::new(BaseRoom::new(name, password)),
        RoomKind::Chat => Box::new(ChatRoom::new(name, password)),
        RoomKind::Jeopardy => Box::new(JeopardyRoom::new(name, password)),
    }
}

/// The featureless room variant: membership and init/deinit only. Ignores
/// every room-targeted message.
pub struct BaseRoom {
    core: RoomCore,
}

impl BaseRoom {
    pub fn new(name: &str, password: &str) -> Self {
        Self {
            core: RoomCore::new(name, password),
        }
    }
}

impl Room for BaseRoom {
    fn kind(&self) -> RoomKind {
        RoomKind::Base
    }

    fn core(&self) -> &RoomCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut RoomCore {
        &mut self.core
    }

    fn receive_message(&mut self, _roster: &mut Roster, _from: ParticipantId, _fields: &[&str]) {}
}

/// A chat room: free-text messages rebroadcast to every member.
pub struct ChatRoom {
    core: RoomCore,
    /// Normalized participant name → id, re-keyed on rename.
    by_norm: BTreeMap<String, ParticipantId>,
}

impl ChatRoom {
    pub fn new(name: &str, password: &str) -> Self {
        Self {
            core: RoomCore::new(name, password),
            by_norm: BTreeMap::new(),
        }
    }

    #[cfg(test)]
    fn lookup_norm(&self, norm: &str) -> Option<ParticipantId> {
        self.by_norm.get(norm).copied()
    }
}

impl Room for ChatRoom {
    fn kind(&self) -> RoomKind {
        RoomKind::Chat
    }

    fn core(&self) -> &RoomCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut RoomCore {
        &mut self.core
    }

    fn add_member(&mut self, roster: &mut Roster, id: ParticipantId) {
        if !self.core.insert_member(id) {
            return;
        }
        if let Some(norm) = roster.norm_of(id) {
            self.by_norm.insert(norm, id);
        }
        let init = self.init_message_for(id);
        roster.send(id, &init);
    }

    fn remove_member(&mut self, roster: &mut Roster, id: ParticipantId) {
        if !self.core.remove_member(id) {
            return;
        }
        if let Some(norm) = roster.norm_of(id) {
            self.by_norm.remove(&norm);
        }
        roster.send(
            id,
            &ServerMessage::Deinit {
                room: self.core.id().to_string(),
            },
        );
    }

    fn handle_rename(&mut self, roster: &mut Roster, id: ParticipantId, old_norm: &str) {
        self.by_norm.remove(old_norm);
        if let Some(norm) = roster.norm_of(id) {
            self.by_norm.insert(norm, id);
        }
        self.core.announce_rename(roster, id, old_norm);
    }

    fn receive_message(&mut self, roster: &mut Roster, from: ParticipantId, fields: &[&str]) {
        if !self.core.is_member(from) {
            return;
        }
        if let Some(RoomCommand::Text(text)) = RoomCommand::parse(fields) {
            let Some(sender) = roster.name_of(from) else {
                return;
            };
            let msg = ServerMessage::Chat {
                room: self.core.id().to_string(),
                text: format!("{sender}: {text}"),
            };
            self.core.broadcast(roster, &msg);
        }
    }
}
