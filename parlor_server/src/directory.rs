// The room directory: every live room, keyed by normalized room id.
//
// Rooms exist while occupied. Creation admits the creator immediately, and a
// room whose last member leaves is destroyed — so apart from the permanent
// room, a listed room always has at least one member. The permanent room is
// created at startup, never destroyed, and every new connection is placed in
// it.
//
// Creation and join failures that the requester can act on carry an error
// message whose `Display` form is the exact wire text. Joining a nonexistent
// room is the one silent failure: the room list is advisory and the room may
// simply have emptied out in between.

use std::collections::BTreeMap;

use parlor_protocol::message::RoomSummary;
use parlor_protocol::types::{ParticipantId, RoomKind, clean_name, to_id};
use thiserror::Error;

use crate::identity::Roster;
use crate::room::{Room, make_room};

/// Why a create-room request was rejected. `Display` is the wire error text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CreateRoomError {
    #[error("Invalid room type given.")]
    UnknownRoomType,
    #[error("Invalid room name given.")]
    EmptyName,
    #[error("A room with that name already exists.")]
    NameConflict,
}

/// Why a join request was rejected. `NotFound` is silent on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("Invalid password given.")]
    WrongPassword,
    #[error("no such room")]
    NotFound,
}

/// All live rooms, plus the identity of the permanent room.
pub struct Directory {
    rooms: BTreeMap<String, Box<dyn Room>>,
    permanent_id: String,
}

impl Directory {
    /// Create the directory with its permanent room (a chat room, no
    /// password).
    pub fn new(permanent_room_name: &str) -> Self {
        let permanent = make_room(RoomKind::Chat, permanent_room_name, "");
        let permanent_id = permanent.core().id().to_string();
        let mut rooms = BTreeMap::new();
        rooms.insert(permanent_id.clone(), permanent);
        Self {
            rooms,
            permanent_id,
        }
    }

    pub fn permanent_id(&self) -> &str {
        &self.permanent_id
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn room_mut(&mut self, room_id: &str) -> Option<&mut Box<dyn Room>> {
        self.rooms.get_mut(room_id)
    }

    /// Create a room and admit the creator. The room id is the normalized
    /// form of the cleaned display name; a name that normalizes to nothing
    /// cannot be addressed and is rejected, as is an id already in use.
    pub fn create(
        &mut self,
        roster: &mut Roster,
        creator: ParticipantId,
        kind_tag: &str,
        name: &str,
        password: &str,
    ) -> Result<String, CreateRoomError> {
        let kind: RoomKind = kind_tag
            .parse()
            .map_err(|_| CreateRoomError::UnknownRoomType)?;
        let name = clean_name(name);
        let id = to_id(&name);
        if id.is_empty() {
            return Err(CreateRoomError::EmptyName);
        }
        if self.rooms.contains_key(&id) {
            return Err(CreateRoomError::NameConflict);
        }
        let mut room = make_room(kind, &name, password);
        room.add_member(roster, creator);
        log::info!("room {id} created ({kind})");
        self.rooms.insert(id.clone(), room);
        Ok(id)
    }

    /// Admit a participant to an existing room. A passworded room requires
    /// an exact match; a passwordless room admits anyone, whatever they
    /// supplied.
    pub fn join(
        &mut self,
        roster: &mut Roster,
        participant: ParticipantId,
        room_id: &str,
        password: &str,
    ) -> Result<(), JoinError> {
        let room = self.rooms.get_mut(room_id).ok_or(JoinError::NotFound)?;
        let expected = room.core().password();
        if !expected.is_empty() && expected != password {
            return Err(JoinError::WrongPassword);
        }
        room.add_member(roster, participant);
        Ok(())
    }

    /// Remove a participant from a room, destroying it if it empties.
    /// Unknown rooms and non-membership are silent no-ops.
    pub fn leave(&mut self, roster: &mut Roster, participant: ParticipantId, room_id: &str) {
        if let Some(room) = self.rooms.get_mut(room_id) {
            room.remove_member(roster, participant);
        }
        self.destroy_if_empty(room_id);
    }

    /// Remove a participant from every room they occupy. Run on disconnect,
    /// before the roster entry is dropped.
    pub fn remove_everywhere(&mut self, roster: &mut Roster, participant: ParticipantId) {
        let occupied: Vec<String> = self
            .rooms
            .iter()
            .filter(|(_, room)| room.core().is_member(participant))
            .map(|(id, _)| id.clone())
            .collect();
        for room_id in occupied {
            self.leave(roster, participant, &room_id);
        }
    }

    /// Propagate a display-name change to every room the participant
    /// occupies.
    pub fn notify_rename(&mut self, roster: &mut Roster, id: ParticipantId, old_norm: &str) {
        for room in self.rooms.values_mut() {
            if room.core().is_member(id) {
                room.handle_rename(roster, id, old_norm);
            }
        }
    }

    /// One summary line per live room, in id order.
    pub fn summaries(&self) -> Vec<RoomSummary> {
        self.rooms.values().map(|room| room.summary()).collect()
    }

    fn destroy_if_empty(&mut self, room_id: &str) {
        if room_id == self.permanent_id {
            return;
        }
        if self
            .rooms
            .get(room_id)
            .is_some_and(|room| room.core().member_count() == 0)
        {
            self.rooms.remove(room_id);
            log::info!("room {room_id} destroyed (empty)");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{TcpListener, TcpStream};

    use pretty_assertions::assert_eq;

    use super::*;

    /// Create a TCP pair: (client_stream, server_stream) on localhost.
    fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    fn roster_with(n: usize) -> (Roster, Vec<ParticipantId>, Vec<TcpStream>) {
        let mut roster = Roster::new();
        let mut ids = Vec::new();
        let mut clients = Vec::new();
        for _ in 0..n {
            let (client, server) = tcp_pair();
            ids.push(roster.register(server));
            clients.push(client);
        }
        (roster, ids, clients)
    }

    #[test]
    fn create_normalizes_the_room_id() {
        let (mut roster, ids, _clients) = roster_with(1);
        let mut directory = Directory::new("Main");
        let id = directory
            .create(&mut roster, ids[0], "jeopardy", "Trivia Night!", "")
            .unwrap();
        assert_eq!(id, "trivianight");
        assert!(directory.contains("trivianight"));
        // The creator was admitted.
        let room = directory.room_mut("trivianight").unwrap();
        assert!(room.core().is_member(ids[0]));
    }

    #[test]
    fn create_rejects_unknown_type() {
        let (mut roster, ids, _clients) = roster_with(1);
        let mut directory = Directory::new("Main");
        assert_eq!(
            directory.create(&mut roster, ids[0], "poker", "Cards", ""),
            Err(CreateRoomError::UnknownRoomType)
        );
        assert_eq!(
            CreateRoomError::UnknownRoomType.to_string(),
            "Invalid room type given."
        );
    }

    #[test]
    fn create_rejects_unaddressable_names() {
        let (mut roster, ids, _clients) = roster_with(1);
        let mut directory = Directory::new("Main");
        assert_eq!(
            directory.create(&mut roster, ids[0], "chat", "!!!", ""),
            Err(CreateRoomError::EmptyName)
        );
        assert_eq!(
            directory.create(&mut roster, ids[0], "chat", "", ""),
            Err(CreateRoomError::EmptyName)
        );
    }

    #[test]
    fn create_rejects_id_conflicts() {
        let (mut roster, ids, _clients) = roster_with(2);
        let mut directory = Directory::new("Main");
        directory
            .create(&mut roster, ids[0], "chat", "Game Night", "")
            .unwrap();
        // Different display name, same normalized id.
        assert_eq!(
            directory.create(&mut roster, ids[1], "chat", "GAME night", ""),
            Err(CreateRoomError::NameConflict)
        );
        // The permanent room's id is taken too.
        assert_eq!(
            directory.create(&mut roster, ids[1], "chat", "MAIN", ""),
            Err(CreateRoomError::NameConflict)
        );
        assert_eq!(
            CreateRoomError::NameConflict.to_string(),
            "A room with that name already exists."
        );
    }

    #[test]
    fn join_checks_the_password() {
        let (mut roster, ids, _clients) = roster_with(2);
        let mut directory = Directory::new("Main");
        directory
            .create(&mut roster, ids[0], "chat", "Vault", "hunter2")
            .unwrap();

        assert_eq!(
            directory.join(&mut roster, ids[1], "vault", ""),
            Err(JoinError::WrongPassword)
        );
        assert_eq!(
            directory.join(&mut roster, ids[1], "vault", "Hunter2"),
            Err(JoinError::WrongPassword)
        );
        directory
            .join(&mut roster, ids[1], "vault", "hunter2")
            .unwrap();
        assert!(directory.room_mut("vault").unwrap().core().is_member(ids[1]));
    }

    #[test]
    fn passwordless_room_ignores_supplied_password() {
        let (mut roster, ids, _clients) = roster_with(2);
        let mut directory = Directory::new("Main");
        directory
            .create(&mut roster, ids[0], "chat", "Open", "")
            .unwrap();

        // A stray password on the join must not lock anyone out of an open
        // room.
        directory
            .join(&mut roster, ids[1], "open", "whatever")
            .unwrap();
        assert!(directory.room_mut("open").unwrap().core().is_member(ids[1]));
        directory.join(&mut roster, ids[0], "main", "stray").unwrap();
    }

    #[test]
    fn join_unknown_room_is_not_found() {
        let (mut roster, ids, _clients) = roster_with(1);
        let mut directory = Directory::new("Main");
        assert_eq!(
            directory.join(&mut roster, ids[0], "nowhere", ""),
            Err(JoinError::NotFound)
        );
    }

    #[test]
    fn room_destroyed_when_last_member_leaves() {
        let (mut roster, ids, _clients) = roster_with(2);
        let mut directory = Directory::new("Main");
        directory
            .create(&mut roster, ids[0], "chat", "Ephemeral", "")
            .unwrap();
        directory.join(&mut roster, ids[1], "ephemeral", "").unwrap();

        directory.leave(&mut roster, ids[0], "ephemeral");
        assert!(directory.contains("ephemeral"));
        directory.leave(&mut roster, ids[1], "ephemeral");
        assert!(!directory.contains("ephemeral"));
    }

    #[test]
    fn permanent_room_survives_emptying() {
        let (mut roster, ids, _clients) = roster_with(1);
        let mut directory = Directory::new("Main");
        directory.join(&mut roster, ids[0], "main", "").unwrap();
        directory.leave(&mut roster, ids[0], "main");
        assert!(directory.contains("main"));
        assert_eq!(directory.permanent_id(), "main");
    }

    #[test]
    fn remove_everywhere_clears_all_memberships() {
        let (mut roster, ids, _clients) = roster_with(2);
        let mut directory = Directory::new("Main");
        directory.join(&mut roster, ids[0], "main", "").unwrap();
        directory
            .create(&mut roster, ids[0], "jeopardy", "Trivia", "")
            .unwrap();
        directory.join(&mut roster, ids[1], "trivia", "").unwrap();

        directory.remove_everywhere(&mut roster, ids[0]);
        assert!(directory.contains("trivia"), "ids[1] still inside");
        assert!(!directory.room_mut("trivia").unwrap().core().is_member(ids[0]));
        assert!(!directory.room_mut("main").unwrap().core().is_member(ids[0]));

        directory.remove_everywhere(&mut roster, ids[1]);
        assert!(!directory.contains("trivia"));
        assert!(directory.contains("main"));
    }

    #[test]
    fn summaries_reflect_live_rooms() {
        let (mut roster, ids, _clients) = roster_with(2);
        let mut directory = Directory::new("Main");
        directory.join(&mut roster, ids[0], "main", "").unwrap();
        directory.join(&mut roster, ids[1], "main", "").unwrap();
        directory
            .create(&mut roster, ids[0], "jeopardy", "Trivia Night", "")
            .unwrap();

        let summaries = directory.summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name, "Main");
        assert_eq!(summaries[0].member_count, 2);
        assert_eq!(summaries[1].name, "Trivia Night");
        assert_eq!(summaries[1].kind, parlor_protocol::types::RoomKind::Jeopardy);
        assert!(!summaries[1].has_password);
    }
}
