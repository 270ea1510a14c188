// The Jeopardy room: board, roles, buzz arbitration, scoring.
//
// `JeopardyRoom` layers a game state machine on the room base contract:
//
// - **Board**: exactly 6 categories of 5 questions. Question values are fixed
//   at board creation from the ordinal and a point multiplier. Question text
//   stays hidden from players and spectators until the question is shown;
//   the `asked` flag is monotonic and only a full board remake clears it.
// - **Roles**: every member is exactly one of host, player, or spectator.
//   The first participant to join a fresh room becomes its sole host — there
//   is no host-removal operation. Everyone else starts as a spectator until
//   a host promotes them.
// - **Buzz arbitration**: showing a question snapshots the current player
//   list into the buzz queue and enables buzzing. A buzz wins only if
//   buzzing is enabled and the player is still queued; the winner is dequeued
//   and buzzing disabled in the same step. All room messages are processed on
//   the server's single owner thread, so the check-and-remove is indivisible
//   and exactly one buzz wins per enablement window.
// - **Scoring**: host-confirmed correct answers add the question's value to
//   the player's score. Scores never decrease; wrong answers cost nothing —
//   the host just re-enables buzzing for the remaining queue. A repeated
//   `correct` for the same question awards again; the protocol has no replay
//   guard (see the scoring tests).
//
// Everything a non-host may not do is silently ignored, as are out-of-range
// indices — the protocol is request/notify, not request/response.

use parlor_protocol::message::{RoomCommand, ServerMessage, UiMode};
use parlor_protocol::types::{ParticipantId, RoomKind};

use crate::identity::Roster;
use crate::room::{Room, RoomCore};

pub const NUM_CATEGORIES: usize = 6;
pub const QUESTIONS_PER_CATEGORY: usize = 5;

/// The starting point multiplier for a fresh board (question values are
/// `(ordinal + 1) * multiplier * 100`).
pub const DEFAULT_MULTIPLIER: u32 = 1;

/// One cell of the board.
pub struct Question {
    category: usize,
    ordinal: usize,
    value: u32,
    text: String,
    asked: bool,
    /// Declared for board parity but never set or read by any operation.
    _daily_double: bool,
}

impl Question {
    fn new(category: usize, ordinal: usize, multiplier: u32) -> Self {
        #[expect(clippy::cast_possible_truncation)]
        let value = (ordinal as u32 + 1) * multiplier * 100;
        Self {
            category,
            ordinal,
            value,
            text: String::new(),
            asked: false,
            _daily_double: false,
        }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn asked(&self) -> bool {
        self.asked
    }
}

/// A column of the board: a name and its questions in value order.
pub struct Category {
    name: String,
    questions: Vec<Question>,
}

impl Category {
    fn new(ordinal: usize, multiplier: u32) -> Self {
        Self {
            name: format!("Category {ordinal}"),
            questions: (0..QUESTIONS_PER_CATEGORY)
                .map(|q| Question::new(ordinal, q, multiplier))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The fixed 6x5 question grid.
pub struct Board {
    categories: Vec<Category>,
}

impl Board {
    pub fn new(multiplier: u32) -> Self {
        Self {
            categories: (0..NUM_CATEGORIES)
                .map(|c| Category::new(c, multiplier))
                .collect(),
        }
    }

    pub fn question(&self, category: usize, question: usize) -> Option<&Question> {
        self.categories.get(category)?.questions.get(question)
    }

    fn question_mut(&mut self, category: usize, question: usize) -> Option<&mut Question> {
        self.categories.get_mut(category)?.questions.get_mut(question)
    }

    pub fn category(&self, category: usize) -> Option<&Category> {
        self.categories.get(category)
    }

    fn category_mut(&mut self, category: usize) -> Option<&mut Category> {
        self.categories.get_mut(category)
    }

    /// The wire form of the board: one line per category,
    /// `cat|Name|q1|$1|q2|$2|...`. A question's text field is blanked unless
    /// `show_hidden` (the host form) or the question has been asked.
    pub fn encode(&self, show_hidden: bool) -> String {
        let mut lines = Vec::with_capacity(self.categories.len());
        for category in &self.categories {
            let mut line = format!("cat|{}", category.name);
            for question in &category.questions {
                if show_hidden || question.asked {
                    line.push_str(&format!("|{}|{}", question.text, question.value));
                } else {
                    line.push_str(&format!("||{}", question.value));
                }
            }
            lines.push(line);
        }
        lines.join("\n")
    }
}

/// A participant promoted to player, with their running score.
struct PlayerEntry {
    id: ParticipantId,
    score: u32,
}

/// A room playing host-moderated trivia.
pub struct JeopardyRoom {
    core: RoomCore,
    board: Board,
    hosts: Vec<ParticipantId>,
    players: Vec<PlayerEntry>,
    /// Ordered subset of players still eligible to buzz for the current
    /// question; repopulated on every reveal.
    buzz_queue: Vec<ParticipantId>,
    buzz_enabled: bool,
}

impl JeopardyRoom {
    pub fn new(name: &str, password: &str) -> Self {
        Self {
            core: RoomCore::new(name, password),
            board: Board::new(DEFAULT_MULTIPLIER),
            hosts: Vec::new(),
            players: Vec::new(),
            buzz_queue: Vec::new(),
            buzz_enabled: false,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn is_host(&self, id: ParticipantId) -> bool {
        self.hosts.contains(&id)
    }

    pub fn is_player(&self, id: ParticipantId) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    /// A spectator is a member who is neither host nor player.
    pub fn is_spectator(&self, id: ParticipantId) -> bool {
        self.core.is_member(id) && !self.is_host(id) && !self.is_player(id)
    }

    pub fn score_of(&self, id: ParticipantId) -> Option<u32> {
        self.players.iter().find(|p| p.id == id).map(|p| p.score)
    }

    pub fn buzzing_enabled(&self) -> bool {
        self.buzz_enabled
    }

    pub fn buzz_queue_len(&self) -> usize {
        self.buzz_queue.len()
    }

    /// Promote a spectator to player: score 0, buzz control enabled on their
    /// client, roster update broadcast. No-op for hosts and existing players.
    fn set_player(&mut self, roster: &mut Roster, target: ParticipantId) {
        if !self.is_spectator(target) {
            return;
        }
        let Some(name) = roster.name_of(target).map(str::to_string) else {
            return;
        };
        self.players.push(PlayerEntry {
            id: target,
            score: 0,
        });
        self.core.broadcast(
            roster,
            &ServerMessage::PlayerScore {
                room: self.core.id().to_string(),
                name,
                score: 0,
            },
        );
        roster.send(
            target,
            &ServerMessage::UiMode {
                room: self.core.id().to_string(),
                mode: UiMode::Player,
            },
        );
    }

    /// Demote a player back to spectator. Also drops them from the buzz
    /// queue so the queue stays a subset of the player list.
    fn set_spectator(&mut self, roster: &mut Roster, target: ParticipantId) {
        if !self.is_player(target) {
            return;
        }
        let Some(norm_id) = roster.norm_of(target) else {
            return;
        };
        self.players.retain(|p| p.id != target);
        self.buzz_queue.retain(|id| *id != target);
        self.core.broadcast(
            roster,
            &ServerMessage::Spectator {
                room: self.core.id().to_string(),
                norm_id,
            },
        );
        roster.send(
            target,
            &ServerMessage::UiMode {
                room: self.core.id().to_string(),
                mode: UiMode::Spectator,
            },
        );
    }

    /// Update a question's text. Broadcast to everyone once asked; to hosts
    /// only while the text is still hidden.
    fn change_question(
        &mut self,
        roster: &mut Roster,
        category: usize,
        question: usize,
        text: String,
    ) {
        let Some(q) = self.board.question_mut(category, question) else {
            return;
        };
        q.text = text;
        self.broadcast_question(roster, category, question);
    }

    /// Reveal a question: mark it asked (monotonic), reset the buzz queue to
    /// the current player list, open buzzing, and show the text to everyone.
    fn show_question(&mut self, roster: &mut Roster, category: usize, question: usize) {
        if self.board.question(category, question).is_none() {
            return;
        }
        self.buzz_queue = self.players.iter().map(|p| p.id).collect();
        self.set_buzzing(roster, true);
        if let Some(q) = self.board.question_mut(category, question) {
            q.asked = true;
        }
        self.broadcast_question(roster, category, question);
    }

    /// Rename a category; always broadcast regardless of asked state.
    fn change_category(&mut self, roster: &mut Roster, category: usize, text: String) {
        let Some(cat) = self.board.category_mut(category) else {
            return;
        };
        cat.name = text.clone();
        self.core.broadcast(
            roster,
            &ServerMessage::Category {
                room: self.core.id().to_string(),
                category,
                text,
            },
        );
    }

    /// Award a question's value to a player and broadcast the new score.
    /// Buzzing is disabled as a defensive reset. Note: there is no replay
    /// guard — a second `correct` for the same question awards again.
    fn correct_answer(
        &mut self,
        roster: &mut Roster,
        category: usize,
        question: usize,
        target: ParticipantId,
    ) {
        if !self.is_player(target) {
            return;
        }
        let Some(value) = self.board.question(category, question).map(Question::value) else {
            return;
        };
        self.set_buzzing(roster, false);
        let Some(player) = self.players.iter_mut().find(|p| p.id == target) else {
            return;
        };
        player.score += value;
        let score = player.score;
        let Some(name) = roster.name_of(target).map(str::to_string) else {
            return;
        };
        self.core.broadcast(
            roster,
            &ServerMessage::PlayerScore {
                room: self.core.id().to_string(),
                name,
                score,
            },
        );
    }

    /// A buzz attempt. Wins only if buzzing is enabled and the player is
    /// still queued; the winner is dequeued and buzzing disabled in the same
    /// step, so exactly one buzz wins per enablement window.
    fn buzz_in(&mut self, roster: &mut Roster, from: ParticipantId) {
        if !self.buzz_enabled || !self.buzz_queue.contains(&from) {
            return;
        }
        self.buzz_queue.retain(|id| *id != from);
        self.set_buzzing(roster, false);
        let Some(name) = roster.name_of(from) else {
            return;
        };
        let msg = ServerMessage::Chat {
            room: self.core.id().to_string(),
            text: format!("{name} has buzzed in!"),
        };
        self.core.broadcast(roster, &msg);
    }

    /// Flip the buzz gate. Enabling notifies the queued players; disabling
    /// notifies every player.
    fn set_buzzing(&mut self, roster: &mut Roster, enabled: bool) {
        self.buzz_enabled = enabled;
        log::debug!("room {}: buzzing set to {enabled}", self.core.id());
        if enabled {
            for id in self.buzz_queue.iter().copied() {
                roster.send(
                    id,
                    &ServerMessage::CanBuzz {
                        room: self.core.id().to_string(),
                    },
                );
            }
        } else {
            for id in self.players.iter().map(|p| p.id) {
                roster.send(
                    id,
                    &ServerMessage::CantBuzz {
                        room: self.core.id().to_string(),
                    },
                );
            }
        }
    }

    /// Remake the board with a new multiplier, discarding all text and asked
    /// state, and push the fresh board to every member — hosts get the
    /// unhidden form.
    fn remake_board(&mut self, roster: &mut Roster, multiplier: u32) {
        self.board = Board::new(multiplier);
        let host_board = self.board.encode(true);
        let hidden_board = self.board.encode(false);
        for member in self.core.member_ids().collect::<Vec<_>>() {
            let board = if self.is_host(member) {
                host_board.clone()
            } else {
                hidden_board.clone()
            };
            roster.send(
                member,
                &ServerMessage::Board {
                    room: self.core.id().to_string(),
                    board,
                },
            );
        }
    }

    /// Send a question's current text to everyone if it has been asked,
    /// otherwise to hosts only (unrevealed content stays hidden).
    fn broadcast_question(&self, roster: &mut Roster, category: usize, question: usize) {
        let Some(q) = self.board.question(category, question) else {
            return;
        };
        let msg = ServerMessage::Question {
            room: self.core.id().to_string(),
            category: q.category,
            question: q.ordinal,
            text: q.text.clone(),
        };
        if q.asked {
            self.core.broadcast(roster, &msg);
        } else {
            for host in self.hosts.iter().copied() {
                roster.send(host, &msg);
            }
        }
    }
}

impl Room for JeopardyRoom {
    fn kind(&self) -> RoomKind {
        RoomKind::Jeopardy
    }

    fn core(&self) -> &RoomCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut RoomCore {
        &mut self.core
    }

    fn init_state(&self) -> String {
        format!(
            "Welcome to {}\n{}",
            self.core.name(),
            self.board.encode(false)
        )
    }

    /// The first participant to join a fresh room becomes its sole host.
    fn add_member(&mut self, roster: &mut Roster, id: ParticipantId) {
        if !self.core.insert_member(id) {
            return;
        }
        let init = self.init_message_for(id);
        roster.send(id, &init);
        if self.core.member_count() == 1 {
            self.hosts.push(id);
            log::debug!("room {}: {id} is now host", self.core.id());
        }
    }

    /// Membership removal also clears the leaver's role labels — roles only
    /// exist over present members.
    fn remove_member(&mut self, roster: &mut Roster, id: ParticipantId) {
        if !self.core.remove_member(id) {
            return;
        }
        self.hosts.retain(|h| *h != id);
        self.players.retain(|p| p.id != id);
        self.buzz_queue.retain(|b| *b != id);
        roster.send(
            id,
            &ServerMessage::Deinit {
                room: self.core.id().to_string(),
            },
        );
    }

    fn receive_message(&mut self, roster: &mut Roster, from: ParticipantId, fields: &[&str]) {
        if !self.core.is_member(from) {
            return;
        }
        let Some(command) = RoomCommand::parse(fields) else {
            return;
        };
        match command {
            RoomCommand::Text(text) => {
                let Some(sender) = roster.name_of(from) else {
                    return;
                };
                let msg = ServerMessage::Chat {
                    room: self.core.id().to_string(),
                    text: format!("{sender}: {text}"),
                };
                self.core.broadcast(roster, &msg);
            }
            RoomCommand::Buzz => self.buzz_in(roster, from),
            // Everything below is host-only; from anyone else it is ignored.
            _ if !self.is_host(from) => {}
            RoomCommand::SetQuestion {
                category,
                question,
                text,
            } => self.change_question(roster, category, question, text),
            RoomCommand::ShowQuestion { category, question } => {
                self.show_question(roster, category, question);
            }
            RoomCommand::SetCategory { category, text } => {
                self.change_category(roster, category, text);
            }
            RoomCommand::SetSpectator { target } => self.set_spectator(roster, target),
            RoomCommand::SetPlayer { target } => self.set_player(roster, target),
            RoomCommand::Correct {
                category,
                question,
                target,
            } => self.correct_answer(roster, category, question, target),
            RoomCommand::BuzzOn => self.set_buzzing(roster, true),
            RoomCommand::BuzzOff => self.set_buzzing(roster, false),
            RoomCommand::RemakeBoard { multiplier } => self.remake_board(roster, multiplier),
        }
    }
}
