// Test-only client for parlor integration tests.
//
// Wraps the real `NetClient` (from `parlor_server::client`) to provide a
// synchronous, test-friendly API for exercising the full pipeline:
// connect → create/join room → room commands → broadcasts → verify.
//
// The only test-specific code here is the synchronous polling wrappers
// (blocking loops around `NetClient::poll()`). All networking uses the same
// code paths as a real client.
//
// See also: `tests/full_pipeline.rs` for the integration test scenarios.

use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

use parlor_protocol::message::{RoomSummary, ServerMessage};
use parlor_server::client::{InitialRoom, NetClient};

/// Default timeout for blocking poll operations.
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep duration between poll attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A test client wrapping a real NetClient. Polled messages that a wait
/// didn't ask for are held in `pending`, so broadcasts arriving in the same
/// batch stay available to later waits.
pub struct TestClient {
    client: NetClient,
    pending: VecDeque<ServerMessage>,
    /// The permanent room's init, read during connect.
    pub initial: InitialRoom,
}

impl TestClient {
    /// Connect to a server. The server has already placed us in the
    /// permanent room by the time this returns.
    pub fn connect(addr: std::net::SocketAddr) -> Self {
        let (client, initial) =
            NetClient::connect(&addr.to_string()).expect("TestClient::connect failed");
        Self {
            client,
            pending: VecDeque::new(),
            initial,
        }
    }

    /// Connect and immediately request a display name.
    pub fn connect_named(addr: std::net::SocketAddr, name: &str) -> Self {
        let mut this = Self::connect(addr);
        this.client.change_name(name).expect("change_name failed");
        this
    }

    /// Send a pre-formatted frame verbatim.
    pub fn send_raw(&mut self, frame: &str) {
        self.client.send_raw(frame).expect("send_raw failed");
    }

    pub fn query_rooms(&mut self) {
        self.client.query_rooms().expect("query_rooms failed");
    }

    pub fn create_room(&mut self, kind_tag: &str, name: &str, password: &str) {
        self.client
            .create_room(kind_tag, name, password)
            .expect("create_room failed");
    }

    pub fn join_room(&mut self, room: &str, password: &str) {
        self.client
            .join_room(room, password)
            .expect("join_room failed");
    }

    pub fn leave_room(&mut self, room: &str) {
        self.client.leave_room(room).expect("leave_room failed");
    }

    pub fn chat(&mut self, room: &str, text: &str) {
        self.client.chat(room, text).expect("chat failed");
    }

    pub fn buzz(&mut self, room: &str) {
        self.client.buzz(room).expect("buzz failed");
    }

    /// Raw poll: return all buffered and pending server messages without
    /// waiting.
    pub fn poll_raw(&mut self) -> Vec<ServerMessage> {
        let mut messages: Vec<ServerMessage> = self.pending.drain(..).collect();
        messages.extend(self.client.poll());
        messages
    }

    /// Blocking poll until a message matching `pred` arrives. Non-matching
    /// messages stay buffered for later waits, so broadcasts can be awaited
    /// in any order regardless of how they batch up on the wire.
    pub fn wait_for(
        &mut self,
        what: &str,
        pred: impl Fn(&ServerMessage) -> bool,
    ) -> ServerMessage {
        let start = Instant::now();
        loop {
            if let Some(index) = self.pending.iter().position(|m| pred(m)) {
                return self.pending.remove(index).expect("index is in range");
            }
            assert!(
                start.elapsed() < POLL_TIMEOUT,
                "timed out waiting for {what}"
            );
            let polled = self.client.poll();
            if polled.is_empty() {
                thread::sleep(POLL_INTERVAL);
            } else {
                self.pending.extend(polled);
            }
        }
    }

    /// Blocking poll until an init for the named room arrives. Returns the
    /// state dump.
    pub fn wait_for_init(&mut self, room_name: &str) -> String {
        let msg = self.wait_for("init", |m| {
            matches!(m, ServerMessage::Init { name, .. } if name == room_name)
        });
        match msg {
            ServerMessage::Init { state, .. } => state,
            _ => unreachable!(),
        }
    }

    /// Blocking poll until a room list arrives.
    pub fn wait_for_room_list(&mut self) -> Vec<RoomSummary> {
        let msg = self.wait_for("roomlist", |m| matches!(m, ServerMessage::RoomList { .. }));
        match msg {
            ServerMessage::RoomList { rooms } => rooms,
            _ => unreachable!(),
        }
    }

    /// Give in-flight messages time to arrive, then drain everything.
    pub fn settle(&mut self) -> Vec<ServerMessage> {
        thread::sleep(Duration::from_millis(150));
        self.poll_raw()
    }
}
