// parlor_server — multi-room chat and trivia server.
//
// A small TCP server hosting named rooms that participants join over
// persistent duplex connections. Every connection starts in the permanent
// room; participants can list, create, join, and leave rooms, and change
// their display name. Chat rooms rebroadcast messages; Jeopardy rooms run a
// host-moderated trivia game with a 6x5 board, buzz arbitration, and scoring.
//
// Module overview:
// - `identity.rs`:  The `Roster` — canonical store of connected participants,
//                   their display names, and the write half of each
//                   connection. All outbound sends go through it.
// - `room.rs`:      The `Room` trait, shared `RoomCore` state, the Base and
//                   Chat variants, and the room factory.
// - `jeopardy.rs`:  The Jeopardy room — board, roles, buzz arbitration, and
//                   scoring.
// - `directory.rs`: The room directory — creation, join/leave, the permanent
//                   room, and empty-room destruction.
// - `server.rs`:    TCP listener, reader threads (one per participant), and
//                   the main event loop. Uses `std::net` with a
//                   thread-per-reader architecture and an `mpsc` channel to
//                   funnel events into the single owner thread.
// - `client.rs`:    A non-blocking TCP client for UIs and integration tests.
//
// Dependencies: `parlor_protocol` (shared message vocabulary and framing).
//
// The server can run as a standalone binary (`main.rs`) or be embedded in
// another process via the library API (`start_server`).

pub mod client;
pub mod directory;
pub mod identity;
pub mod jeopardy;
pub mod room;
pub mod server;

pub use client::NetClient;
pub use server::{ServerConfig, start_server};
