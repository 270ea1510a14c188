// parlor_protocol — wire protocol for the Parlor room server.
//
// This crate defines the message vocabulary, framing, and identifier
// normalization used by the room server (`parlor_server`) and its clients to
// communicate over TCP. It is shared between both sides and has no dependency
// on the server's state machinery.
//
// Module overview:
// - `types.rs`:    Identifier types and normalization — `ParticipantId`,
//                  `RoomKind`, `to_id`, `clean_name`.
// - `message.rs`:  The pipe-delimited message vocabulary: inbound global and
//                  room commands, outbound server messages, room summaries.
// - `framing.rs`:  Length-delimited framing over any `Read`/`Write` stream:
//                  4-byte big-endian length prefix, then a UTF-8 text payload.
//
// Design decisions:
// - **Pipe-delimited text.** Every message is a `|`-separated field sequence.
//   Field 0 is either empty (global command) or a room id (room-targeted
//   message). Display names and room names are cleaned of `|` and `,` before
//   use, so field boundaries stay unambiguous; free-text fields are always
//   last and rejoin any remaining separators.
// - **Length-prefixed framing.** Payloads may contain embedded newlines
//   (board dumps), so line-based framing is out; a length prefix keeps the
//   stream self-delimiting.
// - **No async runtime.** Uses `std::io::Read`/`Write` for framing, compatible
//   with both blocking TCP streams and buffered wrappers.

pub mod framing;
pub mod message;
pub mod types;

pub use framing::{MAX_MESSAGE_SIZE, read_message, write_message};
pub use message::{GlobalCommand, RoomCommand, RoomSummary, ServerMessage, UiMode};
pub use types::{ParticipantId, RoomKind, UnknownRoomKind, clean_name, to_id};
