// TCP client for connecting to a parlor server.
//
// Provides a non-blocking interface for UIs and tests to talk to the server.
// Architecture:
// - `connect()` performs the TCP connect on the calling thread and reads the
//   first message — the init for the permanent room every connection is
//   placed in — then spawns a background reader thread.
// - The reader thread calls `read_message()` in a loop, parses each frame
//   into a `ServerMessage`, and pushes into an `mpsc` channel.
// - The main thread holds a `BufWriter<TcpStream>` for sending.
// - `poll()` drains the inbox non-blocking, returning all queued messages.
//
// This separation ensures the caller never blocks on network I/O. The reader
// thread handles the blocking reads, and the writer flushes synchronously
// (acceptable for the small messages we send).
//
// Typed senders cover the global commands and the common room commands;
// `send_raw` takes any pre-formatted frame for the rest (the host-side
// Jeopardy vocabulary is long, and tests exercise it directly).

use std::io::{BufReader, BufWriter, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use parlor_protocol::framing::{read_message, write_message};
use parlor_protocol::message::ServerMessage;
use parlor_protocol::types::RoomKind;

/// The permanent room's init, read during `connect()`.
pub struct InitialRoom {
    pub kind: RoomKind,
    pub name: String,
    pub state: String,
}

/// TCP client for parlor communication.
pub struct NetClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<ServerMessage>,
    _reader_thread: Option<JoinHandle<()>>,
}

impl NetClient {
    /// Connect to a server, read the permanent room's init message, and
    /// spawn a reader thread. Returns the client and the initial room info.
    pub fn connect(addr: &str) -> Result<(Self, InitialRoom), String> {
        let stream = TcpStream::connect(addr).map_err(|e| format!("connect failed: {e}"))?;

        // Set a read timeout so a misbehaving server can't hang the connect.
        stream
            .set_read_timeout(Some(std::time::Duration::from_secs(5)))
            .ok();

        let reader_stream = stream
            .try_clone()
            .map_err(|e| format!("clone failed: {e}"))?;
        let writer = BufWriter::new(stream);

        let mut reader = BufReader::new(reader_stream);
        let first = read_message(&mut reader).map_err(|e| format!("read init failed: {e}"))?;
        let initial = match ServerMessage::parse(&first) {
            Some(ServerMessage::Init { kind, name, state }) => InitialRoom { kind, name, state },
            other => return Err(format!("unexpected first message: {other:?}")),
        };

        // Clear the read timeout for the long-lived reader loop.
        if let Ok(inner) = reader.get_ref().try_clone() {
            inner.set_read_timeout(None).ok();
        }

        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || {
            reader_loop(reader, tx);
        });

        Ok((
            Self {
                writer,
                inbox: rx,
                _reader_thread: Some(reader_thread),
            },
            initial,
        ))
    }

    /// Send a pre-formatted frame verbatim.
    pub fn send_raw(&mut self, frame: &str) -> Result<(), String> {
        write_message(&mut self.writer, frame).map_err(|e| format!("send failed: {e}"))
    }

    /// Request the current room list.
    pub fn query_rooms(&mut self) -> Result<(), String> {
        self.send_raw("|queryRooms")
    }

    /// Create a room (and join it).
    pub fn create_room(&mut self, kind_tag: &str, name: &str, password: &str) -> Result<(), String> {
        self.send_raw(&format!("|createRoom|{kind_tag}|{name}|{password}"))
    }

    /// Join an existing room by id or display name.
    pub fn join_room(&mut self, room: &str, password: &str) -> Result<(), String> {
        self.send_raw(&format!("|join|{room}|{password}"))
    }

    /// Leave a room.
    pub fn leave_room(&mut self, room: &str) -> Result<(), String> {
        self.send_raw(&format!("|leave|{room}"))
    }

    /// Request a display-name change.
    pub fn change_name(&mut self, name: &str) -> Result<(), String> {
        self.send_raw(&format!("|cn|{name}"))
    }

    /// Send a chat message to a room.
    pub fn chat(&mut self, room: &str, text: &str) -> Result<(), String> {
        self.send_raw(&format!("{room}|t|{text}"))
    }

    /// Buzz in (Jeopardy rooms).
    pub fn buzz(&mut self, room: &str) -> Result<(), String> {
        self.send_raw(&format!("{room}|buzz"))
    }

    /// Drain all queued server messages (non-blocking).
    pub fn poll(&self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.inbox.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Close the connection. Shutting down both halves unblocks the reader
    /// thread (which holds its own clone of the stream) and lets the server
    /// observe the disconnect; dropping the write half alone would leave the
    /// socket open through that clone.
    pub fn disconnect(&mut self) {
        let _ = self.writer.flush();
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }
}

impl Drop for NetClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Reader thread: read framed messages in a loop, push to channel.
fn reader_loop(mut reader: BufReader<TcpStream>, tx: mpsc::Sender<ServerMessage>) {
    while let Ok(frame) = read_message(&mut reader) {
        match ServerMessage::parse(&frame) {
            Some(msg) => {
                if tx.send(msg).is_err() {
                    break; // Main thread dropped the receiver
                }
            }
            None => break, // Malformed message
        }
    }
}
