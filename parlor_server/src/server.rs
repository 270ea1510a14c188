// TCP server and main event loop.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts new TCP
//   connections and sends `InternalEvent::NewConnection` to the main thread.
// - **Reader threads** (one per participant): call `framing::read_message()`
//   in a loop and send `InternalEvent::MessageFrom` to the main thread. On
//   error/EOF, send `InternalEvent::Disconnected`.
// - **Main thread**: owns the `Roster` and `Directory`, receives events from
//   the channel, and dispatches them one at a time. Single ownership means
//   every room observes a total order over its messages — buzz arbitration
//   and membership changes need no further locking.
//
// The main thread is the only writer to client TCP streams (via
// `Roster::send`). Reader threads only read from streams. This avoids
// concurrent read/write on the same `TcpStream`, which is safe on most
// platforms but fragile.
//
// Shutdown: the main thread checks a `keep_running` flag (set to false by
// `ServerHandle::stop`) and breaks out of the event loop.

use std::io::BufReader;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use parlor_protocol::framing::read_message;
use parlor_protocol::message::{GlobalCommand, ServerMessage, field};
use parlor_protocol::types::{ParticipantId, to_id};

use crate::directory::{Directory, JoinError};
use crate::identity::Roster;

/// Events sent from listener/reader threads to the main thread.
enum InternalEvent {
    NewConnection {
        stream: TcpStream,
    },
    MessageFrom {
        participant_id: ParticipantId,
        frame: String,
    },
    Disconnected {
        participant_id: ParticipantId,
    },
}

/// Handle returned by `start_server` to control the running server.
pub struct ServerHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// Signal the server to stop and wait for it to shut down.
    pub fn stop(self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread {
            let _ = handle.join();
        }
    }
}

/// Configuration for starting a server.
pub struct ServerConfig {
    pub port: u16,
    /// Display name of the permanent room every connection starts in.
    pub permanent_room_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            permanent_room_name: "Main".into(),
        }
    }
}

/// All state the main thread owns. Split out as a struct so handlers can
/// borrow the roster and directory independently.
struct ServerState {
    roster: Roster,
    directory: Directory,
}

/// Start the server on a background thread. Returns a handle for stopping it
/// and the actual bound address (useful when port 0 is used to let the OS
/// pick a free port).
pub fn start_server(config: ServerConfig) -> std::io::Result<(ServerHandle, std::net::SocketAddr)> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", config.port))?;
    let addr = listener.local_addr()?;
    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();

    let thread = thread::spawn(move || {
        run_server(listener, config, keep_running_clone);
    });

    Ok((
        ServerHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Main event loop. Runs until `keep_running` is set to false.
fn run_server(listener: TcpListener, config: ServerConfig, keep_running: Arc<AtomicBool>) {
    let mut state = ServerState {
        roster: Roster::new(),
        directory: Directory::new(&config.permanent_room_name),
    };

    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    // Set the listener to non-blocking so the accept thread can check
    // keep_running periodically.
    listener.set_nonblocking(true).ok();

    // Listener thread: accepts new connections.
    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || {
        while keep_running_listener.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, _addr)) => {
                    stream.set_nonblocking(false).ok();
                    let _ = tx_listener.send(InternalEvent::NewConnection { stream });
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(50));
                }
                Err(_) => break,
            }
        }
    });

    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(event) => {
                handle_event(&mut state, event, &tx, &keep_running);
                // Drain any additional events that arrived during handling.
                while let Ok(event) = rx.try_recv() {
                    handle_event(&mut state, event, &tx, &keep_running);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Dispatch a single event.
fn handle_event(
    state: &mut ServerState,
    event: InternalEvent,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    match event {
        InternalEvent::NewConnection { stream } => {
            handle_new_connection(state, stream, tx, keep_running);
        }
        InternalEvent::MessageFrom {
            participant_id,
            frame,
        } => {
            route_frame(state, participant_id, &frame);
        }
        InternalEvent::Disconnected { participant_id } => {
            log::info!("participant {participant_id} disconnected");
            // Rooms are cleared first so leave/empty-destroy logic still sees
            // a live roster entry.
            state
                .directory
                .remove_everywhere(&mut state.roster, participant_id);
            state.roster.deregister(participant_id);
        }
    }
}

/// Handle a new TCP connection: register the participant under a guest name,
/// place them in the permanent room, and spawn a reader thread.
fn handle_new_connection(
    state: &mut ServerState,
    stream: TcpStream,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    // The roster owns the write half; the reader thread owns the read half.
    let write_stream = match stream.try_clone() {
        Ok(s) => s,
        Err(_) => return,
    };
    let participant_id = state.roster.register(write_stream);
    log::info!("participant {participant_id} connected");

    let permanent = state.directory.permanent_id().to_string();
    if let Err(e) = state
        .directory
        .join(&mut state.roster, participant_id, &permanent, "")
    {
        log::warn!("auto-join of permanent room failed: {e}");
    }

    let tx_reader = tx.clone();
    let keep_running_reader = keep_running.clone();
    thread::spawn(move || {
        reader_loop(BufReader::new(stream), participant_id, tx_reader, keep_running_reader);
    });
}

/// Reader loop for a single participant. Runs in its own thread.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    participant_id: ParticipantId,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match read_message(&mut reader) {
            Ok(frame) => {
                let _ = tx.send(InternalEvent::MessageFrom {
                    participant_id,
                    frame,
                });
            }
            Err(_) => {
                // Read error or EOF — disconnect.
                let _ = tx.send(InternalEvent::Disconnected { participant_id });
                break;
            }
        }
    }
}

/// Route one inbound frame on the *normalized* first field: an empty id
/// addresses the server itself, anything else addresses the room with that
/// id. Frames for unknown rooms and unknown commands are dropped.
fn route_frame(state: &mut ServerState, from: ParticipantId, frame: &str) {
    let fields: Vec<&str> = frame.split('|').collect();
    let room_id = to_id(field(&fields, 0));
    if room_id.is_empty() {
        handle_global(state, from, &fields);
        return;
    }
    if let Some(room) = state.directory.room_mut(&room_id) {
        room.receive_message(&mut state.roster, from, &fields[1..]);
    } else {
        log::debug!("frame for unknown room {room_id} from {from}");
    }
}

/// Handle a global command. Failures that carry wire text are sent back as
/// `|error|...`; the rest are logged and dropped.
fn handle_global(state: &mut ServerState, from: ParticipantId, fields: &[&str]) {
    let Some(command) = GlobalCommand::parse(fields) else {
        log::debug!("unknown global command from {from}");
        return;
    };
    match command {
        GlobalCommand::QueryRooms => {
            let rooms = state.directory.summaries();
            state.roster.send(from, &ServerMessage::RoomList { rooms });
        }
        GlobalCommand::CreateRoom {
            kind_tag,
            name,
            password,
        } => {
            if let Err(e) =
                state
                    .directory
                    .create(&mut state.roster, from, &kind_tag, &name, &password)
            {
                state.roster.send(
                    from,
                    &ServerMessage::Error {
                        message: e.to_string(),
                    },
                );
            }
        }
        GlobalCommand::Join { room_id, password } => {
            match state
                .directory
                .join(&mut state.roster, from, &room_id, &password)
            {
                Ok(()) => {}
                Err(JoinError::WrongPassword) => {
                    state.roster.send(
                        from,
                        &ServerMessage::Error {
                            message: JoinError::WrongPassword.to_string(),
                        },
                    );
                }
                Err(JoinError::NotFound) => {
                    log::debug!("{from} tried to join unknown room {room_id}");
                }
            }
        }
        GlobalCommand::Leave { room_id } => {
            state.directory.leave(&mut state.roster, from, &room_id);
        }
        GlobalCommand::ChangeName { name } => {
            match state.roster.rename(from, &name) {
                Ok(outcome) => {
                    state
                        .directory
                        .notify_rename(&mut state.roster, from, &outcome.old_norm);
                }
                Err(e) => log::debug!("rename rejected for {from}: {e}"),
            }
        }
    }
}
