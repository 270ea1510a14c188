// CLI entry point for the parlor server.
//
// Starts a standalone server that clients connect to over TCP. See
// `server.rs` for the networking architecture and `directory.rs` for room
// lifecycle.
//
// Usage:
//   parlor [OPTIONS]
//     --port <PORT>    Listen port (default: 8000)
//     --room <NAME>    Permanent room name (default: Main)

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parlor_server::server::{ServerConfig, start_server};

fn main() {
    env_logger::init();
    let config = parse_args();

    let (handle, addr) = match start_server(config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Failed to start server: {e}");
            std::process::exit(1);
        }
    };

    println!("Parlor listening on {addr}");
    println!("Press Ctrl+C to stop.");

    // The process exits on SIGINT/SIGTERM by default, which is fine here —
    // there is no state to persist. Wire the flag to the `ctrlc` crate if a
    // graceful shutdown path is ever needed.
    let running = Arc::new(AtomicBool::new(true));
    while running.load(Ordering::SeqCst) {
        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    println!("\nShutting down...");
    handle.stop();
}

/// Parse command-line arguments into a `ServerConfig`. Uses simple
/// `std::env::args()` matching — no clap dependency.
fn parse_args() -> ServerConfig {
    let mut config = ServerConfig::default();
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                i += 1;
                config.port = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--port requires a valid port number");
                    std::process::exit(1);
                });
            }
            "--room" => {
                i += 1;
                config.permanent_room_name = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--room requires a value");
                    std::process::exit(1);
                });
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    config
}

fn print_usage() {
    println!("Usage: parlor [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --port <PORT>    Listen port (default: 8000)");
    println!("  --room <NAME>    Permanent room name (default: Main)");
    println!("  --help, -h       Show this help");
}
