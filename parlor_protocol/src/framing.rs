// Length-delimited message framing over TCP.
//
// Provides the wire format for `message.rs` payloads: a 4-byte big-endian
// length prefix followed by a UTF-8 text payload. Pipe-delimited messages may
// contain embedded newlines (board dumps), so line-based framing would split
// messages apart; the length prefix keeps the stream self-delimiting.
//
// A `MAX_MESSAGE_SIZE` constant protects against unbounded allocation from
// malformed or malicious length prefixes. Board init dumps are the largest
// expected messages and stay well under a kilobyte.

use std::io::{self, Read, Write};

/// Maximum allowed message size (64 KB). Protects against unbounded
/// allocation from malformed length prefixes. The largest legitimate
/// messages are board dumps and room lists, both far smaller.
pub const MAX_MESSAGE_SIZE: u32 = 64 * 1024;

/// Write a length-delimited message: 4-byte big-endian length, then the
/// UTF-8 payload.
pub fn write_message<W: Write>(writer: &mut W, msg: &str) -> io::Result<()> {
    let len = msg.len();
    if len > MAX_MESSAGE_SIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("message too large: {len} bytes (max {MAX_MESSAGE_SIZE})"),
        ));
    }
    #[expect(clippy::cast_possible_truncation)]
    let len_bytes = (len as u32).to_be_bytes();
    writer.write_all(&len_bytes)?;
    writer.write_all(msg.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Read a length-delimited message: 4-byte big-endian length, then payload.
///
/// Returns `UnexpectedEof` if the stream closes cleanly before or during a
/// message. Returns `InvalidData` if the length exceeds `MAX_MESSAGE_SIZE`
/// or the payload is not valid UTF-8.
pub fn read_message<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("message too large: {len} bytes (max {MAX_MESSAGE_SIZE})"),
        ));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    String::from_utf8(buf)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("invalid UTF-8: {e}")))
}
