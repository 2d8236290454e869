//! Netstring framing.
//!
//! Every request and response travels as a netstring: the payload length in
//! ASCII decimal, a `:`, the payload bytes and a trailing `,`.
//!
//! ```text
//! 12:hello world!,
//! ```
//!
//! The decoder reads byte by byte so it never consumes anything past the end
//! of the current frame. Lengths are capped at [`MAX_LENGTH_DIGITS`] digits
//! and may not carry leading zeros (`0:` is the only way to spell an empty
//! payload).
use std::io::{self, ErrorKind, Read, Write};

use log::trace;
use thiserror::Error;

/// Longest accepted length prefix.
pub const MAX_LENGTH_DIGITS: usize = 10;

const LENGTH_DELIMITER: u8 = b':';
const TERMINATOR: u8 = b',';

#[derive(Debug, Error)]
pub enum NetstringError {
    #[error("malformed netstring: {0}")]
    Malformed(&'static str),
    #[error("netstring IO error: {0}")]
    Io(#[from] io::Error),
}

impl NetstringError {
    pub fn is_malformed(&self) -> bool {
        matches!(self, NetstringError::Malformed(_))
    }
}

/// Reads a single netstring from `reader`.
///
/// Returns `Ok(None)` when the stream ends cleanly before a new frame starts.
pub fn read_netstring<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>, NetstringError> {
    let mut digits = String::with_capacity(MAX_LENGTH_DIGITS);

    loop {
        let byte = match read_byte(reader)? {
            Some(byte) => byte,
            None if digits.is_empty() => return Ok(None),
            None => return Err(NetstringError::Malformed("stream ended inside length")),
        };

        match byte {
            LENGTH_DELIMITER if digits.is_empty() => {
                return Err(NetstringError::Malformed("missing length"));
            }
            LENGTH_DELIMITER => break,
            b'0'..=b'9' => {
                if digits == "0" {
                    return Err(NetstringError::Malformed("leading zero in length"));
                }
                if digits.len() == MAX_LENGTH_DIGITS {
                    return Err(NetstringError::Malformed("length too long"));
                }
                digits.push(byte as char);
            }
            _ => return Err(NetstringError::Malformed("non-digit in length")),
        }
    }

    let length: u64 = digits
        .parse()
        .map_err(|_| NetstringError::Malformed("unparsable length"))?;
    trace!("reading netstring payload of {length} bytes");

    // Grow with the data actually received rather than trusting the prefix.
    let mut payload = Vec::new();
    let read = reader.by_ref().take(length).read_to_end(&mut payload)?;
    if (read as u64) < length {
        return Err(NetstringError::Malformed("truncated payload"));
    }

    match read_byte(reader)? {
        Some(TERMINATOR) => Ok(Some(payload)),
        Some(_) => Err(NetstringError::Malformed("missing terminator")),
        None => Err(NetstringError::Malformed("stream ended before terminator")),
    }
}

/// Writes `payload` as a single netstring and flushes `writer`.
pub fn write_netstring<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    write!(writer, "{}:", payload.len())?;
    writer.write_all(payload)?;
    writer.write_all(&[TERMINATOR])?;
    writer.flush()
}

fn read_byte<R: Read>(reader: &mut R) -> io::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
