//! CLI utilities for the debug client.
//!
//! The debug client reads raw socketmap requests (`<table> <key>`) from the
//! terminal, one per line, and prints the daemon's replies.
use std::io::{self, BufRead, Write};

pub const PROMPT: &str = "socketmap> ";

/// Possible commands from a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Exit command `.exit`
    Exit,
    /// A request to forward verbatim.
    Request(String),
}

/// Prompt user for the next command.
///
/// Returns `None` once `reader` is exhausted.
pub fn prompt<R, W>(mut reader: R, mut writer: W) -> io::Result<Option<Command>>
where
    R: BufRead,
    W: Write,
{
    let mut s = String::default();
    write!(&mut writer, "{PROMPT}")?;
    writer.flush()?;

    if reader.read_line(&mut s)? == 0 {
        return Ok(None);
    }

    match s.trim_end_matches(['\r', '\n']) {
        ".exit" => Ok(Some(Command::Exit)),
        s => Ok(Some(Command::Request(s.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_prints_correctly() {
        let input = b".exit\n";
        let mut output = Vec::new();

        prompt(&input[..], &mut output).unwrap();

        let output = String::from_utf8(output).expect("not valid UTF-8");
        assert_eq!(PROMPT, output);
    }

    #[test]
    fn prompt_handles_exit() {
        let input = b".exit\r\n";
        let res = prompt(&input[..], Vec::new()).unwrap();

        assert_eq!(Some(Command::Exit), res);
    }

    #[test]
    fn prompt_keeps_request_spacing() {
        let input = b"virtual  john doe@example.com \n";
        let res = prompt(&input[..], Vec::new()).unwrap();

        assert_eq!(
            Some(Command::Request("virtual  john doe@example.com ".to_string())),
            res
        );
    }

    #[test]
    fn prompt_end_of_input() {
        let input = b"";
        let res = prompt(&input[..], Vec::new()).unwrap();

        assert_eq!(None, res);
    }
}
