use std::{
    io::{self, Read, Write},
    time::Duration,
};

use log::trace;
use thiserror::Error;

use super::{
    Response,
    netstring::{NetstringError, read_netstring, write_netstring},
    pump::InputPump,
};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to decode request: {0}")]
    Netstring(#[from] NetstringError),
    #[error("Transport IO Error: {0}")]
    Io(#[from] io::Error),
}

/// Netstring transport over a pair of byte streams.
pub struct ProtocolTransport<W: Write> {
    input: InputPump,
    output: W,
}

impl<W: Write> ProtocolTransport<W> {
    pub fn new<R>(input: R, output: W) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        Ok(Self {
            input: InputPump::spawn(input)?,
            output,
        })
    }

    /// Returns `false` if nothing arrived within `timeout`.
    pub fn wait_for_request(&mut self, timeout: Duration) -> bool {
        self.input.wait_ready(timeout)
    }

    /// Reads the next request frame, `None` once the peer has closed.
    pub fn read_request(&mut self) -> Result<Option<Vec<u8>>, NetstringError> {
        let frame = read_netstring(&mut self.input)?;
        trace!("read frame: {:?}", frame.as_deref().map(String::from_utf8_lossy));
        Ok(frame)
    }

    pub fn write_response(&mut self, resp: &Response) -> Result<(), TransportError> {
        write_netstring(&mut self.output, resp.to_string().as_bytes())?;
        Ok(())
    }

    pub fn into_output(self) -> W {
        self.output
    }
}
