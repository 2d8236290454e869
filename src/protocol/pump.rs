//! Input pump with bounded readiness waits.
//!
//! Blocking reads on stdin cannot be given a deadline, so a dedicated worker
//! thread performs them and forwards chunks over a channel. The session waits
//! on that channel with a timeout to find out whether a request is pending.
use std::{
    io::{self, ErrorKind, Read},
    sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError},
    thread,
    time::Duration,
};

use log::{debug, trace};

const CHUNK_SIZE: usize = 4096;
/// Chunks read ahead of the session before the pump blocks.
const READ_AHEAD: usize = 16;

#[derive(Debug)]
enum Chunk {
    Data(Vec<u8>),
    Failed(io::Error),
}

/// Reader half fed by a background thread.
#[derive(Debug)]
pub struct InputPump {
    receiver: Receiver<Chunk>,
    pending: Vec<u8>,
    offset: usize,
    error: Option<io::Error>,
    closed: bool,
}

impl InputPump {
    pub fn spawn<R>(mut source: R) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel(READ_AHEAD);

        thread::Builder::new()
            .name("input-pump".to_string())
            .spawn(move || {
                let mut buf = vec![0u8; CHUNK_SIZE];
                loop {
                    let chunk = match source.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => Chunk::Data(buf[..n].to_vec()),
                        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                        Err(e) => Chunk::Failed(e),
                    };
                    let failed = matches!(chunk, Chunk::Failed(_));
                    if sender.send(chunk).is_err() || failed {
                        break;
                    }
                }
                debug!("input pump finished");
            })?;

        Ok(Self {
            receiver,
            pending: Vec::new(),
            offset: 0,
            error: None,
            closed: false,
        })
    }

    /// Waits up to `timeout` for input to become available.
    ///
    /// End of stream and read failures count as ready so the next read
    /// observes them.
    pub fn wait_ready(&mut self, timeout: Duration) -> bool {
        if self.has_buffered() || self.closed || self.error.is_some() {
            return true;
        }

        match self.receiver.recv_timeout(timeout) {
            Ok(chunk) => {
                self.accept(chunk);
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                // Give the pump a chance to forward input that is already waiting.
                thread::yield_now();
                self.poll()
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.closed = true;
                true
            }
        }
    }

    fn poll(&mut self) -> bool {
        match self.receiver.try_recv() {
            Ok(chunk) => {
                self.accept(chunk);
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                self.closed = true;
                true
            }
        }
    }

    fn has_buffered(&self) -> bool {
        self.offset < self.pending.len()
    }

    fn accept(&mut self, chunk: Chunk) {
        match chunk {
            Chunk::Data(data) => {
                trace!("pump received {} bytes", data.len());
                self.pending = data;
                self.offset = 0;
            }
            Chunk::Failed(e) => self.error = Some(e),
        }
    }
}

impl Read for InputPump {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while !self.has_buffered() {
            if let Some(e) = self.error.take() {
                return Err(e);
            }
            if self.closed {
                return Ok(0);
            }
            match self.receiver.recv() {
                Ok(chunk) => self.accept(chunk),
                Err(_) => self.closed = true,
            }
        }

        let available = &self.pending[self.offset..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.offset += n;
        Ok(n)
    }
}
