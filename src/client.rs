//! Debug client.
//!
//! Runs the daemon as a child process and talks to it over pipes, exactly as
//! an MTA would, so tables can be tried out from a terminal.
use std::{
    ffi::OsString,
    io::{self, BufReader},
    path::Path,
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
    sync::{Arc, Mutex},
};

use log::debug;
use thiserror::Error;

use crate::protocol::netstring::{NetstringError, read_netstring, write_netstring};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to start server: {0}")]
    Spawn(io::Error),
    #[error("server pipes unavailable")]
    Pipes,
    #[error("server closed the connection")]
    Closed,
    #[error(transparent)]
    Netstring(#[from] NetstringError),
    #[error("client IO error: {0}")]
    Io(#[from] io::Error),
}

/// Handle to a daemon running as a child process.
pub struct DebugClient {
    child: Arc<Mutex<Child>>,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl DebugClient {
    pub fn spawn<I, S>(program: impl AsRef<Path>, args: I) -> Result<Self, ClientError>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        debug!("spawning {:?} {args:?}", program.as_ref());

        let mut child = Command::new(program.as_ref())
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(ClientError::Spawn)?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(ClientError::Pipes);
        };

        Ok(Self {
            child: Arc::new(Mutex::new(child)),
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    /// Shared handle used to kill the child from a signal handler.
    pub fn child(&self) -> Arc<Mutex<Child>> {
        Arc::clone(&self.child)
    }

    pub fn is_running(&self) -> bool {
        match self.child.lock() {
            Ok(mut child) => matches!(child.try_wait(), Ok(None)),
            Err(_) => false,
        }
    }

    /// Sends one request and waits for the reply.
    pub fn query(&mut self, request: &str) -> Result<String, ClientError> {
        write_netstring(&mut self.stdin, request.as_bytes())?;

        let reply = read_netstring(&mut self.stdout)?.ok_or(ClientError::Closed)?;
        Ok(String::from_utf8_lossy(&reply).into_owned())
    }

    pub fn terminate(self) -> Result<(), ClientError> {
        drop(self.stdin);
        let mut child = self.child.lock().map_err(|_| ClientError::Closed)?;
        if child.try_wait()?.is_none() {
            child.kill()?;
        }
        child.wait()?;
        Ok(())
    }
}
