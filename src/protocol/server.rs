use std::{io::Write, time::Duration};

use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    config::MiscConfig,
    router::TableRouter,
    storage::{Lookup, StorageError},
    transform::TransformError,
};

use super::{
    ProtocolTransport, Request, Response,
    request::RequestError,
    transport::TransportError,
};

/// Failures answered with a `PERM` reply, after which the session ends.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("no such table: {0}")]
    UnknownTable(String),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Closed {
    /// No request arrived within the idle timeout.
    Idle,
    /// The peer closed its end of the stream.
    EndOfStream,
    /// The configured number of requests has been served.
    BudgetExhausted,
    /// The peer sent something that is not a netstring.
    Malformed,
    /// A request failed and was answered with `PERM`.
    Failed,
}

/// A single client connection.
///
/// The session owns its [`Lookup`] and closes it when [`serve`](Self::serve)
/// returns, whichever way the loop ended.
pub struct Session<'a, L: Lookup> {
    tables: &'a TableRouter,
    misc: &'a MiscConfig,
    lookup: L,
    idle_timeout: Duration,
    remaining: Option<u64>,
}

impl<'a, L: Lookup> Session<'a, L> {
    pub fn new(
        tables: &'a TableRouter,
        misc: &'a MiscConfig,
        lookup: L,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            tables,
            misc,
            lookup,
            idle_timeout,
            remaining: None,
        }
    }

    /// Limits the session to `max_requests` requests; `None` means unlimited.
    pub fn with_max_requests(mut self, max_requests: Option<u64>) -> Self {
        self.remaining = max_requests;
        self
    }

    pub fn serve<W: Write>(
        mut self,
        transport: &mut ProtocolTransport<W>,
    ) -> Result<Closed, TransportError> {
        info!("serving {} tables", self.tables.len());
        let res = self.run(transport);

        if let Err(e) = self.lookup.close() {
            warn!("{e}");
        }

        match &res {
            Ok(reason) => info!("session closed: {reason:?}"),
            Err(e) => warn!("session aborted: {e}"),
        }
        res
    }

    fn run<W: Write>(
        &mut self,
        transport: &mut ProtocolTransport<W>,
    ) -> Result<Closed, TransportError> {
        loop {
            if let Some(remaining) = self.remaining.as_mut() {
                if *remaining == 0 {
                    return Ok(Closed::BudgetExhausted);
                }
                *remaining -= 1;
            }

            if !transport.wait_for_request(self.idle_timeout) {
                return Ok(Closed::Idle);
            }

            let payload = match transport.read_request() {
                Ok(Some(payload)) => payload,
                Ok(None) => return Ok(Closed::EndOfStream),
                Err(e) if e.is_malformed() => {
                    warn!("{e}");
                    transport.write_response(&Response::perm("malformed netstring"))?;
                    return Ok(Closed::Malformed);
                }
                Err(e) => return Err(e.into()),
            };

            let resp = self.handle(&payload).unwrap_or_else(|e| {
                warn!("request failed: {e}");
                Response::perm(e)
            });
            debug!("responding: {resp}");

            transport.write_response(&resp)?;
            if !resp.keeps_session() {
                return Ok(Closed::Failed);
            }
        }
    }

    /// Answers a single decoded request.
    pub fn handle(&mut self, payload: &[u8]) -> Result<Response, LookupError> {
        let request = Request::try_from(payload)?;
        debug!("received request: {request:?}");

        let tables = self.tables;
        let table = tables
            .resolve(&request.table)
            .ok_or(LookupError::UnknownTable(request.table))?;
        let params = table.parameters(&request.key, self.misc)?;

        match self.lookup.lookup(table.query(), &params)? {
            Some(value) => Ok(Response::Ok(value)),
            None => Ok(Response::NotFound),
        }
    }
}
