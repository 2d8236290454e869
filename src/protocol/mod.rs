//! Socketmap protocol engine.
//!
//! This module implements the server side of the socketmap protocol that mail
//! transfer agents use to delegate table lookups to an external process. The
//! MTA spawns the daemon, writes requests to its standard input and reads the
//! replies from its standard output, one exchange at a time.
//!
//! # Overview
//!
//! A [`Session`] drives the exchange. Each iteration it waits (bounded by the
//! idle timeout) for a request, decodes it, routes it to a table, runs the
//! table's query and writes exactly one reply. The session ends when the peer
//! goes quiet, closes the stream, exhausts the request budget, or when a
//! request fails.
//!
//! # Key Components
//!
//! - [`netstring`]: Framing for every message on the wire.
//! - [`Request`]: A `<table> <key>` lookup.
//! - [`Response`]: `OK`, `NOTFOUND` or `PERM` reply.
//! - [`ProtocolTransport`]: Framed reads and writes with bounded readiness waits.
//! - [`Session`]: The request/response loop.
//!
//! # Wire Format
//!
//! Requests and replies are netstrings:
//!
//! ```text
//! -> 23:virtual bob@example.com,
//! <- 20:OK alice@example.com,
//! -> 23:virtual eve@example.com,
//! <- 9:NOTFOUND ,
//! ```
//!
//! Only three status words exist. A miss keeps the session going; a `PERM`
//! reply is always the last frame of a session. Timeouts never produce a
//! frame: the daemon simply exits and the MTA sees the stream close.
//!
//! # See Also
//!
//! - [`router`](crate::router): Where table names are resolved.
//! - [`storage`](crate::storage): Executes the queries.
pub mod netstring;
mod pump;
mod request;
mod response;
mod server;
mod transport;

pub use request::{Request, RequestError};
pub use response::Response;
pub use server::{Closed, LookupError, Session};
pub use transport::{ProtocolTransport, TransportError};
