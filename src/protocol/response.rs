use std::fmt;

/// Reply sent back for a single request.
///
/// The status words are fixed by the socketmap protocol and are case-sensitive.
/// Timeouts have no status of their own; they are signalled by closing the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `OK <value>`
    Ok(String),
    /// `NOTFOUND ` with an empty value.
    NotFound,
    /// `PERM <message>`
    Perm(String),
}

impl Response {
    pub fn perm(message: impl fmt::Display) -> Self {
        Response::Perm(message.to_string())
    }

    /// Whether the session may carry on after sending this reply.
    pub fn keeps_session(&self) -> bool {
        !matches!(self, Response::Perm(_))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok(value) => write!(f, "OK {value}"),
            Response::NotFound => write!(f, "NOTFOUND "),
            Response::Perm(message) => write!(f, "PERM {message}"),
        }
    }
}
