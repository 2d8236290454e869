use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("request is not valid UTF-8")]
    Encoding,
    #[error("malformed request '{0}': expected '<table> <key>'")]
    MissingSeparator(String),
}

/// A lookup request: `<table> <key>`, split on the first space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub table: String,
    pub key: String,
}

impl TryFrom<&[u8]> for Request {
    type Error = RequestError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let payload = std::str::from_utf8(value).map_err(|_| RequestError::Encoding)?;
        payload.try_into()
    }
}

impl TryFrom<&str> for Request {
    type Error = RequestError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.split_once(' ') {
            Some((table, key)) => Ok(Request {
                table: table.to_string(),
                key: key.to_string(),
            }),
            None => Err(RequestError::MissingSeparator(value.to_string())),
        }
    }
}
