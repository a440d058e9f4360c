//! Response definitions
//!
//! Represents responses to clients.

use bytes::Bytes;

/// A response to send to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Stored,
    NotStored,
    Exists,
    NotFound,
    Deleted,
    End,
    Error,
    Touched,

    /// One `VALUE` block of a retrieval response
    Value { key: Vec<u8>, data: Bytes },

    /// Result of `incr`/`decr`
    Numeric(u64),
}

impl Response {
    /// Create a VALUE block for a hit
    pub fn value(key: impl Into<Vec<u8>>, data: Bytes) -> Self {
        Response::Value {
            key: key.into(),
            data,
        }
    }

    /// The fixed wire token for this response, if it has one
    pub fn token(&self) -> Option<&'static [u8]> {
        match self {
            Response::Stored => Some(b"STORED\r\n"),
            Response::NotStored => Some(b"NOT_STORED\r\n"),
            Response::Exists => Some(b"EXISTS\r\n"),
            Response::NotFound => Some(b"NOT_FOUND\r\n"),
            Response::Deleted => Some(b"DELETED\r\n"),
            Response::End => Some(b"END\r\n"),
            Response::Error => Some(b"ERROR\r\n"),
            Response::Touched => Some(b"TOUCHED\r\n"),
            Response::Value { .. } | Response::Numeric(_) => None,
        }
    }
}
