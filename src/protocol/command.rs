//! Command definitions
//!
//! Represents commands from clients.

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Set,
    Get,
    Gets,
    Delete,
    Incr,
    Decr,
    Close,
}

impl CommandType {
    /// Lower-case keyword as it appears on the wire
    pub fn keyword(&self) -> &'static [u8] {
        match self {
            CommandType::Set => b"set",
            CommandType::Get => b"get",
            CommandType::Gets => b"gets",
            CommandType::Delete => b"delete",
            CommandType::Incr => b"incr",
            CommandType::Decr => b"decr",
            CommandType::Close => b"close",
        }
    }

    /// Upper-case keyword as it appears on the wire
    pub fn keyword_upper(&self) -> &'static [u8] {
        match self {
            CommandType::Set => b"SET",
            CommandType::Get => b"GET",
            CommandType::Gets => b"GETS",
            CommandType::Delete => b"DELETE",
            CommandType::Incr => b"INCR",
            CommandType::Decr => b"DECR",
            CommandType::Close => b"CLOSE",
        }
    }

    /// Resolve a keyword in either accepted spelling.
    ///
    /// Mixed case is rejected: `Set` is not a keyword.
    pub fn from_keyword(word: &[u8]) -> Option<(CommandType, Case)> {
        ALL.iter().find_map(|ty| {
            if word == ty.keyword() {
                Some((*ty, Case::Lower))
            } else if word == ty.keyword_upper() {
                Some((*ty, Case::Upper))
            } else {
                None
            }
        })
    }
}

const ALL: [CommandType; 7] = [
    CommandType::Set,
    CommandType::Get,
    CommandType::Gets,
    CommandType::Delete,
    CommandType::Incr,
    CommandType::Decr,
    CommandType::Close,
];

/// Case family of a command line, fixed by its keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    Lower,
    Upper,
}

impl Case {
    /// The `noreply` token accepted in this case family
    pub fn noreply(&self) -> &'static [u8] {
        match self {
            Case::Lower => b"noreply",
            Case::Upper => b"NOREPLY",
        }
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store an item; `bytes` payload bytes plus CRLF follow the line
    Set {
        key: Vec<u8>,
        flags: u32,
        exptime: i32,
        bytes: usize,
        noreply: bool,
    },

    /// Fetch one key (`multi == false`) or several keys
    Get { keys: Vec<Vec<u8>>, multi: bool },

    /// Remove a key
    Delete { key: Vec<u8>, noreply: bool },

    /// Add `delta` to a numeric value
    Incr { key: Vec<u8>, delta: u64, noreply: bool },

    /// Subtract `delta` from a numeric value
    Decr { key: Vec<u8>, delta: u64, noreply: bool },

    /// Close the connection without a response
    Close,

    /// A line of a known command that does not fit its grammar
    Malformed,

    /// A CRLF-terminated line with an unsupported keyword
    Unknown,
}

impl Command {
    /// Whether the client asked for the response to be suppressed
    pub fn noreply(&self) -> bool {
        match self {
            Command::Set { noreply, .. }
            | Command::Delete { noreply, .. }
            | Command::Incr { noreply, .. }
            | Command::Decr { noreply, .. } => *noreply,
            _ => false,
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } => "set",
            Command::Get { multi: false, .. } => "get",
            Command::Get { multi: true, .. } => "gets",
            Command::Delete { .. } => "delete",
            Command::Incr { .. } => "incr",
            Command::Decr { .. } => "decr",
            Command::Close => "close",
            Command::Malformed => "malformed",
            Command::Unknown => "unknown",
        }
    }
}
