//! Protocol codec
//!
//! Parsing of command lines and encoding of responses for the memcache text
//! protocol.
//!
//! ## Command Lines
//! ```text
//! set <key> <flags> <exptime> <bytes> [noreply]\r\n<data>\r\n
//! get <key>\r\n
//! gets <key> <key> ...\r\n
//! delete <key> [noreply]\r\n
//! incr <key> <delta> [noreply]\r\n
//! decr <key> <delta> [noreply]\r\n
//! close\r\n
//! ```
//!
//! Every line is a keyword followed by space-separated fields. The optional
//! trailing `noreply` is recognized by the exact number of fields, never by
//! "at least N fields".

use std::io::Write;
use std::str::FromStr;

use crate::error::Result;
use super::{Case, Command, CommandType, Response};

/// Line terminator
pub const CRLF: &[u8] = b"\r\n";

/// Longest key accepted on the wire
pub const MAX_KEY_LEN: usize = 250;

// =============================================================================
// Command Parsing
// =============================================================================

/// Parse one raw line (including its terminator) into a command.
///
/// Never fails: lines that do not fit the grammar of a known command become
/// `Command::Malformed`, lines with an unsupported keyword become
/// `Command::Unknown`.
pub fn parse_command(line: &[u8]) -> Command {
    let body = match line.strip_suffix(CRLF) {
        Some(body) => body,
        None => return Command::Malformed,
    };

    let (word, rest) = match body.iter().position(|&b| b == b' ') {
        Some(idx) => (&body[..idx], Some(&body[idx + 1..])),
        None => (body, None),
    };

    let (command_type, case) = match CommandType::from_keyword(word) {
        Some(found) => found,
        None => return Command::Unknown,
    };

    match (command_type, rest) {
        (CommandType::Close, None) => Command::Close,
        (CommandType::Close, Some(_)) => Command::Malformed,
        (_, None) => Command::Malformed,
        (CommandType::Set, Some(rest)) => parse_set(rest, case),
        (CommandType::Get | CommandType::Gets, Some(rest)) => parse_get(rest),
        (CommandType::Delete, Some(rest)) => parse_delete(rest, case),
        (CommandType::Incr, Some(rest)) => parse_incr_decr(rest, case, true),
        (CommandType::Decr, Some(rest)) => parse_incr_decr(rest, case, false),
    }
}

/// `<key> <flags> <exptime> <bytes> [noreply]`
///
/// A negative byte count is a grammar failure just like a missing field.
fn parse_set(rest: &[u8], case: Case) -> Command {
    let fields = split_fields(rest);
    let noreply = match fields.len() {
        4 => false,
        5 if is_noreply(fields[4], case) => true,
        _ => return Command::Malformed,
    };

    let parsed = (
        valid_key(fields[0]),
        parse_number::<u32>(fields[1]),
        parse_number::<i32>(fields[2]),
        parse_number::<i64>(fields[3]),
    );

    match parsed {
        (Some(key), Some(flags), Some(exptime), Some(bytes)) if bytes >= 0 => {
            match usize::try_from(bytes) {
                Ok(bytes) => Command::Set {
                    key: key.to_vec(),
                    flags,
                    exptime,
                    bytes,
                    noreply,
                },
                Err(_) => Command::Malformed,
            }
        }
        _ => Command::Malformed,
    }
}

/// `<key>` or `<key> <key> ...`
///
/// One space on the whole line selects the single-key form; more select the
/// multi-key form regardless of the keyword used.
fn parse_get(rest: &[u8]) -> Command {
    if !rest.contains(&b' ') {
        return match valid_key(rest) {
            Some(key) => Command::Get {
                keys: vec![key.to_vec()],
                multi: false,
            },
            None => Command::Malformed,
        };
    }

    let mut keys = Vec::new();
    for field in split_fields(rest).into_iter().filter(|f| !f.is_empty()) {
        match valid_key(field) {
            Some(key) => keys.push(key.to_vec()),
            None => return Command::Malformed,
        }
    }

    if keys.is_empty() {
        return Command::Malformed;
    }

    Command::Get { keys, multi: true }
}

/// `<key> [noreply]`
fn parse_delete(rest: &[u8], case: Case) -> Command {
    let fields = split_fields(rest);
    let noreply = match fields.len() {
        1 => false,
        2 if is_noreply(fields[1], case) => true,
        _ => return Command::Malformed,
    };

    match valid_key(fields[0]) {
        Some(key) => Command::Delete {
            key: key.to_vec(),
            noreply,
        },
        None => Command::Malformed,
    }
}

/// `<key> <delta> [noreply]`
fn parse_incr_decr(rest: &[u8], case: Case, incr: bool) -> Command {
    let fields = split_fields(rest);
    let noreply = match fields.len() {
        2 => false,
        3 if is_noreply(fields[2], case) => true,
        _ => return Command::Malformed,
    };

    let (key, delta) = match (valid_key(fields[0]), parse_number::<u64>(fields[1])) {
        (Some(key), Some(delta)) => (key.to_vec(), delta),
        _ => return Command::Malformed,
    };

    if incr {
        Command::Incr {
            key,
            delta,
            noreply,
        }
    } else {
        Command::Decr {
            key,
            delta,
            noreply,
        }
    }
}

/// Split on single spaces. Repeated spaces yield empty fields, which then
/// fail key or number validation.
fn split_fields(rest: &[u8]) -> Vec<&[u8]> {
    rest.split(|&b| b == b' ').collect()
}

fn is_noreply(field: &[u8], case: Case) -> bool {
    field == case.noreply()
}

fn parse_number<T: FromStr>(field: &[u8]) -> Option<T> {
    std::str::from_utf8(field).ok()?.parse().ok()
}

/// Keys are 1..=250 bytes with no whitespace or control characters
fn valid_key(key: &[u8]) -> Option<&[u8]> {
    let well_formed = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key.iter().all(|&b| b > b' ' && b != 0x7f);
    well_formed.then_some(key)
}

// =============================================================================
// Response Encoding
// =============================================================================

/// Encode a response to bytes
pub fn encode_response(response: &Response) -> Vec<u8> {
    if let Some(token) = response.token() {
        return token.to_vec();
    }

    match response {
        Response::Value { key, data } => {
            let header = value_header(key, data.len());
            let mut message = Vec::with_capacity(header.len() + data.len() + CRLF.len());
            message.extend_from_slice(&header);
            message.extend_from_slice(data);
            message.extend_from_slice(CRLF);
            message
        }
        Response::Numeric(value) => format!("{}\r\n", value).into_bytes(),
        _ => Vec::new(),
    }
}

/// Write a response to a stream.
///
/// Does not flush: a command's whole response is flushed as one unit by the
/// caller.
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    match response {
        Response::Value { key, data } => {
            // Stream the payload instead of copying it into a message buffer
            writer.write_all(&value_header(key, data.len()))?;
            writer.write_all(data)?;
            writer.write_all(CRLF)?;
        }
        other => writer.write_all(&encode_response(other))?,
    }
    Ok(())
}

/// `VALUE <key> 0 <bytes>\r\n`; flags are always reported as 0
fn value_header(key: &[u8], len: usize) -> Vec<u8> {
    let mut header = Vec::with_capacity(key.len() + 32);
    header.extend_from_slice(b"VALUE ");
    header.extend_from_slice(key);
    header.extend_from_slice(format!(" 0 {}\r\n", len).as_bytes());
    header
}
