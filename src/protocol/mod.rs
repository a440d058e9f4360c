//! Protocol Module
//!
//! Defines the memcache text protocol spoken between clients and the server.
//!
//! ## Request Format
//! ```text
//! ┌──────────┬───────┬──────────────────────┬──────┐
//! │ Keyword  │ Space │  Fields (space sep)  │ CRLF │
//! └──────────┴───────┴──────────────────────┴──────┘
//! ```
//! `set` lines are followed by a data block of the declared length plus CRLF.
//! Keywords are accepted in all-lower or all-upper case.
//!
//! ### Commands
//! - set, get, gets, delete, incr, decr, close
//!
//! ### Responses
//! - STORED, NOT_STORED, EXISTS, NOT_FOUND, DELETED, END, ERROR, TOUCHED
//! - `VALUE <key> 0 <bytes>\r\n<data>\r\n`
//! - `<decimal>\r\n` for incr/decr

mod command;
mod response;
mod codec;

pub use command::{Case, Command, CommandType};
pub use response::Response;
pub use codec::{encode_response, parse_command, write_response, CRLF, MAX_KEY_LEN};
