//! Network Module
//!
//! TCP server and per-connection protocol sessions.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One session thread per connection
//! - Sessions share only the storage backend

mod server;
mod connection;
mod deadline;

pub use server::{Server, ServerHandle};
pub use connection::{serve_connection, Connection};
pub use deadline::Deadline;
