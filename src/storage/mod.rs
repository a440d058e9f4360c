//! Storage Module
//!
//! The capability contract every cache backend implements, and an in-memory
//! reference backend.
//!
//! ## Responsibilities
//! - Key-value semantics for the protocol engine (store, fetch, counters, delete)
//! - Safety under concurrent invocation from many sessions
//! - Its own locking: the engine never locks on a backend's behalf
//!
//! The engine owns all response encoding. A backend only reports outcomes,
//! and may ask for the response of a call to be suppressed through
//! [`Reply::noreply`].

mod memory;

pub use memory::MemoryStore;

use bytes::Bytes;

use crate::error::Result;

/// Outcome of a storage call plus the backend's suppress-response flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply<T> {
    /// The operation result
    pub value: T,

    /// When true the session writes no response for this command
    pub noreply: bool,
}

impl<T> Reply<T> {
    /// A reply the session answers normally
    pub fn new(value: T) -> Self {
        Self {
            value,
            noreply: false,
        }
    }

    /// A reply whose response is suppressed
    pub fn quiet(value: T) -> Self {
        Self {
            value,
            noreply: true,
        }
    }
}

/// An item handed to [`Storage::set`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub key: Vec<u8>,
    pub value: Bytes,

    /// Opaque client flags
    pub flags: u32,

    /// Expiration as sent by the client: 0 never, negative already expired,
    /// up to 30 days relative seconds, otherwise an absolute unix time
    pub exptime: i32,
}

impl Item {
    /// Declared payload size in bytes
    pub fn size(&self) -> usize {
        self.value.len()
    }
}

/// Key-value capability invoked by the protocol engine.
///
/// Implementations must be safe to call from many sessions at once. Calls are
/// synchronous and may block; each session runs on its own thread.
pub trait Storage: Send + Sync {
    /// Fetch a single key
    fn get(&self, key: &[u8]) -> Result<Reply<Option<Bytes>>>;

    /// Fetch several keys, returning one pair per requested key in request
    /// order
    fn get_multi(&self, keys: &[Vec<u8>]) -> Result<Vec<(Vec<u8>, Option<Bytes>)>> {
        keys.iter()
            .map(|key| Ok((key.clone(), self.get(key)?.value)))
            .collect()
    }

    /// Store an item. `noreply` is the client's request; the returned flag is
    /// the backend's
    fn set(&self, item: Item, noreply: bool) -> Result<Reply<()>>;

    /// Add `delta` to a numeric value; `None` when the key is absent
    fn incr(&self, key: &[u8], delta: u64) -> Result<Reply<Option<u64>>>;

    /// Subtract `delta` from a numeric value; `None` when the key is absent
    fn decr(&self, key: &[u8], delta: u64) -> Result<Reply<Option<u64>>>;

    /// Remove a key; the value is whether it was present
    fn delete(&self, key: &[u8]) -> Result<Reply<bool>>;

    /// Release backend resources
    fn shutdown(&self) -> Result<()>;
}
