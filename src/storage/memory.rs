//! In-memory storage backend
//!
//! HashMap-based store with RwLock for concurrency.

use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use parking_lot::RwLock;

use crate::error::{Result, WireError};
use super::{Item, Reply, Storage};

/// Expiration values above this many seconds are absolute unix timestamps
const MAX_RELATIVE_EXPTIME: i64 = 60 * 60 * 24 * 30;

/// A stored value
#[derive(Debug, Clone)]
struct Entry {
    value: Bytes,
    flags: u32,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// In-memory cache backend
///
/// Many readers share the read lock; `set`, `delete` and the counters take
/// the write lock. Expired entries are hidden from reads and dropped on the
/// next write that touches them.
pub struct MemoryStore {
    data: RwLock<HashMap<Vec<u8>, Entry>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.data.read().values().filter(|e| e.is_live(now)).count()
    }

    /// Check if there are no live entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flags stored with a live key
    pub fn flags(&self, key: &[u8]) -> Option<u32> {
        let now = Instant::now();
        self.data
            .read()
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.flags)
    }

    /// Apply a counter update to a live numeric value
    fn update_counter(
        &self,
        key: &[u8],
        apply: impl FnOnce(u64) -> u64,
    ) -> Result<Reply<Option<u64>>> {
        let now = Instant::now();
        let mut data = self.data.write();

        match data.get(key).map(|e| e.is_live(now)) {
            Some(true) => {}
            Some(false) => {
                data.remove(key);
                return Ok(Reply::new(None));
            }
            None => return Ok(Reply::new(None)),
        }

        let entry = match data.get_mut(key) {
            Some(entry) => entry,
            None => return Ok(Reply::new(None)),
        };

        let current = std::str::from_utf8(&entry.value)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| {
                WireError::Storage("cannot increment or decrement non-numeric value".to_string())
            })?;

        let updated = apply(current);
        entry.value = Bytes::from(updated.to_string());
        Ok(Reply::new(Some(updated)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Reply<Option<Bytes>>> {
        let now = Instant::now();
        let value = self
            .data
            .read()
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone());
        Ok(Reply::new(value))
    }

    fn get_multi(&self, keys: &[Vec<u8>]) -> Result<Vec<(Vec<u8>, Option<Bytes>)>> {
        let now = Instant::now();
        let data = self.data.read();
        Ok(keys
            .iter()
            .map(|key| {
                let value = data
                    .get(key)
                    .filter(|e| e.is_live(now))
                    .map(|e| e.value.clone());
                (key.clone(), value)
            })
            .collect())
    }

    fn set(&self, item: Item, _noreply: bool) -> Result<Reply<()>> {
        let now = Instant::now();
        let expires_at = expiry(item.exptime, now);

        let mut data = self.data.write();
        if expires_at.is_some_and(|at| at <= now) {
            // Already expired: the write replaces and hides any previous value
            data.remove(&item.key);
        } else {
            data.insert(
                item.key,
                Entry {
                    value: item.value,
                    flags: item.flags,
                    expires_at,
                },
            );
        }
        Ok(Reply::new(()))
    }

    fn incr(&self, key: &[u8], delta: u64) -> Result<Reply<Option<u64>>> {
        // 64-bit wraparound
        self.update_counter(key, |current| current.wrapping_add(delta))
    }

    fn decr(&self, key: &[u8], delta: u64) -> Result<Reply<Option<u64>>> {
        // Clamps at zero
        self.update_counter(key, |current| current.saturating_sub(delta))
    }

    fn delete(&self, key: &[u8]) -> Result<Reply<bool>> {
        let now = Instant::now();
        let removed = self.data.write().remove(key);
        Ok(Reply::new(removed.is_some_and(|e| e.is_live(now))))
    }

    fn shutdown(&self) -> Result<()> {
        let mut data = self.data.write();
        tracing::debug!("Releasing memory store with {} entries", data.len());
        data.clear();
        Ok(())
    }
}

/// Translate a client exptime into a deadline
fn expiry(exptime: i32, now: Instant) -> Option<Instant> {
    let exptime = i64::from(exptime);
    if exptime == 0 {
        return None;
    }
    if exptime < 0 {
        return Some(now);
    }
    if exptime <= MAX_RELATIVE_EXPTIME {
        return Some(now + Duration::from_secs(exptime as u64));
    }

    let unix_now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let remaining = (exptime as u64).saturating_sub(unix_now);
    Some(now + Duration::from_secs(remaining))
}
