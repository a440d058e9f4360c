//! # mcwire
//!
//! A memcache text protocol server engine with:
//! - A pure command grammar parser and response encoder
//! - A per-connection session loop with idle deadlines
//! - A pluggable storage capability (`Storage` trait)
//! - An in-memory reference backend
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │               (one thread per connection)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Session Loop                               │
//! │      read line → parse → storage call → encode → flush       │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐                ┌─────────────────┐
//!   │    Protocol     │                │     Storage     │
//!   │ (parse/encode)  │                │ (shared, Sync)  │
//!   └─────────────────┘                └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod storage;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{WireError, Result};
pub use config::{Config, SessionConfig};
pub use network::{serve_connection, Server};
pub use storage::{MemoryStore, Storage};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of mcwire
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
