//! # Hive
//!
//! A Bitcask-style key-value store with:
//! - Write-Ahead Logging (WAL) for durability
//! - Crash recovery with torn-write handling
//! - Periodic compaction into a tombstone-free snapshot
//! - Shared-reader / exclusive-writer concurrency model
//! - HTTP/JSON API
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HTTP Router                             │
//! │              (put / get / delete / compact)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │        (RwLock: index + WAL, Mutex: compaction gate)         │
//! └──────┬──────────────────────┬───────────────────────┬───────┘
//!        │                      │                       │
//!        ▼                      ▼                       ▼
//!  ┌───────────┐         ┌─────────────┐        ┌───────────────┐
//!  │    WAL    │         │    Index    │        │  Compaction   │
//!  │ (Append)  │         │ (BTreeMap)  │        │  Scheduler    │
//!  └───────────┘         └─────────────┘        └───────┬───────┘
//!                                                       │
//!                                                       ▼
//!                                               ┌───────────────┐
//!                                               │   Snapshot    │
//!                                               │ (live keys)   │
//!                                               └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod index;
pub mod snapshot;
pub mod compaction;
pub mod engine;
pub mod http;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{HiveError, Result};
pub use config::Config;
pub use engine::{Engine, EngineStats};
pub use compaction::{CompactionOutcome, CompactionStats};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Hive
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
