//! A cache-conscious, open-addressed hash table with incremental
//! two-table rehashing, built for use as the primary indexing structure
//! of a single-threaded in-memory store.
//!
//! Start at [`table::HashTable`] and [`config::TableType`].

/// Process-wide resize policy and the per-element-type behavior contract.
pub mod config;
/// Error type for the handful of entry points that can fail.
pub mod error;
/// The process-wide keyed hash function.
pub mod hash;
/// The hash table itself, and its scan/iterator/sampling/stats surfaces.
pub mod table;

pub use config::{resize_policy, set_resize_policy, ResizePolicy, TableType};
pub use error::{Result, TableError};
pub use table::{HashTable, InsertSlot, Position, ScanFlags};
