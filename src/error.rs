use thiserror::Error;

/// Errors a [`HashTable`](crate::table::HashTable) can report.
///
/// Key-absent, duplicate-key, and empty-table outcomes are ordinary
/// `Option`/`bool` returns, never `Err`. Only `CapacityOverflow` and
/// `AllocFailed` are ever actually handed back from a `Result`-returning
/// entry point (the `try_`-prefixed API, and arithmetic that would overflow
/// the addressable table size). `UnbalancedPause`, `InvalidPosition`, and
/// `FingerprintMismatch` name contract violations that are programmer
/// errors, not recoverable conditions: they never appear in a `Result`, but
/// the `debug_assert!` sites that detect them (`HashTable::insert_at`,
/// `HashTable::two_phase_pop_delete`, `HashTable::resume_rehashing`,
/// `UncheckedIter::next`) format this type's `Display` message as the panic
/// text, so a panic payload and a `Result` error read the same way.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TableError {
    #[error("requested capacity {requested} overflows addressable table size")]
    CapacityOverflow { requested: usize },

    #[error("allocation of {size} bytes failed")]
    AllocFailed { size: usize },

    #[error("pause counters unbalanced: pause_rehash={pause_rehash}, pause_auto_shrink={pause_auto_shrink}")]
    UnbalancedPause { pause_rehash: i16, pause_auto_shrink: i16 },

    #[error("position token does not name a present slot")]
    InvalidPosition,

    #[error("iterator used after the table was mutated without a fingerprint-safe reset")]
    FingerprintMismatch,
}

pub type Result<T> = std::result::Result<T, TableError>;
