//! Driftwatch alert-deduplication persistence.
//!
//! The pipeline only needs one capability from storage: "has this drift
//! condition already produced an alert, and if not, remember that it now
//! has". The [`AlertLedger`] trait captures that contract; backends decide
//! how fingerprints and their last-alerted timestamps are kept.
//!
//! ## Backends
//!
//! - [`SqliteAlertLedger`]: durable single-file store (default)
//! - [`MemoryAlertLedger`]: process-local, used in tests and as the
//!   `memory` backend (no dedup across invocations)

mod error;
mod ledger;
mod memory;
mod sqlite;

pub use error::StoreError;
pub use ledger::{AlertLedger, RetentionPolicy, StoreResult};
pub use memory::MemoryAlertLedger;
pub use sqlite::SqliteAlertLedger;
