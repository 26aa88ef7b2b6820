//! Unified domain model for shared query/view records.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep one record-centric shape for query and view variants.
//!
//! # Invariants
//! - Every domain object is identified by a stable `RecordId`.
//! - A record is owned by a user XOR tied to an anonymous session,
//!   XOR owned by no one (template/public records).

pub mod identity;
pub mod record;
pub mod revision;

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns current wall-clock time as unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
