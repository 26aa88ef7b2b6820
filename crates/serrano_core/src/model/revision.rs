//! Revision ledger domain model.
//!
//! # Responsibility
//! - Define the immutable snapshot recorded after each record mutation.
//!
//! # Invariants
//! - Revisions are append-only; they are never mutated or deleted when
//!   their record is deleted.
//! - `seq` is the monotonic ledger position; ordering uses it, never
//!   wall clock alone.

use crate::model::identity::{Identity, UserId};
use crate::model::record::{RecordId, RecordKind};
use serde::{Deserialize, Serialize};

/// Mutation category captured by a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// One immutable snapshot of a record's content at a mutation point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Monotonic ledger position assigned by storage.
    pub seq: i64,
    /// Weak reference to the snapshotted record.
    pub record_id: RecordId,
    pub record_kind: RecordKind,
    pub operation: Operation,
    /// Record content, stored verbatim.
    pub content_snapshot: String,
    pub actor_user_id: Option<UserId>,
    pub actor_session_key: Option<String>,
    /// Unix epoch milliseconds at recording time.
    pub recorded_at: i64,
}

impl Revision {
    /// Returns the actor identity reconstructed from the stored columns.
    pub fn actor(&self) -> Identity {
        if let Some(user_id) = self.actor_user_id {
            Identity::User(user_id)
        } else if let Some(key) = self.actor_session_key.clone() {
            Identity::Session(key)
        } else {
            Identity::Anonymous
        }
    }
}

/// Input for appending one revision to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRevision {
    pub record_id: RecordId,
    pub record_kind: RecordKind,
    pub operation: Operation,
    pub content_snapshot: String,
    pub actor_user_id: Option<UserId>,
    pub actor_session_key: Option<String>,
    pub recorded_at: i64,
}

impl NewRevision {
    /// Builds a ledger entry for one record mutation by one identity.
    pub fn for_mutation(
        operation: Operation,
        record_id: RecordId,
        kind: RecordKind,
        content_snapshot: impl Into<String>,
        actor: &Identity,
        recorded_at: i64,
    ) -> Self {
        Self {
            record_id,
            record_kind: kind,
            operation,
            content_snapshot: content_snapshot.into(),
            actor_user_id: actor.user_id(),
            actor_session_key: actor.session_key().map(str::to_string),
            recorded_at,
        }
    }
}
