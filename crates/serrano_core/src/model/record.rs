//! Record domain model shared by query and view variants.
//!
//! # Responsibility
//! - Define the canonical record subject to ownership/visibility rules.
//! - Provide lifecycle helpers for ownership assignment and forking.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another record.
//! - `owner_id` and `session_key` are mutually exclusive; both may be
//!   absent for template/public records owned by no one.
//! - A fork starts private (`is_public=false`), non-session, with an
//!   empty share set and `parent` pointing at its source.

use crate::model::identity::{Identity, UserId};
use crate::model::now_epoch_ms;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for every record.
pub type RecordId = Uuid;

/// Content-kind tag distinguishing query and view records.
///
/// Access, fork and revision logic is written once over `Record`; the
/// kind only matters where content semantics differ (e.g. the view
/// default-template fallback).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Query,
    View,
}

/// One collaborator granted read/fork access without being the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedUser {
    pub user_id: UserId,
    /// Delivery address for ownership-change notifications.
    pub email: String,
}

/// Canonical record for query/view data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Stable global ID used for linking, lineage and auditing.
    pub uuid: RecordId,
    pub kind: RecordKind,
    pub name: String,
    pub description: String,
    /// Opaque versioned payload (the analytic definition). Copied
    /// verbatim on fork, snapshotted verbatim at each revision.
    pub content: String,
    /// Owning durable user account, if any.
    pub owner_id: Option<UserId>,
    /// Owning anonymous browser session, if any.
    pub session_key: Option<String>,
    /// Marks the ephemeral "current working" record for its owner.
    pub is_session: bool,
    /// Grants visibility (not mutation) to every identity.
    pub is_public: bool,
    /// Back-reference to the record this one was forked from.
    pub parent: Option<RecordId>,
    /// Users granted read/fork access.
    pub shared_with: Vec<SharedUser>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds; stamped on every successful single read.
    pub accessed_at: i64,
}

/// Caller-supplied fields for create/update operations.
///
/// Content passes through the validation collaborator before it reaches
/// a `Record`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordDraft {
    pub name: String,
    pub description: String,
    pub content: String,
    /// Create the record as the identity's session working record.
    pub is_session: bool,
    pub is_public: bool,
}

/// Model-level validation failure for record state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValidationError {
    /// A record cannot be owned by a user and tied to a session at once.
    OwnerSessionConflict(RecordId),
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OwnerSessionConflict(id) => {
                write!(f, "record {id} has both an owner and a session key")
            }
        }
    }
}

impl Error for RecordValidationError {}

impl Record {
    /// Creates a new record with a generated stable ID and ownership
    /// taken from the creating identity.
    ///
    /// # Invariants
    /// - `parent` starts as `None`; lineage only appears through forks.
    /// - `accessed_at` starts equal to `created_at`.
    pub fn new(kind: RecordKind, identity: &Identity, draft: RecordDraft) -> Self {
        let now = now_epoch_ms();
        let mut record = Self {
            uuid: Uuid::new_v4(),
            kind,
            name: draft.name,
            description: draft.description,
            content: draft.content,
            owner_id: None,
            session_key: None,
            is_session: draft.is_session,
            is_public: draft.is_public,
            parent: None,
            shared_with: Vec::new(),
            created_at: now,
            accessed_at: now,
        };
        record.assign_ownership(identity);
        record
    }

    /// Derives a fork of this record for the given identity.
    ///
    /// Copies the immutable content fields verbatim, establishes the
    /// parent link and assigns ownership to the forking identity. The
    /// fork is never public and starts with an empty share set.
    pub fn fork_for(&self, identity: &Identity) -> Self {
        let now = now_epoch_ms();
        let mut fork = Self {
            uuid: Uuid::new_v4(),
            kind: self.kind,
            name: self.name.clone(),
            description: self.description.clone(),
            content: self.content.clone(),
            owner_id: None,
            session_key: None,
            is_session: false,
            is_public: false,
            parent: Some(self.uuid),
            shared_with: Vec::new(),
            created_at: now,
            accessed_at: now,
        };
        fork.assign_ownership(identity);
        fork
    }

    /// Assigns ownership fields from an identity.
    ///
    /// `Anonymous` leaves the record owned by no one; callers gate
    /// anonymous creation before reaching this point.
    pub fn assign_ownership(&mut self, identity: &Identity) {
        match identity {
            Identity::User(user_id) => {
                self.owner_id = Some(*user_id);
                self.session_key = None;
            }
            Identity::Session(key) => {
                self.owner_id = None;
                self.session_key = Some(key.clone());
            }
            Identity::Anonymous => {
                self.owner_id = None;
                self.session_key = None;
            }
        }
    }

    /// Validates model-level ownership invariants.
    pub fn validate(&self) -> Result<(), RecordValidationError> {
        if self.owner_id.is_some() && self.session_key.is_some() {
            return Err(RecordValidationError::OwnerSessionConflict(self.uuid));
        }
        Ok(())
    }
}
