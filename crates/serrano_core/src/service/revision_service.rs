//! Revision ledger query service.
//!
//! # Responsibility
//! - Expose history lookups by record and by requester.
//! - Reconstruct a record's content at a given ledger position.
//!
//! # Invariants
//! - Lookups are pure: no mutation, no accessed-time stamping.
//! - History is scoped to revisions the requester authored, so a fork's
//!   ledger stays queryable by its author after the fork is deleted.
//! - `reconstruct` fails with `NotFound` when the revision does not
//!   belong to the referenced record, not only when it is missing.

use crate::model::identity::Identity;
use crate::model::record::{RecordId, RecordKind};
use crate::model::revision::Revision;
use crate::repo::revision_repo::RevisionRepository;
use crate::service::{ServiceError, ServiceResult};

/// Query service over the append-only revision ledger.
pub struct RevisionService<V: RevisionRepository> {
    revisions: V,
}

impl<V: RevisionRepository> RevisionService<V> {
    pub fn new(revisions: V) -> Self {
        Self { revisions }
    }

    /// History of one record, newest first.
    pub fn history_for_record(
        &self,
        identity: &Identity,
        record_id: RecordId,
    ) -> ServiceResult<Vec<Revision>> {
        Ok(self.revisions.revisions_for_record(identity, record_id)?)
    }

    /// History across all records of a kind the identity authored,
    /// newest first, paginated by the caller.
    pub fn history_for_identity(
        &self,
        identity: &Identity,
        kind: RecordKind,
        limit: Option<u32>,
        offset: u32,
    ) -> ServiceResult<Vec<Revision>> {
        Ok(self
            .revisions
            .revisions_for_actor(identity, kind, limit, offset)?)
    }

    /// Returns the content snapshot at one ledger position of a record.
    pub fn reconstruct(
        &self,
        identity: &Identity,
        record_id: RecordId,
        seq: i64,
    ) -> ServiceResult<String> {
        match self.revisions.get_revision(identity, record_id, seq)? {
            Some(revision) => Ok(revision.content_snapshot),
            None => Err(ServiceError::NotFound),
        }
    }
}
