//! Record use-case service: reads, mutations, forks and lifecycle.
//!
//! # Responsibility
//! - Gate every operation through the access engine before touching
//!   storage.
//! - Append ledger snapshots after successful mutations and dispatch
//!   collaborator side effects (usage events, delete notifications).
//!
//! # Invariants
//! - Authorize, mutate, then append revision; a failed mutation never
//!   reaches the ledger.
//! - Delete notifications enumerate the share set captured with the
//!   record before deletion, never a later state.
//! - Single-record reads stamp `accessed_at` exactly once, after the
//!   response record is materialized; list reads never stamp it.

use crate::access::{
    can_fork, can_list_forks, can_mutate, can_read, can_view_share_details, is_record_owner,
    visibility_predicate, Predicate,
};
use crate::collab::{Collaborators, UsageAction};
use crate::model::identity::Identity;
use crate::model::now_epoch_ms;
use crate::model::record::{Record, RecordDraft, RecordId, RecordKind, SharedUser};
use crate::model::revision::{NewRevision, Operation};
use crate::repo::record_repo::RecordRepository;
use crate::repo::revision_repo::RevisionRepository;
use crate::repo::RepoError;
use crate::service::{ServiceError, ServiceResult};
use log::{info, warn};

/// Upper bound on parent-chain length. Normal operation cannot create a
/// cycle, but persisted lineage is walked defensively.
pub const MAX_FORK_DEPTH: usize = 32;

/// Single-record lookup: by id, or the identity's session working
/// record. Supplying neither is a caller bug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLookup {
    pub kind: RecordKind,
    pub id: Option<RecordId>,
    pub session: bool,
}

impl RecordLookup {
    pub fn by_id(kind: RecordKind, id: RecordId) -> Self {
        Self {
            kind,
            id: Some(id),
            session: false,
        }
    }

    pub fn session(kind: RecordKind) -> Self {
        Self {
            kind,
            id: None,
            session: true,
        }
    }
}

/// Read envelope for single-record responses.
///
/// `shared_with` is stripped from the record unless the requester is
/// the owner; the flags let the boundary shape its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRead {
    pub record: Record,
    pub is_owner: bool,
    pub share_details_included: bool,
}

/// Use-case service over record and revision repositories.
pub struct RecordService<R: RecordRepository, V: RevisionRepository> {
    records: R,
    revisions: V,
    collab: Collaborators,
}

impl<R: RecordRepository, V: RevisionRepository> RecordService<R, V> {
    /// Creates a service with inert default collaborators.
    pub fn new(records: R, revisions: V) -> Self {
        Self::with_collaborators(records, revisions, Collaborators::default())
    }

    pub fn with_collaborators(records: R, revisions: V, collab: Collaborators) -> Self {
        Self {
            records,
            revisions,
            collab,
        }
    }

    /// Reads one record, stamping its accessed time and emitting a
    /// usage event.
    pub fn get_record(&self, identity: &Identity, lookup: &RecordLookup) -> ServiceResult<RecordRead> {
        let record = self.resolve_lookup(identity, lookup)?;

        if !can_read(identity, &record) {
            return Err(ServiceError::Unauthorized);
        }

        self.collab
            .usage
            .log(UsageAction::Read, record.uuid, identity);
        // Stamp after the response record is materialized so the copy
        // handed back reflects the pre-read ordering key.
        self.records.touch_accessed(record.uuid, now_epoch_ms())?;

        Ok(self.shape_read(identity, record))
    }

    /// Creates a record owned by the identity.
    pub fn create_record(
        &self,
        identity: &Identity,
        kind: RecordKind,
        draft: RecordDraft,
    ) -> ServiceResult<Record> {
        if identity.is_anonymous() {
            return Err(ServiceError::Unauthorized);
        }

        let content = self
            .collab
            .validator
            .validate(&draft.content)
            .map_err(ServiceError::Validation)?;

        let record = Record::new(kind, identity, RecordDraft { content, ..draft });
        self.records.create_record(&record)?;
        self.append_revision(Operation::Create, &record, identity)?;
        self.collab
            .usage
            .log(UsageAction::Create, record.uuid, identity);

        Ok(record)
    }

    /// Replaces the caller-editable fields of a record.
    pub fn update_record(
        &self,
        identity: &Identity,
        id: RecordId,
        draft: RecordDraft,
    ) -> ServiceResult<Record> {
        let mut record = self.require_record(id)?;

        if !can_mutate(identity, &record) {
            return Err(ServiceError::Unauthorized);
        }

        let content = self
            .collab
            .validator
            .validate(&draft.content)
            .map_err(ServiceError::Validation)?;

        record.name = draft.name;
        record.description = draft.description;
        record.content = content;
        record.is_session = draft.is_session;
        record.is_public = draft.is_public;

        self.records.update_record(&record)?;
        self.append_revision(Operation::Update, &record, identity)?;
        self.collab
            .usage
            .log(UsageAction::Update, record.uuid, identity);

        Ok(record)
    }

    /// Deletes a record, leaving its revision ledger intact and
    /// notifying the users it was shared with.
    ///
    /// Session working records are superseded, never deleted through
    /// this path.
    pub fn delete_record(&self, identity: &Identity, id: RecordId) -> ServiceResult<()> {
        let record = self.require_record(id)?;

        if !can_mutate(identity, &record) {
            return Err(ServiceError::Unauthorized);
        }
        if record.is_session {
            return Err(ServiceError::InvalidRequest(
                "session records are superseded, not deleted",
            ));
        }

        // Captured with the record inside this unit; a later share-set
        // change must not alter who gets notified.
        let recipients: Vec<String> = record
            .shared_with
            .iter()
            .map(|share| share.email.clone())
            .collect();

        self.records.delete_record(record.uuid)?;
        self.append_revision(Operation::Delete, &record, identity)?;
        self.collab
            .usage
            .log(UsageAction::Delete, record.uuid, identity);

        if !recipients.is_empty() {
            self.collab.notifier.notify(
                &recipients,
                &delete_notice_subject(&record.name),
                &delete_notice_body(&record.name),
            );
        }

        info!(
            "event=record_delete module=service status=ok record={} notified={}",
            record.uuid,
            recipients.len()
        );

        Ok(())
    }

    /// Forks a record for the identity, preserving content and lineage.
    pub fn fork_record(&self, identity: &Identity, source_id: RecordId) -> ServiceResult<Record> {
        let source = self.require_record(source_id)?;

        if !can_fork(identity, &source) {
            return Err(ServiceError::Unauthorized);
        }

        let fork = source.fork_for(identity);
        self.records.create_record(&fork)?;
        self.append_revision(Operation::Create, &fork, identity)?;
        self.collab
            .usage
            .log(UsageAction::Create, fork.uuid, identity);

        info!(
            "event=record_fork module=service status=ok source={} fork={}",
            source.uuid, fork.uuid
        );

        Ok(fork)
    }

    /// Lists the records owned by or shared with the identity, most
    /// recently accessed first.
    ///
    /// `Anonymous` always gets an empty list without a storage query.
    /// An empty view listing falls back to the template collaborator.
    pub fn list_mine(&self, identity: &Identity, kind: RecordKind) -> ServiceResult<Vec<Record>> {
        let Some(predicate) = visibility_predicate(identity) else {
            return Ok(Vec::new());
        };

        let listed = self
            .records
            .list_records(&predicate.and(Predicate::KindIs(kind)))?;

        if listed.is_empty() && kind == RecordKind::View {
            if let Some(default) = self.default_session_view(identity)? {
                return Ok(vec![default]);
            }
        }

        Ok(listed)
    }

    /// Lists all public records of a kind, most recently accessed first.
    pub fn list_public(&self, kind: RecordKind) -> ServiceResult<Vec<Record>> {
        let predicate = Predicate::IsPublic.and(Predicate::KindIs(kind));
        Ok(self.records.list_records(&predicate)?)
    }

    /// Lists the forks of a record. Public records expose forks to
    /// everyone; private ones only to their owner.
    pub fn list_forks(&self, identity: &Identity, parent_id: RecordId) -> ServiceResult<Vec<Record>> {
        let parent = self.require_record(parent_id)?;

        if !can_list_forks(identity, &parent) {
            return Err(ServiceError::Unauthorized);
        }

        Ok(self.records.list_records(&Predicate::ParentIs(parent.uuid))?)
    }

    /// Replaces the record's share set wholesale (last-write-wins).
    pub fn share_record(
        &self,
        identity: &Identity,
        id: RecordId,
        shares: Vec<SharedUser>,
    ) -> ServiceResult<Record> {
        let record = self.require_record(id)?;

        if !can_mutate(identity, &record) {
            return Err(ServiceError::Unauthorized);
        }

        self.records.replace_shares(record.uuid, &shares)?;
        self.require_record(id)
    }

    /// Walks the record's parent chain, self first.
    ///
    /// The chain ends at a record with no parent, whose parent was
    /// deleted, or whose parent the identity cannot read; every returned
    /// ancestor passes the same visibility check as a direct read, and
    /// `shared_with` is included only for records the identity owns.
    /// Chains longer than `MAX_FORK_DEPTH` indicate corrupted lineage
    /// and are rejected.
    pub fn lineage(&self, identity: &Identity, id: RecordId) -> ServiceResult<Vec<Record>> {
        let record = self.require_record(id)?;

        if !can_read(identity, &record) {
            return Err(ServiceError::Unauthorized);
        }

        let mut chain = vec![record];
        while let Some(parent_id) = chain.last().and_then(|record| record.parent) {
            if chain.len() >= MAX_FORK_DEPTH {
                return Err(ServiceError::Repo(RepoError::InvalidData(format!(
                    "record {id} lineage exceeds depth {MAX_FORK_DEPTH}"
                ))));
            }
            match self.records.get_record(parent_id)? {
                Some(parent) if can_read(identity, &parent) => chain.push(parent),
                _ => break,
            }
        }

        for record in &mut chain {
            if !can_view_share_details(identity, record) {
                record.shared_with.clear();
            }
        }

        Ok(chain)
    }

    fn resolve_lookup(
        &self,
        identity: &Identity,
        lookup: &RecordLookup,
    ) -> ServiceResult<Record> {
        let record = if let Some(id) = lookup.id {
            self.records.get_record(id)?
        } else if lookup.session {
            self.records.find_session_record(identity, lookup.kind)?
        } else {
            return Err(ServiceError::InvalidRequest(
                "a record id or the session flag is required for the lookup",
            ));
        };

        match record {
            Some(record) if record.kind == lookup.kind => Ok(record),
            _ => Err(ServiceError::NotFound),
        }
    }

    fn require_record(&self, id: RecordId) -> ServiceResult<Record> {
        self.records.get_record(id)?.ok_or(ServiceError::NotFound)
    }

    fn shape_read(&self, identity: &Identity, mut record: Record) -> RecordRead {
        let is_owner = is_record_owner(identity, &record);
        let share_details_included = can_view_share_details(identity, &record);
        if !share_details_included {
            record.shared_with.clear();
        }
        RecordRead {
            record,
            is_owner,
            share_details_included,
        }
    }

    fn append_revision(
        &self,
        operation: Operation,
        record: &Record,
        identity: &Identity,
    ) -> ServiceResult<i64> {
        let revision = NewRevision::for_mutation(
            operation,
            record.uuid,
            record.kind,
            record.content.clone(),
            identity,
            now_epoch_ms(),
        );
        Ok(self.revisions.append_revision(&revision)?)
    }

    fn default_session_view(&self, identity: &Identity) -> ServiceResult<Option<Record>> {
        let Some(content) = self.collab.templates.default_content(RecordKind::View) else {
            warn!("event=view_default module=service status=missing reason=no_default_template");
            return Ok(None);
        };

        let draft = RecordDraft {
            content,
            is_session: true,
            ..RecordDraft::default()
        };

        match self.create_record(identity, RecordKind::View, draft) {
            Ok(record) => Ok(Some(record)),
            Err(ServiceError::Validation(errors)) => {
                warn!(
                    "event=view_default module=service status=error reason=invalid_template errors={}",
                    errors.len()
                );
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }
}

fn delete_notice_subject(name: &str) -> String {
    format!("'{name}' has been deleted")
}

fn delete_notice_body(name: &str) -> String {
    format!(
        "The record named '{name}' has been deleted. You are being notified \
         because it was shared with you. It is no longer available."
    )
}
