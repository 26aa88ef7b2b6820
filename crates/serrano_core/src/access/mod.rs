//! Ownership and visibility resolution engine.
//!
//! # Responsibility
//! - Decide what a resolved identity may read, mutate, fork or list.
//! - Build the visibility predicate used by list queries.
//!
//! # Invariants
//! - `shared_with` grants read and fork access, never mutation.
//! - `is_public` relaxes visibility and forkability, never mutation.
//! - `Anonymous` has an empty visibility set and no rights at all.
//! - Authorization checks are pure; side effects (accessed stamps,
//!   ledger appends) live in the service layer.

use crate::model::identity::{Identity, UserId};
use crate::model::record::{Record, RecordId, RecordKind};

/// Returns whether the identity holds ownership rights on the record.
///
/// Ownership is strictly: the owning user account, or the session that
/// created the record. Session ownership follows the record's session
/// key, not the `is_session` working-copy flag.
pub fn is_record_owner(identity: &Identity, record: &Record) -> bool {
    match identity {
        Identity::User(user_id) => record.owner_id == Some(*user_id),
        Identity::Session(key) => record.session_key.as_deref() == Some(key.as_str()),
        Identity::Anonymous => false,
    }
}

/// Returns whether the identity appears in the record's share set.
///
/// Shares are granted to resolved user accounts only; session identities
/// can never be sharees.
pub fn is_sharee(identity: &Identity, record: &Record) -> bool {
    match identity.user_id() {
        Some(user_id) => record
            .shared_with
            .iter()
            .any(|share| share.user_id == user_id),
        None => false,
    }
}

/// Visibility invariant: owner, sharee, public, or matching session.
pub fn can_read(identity: &Identity, record: &Record) -> bool {
    record.is_public || is_record_owner(identity, record) || is_sharee(identity, record)
}

/// Mutation rights: ownership only. Public visibility and shares never
/// grant update or delete.
pub fn can_mutate(identity: &Identity, record: &Record) -> bool {
    is_record_owner(identity, record)
}

/// Fork rights: public records can be forked by any resolved identity;
/// private records only by their owning user account or a sharee.
/// `Anonymous` cannot retain records and therefore never forks, and
/// session ownership does not extend to forking private records.
pub fn can_fork(identity: &Identity, record: &Record) -> bool {
    if identity.is_anonymous() {
        return false;
    }
    if record.is_public {
        return true;
    }
    match identity.user_id() {
        Some(user_id) => record.owner_id == Some(user_id) || is_sharee(identity, record),
        None => false,
    }
}

/// Fork-listing rights: public records expose their forks to everyone;
/// otherwise only the owner may enumerate them. Shares do not extend
/// this far.
pub fn can_list_forks(identity: &Identity, record: &Record) -> bool {
    record.is_public || is_record_owner(identity, record)
}

/// Whether a response for this identity may include the share set.
/// Only the owner sees who a record is shared with.
pub fn can_view_share_details(identity: &Identity, record: &Record) -> bool {
    is_record_owner(identity, record)
}

/// Delete eligibility: mutation rights, minus session working records,
/// which are superseded rather than deleted.
pub fn can_delete(identity: &Identity, record: &Record) -> bool {
    can_mutate(identity, record) && !record.is_session
}

/// Boolean predicate over the indexed record fields.
///
/// List queries compose these instead of a generic query DSL; the repo
/// layer renders them to SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    OwnerIs(UserId),
    SessionKeyIs(String),
    /// Membership in the share set, resolved per user account.
    SharedWithUser(UserId),
    IsPublic,
    ParentIs(RecordId),
    KindIs(RecordKind),
    IsSessionRecord(bool),
    Any(Vec<Predicate>),
    All(Vec<Predicate>),
}

impl Predicate {
    /// Conjunction helper keeping call sites readable.
    pub fn and(self, other: Predicate) -> Predicate {
        match self {
            Predicate::All(mut parts) => {
                parts.push(other);
                Predicate::All(parts)
            }
            first => Predicate::All(vec![first, other]),
        }
    }
}

/// Builds the "my records" visibility predicate for an identity.
///
/// Users see what they own plus what is shared with them; sessions see
/// their session-keyed records. `None` means the visibility set is empty
/// and storage must not be queried at all.
pub fn visibility_predicate(identity: &Identity) -> Option<Predicate> {
    match identity {
        Identity::User(user_id) => Some(Predicate::Any(vec![
            Predicate::OwnerIs(*user_id),
            Predicate::SharedWithUser(*user_id),
        ])),
        Identity::Session(key) => Some(Predicate::SessionKeyIs(key.clone())),
        Identity::Anonymous => None,
    }
}
