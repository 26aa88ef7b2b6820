//! Access-control and lineage core for shared analytic queries and views.
//! This crate is the single source of truth for ownership, visibility,
//! fork and revision invariants.

pub mod access;
pub mod collab;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use access::{
    can_delete, can_fork, can_list_forks, can_mutate, can_read, can_view_share_details,
    is_record_owner, visibility_predicate, Predicate,
};
pub use collab::{
    Collaborators, ContentValidator, FieldError, JsonContentValidator, NoTemplates, NoopNotifier,
    NoopUsageLog, Notifier, TemplateProvider, UsageAction, UsageLog,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::identity::{Identity, RequestContext, UserId};
pub use model::record::{Record, RecordDraft, RecordId, RecordKind, RecordValidationError, SharedUser};
pub use model::revision::{NewRevision, Operation, Revision};
pub use repo::record_repo::{RecordRepository, SqliteRecordRepository};
pub use repo::revision_repo::{RevisionRepository, SqliteRevisionRepository};
pub use repo::{RepoError, RepoResult};
pub use service::record_service::{RecordLookup, RecordRead, RecordService, MAX_FORK_DEPTH};
pub use service::revision_service::RevisionService;
pub use service::{ServiceError, ServiceResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
