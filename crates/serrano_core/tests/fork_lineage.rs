use serrano_core::db::open_db_in_memory;
use serrano_core::{
    Identity, Operation, RecordDraft, RecordId, RecordKind, RecordService, RevisionService,
    ServiceError, SharedUser, SqliteRecordRepository, SqliteRevisionRepository, MAX_FORK_DEPTH,
};
use rusqlite::Connection;
use uuid::Uuid;

type SqliteService<'a> = RecordService<SqliteRecordRepository<'a>, SqliteRevisionRepository<'a>>;

fn service(conn: &Connection) -> SqliteService<'_> {
    RecordService::new(
        SqliteRecordRepository::new(conn),
        SqliteRevisionRepository::new(conn),
    )
}

fn draft(name: &str, content: &str) -> RecordDraft {
    RecordDraft {
        name: name.to_string(),
        content: content.to_string(),
        ..RecordDraft::default()
    }
}

fn share_for(user: &Identity) -> SharedUser {
    let user_id = user.user_id().unwrap();
    SharedUser {
        user_id,
        email: format!("{user_id}@example.com"),
    }
}

fn set_parent(conn: &Connection, id: RecordId, parent: RecordId) {
    conn.execute(
        "UPDATE records SET parent_uuid = ?1 WHERE uuid = ?2;",
        rusqlite::params![parent.to_string(), id.to_string()],
    )
    .unwrap();
}

#[test]
fn owner_can_fork_their_own_record() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let me = Identity::User(Uuid::new_v4());
    let source = service
        .create_record(&me, RecordKind::Query, draft("source", "{\"a\": 1}"))
        .unwrap();

    let fork = service.fork_record(&me, source.uuid).unwrap();
    assert_ne!(fork.uuid, source.uuid);
    assert_eq!(fork.parent, Some(source.uuid));
    assert_eq!(fork.content, source.content);
    assert_eq!(fork.owner_id, me.user_id());
    assert!(!fork.is_public);
    assert!(!fork.is_session);
    assert!(fork.shared_with.is_empty());
}

#[test]
fn sharee_fork_takes_ownership_and_drops_shares() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let owner = Identity::User(Uuid::new_v4());
    let sharee = Identity::User(Uuid::new_v4());
    let source = service
        .create_record(&owner, RecordKind::Query, draft("shared", "{}"))
        .unwrap();
    service
        .share_record(&owner, source.uuid, vec![share_for(&sharee)])
        .unwrap();

    let fork = service.fork_record(&sharee, source.uuid).unwrap();
    assert_eq!(fork.owner_id, sharee.user_id());
    assert_eq!(fork.parent, Some(source.uuid));
    assert!(fork.shared_with.is_empty());
}

#[test]
fn stranger_cannot_fork_a_private_record() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let owner = Identity::User(Uuid::new_v4());
    let source = service
        .create_record(&owner, RecordKind::Query, draft("private", "{}"))
        .unwrap();

    let err = service
        .fork_record(&Identity::User(Uuid::new_v4()), source.uuid)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized));
}

#[test]
fn anonymous_cannot_fork_even_public_records() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let owner = Identity::User(Uuid::new_v4());
    let source = service
        .create_record(
            &owner,
            RecordKind::Query,
            RecordDraft {
                is_public: true,
                ..draft("public", "{}")
            },
        )
        .unwrap();

    let err = service
        .fork_record(&Identity::Anonymous, source.uuid)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized));
}

#[test]
fn session_identity_can_fork_a_public_record() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let owner = Identity::User(Uuid::new_v4());
    let source = service
        .create_record(
            &owner,
            RecordKind::Query,
            RecordDraft {
                is_public: true,
                ..draft("public", "{}")
            },
        )
        .unwrap();

    let session = Identity::Session("s1".to_string());
    let fork = service.fork_record(&session, source.uuid).unwrap();
    assert_eq!(fork.owner_id, None);
    assert_eq!(fork.session_key.as_deref(), Some("s1"));
    assert!(!fork.is_session);
}

#[test]
fn session_cannot_fork_its_own_private_record() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let session = Identity::Session("s1".to_string());
    let record = service
        .create_record(&session, RecordKind::Query, draft("private", "{}"))
        .unwrap();

    let err = service.fork_record(&session, record.uuid).unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized));
}

#[test]
fn lineage_walks_fork_of_fork_self_first() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let me = Identity::User(Uuid::new_v4());
    let a = service
        .create_record(&me, RecordKind::Query, draft("a", "{}"))
        .unwrap();
    let b = service.fork_record(&me, a.uuid).unwrap();
    let c = service.fork_record(&me, b.uuid).unwrap();

    let chain = service.lineage(&me, c.uuid).unwrap();
    let ids: Vec<RecordId> = chain.iter().map(|record| record.uuid).collect();
    assert_eq!(ids, vec![c.uuid, b.uuid, a.uuid]);
}

#[test]
fn lineage_ends_where_the_parent_was_deleted() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let me = Identity::User(Uuid::new_v4());
    let a = service
        .create_record(&me, RecordKind::Query, draft("a", "{}"))
        .unwrap();
    let b = service.fork_record(&me, a.uuid).unwrap();

    service.delete_record(&me, a.uuid).unwrap();

    let chain = service.lineage(&me, b.uuid).unwrap();
    let ids: Vec<RecordId> = chain.iter().map(|record| record.uuid).collect();
    assert_eq!(ids, vec![b.uuid]);
}

#[test]
fn lineage_stops_at_ancestors_the_requester_cannot_read() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let owner = Identity::User(Uuid::new_v4());
    let outsider = Identity::User(Uuid::new_v4());

    let root = service
        .create_record(&owner, RecordKind::Query, draft("root", "{\"secret\": true}"))
        .unwrap();
    let fork = service.fork_record(&owner, root.uuid).unwrap();
    service
        .share_record(&owner, fork.uuid, vec![share_for(&outsider)])
        .unwrap();

    // The sharee can read the fork, but the private root stays out of
    // the chain, and the fork's share set is owner-only detail.
    let chain = service.lineage(&outsider, fork.uuid).unwrap();
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].uuid, fork.uuid);
    assert!(chain[0].shared_with.is_empty());

    let chain = service.lineage(&owner, fork.uuid).unwrap();
    let ids: Vec<RecordId> = chain.iter().map(|record| record.uuid).collect();
    assert_eq!(ids, vec![fork.uuid, root.uuid]);
    assert_eq!(chain[0].shared_with.len(), 1);
}

#[test]
fn lineage_rejects_corrupted_cyclic_parent_chains() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let me = Identity::User(Uuid::new_v4());
    let a = service
        .create_record(&me, RecordKind::Query, draft("a", "{}"))
        .unwrap();
    let b = service.fork_record(&me, a.uuid).unwrap();
    set_parent(&conn, a.uuid, b.uuid);

    let err = service.lineage(&me, a.uuid).unwrap_err();
    assert!(matches!(err, ServiceError::Repo(_)));
}

#[test]
fn lineage_depth_guard_covers_long_legitimate_chains() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let me = Identity::User(Uuid::new_v4());
    let mut current = service
        .create_record(&me, RecordKind::Query, draft("root", "{}"))
        .unwrap();
    for _ in 1..MAX_FORK_DEPTH {
        current = service.fork_record(&me, current.uuid).unwrap();
    }

    let chain = service.lineage(&me, current.uuid).unwrap();
    assert_eq!(chain.len(), MAX_FORK_DEPTH);
}

#[test]
fn fork_listing_is_owner_only_for_private_records() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let owner = Identity::User(Uuid::new_v4());
    let sharee = Identity::User(Uuid::new_v4());
    let source = service
        .create_record(&owner, RecordKind::Query, draft("source", "{}"))
        .unwrap();
    service
        .share_record(&owner, source.uuid, vec![share_for(&sharee)])
        .unwrap();
    let fork = service.fork_record(&sharee, source.uuid).unwrap();

    let listed = service.list_forks(&owner, source.uuid).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].uuid, fork.uuid);

    // Sharing grants reading the record, not enumerating its forks.
    let err = service.list_forks(&sharee, source.uuid).unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized));
}

#[test]
fn fork_listing_is_open_for_public_records() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let owner = Identity::User(Uuid::new_v4());
    let source = service
        .create_record(
            &owner,
            RecordKind::Query,
            RecordDraft {
                is_public: true,
                ..draft("public", "{}")
            },
        )
        .unwrap();
    let forker = Identity::User(Uuid::new_v4());
    let fork = service.fork_record(&forker, source.uuid).unwrap();

    let listed = service
        .list_forks(&Identity::Anonymous, source.uuid)
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].uuid, fork.uuid);
}

#[test]
fn deleting_a_fork_leaves_the_source_history_untouched() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let ledger = RevisionService::new(SqliteRevisionRepository::new(&conn));

    let owner = Identity::User(Uuid::new_v4());
    let collaborator = Identity::User(Uuid::new_v4());

    let source = service
        .create_record(&owner, RecordKind::Query, draft("source", "{\"v\": 1}"))
        .unwrap();
    service
        .share_record(&owner, source.uuid, vec![share_for(&collaborator)])
        .unwrap();
    service
        .update_record(&owner, source.uuid, draft("source", "{\"v\": 2}"))
        .unwrap();

    let fork = service.fork_record(&collaborator, source.uuid).unwrap();
    service.delete_record(&collaborator, fork.uuid).unwrap();

    // The source's ledger, as its owner sees it, is unchanged.
    let source_history = ledger.history_for_record(&owner, source.uuid).unwrap();
    let operations: Vec<Operation> = source_history
        .iter()
        .map(|revision| revision.operation)
        .collect();
    assert_eq!(operations, vec![Operation::Update, Operation::Create]);

    // The fork's ledger survives its deletion for the author.
    let fork_history = ledger
        .history_for_record(&collaborator, fork.uuid)
        .unwrap();
    let operations: Vec<Operation> = fork_history
        .iter()
        .map(|revision| revision.operation)
        .collect();
    assert_eq!(operations, vec![Operation::Delete, Operation::Create]);
}
