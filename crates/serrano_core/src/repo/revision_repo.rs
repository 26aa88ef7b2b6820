//! Revision ledger persistence.
//!
//! # Responsibility
//! - Append immutable snapshots and serve ordered history lookups.
//! - Scope history queries to the requesting actor.
//!
//! # Invariants
//! - The ledger is append-only; nothing here updates or deletes rows.
//! - History ordering uses the monotonic `seq` position, newest first.
//! - Anonymous actors get empty results without a storage query.

use crate::model::identity::Identity;
use crate::model::record::{RecordId, RecordKind};
use crate::model::revision::{NewRevision, Operation, Revision};
use crate::repo::record_repo::{parse_record_kind, record_kind_to_db};
use crate::repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const REVISION_SELECT_SQL: &str = "SELECT
    seq,
    record_uuid,
    record_kind,
    operation,
    content_snapshot,
    actor_user_id,
    actor_session_key,
    recorded_at
FROM revisions";

/// Repository interface for the append-only revision ledger.
pub trait RevisionRepository {
    /// Appends one snapshot, returning its ledger position.
    fn append_revision(&self, revision: &NewRevision) -> RepoResult<i64>;
    /// Revisions of one record authored by the given actor, newest first.
    fn revisions_for_record(
        &self,
        actor: &Identity,
        record_id: RecordId,
    ) -> RepoResult<Vec<Revision>>;
    /// All revisions the actor authored for one record kind, newest
    /// first, caller-paginated.
    fn revisions_for_actor(
        &self,
        actor: &Identity,
        kind: RecordKind,
        limit: Option<u32>,
        offset: u32,
    ) -> RepoResult<Vec<Revision>>;
    /// Strict lookup: the revision must exist AND belong to `record_id`.
    fn get_revision(
        &self,
        actor: &Identity,
        record_id: RecordId,
        seq: i64,
    ) -> RepoResult<Option<Revision>>;
}

/// SQLite-backed revision ledger.
pub struct SqliteRevisionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRevisionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

/// Returns the actor-match SQL clause and bind value, or `None` for
/// anonymous actors whose history is empty by definition.
fn actor_clause(actor: &Identity) -> Option<(&'static str, Value)> {
    match actor {
        Identity::User(user_id) => Some((
            "actor_user_id = ?",
            Value::Text(user_id.to_string()),
        )),
        Identity::Session(key) => Some((
            "actor_session_key = ?",
            Value::Text(key.clone()),
        )),
        Identity::Anonymous => None,
    }
}

impl RevisionRepository for SqliteRevisionRepository<'_> {
    fn append_revision(&self, revision: &NewRevision) -> RepoResult<i64> {
        self.conn.execute(
            "INSERT INTO revisions (
                record_uuid,
                record_kind,
                operation,
                content_snapshot,
                actor_user_id,
                actor_session_key,
                recorded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                revision.record_id.to_string(),
                record_kind_to_db(revision.record_kind),
                operation_to_db(revision.operation),
                revision.content_snapshot.as_str(),
                revision.actor_user_id.map(|id| id.to_string()),
                revision.actor_session_key.as_deref(),
                revision.recorded_at,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn revisions_for_record(
        &self,
        actor: &Identity,
        record_id: RecordId,
    ) -> RepoResult<Vec<Revision>> {
        let Some((clause, bind)) = actor_clause(actor) else {
            return Ok(Vec::new());
        };

        let mut stmt = self.conn.prepare(&format!(
            "{REVISION_SELECT_SQL}
             WHERE record_uuid = ? AND {clause}
             ORDER BY seq DESC;"
        ))?;

        let binds = vec![Value::Text(record_id.to_string()), bind];
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut revisions = Vec::new();

        while let Some(row) = rows.next()? {
            revisions.push(parse_revision_row(row)?);
        }

        Ok(revisions)
    }

    fn revisions_for_actor(
        &self,
        actor: &Identity,
        kind: RecordKind,
        limit: Option<u32>,
        offset: u32,
    ) -> RepoResult<Vec<Revision>> {
        let Some((clause, bind)) = actor_clause(actor) else {
            return Ok(Vec::new());
        };

        let mut sql = format!(
            "{REVISION_SELECT_SQL}
             WHERE record_kind = ? AND {clause}
             ORDER BY seq DESC"
        );
        let mut binds = vec![Value::Text(record_kind_to_db(kind).to_string()), bind];

        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            binds.push(Value::Integer(i64::from(limit)));
            if offset > 0 {
                sql.push_str(" OFFSET ?");
                binds.push(Value::Integer(i64::from(offset)));
            }
        } else if offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            binds.push(Value::Integer(i64::from(offset)));
        }
        sql.push(';');

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut revisions = Vec::new();

        while let Some(row) = rows.next()? {
            revisions.push(parse_revision_row(row)?);
        }

        Ok(revisions)
    }

    fn get_revision(
        &self,
        actor: &Identity,
        record_id: RecordId,
        seq: i64,
    ) -> RepoResult<Option<Revision>> {
        let Some((clause, bind)) = actor_clause(actor) else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(&format!(
            "{REVISION_SELECT_SQL}
             WHERE seq = ? AND record_uuid = ? AND {clause};"
        ))?;

        let binds = vec![
            Value::Integer(seq),
            Value::Text(record_id.to_string()),
            bind,
        ];
        let mut rows = stmt.query(params_from_iter(binds))?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_revision_row(row)?));
        }

        Ok(None)
    }
}

fn parse_revision_row(row: &Row<'_>) -> RepoResult<Revision> {
    let record_text: String = row.get("record_uuid")?;
    let record_id = Uuid::parse_str(&record_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid value `{record_text}` in revisions.record_uuid"
        ))
    })?;

    let kind_text: String = row.get("record_kind")?;
    let record_kind = parse_record_kind(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid record kind `{kind_text}` in revisions.record_kind"
        ))
    })?;

    let operation_text: String = row.get("operation")?;
    let operation = parse_operation(&operation_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid operation `{operation_text}` in revisions.operation"
        ))
    })?;

    let actor_user_id = match row.get::<_, Option<String>>("actor_user_id")? {
        Some(text) => Some(Uuid::parse_str(&text).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid uuid value `{text}` in revisions.actor_user_id"
            ))
        })?),
        None => None,
    };

    Ok(Revision {
        seq: row.get("seq")?,
        record_id,
        record_kind,
        operation,
        content_snapshot: row.get("content_snapshot")?,
        actor_user_id,
        actor_session_key: row.get("actor_session_key")?,
        recorded_at: row.get("recorded_at")?,
    })
}

fn operation_to_db(operation: Operation) -> &'static str {
    match operation {
        Operation::Create => "create",
        Operation::Update => "update",
        Operation::Delete => "delete",
    }
}

fn parse_operation(value: &str) -> Option<Operation> {
    match value {
        "create" => Some(Operation::Create),
        "update" => Some(Operation::Update),
        "delete" => Some(Operation::Delete),
        _ => None,
    }
}
