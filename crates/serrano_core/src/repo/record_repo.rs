//! Record repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and predicate-driven listing over `records` storage.
//! - Render access predicates to SQL; keep SQL details inside the
//!   persistence boundary.
//!
//! # Invariants
//! - Write paths call `Record::validate()` before SQL mutations.
//! - Listings order by `accessed_at DESC`, ties by `uuid DESC`, and are
//!   deduplicated (share membership renders as `EXISTS`, not a join).
//! - Deleting a record cascades into `record_shares` but never into
//!   `revisions`.

use crate::access::Predicate;
use crate::model::identity::Identity;
use crate::model::record::{Record, RecordId, RecordKind, SharedUser};
use crate::repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const RECORD_SELECT_SQL: &str = "SELECT
    uuid,
    kind,
    name,
    description,
    content,
    owner_id,
    session_key,
    is_session,
    is_public,
    parent_uuid,
    created_at,
    accessed_at
FROM records";

/// Repository interface for record persistence.
pub trait RecordRepository {
    fn create_record(&self, record: &Record) -> RepoResult<RecordId>;
    fn update_record(&self, record: &Record) -> RepoResult<()>;
    fn get_record(&self, id: RecordId) -> RepoResult<Option<Record>>;
    /// Finds the identity's session working record of the given kind.
    fn find_session_record(
        &self,
        identity: &Identity,
        kind: RecordKind,
    ) -> RepoResult<Option<Record>>;
    fn list_records(&self, predicate: &Predicate) -> RepoResult<Vec<Record>>;
    /// Stamps `accessed_at`; the record row must exist.
    fn touch_accessed(&self, id: RecordId, accessed_at: i64) -> RepoResult<()>;
    /// Replaces the full share set (last-write-wins).
    fn replace_shares(&self, id: RecordId, shares: &[SharedUser]) -> RepoResult<()>;
    fn delete_record(&self, id: RecordId) -> RepoResult<()>;
}

/// SQLite-backed record repository.
pub struct SqliteRecordRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn load_shares(&self, id: RecordId) -> RepoResult<Vec<SharedUser>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, email FROM record_shares
             WHERE record_uuid = ?1
             ORDER BY user_id;",
        )?;
        let mut rows = stmt.query(params![id.to_string()])?;
        let mut shares = Vec::new();

        while let Some(row) = rows.next()? {
            let user_text: String = row.get("user_id")?;
            let user_id = Uuid::parse_str(&user_text).map_err(|_| {
                RepoError::InvalidData(format!(
                    "invalid uuid value `{user_text}` in record_shares.user_id"
                ))
            })?;
            shares.push(SharedUser {
                user_id,
                email: row.get("email")?,
            });
        }

        Ok(shares)
    }

    fn hydrate(&self, row: &Row<'_>) -> RepoResult<Record> {
        let mut record = parse_record_row(row)?;
        record.shared_with = self.load_shares(record.uuid)?;
        record.validate()?;
        Ok(record)
    }
}

impl RecordRepository for SqliteRecordRepository<'_> {
    fn create_record(&self, record: &Record) -> RepoResult<RecordId> {
        record.validate()?;

        self.conn.execute(
            "INSERT INTO records (
                uuid,
                kind,
                name,
                description,
                content,
                owner_id,
                session_key,
                is_session,
                is_public,
                parent_uuid,
                created_at,
                accessed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            params![
                record.uuid.to_string(),
                record_kind_to_db(record.kind),
                record.name.as_str(),
                record.description.as_str(),
                record.content.as_str(),
                record.owner_id.map(|id| id.to_string()),
                record.session_key.as_deref(),
                bool_to_int(record.is_session),
                bool_to_int(record.is_public),
                record.parent.map(|id| id.to_string()),
                record.created_at,
                record.accessed_at,
            ],
        )?;

        if !record.shared_with.is_empty() {
            self.replace_shares(record.uuid, &record.shared_with)?;
        }

        Ok(record.uuid)
    }

    fn update_record(&self, record: &Record) -> RepoResult<()> {
        record.validate()?;

        let changed = self.conn.execute(
            "UPDATE records
             SET
                kind = ?1,
                name = ?2,
                description = ?3,
                content = ?4,
                owner_id = ?5,
                session_key = ?6,
                is_session = ?7,
                is_public = ?8,
                parent_uuid = ?9
             WHERE uuid = ?10;",
            params![
                record_kind_to_db(record.kind),
                record.name.as_str(),
                record.description.as_str(),
                record.content.as_str(),
                record.owner_id.map(|id| id.to_string()),
                record.session_key.as_deref(),
                bool_to_int(record.is_session),
                bool_to_int(record.is_public),
                record.parent.map(|id| id.to_string()),
                record.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(record.uuid));
        }

        Ok(())
    }

    fn get_record(&self, id: RecordId) -> RepoResult<Option<Record>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RECORD_SELECT_SQL} WHERE uuid = ?1;"))?;

        let mut rows = stmt.query(params![id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(self.hydrate(row)?));
        }

        Ok(None)
    }

    fn find_session_record(
        &self,
        identity: &Identity,
        kind: RecordKind,
    ) -> RepoResult<Option<Record>> {
        let owner = match identity {
            Identity::User(user_id) => Predicate::OwnerIs(*user_id),
            Identity::Session(key) => Predicate::SessionKeyIs(key.clone()),
            Identity::Anonymous => return Ok(None),
        };

        let predicate = Predicate::All(vec![
            Predicate::IsSessionRecord(true),
            Predicate::KindIs(kind),
            owner,
        ]);
        Ok(self.list_records(&predicate)?.into_iter().next())
    }

    fn list_records(&self, predicate: &Predicate) -> RepoResult<Vec<Record>> {
        let mut bind_values: Vec<Value> = Vec::new();
        let clause = predicate_to_sql(predicate, &mut bind_values);
        let sql = format!(
            "{RECORD_SELECT_SQL} WHERE {clause} ORDER BY accessed_at DESC, uuid DESC;"
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            records.push(self.hydrate(row)?);
        }

        Ok(records)
    }

    fn touch_accessed(&self, id: RecordId, accessed_at: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE records SET accessed_at = ?1 WHERE uuid = ?2;",
            params![accessed_at, id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn replace_shares(&self, id: RecordId, shares: &[SharedUser]) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM record_shares WHERE record_uuid = ?1;",
            params![id.to_string()],
        )?;

        let mut stmt = self.conn.prepare(
            "INSERT OR REPLACE INTO record_shares (record_uuid, user_id, email)
             VALUES (?1, ?2, ?3);",
        )?;
        for share in shares {
            stmt.execute(params![
                id.to_string(),
                share.user_id.to_string(),
                share.email.as_str(),
            ])?;
        }

        Ok(())
    }

    fn delete_record(&self, id: RecordId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM records WHERE uuid = ?1;",
            params![id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

/// Renders one access predicate to a SQL clause, pushing bind values in
/// rendering order.
fn predicate_to_sql(predicate: &Predicate, binds: &mut Vec<Value>) -> String {
    match predicate {
        Predicate::OwnerIs(user_id) => {
            binds.push(Value::Text(user_id.to_string()));
            "owner_id = ?".to_string()
        }
        Predicate::SessionKeyIs(key) => {
            binds.push(Value::Text(key.clone()));
            "session_key = ?".to_string()
        }
        Predicate::SharedWithUser(user_id) => {
            binds.push(Value::Text(user_id.to_string()));
            "EXISTS (SELECT 1 FROM record_shares
                WHERE record_shares.record_uuid = records.uuid
                  AND record_shares.user_id = ?)"
                .to_string()
        }
        Predicate::IsPublic => "is_public = 1".to_string(),
        Predicate::ParentIs(parent_id) => {
            binds.push(Value::Text(parent_id.to_string()));
            "parent_uuid = ?".to_string()
        }
        Predicate::KindIs(kind) => {
            binds.push(Value::Text(record_kind_to_db(*kind).to_string()));
            "kind = ?".to_string()
        }
        Predicate::IsSessionRecord(flag) => {
            binds.push(Value::Integer(bool_to_int(*flag)));
            "is_session = ?".to_string()
        }
        Predicate::Any(parts) => compose(parts, " OR ", "0", binds),
        Predicate::All(parts) => compose(parts, " AND ", "1", binds),
    }
}

fn compose(parts: &[Predicate], separator: &str, empty: &str, binds: &mut Vec<Value>) -> String {
    if parts.is_empty() {
        return empty.to_string();
    }
    let clauses: Vec<String> = parts
        .iter()
        .map(|part| predicate_to_sql(part, binds))
        .collect();
    format!("({})", clauses.join(separator))
}

fn parse_record_row(row: &Row<'_>) -> RepoResult<Record> {
    let uuid = parse_uuid_column(row, "uuid")?;

    let kind_text: String = row.get("kind")?;
    let kind = parse_record_kind(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid record kind `{kind_text}` in records.kind"))
    })?;

    let owner_id = parse_optional_uuid_column(row, "owner_id")?;
    let parent = parse_optional_uuid_column(row, "parent_uuid")?;
    let is_session = parse_flag_column(row, "is_session")?;
    let is_public = parse_flag_column(row, "is_public")?;

    Ok(Record {
        uuid,
        kind,
        name: row.get("name")?,
        description: row.get("description")?,
        content: row.get("content")?,
        owner_id,
        session_key: row.get("session_key")?,
        is_session,
        is_public,
        parent,
        shared_with: Vec::new(),
        created_at: row.get("created_at")?,
        accessed_at: row.get("accessed_at")?,
    })
}

fn parse_uuid_column(row: &Row<'_>, column: &'static str) -> RepoResult<Uuid> {
    let text: String = row.get(column)?;
    Uuid::parse_str(&text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{text}` in records.{column}"))
    })
}

fn parse_optional_uuid_column(row: &Row<'_>, column: &'static str) -> RepoResult<Option<Uuid>> {
    match row.get::<_, Option<String>>(column)? {
        Some(text) => {
            let parsed = Uuid::parse_str(&text).map_err(|_| {
                RepoError::InvalidData(format!("invalid uuid value `{text}` in records.{column}"))
            })?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn parse_flag_column(row: &Row<'_>, column: &'static str) -> RepoResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in records.{column}"
        ))),
    }
}

pub(crate) fn record_kind_to_db(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Query => "query",
        RecordKind::View => "view",
    }
}

pub(crate) fn parse_record_kind(value: &str) -> Option<RecordKind> {
    match value {
        "query" => Some(RecordKind::Query),
        "view" => Some(RecordKind::View),
        _ => None,
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
