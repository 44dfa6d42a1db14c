//! Generic entity repository over SQLite.
//!
//! # Responsibility
//! - Insert and update any `SqlRecord` through one code path.
//! - Hand out `EntityQuery` scopes for lifecycle filtering and lookups.
//! - Map persisted rows back to validated entities.
//!
//! # Invariants
//! - Write paths call `Entity::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - `created_at`, `created_by` and `uuid` are never rewritten by `save`.

use crate::config::Settings;
use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::base::{now_epoch_ms, BaseFields, UserId, ValidationError};
use crate::model::entity::Entity;
use crate::model::named::Named;
use crate::model::user::User;
use crate::repo::lookup::Criterion;
use crate::repo::query::EntityQuery;
use log::info;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, ErrorCode, Row};
use std::marker::PhantomData;
use thiserror::Error;
use uuid::Uuid;

/// Tables whose audit columns reference `users`.
pub const AUDITED_TABLES: &[&str] = &[User::TABLE, Named::TABLE];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for entity persistence and query operations.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("record not found: {0}")]
    NotFound(Uuid),
    #[error("record already persisted: {0}")]
    AlreadyPersisted(Uuid),
    /// A store constraint (unique, foreign key, check) rejected the write.
    #[error("constraint violation: {0}")]
    Conflict(String),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error("invalid query criteria: {0}")]
    InvalidCriteria(String),
    #[error("refusing to delete the default audit user {0}")]
    DefaultUserDeletion(UserId),
    #[error("repository requires schema version {expected_version}, got {actual_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("repository requires table `{0}`")]
    MissingRequiredTable(&'static str),
    #[error("repository requires column `{column}` in table `{table}`")]
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, message) = &value {
            if failure.code == ErrorCode::ConstraintViolation {
                return Self::Conflict(message.clone().unwrap_or_else(|| failure.to_string()));
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Row mapping for an entity's own (non-base) columns.
///
/// `own_values` must follow the concrete order of `Schema::own_fields`.
pub trait SqlRecord: Entity {
    fn own_values(&self) -> Vec<Value>;

    fn from_row(base: BaseFields, row: &Row<'_>) -> RepoResult<Self>;
}

/// SQLite-backed repository for one entity type.
pub struct SqliteRepository<'conn, E> {
    conn: &'conn Connection,
    default_user: Option<UserId>,
    _entity: PhantomData<E>,
}

impl<'conn, E: SqlRecord> SqliteRepository<'conn, E> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, E::TABLE, &E::schema().column_names())?;
        Ok(Self {
            conn,
            default_user: None,
            _entity: PhantomData,
        })
    }

    /// Creates a repository that substitutes the configured audit default
    /// user when users are hard deleted.
    pub fn from_settings(conn: &'conn Connection, settings: &Settings) -> RepoResult<Self> {
        Ok(Self::try_new(conn)?.with_default_user(settings.audit_default_user))
    }

    /// Sets the user that replaces references to hard-deleted users.
    pub fn with_default_user(mut self, default_user: Option<UserId>) -> Self {
        self.default_user = default_user;
        self
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    /// Inserts a new record and assigns its primary key.
    ///
    /// Stamps `created_at`/`modified_at` and fills `created_by`/`updated_by`
    /// from `actor` when they are still empty.
    pub fn create(&self, entity: &mut E, actor: Option<UserId>) -> RepoResult<()> {
        if entity.base().is_persisted() {
            return Err(RepoError::AlreadyPersisted(entity.base().uuid));
        }

        let now = now_epoch_ms();
        let base = entity.base_mut();
        base.created_at = now;
        base.modified_at = now;
        base.created_by = base.created_by.or(actor);
        base.updated_by = base.updated_by.or(actor);
        entity.validate()?;

        let columns = E::schema().column_names();
        let mut values = base_values(entity.base());
        values.extend(entity.own_values());
        let placeholders = vec!["?"; columns.len()].join(", ");
        self.conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({placeholders});",
                E::TABLE,
                columns.join(", ")
            ),
            params_from_iter(values),
        )?;

        let id = self.conn.last_insert_rowid();
        entity.base_mut().id = Some(id);
        info!(
            "event=entity_create module=repo status=ok table={} id={id} uuid={}",
            E::TABLE,
            entity.base().uuid
        );
        Ok(())
    }

    /// Writes every mutable column of a persisted record.
    pub fn save(&self, entity: &mut E, actor: Option<UserId>) -> RepoResult<()> {
        let Some(id) = entity.base().id else {
            return Err(RepoError::NotFound(entity.base().uuid));
        };
        entity.base_mut().touch(actor, now_epoch_ms());
        entity.validate()?;

        let columns = E::schema().column_names();
        let mut values = base_values(entity.base());
        values.extend(entity.own_values());
        let mut assignments = Vec::new();
        let mut params = Vec::new();
        for (column, value) in columns.into_iter().zip(values) {
            if IMMUTABLE_COLUMNS.contains(&column) {
                continue;
            }
            assignments.push(format!("{column} = ?"));
            params.push(value);
        }
        params.push(Value::Integer(id));
        params.push(Value::Text(entity.base().uuid.to_string()));

        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET {} WHERE id = ? AND uuid = ?;",
                E::TABLE,
                assignments.join(", ")
            ),
            params_from_iter(params),
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(entity.base().uuid));
        }

        info!(
            "event=entity_save module=repo status=ok table={} id={id}",
            E::TABLE
        );
        Ok(())
    }

    /// Query scope over every row, deleted ones included.
    pub fn objects(&self) -> EntityQuery<'conn, E> {
        EntityQuery::new(self.conn, self.default_user)
    }

    /// Query scope over rows that are not soft deleted.
    pub fn alive(&self) -> EntityQuery<'conn, E> {
        self.objects().alive()
    }

    /// Loads one record by external identity, deleted ones included.
    pub fn get_by_uuid(&self, uuid: Uuid) -> RepoResult<E> {
        self.objects()
            .get_or_none(&[Criterion::eq("uuid", uuid)])?
            .ok_or(RepoError::NotFound(uuid))
    }
}

const IMMUTABLE_COLUMNS: &[&str] = &["id", "uuid", "created_at", "created_by"];

/// Base column values in `BASE_FIELDS` order.
pub(crate) fn base_values(base: &BaseFields) -> Vec<Value> {
    vec![
        base.id.map_or(Value::Null, Value::Integer),
        Value::Text(base.uuid.to_string()),
        Value::Integer(base.created_at),
        Value::Integer(base.modified_at),
        base.deleted_at.map_or(Value::Null, Value::Integer),
        base.created_by.map_or(Value::Null, Value::Integer),
        base.updated_by.map_or(Value::Null, Value::Integer),
        base.deleted_by.map_or(Value::Null, Value::Integer),
        Value::Integer(bool_to_int(base.is_active)),
        Value::Integer(bool_to_int(base.is_deleted)),
    ]
}

/// Reads the base columns of `table` from `row`.
pub(crate) fn parse_base(row: &Row<'_>, table: &str) -> RepoResult<BaseFields> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in {table}.uuid"))
    })?;

    Ok(BaseFields {
        id: Some(row.get("id")?),
        uuid,
        created_at: row.get("created_at")?,
        modified_at: row.get("modified_at")?,
        deleted_at: row.get("deleted_at")?,
        created_by: row.get("created_by")?,
        updated_by: row.get("updated_by")?,
        deleted_by: row.get("deleted_by")?,
        is_active: parse_flag(row, table, "is_active")?,
        is_deleted: parse_flag(row, table, "is_deleted")?,
    })
}

/// Reads a 0/1 integer column as `bool`.
pub(crate) fn parse_flag(row: &Row<'_>, table: &str, column: &str) -> RepoResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid {column} value `{other}` in {table}.{column}"
        ))),
    }
}

/// Maps one full row to a validated entity.
pub(crate) fn parse_row<E: SqlRecord>(row: &Row<'_>) -> RepoResult<E> {
    let base = parse_base(row, E::TABLE)?;
    let entity = E::from_row(base, row)?;
    entity.validate()?;
    Ok(entity)
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_connection_ready(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let present = table_columns(conn, table)?;
    if present.is_empty() {
        return Err(RepoError::MissingRequiredTable(table));
    }
    for &column in columns {
        if !present.iter().any(|name| name == column) {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}
