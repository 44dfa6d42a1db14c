//! Lifecycle-filtered query scopes over one entity table.
//!
//! # Responsibility
//! - Translate `LifecycleFilter` predicates and equality criteria to SQL.
//! - Run lifecycle mutations over a scope as single statements.
//! - Resolve single-record lookups without raising on absence.
//!
//! # Invariants
//! - Mutations never touch rows outside the scope.
//! - `soft_delete` leaves already deleted rows (and their stamps) untouched.
//! - Hard-deleting users rewrites every audit reference to them first.

use crate::lifecycle::LifecycleFilter;
use crate::model::base::{now_epoch_ms, UserId};
use crate::repo::entity_repo::{
    bool_to_int, parse_row, RepoError, RepoResult, SqlRecord, AUDITED_TABLES,
};
use crate::repo::lookup::{bind, Binding, Criterion, Lookup};
use log::{debug, info};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::marker::PhantomData;

/// Row order of fetched results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Primary key ascending.
    #[default]
    Insertion,
    /// `modified_at` descending, then primary key ascending.
    RecentlyModified,
}

impl SortOrder {
    fn sql(self) -> &'static str {
        match self {
            Self::Insertion => "id ASC",
            Self::RecentlyModified => "modified_at DESC, id ASC",
        }
    }
}

/// A filtered view of one entity table.
///
/// Builders consume and return the scope; terminal operations borrow it.
#[derive(Debug, Clone)]
pub struct EntityQuery<'conn, E> {
    conn: &'conn Connection,
    filter: LifecycleFilter,
    criteria: Vec<Criterion>,
    default_user: Option<UserId>,
    order: SortOrder,
    _entity: PhantomData<E>,
}

impl<'conn, E: SqlRecord> EntityQuery<'conn, E> {
    pub(crate) fn new(conn: &'conn Connection, default_user: Option<UserId>) -> Self {
        Self {
            conn,
            filter: LifecycleFilter::all(),
            criteria: Vec::new(),
            default_user,
            order: SortOrder::default(),
            _entity: PhantomData,
        }
    }

    pub fn alive(mut self) -> Self {
        self.filter = self.filter.alive();
        self
    }

    pub fn dead(mut self) -> Self {
        self.filter = self.filter.dead();
        self
    }

    pub fn active(mut self) -> Self {
        self.filter = self.filter.active();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.filter = self.filter.inactive();
        self
    }

    /// Narrows the scope by every predicate of `filter`.
    pub fn scope(mut self, filter: &LifecycleFilter) -> Self {
        self.filter = self.filter.and(filter);
        self
    }

    /// Narrows the scope by an equality criterion.
    ///
    /// A criterion that does not bind to the schema surfaces as
    /// `RepoError::InvalidCriteria` from the terminal operation.
    pub fn filter(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    pub fn order_by(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn lifecycle_filter(&self) -> &LifecycleFilter {
        &self.filter
    }

    /// Every row in scope.
    pub fn fetch(&self) -> RepoResult<Vec<E>> {
        let (clause, params) = self.where_clause(&[])?;
        self.select(&clause, params, "")
    }

    /// One window of the scope, in scope order.
    pub fn fetch_page(&self, limit: u32, offset: u32) -> RepoResult<Vec<E>> {
        let (clause, mut params) = self.where_clause(&[])?;
        params.push(Value::Integer(i64::from(limit)));
        params.push(Value::Integer(i64::from(offset)));
        self.select(&clause, params, " LIMIT ? OFFSET ?")
    }

    pub fn count(&self) -> RepoResult<usize> {
        let (clause, params) = self.where_clause(&[])?;
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE {clause};", E::TABLE),
            params_from_iter(params),
            |row| row.get(0),
        )?;
        usize::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count {count}")))
    }

    pub fn exists(&self) -> RepoResult<bool> {
        Ok(self.count()? > 0)
    }

    /// Resolves exactly one row matching `criteria` within the scope.
    ///
    /// Malformed criteria (given here or through `filter`), zero matches and
    /// several matches are reported as distinct `Lookup` variants; only
    /// storage failures are errors.
    pub fn resolve(&self, criteria: &[Criterion]) -> RepoResult<Lookup<E>> {
        let bindings = match criteria
            .iter()
            .map(|criterion| bind(E::schema(), criterion))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(bindings) => bindings,
            Err(reason) => return Ok(self.absent(Lookup::Malformed(reason))),
        };

        let (clause, params) = match self.where_clause(&bindings) {
            Ok(parts) => parts,
            Err(RepoError::InvalidCriteria(reason)) => {
                return Ok(self.absent(Lookup::Malformed(reason)));
            }
            Err(err) => return Err(err),
        };
        let mut rows = self.select(&clause, params, " LIMIT 2")?;
        if rows.len() > 1 {
            return Ok(self.absent(Lookup::Ambiguous));
        }
        Ok(rows
            .pop()
            .map_or_else(|| self.absent(Lookup::NotFound), Lookup::Found))
    }

    /// Returns the single row matching `criteria`, or `None` when the
    /// criteria match nothing, match several rows or are malformed.
    pub fn get_or_none(&self, criteria: &[Criterion]) -> RepoResult<Option<E>> {
        Ok(self.resolve(criteria)?.into_option())
    }

    /// Soft deletes every live row in scope as `actor`.
    ///
    /// Returns the number of rows newly deleted.
    pub fn soft_delete(&self, actor: Option<UserId>) -> RepoResult<usize> {
        let now = now_epoch_ms();
        let assignments = "is_deleted = 1, is_active = 0, deleted_at = ?, deleted_by = ?";
        let params = vec![Value::Integer(now), user_value(actor)];
        self.mutate("soft_delete", assignments, params, "is_deleted = 0", actor, now)
    }

    /// Clears the deletion stamp of every deleted row in scope and
    /// re-activates it.
    pub fn restore(&self, actor: Option<UserId>) -> RepoResult<usize> {
        let now = now_epoch_ms();
        let assignments = "is_deleted = 0, is_active = 1, deleted_at = NULL, deleted_by = NULL";
        self.mutate("restore", assignments, Vec::new(), "is_deleted = 1", actor, now)
    }

    /// Re-activates deactivated rows in scope. Deleted rows are skipped.
    pub fn activate(&self, actor: Option<UserId>) -> RepoResult<usize> {
        let now = now_epoch_ms();
        self.mutate(
            "activate",
            "is_active = 1",
            Vec::new(),
            "is_deleted = 0 AND is_active = 0",
            actor,
            now,
        )
    }

    pub fn deactivate(&self, actor: Option<UserId>) -> RepoResult<usize> {
        let now = now_epoch_ms();
        self.mutate("deactivate", "is_active = 0", Vec::new(), "is_active = 1", actor, now)
    }

    /// Physically removes every row in scope. Irreversible.
    ///
    /// For user rows, audit references in every audited table are first
    /// rewritten to the default user, in the same transaction. Deleting
    /// the default user itself is refused.
    pub fn hard_delete(&self) -> RepoResult<usize> {
        let (clause, params) = self.where_clause(&[])?;
        if !E::AUDIT_TARGET {
            let removed = self.conn.execute(
                &format!("DELETE FROM {} WHERE {clause};", E::TABLE),
                params_from_iter(params),
            )?;
            info!(
                "event=hard_delete module=repo status=ok table={} rows={removed}",
                E::TABLE
            );
            return Ok(removed);
        }

        let tx = self.conn.unchecked_transaction()?;
        let ids: Vec<i64> = {
            let mut stmt = tx.prepare(&format!("SELECT id FROM {} WHERE {clause};", E::TABLE))?;
            let rows = stmt.query_map(params_from_iter(params), |row| row.get(0))?;
            rows.collect::<rusqlite::Result<Vec<i64>>>()?
        };
        if ids.is_empty() {
            return Ok(0);
        }
        if let Some(default_user) = self.default_user {
            if ids.contains(&default_user) {
                return Err(RepoError::DefaultUserDeletion(default_user));
            }
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut substituted = 0;
        for table in AUDITED_TABLES {
            for column in ["created_by", "updated_by", "deleted_by"] {
                let mut params = vec![user_value(self.default_user)];
                params.extend(ids.iter().copied().map(Value::Integer));
                substituted += tx.execute(
                    &format!("UPDATE {table} SET {column} = ? WHERE {column} IN ({placeholders});"),
                    params_from_iter(params),
                )?;
            }
        }
        let removed = tx.execute(
            &format!("DELETE FROM {} WHERE id IN ({placeholders});", E::TABLE),
            params_from_iter(ids.iter().copied().map(Value::Integer)),
        )?;
        tx.commit()?;

        info!(
            "event=hard_delete module=repo status=ok table={} rows={removed} substituted_refs={substituted}",
            E::TABLE
        );
        Ok(removed)
    }

    fn absent(&self, lookup: Lookup<E>) -> Lookup<E> {
        match &lookup {
            Lookup::Malformed(reason) => debug!(
                "event=lookup module=repo status=absent outcome=malformed table={} reason={reason}",
                E::TABLE
            ),
            other => debug!(
                "event=lookup module=repo status=absent outcome={} table={}",
                other.outcome(),
                E::TABLE
            ),
        }
        lookup
    }

    fn mutate(
        &self,
        event: &str,
        assignments: &str,
        mut params: Vec<Value>,
        guard: &str,
        actor: Option<UserId>,
        now: i64,
    ) -> RepoResult<usize> {
        let (clause, scope_params) = self.where_clause(&[])?;
        params.push(Value::Integer(now));
        params.push(user_value(actor));
        params.extend(scope_params);

        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET {assignments}, modified_at = MAX(?, created_at), updated_by = COALESCE(?, updated_by) WHERE {clause} AND {guard};",
                E::TABLE
            ),
            params_from_iter(params),
        )?;
        info!(
            "event={event} module=repo status=ok table={} rows={changed}",
            E::TABLE
        );
        Ok(changed)
    }

    fn select(&self, clause: &str, params: Vec<Value>, tail: &str) -> RepoResult<Vec<E>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {clause} ORDER BY {}{tail};",
            E::schema().column_names().join(", "),
            E::TABLE,
            self.order.sql()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(parse_row::<E>(row)?);
        }
        Ok(entities)
    }

    /// Builds the scope predicate plus `extra` bindings.
    fn where_clause(&self, extra: &[Binding]) -> RepoResult<(String, Vec<Value>)> {
        let mut predicates = Vec::new();
        let mut params = Vec::new();

        for predicate in self.filter.predicates() {
            predicates.push(format!("{} = ?", predicate.flag.column()));
            params.push(Value::Integer(bool_to_int(predicate.value)));
        }

        let scoped = self
            .criteria
            .iter()
            .map(|criterion| bind(E::schema(), criterion).map_err(RepoError::InvalidCriteria))
            .collect::<RepoResult<Vec<_>>>()?;
        for binding in scoped.into_iter().chain(extra.iter().cloned()) {
            predicates.push(binding.predicate());
            params.extend(binding.into_param());
        }

        if predicates.is_empty() {
            return Ok(("1 = 1".to_string(), params));
        }
        Ok((predicates.join(" AND "), params))
    }
}

fn user_value(user: Option<UserId>) -> Value {
    user.map_or(Value::Null, Value::Integer)
}
