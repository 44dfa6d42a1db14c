//! Entity base shape.
//!
//! # Responsibility
//! - Define identity, audit stamps and lifecycle flags shared by every
//!   persisted record.
//! - Provide in-record lifecycle transitions (soft delete, restore,
//!   activation).
//!
//! # Invariants
//! - `uuid` is generated once, never nil and never rewritten.
//! - `is_deleted == true` implies `is_active == false`.
//! - `created_by`, `updated_by` and `deleted_by` are weak references: the
//!   record never owns the referenced user.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Internal primary key assigned by the store.
pub type RecordId = i64;

/// Primary key of a row in the `users` table.
pub type UserId = RecordId;

/// Returns the current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

/// Validation failures for entity state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("uuid must not be nil")]
    NilUuid,
    #[error("a deleted record must be inactive")]
    DeletedButActive,
    #[error("modified_at ({modified_at}) must be >= created_at ({created_at})")]
    ModifiedBeforeCreated { created_at: i64, modified_at: i64 },
    #[error("{field}: {message}")]
    Field { field: String, message: String },
}

impl ValidationError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Field {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Columns every entity table carries in addition to its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseFields {
    /// `None` until the row has been inserted.
    pub id: Option<RecordId>,
    pub uuid: Uuid,
    pub created_at: i64,
    pub modified_at: i64,
    pub deleted_at: Option<i64>,
    pub created_by: Option<UserId>,
    pub updated_by: Option<UserId>,
    pub deleted_by: Option<UserId>,
    pub is_active: bool,
    pub is_deleted: bool,
}

impl Default for BaseFields {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseFields {
    /// Creates base fields for a new, not yet persisted record.
    ///
    /// # Invariants
    /// - `is_active` starts as `true`, `is_deleted` as `false`.
    /// - Audit references start empty.
    pub fn new() -> Self {
        let now = now_epoch_ms();
        Self {
            id: None,
            uuid: Uuid::new_v4(),
            created_at: now,
            modified_at: now,
            deleted_at: None,
            created_by: None,
            updated_by: None,
            deleted_by: None,
            is_active: true,
            is_deleted: false,
        }
    }

    /// Creates base fields with an externally supplied identity.
    ///
    /// Used by import paths where the UUID already exists elsewhere.
    pub fn with_uuid(uuid: Uuid) -> Result<Self, ValidationError> {
        if uuid.is_nil() {
            return Err(ValidationError::NilUuid);
        }
        Ok(Self {
            uuid,
            ..Self::new()
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.uuid.is_nil() {
            return Err(ValidationError::NilUuid);
        }
        if self.is_deleted && self.is_active {
            return Err(ValidationError::DeletedButActive);
        }
        if self.modified_at < self.created_at {
            return Err(ValidationError::ModifiedBeforeCreated {
                created_at: self.created_at,
                modified_at: self.modified_at,
            });
        }
        Ok(())
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Returns whether the record has not been soft deleted.
    pub fn is_alive(&self) -> bool {
        !self.is_deleted
    }

    /// Stamps a mutation by `actor` at `now`.
    pub fn touch(&mut self, actor: Option<UserId>, now: i64) {
        self.modified_at = now.max(self.created_at);
        if actor.is_some() {
            self.updated_by = actor;
        }
    }

    /// Marks the record as soft deleted.
    ///
    /// Returns `false` without touching any stamp when the record is already
    /// deleted, so repeated calls keep the first deletion stamp.
    pub fn soft_delete(&mut self, actor: Option<UserId>, now: i64) -> bool {
        if self.is_deleted {
            return false;
        }
        self.is_deleted = true;
        self.is_active = false;
        self.deleted_at = Some(now);
        self.deleted_by = actor;
        self.touch(actor, now);
        true
    }

    /// Clears the soft delete stamp and re-activates the record.
    pub fn restore(&mut self, actor: Option<UserId>, now: i64) -> bool {
        if !self.is_deleted {
            return false;
        }
        self.is_deleted = false;
        self.is_active = true;
        self.deleted_at = None;
        self.deleted_by = None;
        self.touch(actor, now);
        true
    }

    /// Re-activates a deactivated record. Deleted records stay inactive.
    pub fn activate(&mut self, actor: Option<UserId>, now: i64) -> bool {
        if self.is_deleted || self.is_active {
            return false;
        }
        self.is_active = true;
        self.touch(actor, now);
        true
    }

    pub fn deactivate(&mut self, actor: Option<UserId>, now: i64) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_active = false;
        self.touch(actor, now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{BaseFields, ValidationError};
    use uuid::Uuid;

    #[test]
    fn new_sets_lifecycle_defaults() {
        let base = BaseFields::new();
        assert!(!base.uuid.is_nil());
        assert!(base.is_active);
        assert!(!base.is_deleted);
        assert!(!base.is_persisted());
        assert_eq!(base.created_at, base.modified_at);
    }

    #[test]
    fn with_uuid_rejects_nil() {
        assert_eq!(
            BaseFields::with_uuid(Uuid::nil()).unwrap_err(),
            ValidationError::NilUuid
        );
    }

    #[test]
    fn soft_delete_deactivates_and_keeps_first_stamp() {
        let mut base = BaseFields::new();
        assert!(base.soft_delete(Some(7), base.created_at + 10));
        assert!(base.is_deleted);
        assert!(!base.is_active);
        assert_eq!(base.deleted_by, Some(7));
        let first_stamp = base.deleted_at;

        assert!(!base.soft_delete(Some(8), base.created_at + 20));
        assert_eq!(base.deleted_at, first_stamp);
        assert_eq!(base.deleted_by, Some(7));
        base.validate().unwrap();
    }

    #[test]
    fn activate_refuses_deleted_record() {
        let mut base = BaseFields::new();
        base.soft_delete(None, base.created_at);
        assert!(!base.activate(None, base.created_at));
        assert!(!base.is_active);

        assert!(base.restore(Some(3), base.created_at + 1));
        assert!(base.is_active);
        assert_eq!(base.deleted_at, None);
        assert_eq!(base.updated_by, Some(3));
    }

    #[test]
    fn validate_rejects_deleted_active_record() {
        let mut base = BaseFields::new();
        base.is_deleted = true;
        assert_eq!(base.validate(), Err(ValidationError::DeletedButActive));
    }
}
