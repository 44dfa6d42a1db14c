//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Persist any entity type through one generic SQLite repository.
//! - Expose lifecycle-filtered query scopes and absence-signalling lookups.
//!
//! # Invariants
//! - Repository writes enforce `Entity::validate()` before persistence.
//! - Lookups report absence as a value; only storage failures are errors.

pub mod entity_repo;
pub mod lookup;
pub mod query;
mod records;

pub use entity_repo::{RepoError, RepoResult, SqlRecord, SqliteRepository, AUDITED_TABLES};
pub use lookup::{Criterion, Lookup, LookupValue};
pub use query::{EntityQuery, SortOrder};
