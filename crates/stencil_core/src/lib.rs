//! Record-lifecycle backend core.
//! This crate is the single source of truth for entity lifecycle invariants.

pub mod api;
pub mod config;
pub mod db;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod repo;

pub use api::{Action, ActionCode, ApiError, Envelope, Request, ViewSet};
pub use config::{ConfigError, Environment, Settings};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use lifecycle::{Lifecycle, LifecycleFilter};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::base::{BaseFields, RecordId, UserId, ValidationError};
pub use model::entity::{Entity, Writable};
pub use model::named::Named;
pub use model::user::User;
pub use repo::{
    Criterion, EntityQuery, Lookup, LookupValue, RepoError, RepoResult, SqliteRepository,
};

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
