//! Entity model shared by every persisted record.
//!
//! # Responsibility
//! - Define the base shape (identity, audit stamps, lifecycle flags).
//! - Expose typed field introspection per entity type.
//! - Define the concrete entities shipped with the core.
//!
//! # Invariants
//! - Every entity is identified externally by a stable UUID, never by its
//!   internal primary key.
//! - Deletion is a soft-delete tombstone unless a hard delete is requested
//!   explicitly.

pub mod base;
pub mod entity;
pub mod fields;
pub mod named;
pub mod user;
