//! Outward-facing request handling.
//!
//! # Responsibility
//! - Wrap every operation result in the uniform response envelope.
//! - Provide the generic CRUD view pipeline over any writable entity.
//!
//! # Invariants
//! - Recoverable failures become error envelopes; nothing here panics.

pub mod envelope;
pub mod error;
pub mod helpers;
pub mod pagination;
pub mod viewset;

pub use envelope::{from_error, send_error_response, send_response, ActionCode, Envelope, ResponseStatus};
pub use error::{ApiError, FieldErrors};
pub use pagination::{Page, Pagination};
pub use viewset::{respond, Action, Outcome, Request, ViewSet, ViewSetBuilder};
