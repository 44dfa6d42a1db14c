//! Entity capability traits.
//!
//! # Responsibility
//! - Give generic code (lifecycle filters, repositories, view pipelines) a
//!   typed handle on any persisted record.
//! - Keep per-type knowledge (table, schema, payload assignment) next to the
//!   type that owns it.

use crate::model::base::{BaseFields, ValidationError};
use crate::model::fields::Schema;
use serde::Serialize;
use serde_json::Value;

/// Maximum length for short text columns.
pub const COMMON_CHAR_FIELD_MAX_LENGTH: usize = 512;

/// A persisted record carrying `BaseFields`.
pub trait Entity: Sized + Serialize {
    /// Backing table name.
    const TABLE: &'static str;

    /// `true` when audit columns of other tables point at this entity.
    const AUDIT_TARGET: bool = false;

    fn schema() -> &'static Schema;

    fn base(&self) -> &BaseFields;

    fn base_mut(&mut self) -> &mut BaseFields;

    /// Checks type-specific rules on top of the base invariants.
    fn validate(&self) -> Result<(), ValidationError> {
        self.base().validate()
    }
}

/// An entity that can be built or patched from an inbound JSON payload.
pub trait Writable: Entity {
    /// An empty record that payload assignment fills in.
    fn blank() -> Self;

    /// Assigns one declared field from a JSON value.
    fn assign(&mut self, field: &str, value: &Value) -> Result<(), ValidationError>;
}

/// Reads an optional string field. Blank strings collapse to `None`.
pub fn optional_text(field: &str, value: &Value) -> Result<Option<String>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) if text.trim().is_empty() => Ok(None),
        Value::String(text) => Ok(Some(text.trim().to_string())),
        _ => Err(ValidationError::field(field, "expected a string")),
    }
}

/// Reads a required string field.
pub fn required_text(field: &str, value: &Value) -> Result<String, ValidationError> {
    optional_text(field, value)?
        .ok_or_else(|| ValidationError::field(field, "Please fill this field. This field cannot be left empty."))
}

pub fn bool_value(field: &str, value: &Value) -> Result<bool, ValidationError> {
    value
        .as_bool()
        .ok_or_else(|| ValidationError::field(field, "expected a boolean"))
}

/// Rejects text longer than `COMMON_CHAR_FIELD_MAX_LENGTH` characters.
pub fn ensure_char_length(field: &str, text: &str) -> Result<(), ValidationError> {
    let length = text.chars().count();
    if length > COMMON_CHAR_FIELD_MAX_LENGTH {
        return Err(ValidationError::field(
            field,
            format!("must be at most {COMMON_CHAR_FIELD_MAX_LENGTH} characters, got {length}"),
        ));
    }
    Ok(())
}
