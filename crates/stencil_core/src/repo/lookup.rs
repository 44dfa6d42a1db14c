//! Single-record lookup by equality criteria.
//!
//! # Responsibility
//! - Describe lookup criteria as typed `(field, value)` pairs.
//! - Bind criteria against an entity `Schema` before any SQL is built.
//! - Report the lookup outcome as one of four explicit variants.
//!
//! # Invariants
//! - A criterion naming an unknown or relational field never reaches SQL.
//! - `Lookup::into_option` yields `Some` only for `Found`.

use crate::model::fields::{FieldKind, Schema};
use rusqlite::types::Value;
use uuid::Uuid;

/// Right-hand side of an equality criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupValue {
    Null,
    Integer(i64),
    Text(String),
    Bool(bool),
    Uuid(Uuid),
}

impl From<i64> for LookupValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for LookupValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for LookupValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for LookupValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Uuid> for LookupValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl<T: Into<LookupValue>> From<Option<T>> for LookupValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// `field = value` criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    pub field: String,
    pub value: LookupValue,
}

impl Criterion {
    pub fn eq(field: impl Into<String>, value: impl Into<LookupValue>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Outcome of a single-record lookup.
///
/// The three non-`Found` variants are kept apart so logs and tests can tell
/// them apart; callers that only care about presence use `into_option`.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<E> {
    Found(E),
    NotFound,
    Ambiguous,
    /// Criteria could not be bound to the schema.
    Malformed(String),
}

impl<E> Lookup<E> {
    pub fn into_option(self) -> Option<E> {
        match self {
            Self::Found(entity) => Some(entity),
            Self::NotFound | Self::Ambiguous | Self::Malformed(_) => None,
        }
    }

    /// Short tag used in log events.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Found(_) => "found",
            Self::NotFound => "not_found",
            Self::Ambiguous => "ambiguous",
            Self::Malformed(_) => "malformed",
        }
    }
}

/// A criterion bound to a concrete column.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Binding {
    Eq { column: &'static str, value: Value },
    IsNull(&'static str),
}

impl Binding {
    /// SQL predicate fragment with at most one positional parameter.
    pub(crate) fn predicate(&self) -> String {
        match self {
            Self::Eq { column, .. } => format!("{column} = ?"),
            Self::IsNull(column) => format!("{column} IS NULL"),
        }
    }

    pub(crate) fn into_param(self) -> Option<Value> {
        match self {
            Self::Eq { value, .. } => Some(value),
            Self::IsNull(_) => None,
        }
    }
}

/// Resolves `criterion` against `schema`, returning a reason when the
/// criterion is malformed.
pub(crate) fn bind(schema: &Schema, criterion: &Criterion) -> Result<Binding, String> {
    let field = schema
        .model_field(&criterion.field)
        .ok_or_else(|| format!("unknown field `{}`", criterion.field))?;
    if !field.is_concrete() {
        return Err(format!("`{}` is not a column", field.name));
    }

    let column = field.name;
    if criterion.value == LookupValue::Null {
        if field.nullable {
            return Ok(Binding::IsNull(column));
        }
        return Err(format!("`{column}` cannot be null"));
    }

    let value = match field.kind {
        FieldKind::Uuid => Value::Text(uuid_text(column, &criterion.value)?),
        FieldKind::PrimaryKey | FieldKind::Integer | FieldKind::UserRef | FieldKind::Timestamp => {
            Value::Integer(integer(column, &criterion.value)?)
        }
        FieldKind::Boolean => Value::Integer(i64::from(boolean(column, &criterion.value)?)),
        FieldKind::Text => match &criterion.value {
            LookupValue::Text(text) => Value::Text(text.clone()),
            other => return Err(mismatch(column, "text", other)),
        },
        FieldKind::ManyToMany | FieldKind::Reverse => {
            return Err(format!("`{column}` is not a column"));
        }
    };
    Ok(Binding::Eq { column, value })
}

fn uuid_text(column: &str, value: &LookupValue) -> Result<String, String> {
    match value {
        LookupValue::Uuid(uuid) => Ok(uuid.to_string()),
        LookupValue::Text(text) => Uuid::parse_str(text.trim())
            .map(|uuid| uuid.to_string())
            .map_err(|_| format!("`{text}` is not a valid UUID for `{column}`")),
        other => Err(mismatch(column, "uuid", other)),
    }
}

fn integer(column: &str, value: &LookupValue) -> Result<i64, String> {
    match value {
        LookupValue::Integer(number) => Ok(*number),
        LookupValue::Text(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("`{text}` is not an integer for `{column}`")),
        other => Err(mismatch(column, "integer", other)),
    }
}

fn boolean(column: &str, value: &LookupValue) -> Result<bool, String> {
    match value {
        LookupValue::Bool(flag) => Ok(*flag),
        LookupValue::Integer(0) => Ok(false),
        LookupValue::Integer(1) => Ok(true),
        LookupValue::Text(text) => match text.trim() {
            "t" | "true" | "True" | "1" => Ok(true),
            "f" | "false" | "False" | "0" => Ok(false),
            _ => Err(format!("`{text}` is not a boolean for `{column}`")),
        },
        other => Err(mismatch(column, "boolean", other)),
    }
}

fn mismatch(column: &str, expected: &str, got: &LookupValue) -> String {
    format!("`{column}` expects {expected}, got {got:?}")
}

#[cfg(test)]
mod tests {
    use super::{bind, Binding, Criterion, Lookup, LookupValue};
    use crate::model::entity::Entity;
    use crate::model::named::Named;
    use rusqlite::types::Value;
    use uuid::Uuid;

    #[test]
    fn uuid_text_is_canonicalized() {
        let uuid = Uuid::new_v4();
        let upper = uuid.to_string().to_uppercase();
        let binding = bind(Named::schema(), &Criterion::eq("uuid", upper)).unwrap();
        assert_eq!(
            binding,
            Binding::Eq {
                column: "uuid",
                value: Value::Text(uuid.to_string()),
            }
        );
    }

    #[test]
    fn malformed_criteria_are_rejected_before_sql() {
        let schema = Named::schema();
        assert!(bind(schema, &Criterion::eq("uuid", "not-a-uuid")).is_err());
        assert!(bind(schema, &Criterion::eq("uuid", LookupValue::Null)).is_err());
        assert!(bind(schema, &Criterion::eq("id", "abc")).is_err());
        assert!(bind(schema, &Criterion::eq("nope", 1_i64)).is_err());
        assert!(bind(schema, &Criterion::eq("tags", 1_i64)).is_err());
        assert!(bind(schema, &Criterion::eq("identity", 7_i64)).is_err());
    }

    #[test]
    fn null_on_nullable_column_binds_is_null() {
        let binding = bind(
            Named::schema(),
            &Criterion::eq("deleted_by", LookupValue::Null),
        )
        .unwrap();
        assert_eq!(binding, Binding::IsNull("deleted_by"));
    }

    #[test]
    fn numeric_text_binds_as_integer() {
        let binding = bind(Named::schema(), &Criterion::eq("id", " 12 ")).unwrap();
        assert_eq!(binding.into_param(), Some(Value::Integer(12)));
    }

    #[test]
    fn only_found_survives_into_option() {
        assert_eq!(Lookup::Found(3).into_option(), Some(3));
        assert_eq!(Lookup::<i32>::NotFound.into_option(), None);
        assert_eq!(Lookup::<i32>::Ambiguous.into_option(), None);
        assert_eq!(Lookup::<i32>::Malformed("x".into()).into_option(), None);
    }
}
