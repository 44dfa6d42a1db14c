//! Row mappings for the entities shipped with the core.

use crate::model::base::BaseFields;
use crate::model::entity::Entity;
use crate::model::named::Named;
use crate::model::user::User;
use crate::repo::entity_repo::{bool_to_int, parse_flag, RepoResult, SqlRecord};
use rusqlite::types::Value;
use rusqlite::Row;

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn optional_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, text)
}

impl SqlRecord for User {
    fn own_values(&self) -> Vec<Value> {
        vec![
            text(&self.email),
            optional_text(self.first_name.as_deref()),
            optional_text(self.last_name.as_deref()),
            optional_text(self.phone_number.as_deref()),
            Value::Integer(bool_to_int(self.is_staff)),
            Value::Integer(bool_to_int(self.is_superuser)),
        ]
    }

    fn from_row(base: BaseFields, row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            base,
            email: row.get("email")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            phone_number: row.get("phone_number")?,
            is_staff: parse_flag(row, Self::TABLE, "is_staff")?,
            is_superuser: parse_flag(row, Self::TABLE, "is_superuser")?,
        })
    }
}

impl SqlRecord for Named {
    fn own_values(&self) -> Vec<Value> {
        vec![
            text(&self.identity),
            optional_text(self.description.as_deref()),
        ]
    }

    fn from_row(base: BaseFields, row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            base,
            identity: row.get("identity")?,
            description: row.get("description")?,
        })
    }
}
