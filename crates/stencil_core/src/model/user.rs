//! User entity: the acting party behind every audit reference.
//!
//! # Invariants
//! - `email` is unique, non-empty and normalized (domain part lowercase).
//! - Users are themselves entities and carry `BaseFields`.

use crate::model::base::{BaseFields, ValidationError};
use crate::model::entity::{
    bool_value, ensure_char_length, optional_text, required_text, Entity, Writable,
};
use crate::model::fields::{FieldDescriptor, FieldKind, Schema};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

const USER_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::required("email", FieldKind::Text),
    FieldDescriptor::optional("first_name", FieldKind::Text),
    FieldDescriptor::optional("last_name", FieldKind::Text),
    FieldDescriptor::optional("phone_number", FieldKind::Text),
    FieldDescriptor::required("is_staff", FieldKind::Boolean),
    FieldDescriptor::required("is_superuser", FieldKind::Boolean),
    FieldDescriptor::optional("created_named_records", FieldKind::Reverse),
    FieldDescriptor::optional("updated_named_records", FieldKind::Reverse),
];

static USER_SCHEMA: Schema = Schema::new(USER_FIELDS);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub base: BaseFields,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl User {
    /// Creates a regular (non-staff) user.
    pub fn new(email: &str) -> Result<Self, ValidationError> {
        let mut user = Self::blank();
        user.email = normalize_email(email)?;
        Ok(user)
    }

    /// Creates a staff superuser.
    pub fn new_superuser(email: &str) -> Result<Self, ValidationError> {
        let mut user = Self::new(email)?;
        user.is_staff = true;
        user.is_superuser = true;
        Ok(user)
    }

    /// Full name when known, otherwise the email address.
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if parts.is_empty() {
            self.email.clone()
        } else {
            parts.join(" ")
        }
    }
}

/// Trims the address and lowercases its domain part.
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::field("email", "The email is must for user."));
    }
    let normalized = match trimmed.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => trimmed.to_string(),
    };
    if !EMAIL_RE.is_match(&normalized) {
        return Err(ValidationError::field(
            "email",
            format!("`{normalized}` is not a valid email address"),
        ));
    }
    ensure_char_length("email", &normalized)?;
    Ok(normalized)
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const AUDIT_TARGET: bool = true;

    fn schema() -> &'static Schema {
        &USER_SCHEMA
    }

    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseFields {
        &mut self.base
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.base.validate()?;
        let normalized = normalize_email(&self.email)?;
        if normalized != self.email {
            return Err(ValidationError::field("email", "email is not normalized"));
        }
        if self.is_superuser && !self.is_staff {
            return Err(ValidationError::field(
                "is_staff",
                "Superuser must have is_staff=True.",
            ));
        }
        Ok(())
    }
}

impl Writable for User {
    fn blank() -> Self {
        Self {
            base: BaseFields::new(),
            email: String::new(),
            first_name: None,
            last_name: None,
            phone_number: None,
            is_staff: false,
            is_superuser: false,
        }
    }

    fn assign(&mut self, field: &str, value: &Value) -> Result<(), ValidationError> {
        match field {
            "email" => self.email = normalize_email(&required_text(field, value)?)?,
            "first_name" => self.first_name = optional_text(field, value)?,
            "last_name" => self.last_name = optional_text(field, value)?,
            "phone_number" => self.phone_number = optional_text(field, value)?,
            "is_staff" => self.is_staff = bool_value(field, value)?,
            "is_superuser" => self.is_superuser = bool_value(field, value)?,
            other => return Err(ValidationError::field(other, "field is not writable")),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_email, User};
    use crate::model::entity::Entity;

    #[test]
    fn normalize_email_lowercases_domain_only() {
        assert_eq!(
            normalize_email("  Jane.Doe@Example.COM ").unwrap(),
            "Jane.Doe@example.com"
        );
    }

    #[test]
    fn normalize_email_rejects_empty_and_malformed() {
        assert!(normalize_email("").is_err());
        assert!(normalize_email("no-at-sign").is_err());
    }

    #[test]
    fn superuser_requires_staff() {
        let mut user = User::new_superuser("root@example.com").unwrap();
        user.validate().unwrap();
        user.is_staff = false;
        assert!(user.validate().is_err());
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let mut user = User::new("a@example.com").unwrap();
        assert_eq!(user.display_name(), "a@example.com");
        user.first_name = Some("Ada".to_string());
        user.last_name = Some("Lovelace".to_string());
        assert_eq!(user.display_name(), "Ada Lovelace");
    }
}
