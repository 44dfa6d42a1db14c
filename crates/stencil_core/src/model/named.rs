//! Named record: an entity identified by a human-readable `identity`
//! (city, category, status label and the like).

use crate::model::base::{BaseFields, ValidationError};
use crate::model::entity::{ensure_char_length, optional_text, required_text, Entity, Writable};
use crate::model::fields::{FieldDescriptor, FieldKind, Schema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const NAMED_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::required("identity", FieldKind::Text),
    FieldDescriptor::optional("description", FieldKind::Text),
    FieldDescriptor::optional("tags", FieldKind::ManyToMany),
];

static NAMED_SCHEMA: Schema = Schema::new(NAMED_FIELDS);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Named {
    #[serde(flatten)]
    pub base: BaseFields,
    /// Display name/title.
    pub identity: String,
    pub description: Option<String>,
}

impl Named {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            base: BaseFields::new(),
            identity: identity.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Entity for Named {
    const TABLE: &'static str = "named_records";

    fn schema() -> &'static Schema {
        &NAMED_SCHEMA
    }

    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseFields {
        &mut self.base
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.base.validate()?;
        if self.identity.trim().is_empty() {
            return Err(ValidationError::field(
                "identity",
                "Please fill this field. This field cannot be left empty.",
            ));
        }
        ensure_char_length("identity", &self.identity)
    }
}

impl Writable for Named {
    fn blank() -> Self {
        Self::new(String::new())
    }

    fn assign(&mut self, field: &str, value: &Value) -> Result<(), ValidationError> {
        match field {
            "identity" => {
                let identity = required_text(field, value)?;
                ensure_char_length(field, &identity)?;
                self.identity = identity;
            }
            "description" => self.description = optional_text(field, value)?,
            other => return Err(ValidationError::field(other, "field is not writable")),
        }
        Ok(())
    }
}

impl std::fmt::Display for Named {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.identity)
    }
}
