//! Typed field introspection for entity types.
//!
//! Generic code (view pipelines, lookups, select lists) asks an entity type
//! for its `Schema` instead of reflecting over values.
//!
//! # Invariants
//! - Base field descriptors always come first, in column order.
//! - Relational collections (`ManyToMany`, `Reverse`) are never columns.

use serde::Serialize;

/// Field names left out of `Schema::model_field_names` unless the caller
/// builds its own list.
pub const DEFAULT_EXCLUDED_FIELDS: [&str; 4] = ["id", "created_by", "created_at", "modified_at"];

/// Storage kind of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    PrimaryKey,
    Uuid,
    /// Unix epoch milliseconds.
    Timestamp,
    Boolean,
    Text,
    Integer,
    /// Nullable reference to a row in `users`.
    UserRef,
    /// Link table collection.
    ManyToMany,
    /// Collection owned by another table pointing back at this one.
    Reverse,
}

impl FieldKind {
    /// Returns whether the field is backed by a column of the entity table.
    pub fn is_concrete(self) -> bool {
        !matches!(self, Self::ManyToMany | Self::Reverse)
    }
}

/// Static description of one entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
}

impl FieldDescriptor {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: true,
        }
    }

    pub fn is_concrete(&self) -> bool {
        self.kind.is_concrete()
    }
}

/// Descriptors for the columns declared by `BaseFields`.
pub const BASE_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::required("id", FieldKind::PrimaryKey),
    FieldDescriptor::required("uuid", FieldKind::Uuid),
    FieldDescriptor::required("created_at", FieldKind::Timestamp),
    FieldDescriptor::required("modified_at", FieldKind::Timestamp),
    FieldDescriptor::optional("deleted_at", FieldKind::Timestamp),
    FieldDescriptor::optional("created_by", FieldKind::UserRef),
    FieldDescriptor::optional("updated_by", FieldKind::UserRef),
    FieldDescriptor::optional("deleted_by", FieldKind::UserRef),
    FieldDescriptor::required("is_active", FieldKind::Boolean),
    FieldDescriptor::required("is_deleted", FieldKind::Boolean),
];

/// Field registry of one entity type: base fields plus its own.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    own: &'static [FieldDescriptor],
}

impl Schema {
    pub const fn new(own: &'static [FieldDescriptor]) -> Self {
        Self { own }
    }

    /// Returns the fields declared by the entity type itself.
    pub fn own_fields(&self) -> &'static [FieldDescriptor] {
        self.own
    }

    /// Every declared field, relational collections included.
    pub fn all_model_fields(&self) -> Vec<&'static FieldDescriptor> {
        let own = self.own;
        BASE_FIELDS.iter().chain(own.iter()).collect()
    }

    /// Column-backed fields only.
    pub fn model_fields(&self) -> Vec<&'static FieldDescriptor> {
        self.all_model_fields()
            .into_iter()
            .filter(|field| field.is_concrete())
            .collect()
    }

    /// Column-backed field names without `DEFAULT_EXCLUDED_FIELDS` and
    /// without any name listed in `exclude`.
    pub fn model_field_names(&self, exclude: &[&str]) -> Vec<&'static str> {
        self.model_fields()
            .into_iter()
            .map(|field| field.name)
            .filter(|name| !DEFAULT_EXCLUDED_FIELDS.contains(name) && !exclude.contains(name))
            .collect()
    }

    /// Resolves one field by name.
    pub fn model_field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.all_model_fields()
            .into_iter()
            .find(|field| field.name == name)
    }

    /// Resolves one field by name, returning `fallback` when it is not
    /// declared.
    pub fn model_field_or<'a>(
        &self,
        name: &str,
        fallback: &'a FieldDescriptor,
    ) -> &'a FieldDescriptor {
        match self.model_field(name) {
            Some(field) => field,
            None => fallback,
        }
    }

    /// Column names in select order.
    pub fn column_names(&self) -> Vec<&'static str> {
        self.model_fields()
            .into_iter()
            .map(|field| field.name)
            .collect()
    }
}
