//! Generic CRUD view pipeline.
//!
//! # Responsibility
//! - Configure per-entity handlers through `ViewSet::builder()`.
//! - Run one action against storage and wrap its outcome in an `Envelope`.
//!
//! # Invariants
//! - Every action, successful or not, leaves through `respond`.
//! - Authentication is checked before the action is resolved.
//! - Records are addressed by `uuid`, never by primary key.
//! - Destroy is a soft delete.

use crate::api::envelope::{from_error, ActionCode, Envelope};
use crate::api::error::{field_errors, ApiError, FieldErrors};
use crate::api::helpers::choices_for_meta;
use crate::api::pagination::Pagination;
use crate::config::Settings;
use crate::lifecycle::LifecycleFilter;
use crate::model::base::{UserId, ValidationError};
use crate::model::entity::{Entity, Writable};
use crate::repo::{Criterion, SqlRecord, SqliteRepository};
use http::StatusCode;
use log::{error, info};
use rusqlite::Connection;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::time::Instant;

const LOOKUP_FIELD: &str = "uuid";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
    /// Choice metadata for building forms; with a lookup, also the
    /// record's current values.
    Meta,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Self::List,
        Self::Retrieve,
        Self::Create,
        Self::Update,
        Self::PartialUpdate,
        Self::Destroy,
        Self::Meta,
    ];

    /// HTTP method the action is routed from.
    pub fn method(self) -> &'static str {
        match self {
            Self::List | Self::Retrieve | Self::Meta => "GET",
            Self::Create => "POST",
            Self::Update => "PUT",
            Self::PartialUpdate => "PATCH",
            Self::Destroy => "DELETE",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Retrieve => "retrieve",
            Self::Create => "create",
            Self::Update => "update",
            Self::PartialUpdate => "partial_update",
            Self::Destroy => "destroy",
            Self::Meta => "meta",
        }
    }
}

/// Inbound request, already authenticated by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    /// Acting user; `None` for anonymous requests.
    pub actor: Option<UserId>,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub body: Value,
}

impl Request {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            body: Value::Null,
            ..Self::default()
        }
    }

    pub fn with_actor(mut self, actor: UserId) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }
}

/// Successful action result before wrapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub status_code: StatusCode,
    pub data: Value,
}

impl Outcome {
    pub fn ok(data: Value) -> Self {
        Self {
            status_code: StatusCode::OK,
            data,
        }
    }

    pub fn created(data: Value) -> Self {
        Self {
            status_code: StatusCode::CREATED,
            data,
        }
    }

    pub fn no_content() -> Self {
        Self {
            status_code: StatusCode::NO_CONTENT,
            data: Value::Null,
        }
    }
}

/// The single envelope stage every action result passes through.
pub fn respond(result: Result<Outcome, ApiError>) -> Envelope {
    match result {
        Ok(outcome) => Envelope::wrap(
            outcome.data,
            outcome.status_code,
            ActionCode::DoNothing,
            Map::new(),
        ),
        Err(err) => from_error(&err),
    }
}

type ExtraField<E> = Box<dyn Fn(&E) -> Value + Send + Sync>;

/// Configured CRUD handler for one entity type.
pub struct ViewSet<E> {
    actions: Vec<Action>,
    fields: Vec<&'static str>,
    extras: Vec<(&'static str, ExtraField<E>)>,
    write_fields: Vec<&'static str>,
    auth_required: bool,
    scope: LifecycleFilter,
    choices: Vec<(&'static str, Vec<&'static str>)>,
    pagination: Pagination,
    default_user: Option<UserId>,
}

impl<E: SqlRecord + Writable> ViewSet<E> {
    pub fn builder() -> ViewSetBuilder<E> {
        ViewSetBuilder::new()
    }

    pub fn is_enabled(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }

    /// Runs `action` and wraps the result.
    ///
    /// `lookup` is the record's uuid for detail actions.
    pub fn dispatch(
        &self,
        conn: &Connection,
        action: Action,
        request: &Request,
        lookup: Option<&str>,
    ) -> Envelope {
        let started_at = Instant::now();
        let result = self.handle(conn, action, request, lookup);
        match &result {
            Ok(outcome) => info!(
                "event=view_dispatch module=api status=ok table={} action={} http_status={} duration_ms={}",
                E::TABLE,
                action.name(),
                outcome.status_code.as_u16(),
                started_at.elapsed().as_millis()
            ),
            Err(err) if err.is_server_error() => error!(
                "event=view_dispatch module=api status=error table={} action={} http_status={} duration_ms={} error={err}",
                E::TABLE,
                action.name(),
                err.status_code().as_u16(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => info!(
                "event=view_dispatch module=api status=rejected table={} action={} http_status={} duration_ms={}",
                E::TABLE,
                action.name(),
                err.status_code().as_u16(),
                started_at.elapsed().as_millis()
            ),
        }
        respond(result)
    }

    fn handle(
        &self,
        conn: &Connection,
        action: Action,
        request: &Request,
        lookup: Option<&str>,
    ) -> Result<Outcome, ApiError> {
        if self.auth_required && request.actor.is_none() {
            return Err(ApiError::NotAuthenticated);
        }
        if !self.is_enabled(action) {
            return Err(ApiError::MethodNotAllowed(action.method()));
        }

        let repo = SqliteRepository::<E>::try_new(conn)?.with_default_user(self.default_user);
        match action {
            Action::List => {
                let scope = repo.objects().scope(&self.scope);
                let page = self.pagination.paginate(
                    &scope,
                    &request.path,
                    &request.query,
                    |entity| self.render(entity),
                )?;
                Ok(Outcome::ok(serde_json::to_value(page)?))
            }
            Action::Retrieve => {
                let entity = self.object(&repo, lookup)?;
                Ok(Outcome::ok(self.render(&entity)?))
            }
            Action::Create => {
                let mut entity = E::blank();
                self.apply_payload(&mut entity, &request.body, false)?;
                repo.create(&mut entity, request.actor)?;
                Ok(Outcome::created(self.initial(&entity)?))
            }
            Action::Update | Action::PartialUpdate => {
                let mut entity = self.object(&repo, lookup)?;
                self.apply_payload(&mut entity, &request.body, action == Action::PartialUpdate)?;
                repo.save(&mut entity, request.actor)?;
                Ok(Outcome::ok(self.initial(&entity)?))
            }
            Action::Destroy => {
                let entity = self.object(&repo, lookup)?;
                repo.objects()
                    .filter(Criterion::eq(LOOKUP_FIELD, entity.base().uuid))
                    .soft_delete(request.actor)?;
                Ok(Outcome::no_content())
            }
            Action::Meta => {
                let initial = match lookup {
                    Some(_) => self.initial(&self.object(&repo, lookup)?)?,
                    None => json!({}),
                };
                let meta: Map<String, Value> = self
                    .choices
                    .iter()
                    .map(|(field, values)| (field.to_string(), choices_for_meta(values)))
                    .collect();
                Ok(Outcome::ok(json!({ "meta": meta, "initial": initial })))
            }
        }
    }

    /// Resolves the addressed record inside the view's scope.
    fn object(
        &self,
        repo: &SqliteRepository<'_, E>,
        lookup: Option<&str>,
    ) -> Result<E, ApiError> {
        let lookup = lookup.ok_or(ApiError::NotFound)?;
        repo.objects()
            .scope(&self.scope)
            .get_or_none(&[Criterion::eq(LOOKUP_FIELD, lookup)])?
            .ok_or(ApiError::NotFound)
    }

    /// Read representation: configured fields plus computed extras.
    fn render(&self, entity: &E) -> Result<Value, ApiError> {
        let mut data = pick(&serde_json::to_value(entity)?, &self.fields);
        for (name, extra) in &self.extras {
            data.insert(name.to_string(), extra(entity));
        }
        Ok(Value::Object(data))
    }

    /// Write representation returned after create/update: `uuid` and the
    /// writable fields.
    fn initial(&self, entity: &E) -> Result<Value, ApiError> {
        let mut fields = vec![LOOKUP_FIELD];
        fields.extend(self.write_fields.iter().copied());
        Ok(Value::Object(pick(&serde_json::to_value(entity)?, &fields)))
    }

    /// Assigns writable fields from `body`, collecting every field error.
    ///
    /// All writable fields are required unless `partial`.
    fn apply_payload(&self, entity: &mut E, body: &Value, partial: bool) -> Result<(), ApiError> {
        let Value::Object(payload) = body else {
            let mut errors = FieldErrors::new();
            errors.insert(
                "non_field_errors".to_string(),
                vec!["Invalid data. Expected a dictionary.".to_string()],
            );
            return Err(ApiError::Validation(errors));
        };

        let mut errors = FieldErrors::new();
        for field in &self.write_fields {
            match payload.get(*field) {
                Some(value) => {
                    if let Err(err) = entity.assign(field, value) {
                        merge(&mut errors, &err);
                    }
                }
                None if partial => {}
                None => {
                    errors
                        .entry(field.to_string())
                        .or_default()
                        .push("This field is required.".to_string());
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

fn merge(errors: &mut FieldErrors, err: &ValidationError) {
    for (field, messages) in field_errors(err) {
        errors.entry(field).or_default().extend(messages);
    }
}

fn pick(value: &Value, fields: &[&str]) -> Map<String, Value> {
    fields
        .iter()
        .map(|field| {
            let picked = value.get(*field).cloned().unwrap_or(Value::Null);
            (field.to_string(), picked)
        })
        .collect()
}

/// Builder for `ViewSet`.
pub struct ViewSetBuilder<E> {
    actions: Vec<Action>,
    fields: Option<Vec<&'static str>>,
    extras: Vec<(&'static str, ExtraField<E>)>,
    write_fields: Vec<&'static str>,
    auth_required: bool,
    scope: LifecycleFilter,
    choices: Vec<(&'static str, Vec<&'static str>)>,
    pagination: Pagination,
    default_user: Option<UserId>,
}

impl<E: SqlRecord + Writable> ViewSetBuilder<E> {
    fn new() -> Self {
        Self {
            actions: vec![Action::List, Action::Retrieve],
            fields: None,
            extras: Vec::new(),
            write_fields: Vec::new(),
            auth_required: true,
            scope: LifecycleFilter::all().alive(),
            choices: Vec::new(),
            pagination: Pagination::default(),
            default_user: None,
        }
    }

    /// Enabled actions. Defaults to list and retrieve.
    pub fn actions(mut self, actions: &[Action]) -> Self {
        self.actions = actions.to_vec();
        self
    }

    /// Read fields. Defaults to the entity's field names without the
    /// default exclusions.
    pub fn fields(mut self, fields: &[&'static str]) -> Self {
        self.fields = Some(fields.to_vec());
        self
    }

    /// Adds a computed read field.
    pub fn extra<F>(mut self, name: &'static str, compute: F) -> Self
    where
        F: Fn(&E) -> Value + Send + Sync + 'static,
    {
        self.extras.push((name, Box::new(compute)));
        self
    }

    pub fn write_fields(mut self, fields: &[&'static str]) -> Self {
        self.write_fields = fields.to_vec();
        self
    }

    pub fn require_auth(mut self, required: bool) -> Self {
        self.auth_required = required;
        self
    }

    /// Base lifecycle scope. Defaults to alive records.
    pub fn scope(mut self, scope: LifecycleFilter) -> Self {
        self.scope = scope;
        self
    }

    /// Choice list published by the meta action under `field`.
    pub fn choices(mut self, field: &'static str, values: &[&'static str]) -> Self {
        self.choices.push((field, values.to_vec()));
        self
    }

    pub fn pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn default_user(mut self, default_user: Option<UserId>) -> Self {
        self.default_user = default_user;
        self
    }

    /// Takes pagination and the audit default user from `settings`.
    pub fn settings(self, settings: &Settings) -> Result<Self, ValidationError> {
        Ok(self
            .pagination(Pagination::from_settings(settings)?)
            .default_user(settings.audit_default_user))
    }

    /// Checks every configured field against the entity schema.
    pub fn build(self) -> Result<ViewSet<E>, ValidationError> {
        let schema = E::schema();
        let fields = self
            .fields
            .unwrap_or_else(|| schema.model_field_names(&[]));
        for field in fields.iter().chain(self.write_fields.iter()) {
            match schema.model_field(field) {
                Some(descriptor) if descriptor.is_concrete() => {}
                _ => {
                    return Err(ValidationError::field(
                        *field,
                        format!("is not a column of `{}`", E::TABLE),
                    ));
                }
            }
        }

        Ok(ViewSet {
            actions: self.actions,
            fields,
            extras: self.extras,
            write_fields: self.write_fields,
            auth_required: self.auth_required,
            scope: self.scope,
            choices: self.choices,
            pagination: self.pagination,
            default_user: self.default_user,
        })
    }
}
