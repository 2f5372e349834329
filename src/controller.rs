//! # CRUD Controller
//!
//! A controller serves the `list`, `edit`, `view` and `delete` actions for one
//! model type. Implement [`CrudController`] for a type holding the collaborators
//! (store, URL builder) and the [`ActionConfig`]; override the responder hooks
//! to plug in a template engine.
//!
//! Each request gets its own [`ActionContext`]. It resolves the record and the
//! filter model at most once, computes the return URL and builds item links;
//! views receive it to read exactly those values.
//!
//! ```rust,ignore
//! pub struct PostController {
//!     config: ActionConfig,
//!     store: SeaOrmStore,
//!     urls: RouteUrls,
//! }
//!
//! #[async_trait]
//! impl CrudController for PostController {
//!     type Model = Post;
//!     type Filter = Post;
//!     type Store = SeaOrmStore;
//!     type Urls = RouteUrls;
//!
//!     fn config(&self) -> &ActionConfig { &self.config }
//!     fn store(&self) -> &SeaOrmStore { &self.store }
//!     fn urls(&self) -> &RouteUrls { &self.urls }
//! }
//! ```

use async_trait::async_trait;
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::OnceLock;

use crate::binding::assign_attributes;
use crate::config::{ActionConfig, CrudAction};
use crate::core::{CrudModel, CrudStore, FormModel, SaveError};
use crate::errors::ControllerError;
use crate::memo::Memo;
use crate::request::RequestContext;
use crate::urls::{ReturnTo, UrlBuilder, is_allowed_return_url};
use crate::validation::{Validatable, ValidationError, ValidationErrors};

/// Outcome of a successful save, recorded for the next page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub model_name: &'static str,
    pub kind: FlashKind,
}

impl Flash {
    /// `<Model>-created` or `<Model>-updated`
    #[must_use]
    pub fn key(&self) -> String {
        let suffix = match self.kind {
            FlashKind::Created => "created",
            FlashKind::Updated => "updated",
        };
        format!("{}-{suffix}", self.model_name)
    }
}

/// What an action asks the HTTP layer to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Render a view with the action context
    Render { view: String },
    Redirect {
        location: String,
        flash: Option<Flash>,
    },
    /// Result of an AJAX validation-only submission; nothing else happens
    Validation(ValidationErrors),
}

/// A controller serving CRUD pages for one model type
///
/// Only `config`, `store` and `urls` are required. The remaining methods are
/// hooks with defaults:
///
/// - `assign_filter_attributes`: how filter values are read from the request
/// - `render`, `redirect`, `validation_response`, `set_flash`: how outcomes
///   become HTTP responses
#[async_trait]
pub trait CrudController: Send + Sync + Sized + 'static {
    type Model: CrudModel + Serialize;
    /// Filter model; use `Self::Model` when the record type doubles as filter
    type Filter: FormModel + Serialize;
    type Store: CrudStore<Self::Model>;
    type Urls: UrlBuilder;

    fn config(&self) -> &ActionConfig;

    fn store(&self) -> &Self::Store;

    fn urls(&self) -> &Self::Urls;

    /// Fill the filter model from the request.
    ///
    /// The default assigns the query map named after the filter model
    /// (`?Post[title]=...`). Values that do not coerce are skipped: filters are
    /// not validated. Override to read a custom URL scheme such as
    /// `?from=2024-01-01&to=2024-02-01`.
    fn assign_filter_attributes(&self, filter: &mut Self::Filter, request: &RequestContext) {
        let Some(values) = request.query_map(Self::Filter::MODEL_NAME) else {
            return;
        };
        if let Err(errors) = assign_attributes(filter, values) {
            tracing::debug!(
                model = Self::Filter::MODEL_NAME,
                errors = %errors,
                "Skipped filter values that could not be assigned"
            );
        }
    }

    /// Render `view` for the current request.
    ///
    /// The default responds with a JSON document holding the view name, the
    /// resolved record (if any), the filter model and the validation errors.
    /// Implementations backed by a template engine pass `context` to the
    /// template instead.
    ///
    /// # Errors
    ///
    /// Any `ControllerError`, e.g. when resolving values for the view fails.
    async fn render(
        &self,
        view: &str,
        context: &mut ActionContext<'_, Self>,
    ) -> Result<Response, ControllerError> {
        let model = match context.resolved_model() {
            Some(model) => to_json(model)?,
            None => Value::Null,
        };
        let filter = to_json(context.filter_model())?;
        let body = json!({
            "view": view,
            "model": model,
            "filter": filter,
            "errors": context.errors(),
        });
        Ok(Json(body).into_response())
    }

    /// Redirect to `location` (`302 Found`)
    fn redirect(&self, location: &str) -> Response {
        match HeaderValue::from_str(location) {
            Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
            Err(_) => ControllerError::internal(
                "Invalid redirect target",
                Some(format!("Location header rejected: {location:?}")),
            )
            .into_response(),
        }
    }

    /// Respond to an AJAX validation-only submission
    fn validation_response(&self, errors: &ValidationErrors) -> Response {
        Json(errors.to_form_fields(Self::Model::MODEL_NAME)).into_response()
    }

    /// Record `flash` on the response. The default sets a `flash` cookie
    /// holding the key; session-backed applications override this.
    fn set_flash(&self, flash: &Flash, response: &mut Response) {
        let cookie = format!("flash={}; Path=/; HttpOnly; SameSite=Lax", flash.key());
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!(error = %e, key = %flash.key(), "Could not set flash cookie"),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ControllerError> {
    serde_json::to_value(value)
        .map_err(|e| ControllerError::internal("Could not render view", Some(e.to_string())))
}

/// Per-request state of a controller.
///
/// Everything cached here lives exactly as long as the request.
pub struct ActionContext<'a, C: CrudController> {
    controller: &'a C,
    request: &'a RequestContext,
    model: Memo<C::Model>,
    filter: Option<C::Filter>,
    errors: Option<ValidationErrors>,
    key_column: OnceLock<&'static str>,
}

impl<'a, C: CrudController> ActionContext<'a, C> {
    #[must_use]
    pub fn new(controller: &'a C, request: &'a RequestContext) -> Self {
        Self {
            controller,
            request,
            model: Memo::default(),
            filter: None,
            errors: None,
            key_column: OnceLock::new(),
        }
    }

    #[must_use]
    pub const fn controller(&self) -> &'a C {
        self.controller
    }

    #[must_use]
    pub const fn request(&self) -> &'a RequestContext {
        self.request
    }

    fn config(&self) -> &'a ActionConfig {
        self.controller.config()
    }

    /// Validation errors of the last edit submission, if it failed
    #[must_use]
    pub const fn errors(&self) -> Option<&ValidationErrors> {
        self.errors.as_ref()
    }

    /// Resolve the record once per request.
    ///
    /// With an identifier parameter the store is asked for the record (update
    /// scenario); without one a new record is created (create scenario). A
    /// missing record is cached as well.
    async fn resolve_model(&mut self) -> Result<(), ControllerError> {
        if self.model.is_computed() {
            return Ok(());
        }
        let config = self.config();

        let resolved = match self.request.query_str(&config.id_param) {
            Some(key) => {
                let found = self.controller.store().find_by_key(key).await?;
                found.map(|mut model| {
                    model.set_scenario(&config.scenarios.update);
                    model
                })
            }
            None => {
                let mut model = C::Model::new_instance();
                model.set_scenario(&config.scenarios.create);
                Some(model)
            }
        };

        tracing::debug!(
            model = C::Model::MODEL_NAME,
            found = resolved.is_some(),
            "Resolved record"
        );
        self.model.set(resolved);
        Ok(())
    }

    fn missing_model(&self) -> ControllerError {
        ControllerError::not_found(
            C::Model::MODEL_NAME,
            self.request
                .query_str(&self.config().id_param)
                .map(ToString::to_string),
        )
    }

    /// The record for this request.
    ///
    /// # Errors
    ///
    /// `NotFound` when `required` and the identifier names no record; store
    /// failures as `Database`.
    pub async fn model(&mut self, required: bool) -> Result<Option<&C::Model>, ControllerError> {
        self.resolve_model().await?;
        if required && self.model.value().is_none() {
            return Err(self.missing_model());
        }
        Ok(self.model.value())
    }

    /// Mutable access to the (required) record
    ///
    /// # Errors
    ///
    /// Same as [`ActionContext::model`] with `required = true`.
    pub async fn model_mut(&mut self) -> Result<&mut C::Model, ControllerError> {
        self.resolve_model().await?;
        if self.model.value().is_none() {
            return Err(self.missing_model());
        }
        self.model
            .value_mut()
            .ok_or_else(|| ControllerError::internal("Record was not resolved", None))
    }

    /// The record if it has been resolved already, without resolving it
    #[must_use]
    pub fn resolved_model(&self) -> Option<&C::Model> {
        self.model.value()
    }

    /// The stored record; a fresh record (no identifier given) is not found
    async fn existing_model(&mut self) -> Result<&C::Model, ControllerError> {
        self.resolve_model().await?;
        match self.model.value() {
            Some(model) if !model.is_new_record() => Ok(model),
            _ => Err(self.missing_model()),
        }
    }

    /// The filter model, built and filled from the request on first use
    pub fn filter_model(&mut self) -> &C::Filter {
        let controller = self.controller;
        let request = self.request;
        self.filter.get_or_insert_with(|| {
            let mut filter = C::Filter::new_instance();
            filter.set_scenario(&controller.config().scenarios.filter);
            controller.assign_filter_attributes(&mut filter, request);
            filter
        })
    }

    /// Where to go after a successful edit or delete.
    ///
    /// The return parameter may hold `edit` or `view` to come back to that page
    /// for the current record (the list page while the record is new), or a
    /// URL accepted by [`is_allowed_return_url`]. Anything else, and a missing
    /// parameter, leads to the list page.
    ///
    /// # Errors
    ///
    /// Resolving the record for the `edit`/`view` tokens can fail like
    /// [`ActionContext::model`].
    pub async fn return_url(&mut self) -> Result<String, ControllerError> {
        self.resolve_return_url(true).await
    }

    /// `record_exists = false` after a delete: the `edit`/`view` tokens then
    /// lead to the list page instead of the removed record.
    async fn resolve_return_url(&mut self, record_exists: bool) -> Result<String, ControllerError> {
        let config = self.config();
        let urls = self.controller.urls();
        let list_url = urls.build_url(CrudAction::List, &[]);

        let Some(target) = self.request.query_str(&config.return_var) else {
            return Ok(list_url);
        };

        match target {
            "edit" | "view" if !record_exists => Ok(list_url),
            "edit" | "view" => {
                let action = if target == "edit" {
                    CrudAction::Edit
                } else {
                    CrudAction::View
                };
                let key = self
                    .model(true)
                    .await?
                    .and_then(C::Model::primary_key);
                Ok(match key {
                    Some(key) => urls.build_url(action, &[(config.id_param.as_str(), key.as_str())]),
                    None => list_url,
                })
            }
            literal if is_allowed_return_url(literal, &config.allowed_return_origins) => {
                Ok(literal.to_string())
            }
            rejected => {
                tracing::warn!(
                    return_url = %rejected,
                    "Rejected return URL outside the allowed origins"
                );
                Ok(list_url)
            }
        }
    }

    /// The single key column; composite keys are rejected
    fn key_column(&self) -> Result<&'static str, ControllerError> {
        if let Some(column) = self.key_column.get() {
            return Ok(*column);
        }
        match C::Model::primary_key_columns() {
            [column] => Ok(*self.key_column.get_or_init(|| *column)),
            columns => Err(ControllerError::unsupported(format!(
                "{} has a composite primary key ({}); only single-column keys are supported",
                C::Model::MODEL_NAME,
                columns.join(", ")
            ))),
        }
    }

    /// URL of `action` (`edit` or `view`) for one record, typically a row of
    /// the list view. The key goes into the identifier parameter
    /// (`ActionConfig::id_param`), so the link resolves back to the record.
    ///
    /// # Errors
    ///
    /// `UnsupportedConfiguration` for models with composite keys, `Internal`
    /// for records that have not been saved yet.
    pub fn create_item_url(
        &self,
        model: &C::Model,
        action: CrudAction,
        return_to: ReturnTo<'_>,
    ) -> Result<String, ControllerError> {
        self.key_column()?;
        let key = model.primary_key().ok_or_else(|| {
            ControllerError::internal(
                "Cannot link to an unsaved record",
                Some(format!("{} has no primary key yet", C::Model::MODEL_NAME)),
            )
        })?;

        // keyed by the identifier parameter the resolver reads
        let config = self.config();
        let mut params = vec![(config.id_param.as_str(), key.as_str())];
        let return_var = config.return_var.as_str();
        match return_to {
            ReturnTo::Omit => {}
            ReturnTo::CurrentPage => params.push((return_var, self.request.url())),
            ReturnTo::Url(url) => params.push((return_var, url)),
        }
        Ok(self.controller.urls().build_url(action, &params))
    }

    /// Run one action for this request
    ///
    /// # Errors
    ///
    /// `NotFound` for disabled actions and missing records, plus whatever the
    /// collaborators report.
    pub async fn run(&mut self, action: CrudAction) -> Result<ActionOutcome, ControllerError> {
        tracing::debug!(model = C::Model::MODEL_NAME, %action, "Dispatching action");
        match action {
            CrudAction::List => self.list(),
            CrudAction::Edit => self.edit().await,
            CrudAction::View => self.view().await,
            CrudAction::Delete => self.delete().await,
        }
    }

    fn list(&self) -> Result<ActionOutcome, ControllerError> {
        let config = self.config();
        config.ensure_enabled(C::Model::MODEL_NAME, CrudAction::List)?;

        let view = if self.request.is_ajax() {
            &config.list_partial
        } else {
            &config.list_view
        };
        Ok(ActionOutcome::Render { view: view.clone() })
    }

    async fn edit(&mut self) -> Result<ActionOutcome, ControllerError> {
        let config = self.config();
        let request = self.request;
        config.ensure_enabled(C::Model::MODEL_NAME, CrudAction::Edit)?;

        let submitted = request.body_map(C::Model::MODEL_NAME);
        let validation_only = request
            .body_str(&config.ajax_var)
            .is_some_and(|marker| marker == config.form_id(C::Model::MODEL_NAME));

        if validation_only {
            let model = self.model_mut().await?;
            let mut errors = ValidationErrors::new();
            if let Some(values) = submitted {
                bind_and_validate(model, values, &mut errors);
            } else if let Err(model_errors) = model.validate() {
                errors.merge(model_errors);
            }
            return Ok(ActionOutcome::Validation(errors));
        }

        if let Some(values) = submitted {
            let store = self.controller.store();
            let model = self.model_mut().await?;
            let was_new = model.is_new_record();

            let mut errors = ValidationErrors::new();
            bind_and_validate(model, values, &mut errors);

            if errors.is_empty() {
                match store.save(model).await {
                    Ok(()) => {
                        let flash = Flash {
                            model_name: C::Model::MODEL_NAME,
                            kind: if was_new {
                                FlashKind::Created
                            } else {
                                FlashKind::Updated
                            },
                        };
                        let location = self.return_url().await?;
                        return Ok(ActionOutcome::Redirect {
                            location,
                            flash: Some(flash),
                        });
                    }
                    Err(SaveError::Validation(save_errors)) => errors.merge(save_errors),
                    Err(SaveError::Database(err)) => {
                        tracing::error!(
                            model = C::Model::MODEL_NAME,
                            error = ?err,
                            "Saving record failed"
                        );
                        errors.add(ValidationError::form("The record could not be saved"));
                    }
                }
            }
            self.errors = Some(errors);
        }

        self.model(true).await?;
        Ok(ActionOutcome::Render {
            view: config.form_view.clone(),
        })
    }

    async fn view(&mut self) -> Result<ActionOutcome, ControllerError> {
        let config = self.config();
        config.ensure_enabled(C::Model::MODEL_NAME, CrudAction::View)?;

        self.existing_model().await?;
        Ok(ActionOutcome::Render {
            view: config.detail_view.clone(),
        })
    }

    async fn delete(&mut self) -> Result<ActionOutcome, ControllerError> {
        self.config()
            .ensure_enabled(C::Model::MODEL_NAME, CrudAction::Delete)?;

        let store = self.controller.store();
        let model = self.existing_model().await?;
        store.delete(model).await?;
        tracing::debug!(model = C::Model::MODEL_NAME, "Deleted record");

        let location = self.resolve_return_url(false).await?;
        Ok(ActionOutcome::Redirect {
            location,
            flash: None,
        })
    }
}

/// Assign submitted values, then validate when every value was accepted
fn bind_and_validate<M: CrudModel>(
    model: &mut M,
    values: &serde_json::Map<String, Value>,
    errors: &mut ValidationErrors,
) {
    if let Err(binding_errors) = assign_attributes(model, values) {
        errors.merge(binding_errors);
        return;
    }
    if let Err(model_errors) = model.validate() {
        errors.merge(model_errors);
    }
}
