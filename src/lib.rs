//! Generic CRUD actions for web controllers.
//!
//! A [`CrudController`] serves the `list`, `edit`, `view` and `delete` actions
//! for one model type. Per request, an [`ActionContext`] resolves the record
//! and the filter model at most once, works out where to return after a save
//! or delete, and builds item URLs for list rows. [`crud_router`] mounts a
//! controller on an axum router.

pub mod binding;
pub mod config;
pub mod controller;
pub mod core;
pub mod errors;
pub mod memo;
pub mod request;
pub mod routes;
pub mod urls;
pub mod validation;

pub use config::{ActionConfig, CrudAction, ScenarioNames, ViewAccess};
pub use controller::{ActionContext, ActionOutcome, CrudController, Flash, FlashKind};
pub use crate::core::{CrudModel, CrudStore, FormModel, SaveError, SeaOrmRecord, SeaOrmStore};
pub use errors::ControllerError;
pub use request::RequestContext;
pub use routes::{crud_router, handle_action};
pub use urls::{ReturnTo, RouteUrls, UrlBuilder};
pub use validation::{Validatable, ValidationError, ValidationErrors};

// Re-exported so implementors use the same versions as the crate
pub use async_trait::async_trait;
