use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ControllerError;

/// The four actions a CRUD controller can serve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrudAction {
    List,
    Edit,
    View,
    Delete,
}

impl CrudAction {
    pub const ALL: [Self; 4] = [Self::List, Self::Edit, Self::View, Self::Delete];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Edit => "edit",
            Self::View => "view",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for CrudAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrudAction {
    type Err = ControllerError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == name)
            .ok_or_else(|| ControllerError::not_found("Action", Some(name.to_string())))
    }
}

/// Whether the view action checks `enabled_actions` like the other actions.
///
/// `Gated` is the default: a controller that removes `view` from its action
/// list does not serve detail pages. `Open` serves them regardless.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewAccess {
    #[default]
    Gated,
    Open,
}

/// Scenario names applied to models depending on how they were obtained
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioNames {
    pub create: String,
    pub update: String,
    pub filter: String,
}

impl Default for ScenarioNames {
    fn default() -> Self {
        Self {
            create: "create".to_string(),
            update: "update".to_string(),
            filter: "filter".to_string(),
        }
    }
}

/// Per-controller settings.
///
/// Every field has a default, so a settings document only needs the values it
/// changes:
///
/// ```json
/// { "enabled_actions": ["list", "view"], "detail_view": "posts/show" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    /// Action served at the controller root
    pub default_action: CrudAction,
    pub enabled_actions: Vec<CrudAction>,
    /// View for the create/update form
    pub form_view: String,
    /// View rendering the filter and the item list
    pub list_view: String,
    /// Partial rendering only the items, for AJAX refreshes of the list
    pub list_partial: String,
    pub detail_view: String,
    pub scenarios: ScenarioNames,
    /// Query parameter holding the return URL
    pub return_var: String,
    /// Query parameter holding the record identifier
    pub id_param: String,
    /// Body parameter marking an AJAX validation-only submission
    pub ajax_var: String,
    /// Form id expected in `ajax_var`; `<model name in lowercase>-form` when unset
    pub form_id: Option<String>,
    pub view_access: ViewAccess,
    /// Origins (`scheme://host[:port]`) accepted for absolute return URLs.
    /// Relative same-origin paths are always accepted.
    pub allowed_return_origins: Vec<String>,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            default_action: CrudAction::List,
            enabled_actions: CrudAction::ALL.to_vec(),
            form_view: "form".to_string(),
            list_view: "list".to_string(),
            list_partial: "_items".to_string(),
            detail_view: "detail".to_string(),
            scenarios: ScenarioNames::default(),
            return_var: "returnUrl".to_string(),
            id_param: "id".to_string(),
            ajax_var: "ajax".to_string(),
            form_id: None,
            view_access: ViewAccess::default(),
            allowed_return_origins: Vec::new(),
        }
    }
}

impl ActionConfig {
    /// Parse settings from a JSON document, filling in defaults
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedConfiguration` when the document does not describe
    /// an `ActionConfig`.
    pub fn from_json(document: &str) -> Result<Self, ControllerError> {
        serde_json::from_str(document)
            .map_err(|e| ControllerError::unsupported(format!("Invalid controller settings: {e}")))
    }

    /// Replace the enabled action list
    #[must_use]
    pub fn with_actions(mut self, actions: impl IntoIterator<Item = CrudAction>) -> Self {
        self.enabled_actions = actions.into_iter().collect();
        self
    }

    #[must_use]
    pub fn without(mut self, action: CrudAction) -> Self {
        self.enabled_actions.retain(|enabled| *enabled != action);
        self
    }

    #[must_use]
    pub const fn with_view_access(mut self, access: ViewAccess) -> Self {
        self.view_access = access;
        self
    }

    #[must_use]
    pub fn allow_return_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_return_origins.push(origin.into());
        self
    }

    #[must_use]
    pub fn is_enabled(&self, action: CrudAction) -> bool {
        self.enabled_actions.contains(&action)
    }

    /// Fail with `NotFound` unless `action` may run
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for actions missing from `enabled_actions`, except
    /// `view` under [`ViewAccess::Open`].
    pub fn ensure_enabled(&self, model_name: &str, action: CrudAction) -> Result<(), ControllerError> {
        let open_view = action == CrudAction::View && self.view_access == ViewAccess::Open;
        if open_view || self.is_enabled(action) {
            Ok(())
        } else {
            Err(ControllerError::action_disabled(model_name, action))
        }
    }

    /// Form id the AJAX validation marker must carry
    #[must_use]
    pub fn form_id(&self, model_name: &str) -> String {
        self.form_id
            .clone()
            .unwrap_or_else(|| format!("{}-form", model_name.to_lowercase()))
    }
}
