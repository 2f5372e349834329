use serde_json::Value;

use crate::validation::{Validatable, ValidationError};

/// A model that can be filled from submitted form values.
///
/// Both the managed record and the filter model implement this. Attribute
/// assignment goes through an explicit allow-list ([`FormModel::safe_attributes`])
/// and a typed setter ([`FormModel::set_attribute`]); see [`crate::binding`]
/// for coercion helpers.
pub trait FormModel: Send + Sync + Sized + 'static {
    /// Name of the model. Submitted values are read from the request map under
    /// this key (`Post[title]=...`), and flash keys start with it.
    const MODEL_NAME: &'static str;

    /// Create a fresh, empty instance
    fn new_instance() -> Self;

    fn scenario(&self) -> &str;

    fn set_scenario(&mut self, scenario: &str);

    /// Attributes that may be assigned from request data in the current scenario
    fn safe_attributes(&self) -> Vec<&'static str>;

    /// Assign one attribute from a raw request value
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for `name` when the value cannot be coerced
    /// into the field's type.
    fn set_attribute(&mut self, name: &str, value: &Value) -> Result<(), ValidationError>;
}

/// The record managed by a controller.
///
/// # Example
///
/// ```rust,ignore
/// impl CrudModel for Post {
///     fn primary_key(&self) -> Option<String> {
///         self.id.map(|id| id.to_string())
///     }
/// }
/// ```
pub trait CrudModel: FormModel + Validatable {
    /// Columns forming the primary key. Only single-column keys are supported;
    /// anything else fails when a keyed URL is built.
    #[must_use]
    fn primary_key_columns() -> &'static [&'static str] {
        &["id"]
    }

    /// Key of a stored record, `None` while the record is new
    fn primary_key(&self) -> Option<String>;

    fn is_new_record(&self) -> bool {
        self.primary_key().is_none()
    }
}
